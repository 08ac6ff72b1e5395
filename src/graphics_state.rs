//! Suppressing redundant graphics state changes.
//!
//! The canvas issues a color, font or transparency change to the backend only if
//! the requested value differs from the value it last applied. The backend is never
//! assumed to deduplicate on its own.
//!
//! The cache does not know what the backend's graphics state stack contains, so it
//! is reset on every save, restore and new page. After a reset, the next change of
//! each kind is always applied.

use float_cmp::approx_eq;

use crate::backend::FontId;
use crate::color::Transparency;

/// The kinds of state the cache keeps track of.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// The stroking color.
    StrokeColor,
    /// The non-stroking color.
    FillColor,
    /// The font and font size.
    Font,
    /// The stroking blend mode and opacity.
    StrokeTransparency,
    /// The non-stroking blend mode and opacity.
    FillTransparency,
}

/// A requested state change.
#[derive(Debug, Copy, Clone)]
pub enum StateChange {
    /// Select a stroking color.
    StrokeColor([f32; 3]),
    /// Select a non-stroking color.
    FillColor([f32; 3]),
    /// Select a font at a size.
    Font(FontId, f32),
    /// Select a stroking transparency.
    StrokeTransparency(Transparency),
    /// Select a non-stroking transparency.
    FillTransparency(Transparency),
}

impl StateChange {
    /// The kind of state this change affects.
    pub fn kind(&self) -> StateKind {
        match self {
            StateChange::StrokeColor(_) => StateKind::StrokeColor,
            StateChange::FillColor(_) => StateKind::FillColor,
            StateChange::Font(..) => StateKind::Font,
            StateChange::StrokeTransparency(_) => StateKind::StrokeTransparency,
            StateChange::FillTransparency(_) => StateKind::FillTransparency,
        }
    }
}

fn same_components(a: &[f32; 3], b: &[f32; 3]) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(a, b)| approx_eq!(f32, *a, *b, ulps = 2))
}

/// The last applied value of each kind of state.
#[derive(Debug, Clone, Default)]
pub struct GraphicsStateCache {
    stroke_color: Option<[f32; 3]>,
    fill_color: Option<[f32; 3]>,
    font: Option<(FontId, f32)>,
    stroke_transparency: Option<Transparency>,
    fill_transparency: Option<Transparency>,
}

impl GraphicsStateCache {
    /// Create a new cache that knows nothing about the current state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the change needs to be sent to the backend.
    pub fn should_apply(&self, change: &StateChange) -> bool {
        match change {
            StateChange::StrokeColor(c) => self
                .stroke_color
                .as_ref()
                .map_or(true, |cur| !same_components(cur, c)),
            StateChange::FillColor(c) => self
                .fill_color
                .as_ref()
                .map_or(true, |cur| !same_components(cur, c)),
            StateChange::Font(id, size) => self.font.map_or(true, |(cur_id, cur_size)| {
                cur_id != *id || !approx_eq!(f32, cur_size, *size, ulps = 2)
            }),
            StateChange::StrokeTransparency(t) => self.stroke_transparency.as_ref() != Some(t),
            StateChange::FillTransparency(t) => self.fill_transparency.as_ref() != Some(t),
        }
    }

    /// Remember that the change has been applied.
    pub fn record(&mut self, change: StateChange) {
        match change {
            StateChange::StrokeColor(c) => self.stroke_color = Some(c),
            StateChange::FillColor(c) => self.fill_color = Some(c),
            StateChange::Font(id, size) => self.font = Some((id, size)),
            StateChange::StrokeTransparency(t) => self.stroke_transparency = Some(t),
            StateChange::FillTransparency(t) => self.fill_transparency = Some(t),
        }
    }

    /// Check and record in one step. Returns whether the change needs to be applied.
    pub fn update(&mut self, change: StateChange) -> bool {
        if self.should_apply(&change) {
            self.record(change);
            true
        } else {
            log::trace!("suppressing redundant {:?} change", change.kind());
            false
        }
    }

    /// Forget everything that is known about the current state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether nothing is known about the given kind of state.
    pub fn is_unknown(&self, kind: StateKind) -> bool {
        match kind {
            StateKind::StrokeColor => self.stroke_color.is_none(),
            StateKind::FillColor => self.fill_color.is_none(),
            StateKind::Font => self.font.is_none(),
            StateKind::StrokeTransparency => self.stroke_transparency.is_none(),
            StateKind::FillTransparency => self.fill_transparency.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::BlendMode;

    #[test]
    fn identical_color_is_applied_once() {
        let mut cache = GraphicsStateCache::new();
        assert!(cache.update(StateChange::FillColor([0.0, 0.0, 0.0])));
        assert!(!cache.update(StateChange::FillColor([0.0, 0.0, 0.0])));
        assert!(cache.update(StateChange::FillColor([0.0, 0.0, 0.5])));
    }

    #[test]
    fn stroke_and_fill_are_independent() {
        let mut cache = GraphicsStateCache::new();
        let half = Transparency::new(BlendMode::Normal, 0.5);

        assert!(cache.update(StateChange::StrokeTransparency(half)));
        assert!(cache.update(StateChange::FillTransparency(half)));
        assert!(!cache.update(StateChange::StrokeTransparency(half)));
        assert!(cache.update(StateChange::StrokeColor([1.0, 0.0, 0.0])));
        assert!(cache.update(StateChange::FillColor([1.0, 0.0, 0.0])));
    }

    #[test]
    fn transparency_compares_mode_and_opacity() {
        let mut cache = GraphicsStateCache::new();
        assert!(cache.update(StateChange::FillTransparency(Transparency::new(
            BlendMode::Normal,
            0.5
        ))));
        assert!(cache.update(StateChange::FillTransparency(Transparency::new(
            BlendMode::Multiply,
            0.5
        ))));
        assert!(cache.update(StateChange::FillTransparency(Transparency::new(
            BlendMode::Multiply,
            0.75
        ))));
    }

    #[test]
    fn font_compares_id_and_size() {
        let mut cache = GraphicsStateCache::new();
        assert!(cache.update(StateChange::Font(FontId(0), 12.0)));
        assert!(!cache.update(StateChange::Font(FontId(0), 12.0)));
        assert!(cache.update(StateChange::Font(FontId(0), 14.0)));
        assert!(cache.update(StateChange::Font(FontId(1), 14.0)));
    }

    #[test]
    fn should_apply_does_not_record() {
        let cache = GraphicsStateCache::new();
        let change = StateChange::StrokeColor([0.2, 0.2, 0.2]);
        assert!(cache.should_apply(&change));
        assert!(cache.should_apply(&change));
        assert!(cache.is_unknown(StateKind::StrokeColor));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut cache = GraphicsStateCache::new();
        cache.record(StateChange::StrokeColor([0.0; 3]));
        cache.record(StateChange::FillColor([0.0; 3]));
        cache.record(StateChange::Font(FontId(3), 10.0));
        cache.record(StateChange::StrokeTransparency(Transparency::default()));
        cache.record(StateChange::FillTransparency(Transparency::default()));
        cache.reset();

        for kind in [
            StateKind::StrokeColor,
            StateKind::FillColor,
            StateKind::Font,
            StateKind::StrokeTransparency,
            StateKind::FillTransparency,
        ] {
            assert!(cache.is_unknown(kind));
        }
    }
}
