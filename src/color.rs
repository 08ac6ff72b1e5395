//! Colors, blending and transparency.

use float_cmp::approx_eq;

/// An RGB color with an optional alpha channel.
///
/// Components are in the range 0–1. Besides the fourth component that an RGBA color
/// carries, a color can have an alpha override, which takes precedence when
/// computing the opacity the color is drawn with.
#[derive(Debug, Clone, Copy)]
pub struct Color {
    rgb: [f32; 3],
    component_alpha: Option<f32>,
    alpha: Option<f32>,
}

impl Color {
    /// Create a new opaque RGB color.
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            rgb: [r, g, b],
            component_alpha: None,
            alpha: None,
        }
    }

    /// Create a new RGBA color.
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            rgb: [r, g, b],
            component_alpha: Some(a),
            alpha: None,
        }
    }

    /// Create a color from a slice of 3 (RGB) or 4 (RGBA) components.
    ///
    /// Returns `None` for any other number of components.
    pub fn from_components(components: &[f32]) -> Option<Self> {
        match *components {
            [r, g, b] => Some(Self::rgb(r, g, b)),
            [r, g, b, a] => Some(Self::rgba(r, g, b, a)),
            _ => None,
        }
    }

    /// Black.
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// White.
    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    /// Return the same color with an alpha override.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// The components that are sent to the backend when selecting this color.
    pub fn components(&self) -> [f32; 3] {
        self.rgb
    }

    /// The opacity of the color itself, before any canvas-wide opacity is applied.
    pub fn alpha(&self) -> f32 {
        self.alpha.or(self.component_alpha).unwrap_or(1.0)
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.rgb
            .iter()
            .zip(other.rgb.iter())
            .all(|(a, b)| approx_eq!(f32, *a, *b, ulps = 2))
            && approx_eq!(f32, self.alpha(), other.alpha(), ulps = 2)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// How to blend source and backdrop.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[allow(missing_docs)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

impl BlendMode {
    /// Parse a blend mode from its PDF name.
    ///
    /// Names that are not recognized fall back to [`BlendMode::Normal`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "Multiply" => BlendMode::Multiply,
            "Screen" => BlendMode::Screen,
            "Overlay" => BlendMode::Overlay,
            "Darken" => BlendMode::Darken,
            "Lighten" => BlendMode::Lighten,
            // Older layout engines emit the misspelled name.
            "ColorDodge" | "ColorDogde" => BlendMode::ColorDodge,
            "ColorBurn" => BlendMode::ColorBurn,
            "HardLight" => BlendMode::HardLight,
            "SoftLight" => BlendMode::SoftLight,
            "Difference" => BlendMode::Difference,
            "Exclusion" => BlendMode::Exclusion,
            _ => BlendMode::Normal,
        }
    }

    /// The PDF name of the blend mode.
    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "ColorDodge",
            BlendMode::ColorBurn => "ColorBurn",
            BlendMode::HardLight => "HardLight",
            BlendMode::SoftLight => "SoftLight",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
        }
    }

    pub(crate) fn to_pdf(self) -> pdf_writer::types::BlendMode {
        match self {
            BlendMode::Normal => pdf_writer::types::BlendMode::Normal,
            BlendMode::Multiply => pdf_writer::types::BlendMode::Multiply,
            BlendMode::Screen => pdf_writer::types::BlendMode::Screen,
            BlendMode::Overlay => pdf_writer::types::BlendMode::Overlay,
            BlendMode::Darken => pdf_writer::types::BlendMode::Darken,
            BlendMode::Lighten => pdf_writer::types::BlendMode::Lighten,
            BlendMode::ColorDodge => pdf_writer::types::BlendMode::ColorDodge,
            BlendMode::ColorBurn => pdf_writer::types::BlendMode::ColorBurn,
            BlendMode::HardLight => pdf_writer::types::BlendMode::HardLight,
            BlendMode::SoftLight => pdf_writer::types::BlendMode::SoftLight,
            BlendMode::Difference => pdf_writer::types::BlendMode::Difference,
            BlendMode::Exclusion => pdf_writer::types::BlendMode::Exclusion,
        }
    }
}

/// A blend mode paired with a constant opacity.
///
/// The canvas tracks one of these for strokes and one for fills.
#[derive(Debug, Copy, Clone)]
pub struct Transparency {
    /// The blend mode.
    pub blend_mode: BlendMode,
    /// The constant opacity, in the range 0–1.
    pub opacity: f32,
}

impl Transparency {
    /// Create a new transparency.
    pub fn new(blend_mode: BlendMode, opacity: f32) -> Self {
        Self {
            blend_mode,
            opacity,
        }
    }
}

impl PartialEq for Transparency {
    fn eq(&self, other: &Self) -> bool {
        self.blend_mode == other.blend_mode
            && approx_eq!(f32, self.opacity, other.opacity, ulps = 2)
    }
}

impl Default for Transparency {
    fn default() -> Self {
        Self::new(BlendMode::Normal, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_blend_mode_is_normal() {
        assert_eq!(BlendMode::from_name("Luminosity"), BlendMode::Normal);
        assert_eq!(BlendMode::from_name("multiply"), BlendMode::Normal);
        assert_eq!(BlendMode::from_name(""), BlendMode::Normal);
    }

    #[test]
    fn blend_mode_names_round_trip() {
        for mode in [
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Difference,
            BlendMode::Exclusion,
        ] {
            assert_eq!(BlendMode::from_name(mode.name()), mode);
        }

        assert_eq!(BlendMode::from_name("ColorDogde"), BlendMode::ColorDodge);
    }

    #[test]
    fn alpha_override_wins() {
        let color = Color::rgba(1.0, 0.0, 0.0, 0.5);
        assert_eq!(color.alpha(), 0.5);
        assert_eq!(color.with_alpha(0.25).alpha(), 0.25);
        assert_eq!(Color::rgb(1.0, 0.0, 0.0).alpha(), 1.0);
    }

    #[test]
    fn color_equality_is_component_wise() {
        assert_eq!(Color::rgb(0.1, 0.2, 0.3), Color::rgb(0.1, 0.2, 0.3));
        assert_ne!(Color::rgb(0.1, 0.2, 0.3), Color::rgb(0.1, 0.2, 0.31));
        assert_ne!(Color::rgb(0.1, 0.2, 0.3), Color::rgba(0.1, 0.2, 0.3, 0.5));
    }

    #[test]
    fn from_components() {
        assert_eq!(
            Color::from_components(&[0.0, 0.5, 1.0]),
            Some(Color::rgb(0.0, 0.5, 1.0))
        );
        assert_eq!(
            Color::from_components(&[0.0, 0.5, 1.0, 0.2]).map(|c| c.alpha()),
            Some(0.2)
        );
        assert!(Color::from_components(&[0.0, 0.5]).is_none());
    }
}
