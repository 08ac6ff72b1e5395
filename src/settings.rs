//! Canvas configuration.

use crate::error::{CanvasError, CanvasResult};

/// The size of the paper each page is allocated with, in points.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PaperSize {
    /// ISO A3.
    A3,
    /// ISO A4.
    A4,
    /// ISO A5.
    A5,
    /// US Letter.
    Letter,
    /// US Legal.
    Legal,
    /// A custom width and height.
    Custom(f32, f32),
}

impl PaperSize {
    /// The portrait dimensions of the paper.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (841.89, 1190.55),
            PaperSize::A4 => (595.28, 841.89),
            PaperSize::A5 => (419.53, 595.28),
            PaperSize::Letter => (612.0, 792.0),
            PaperSize::Legal => (612.0, 1008.0),
            PaperSize::Custom(w, h) => (*w, *h),
        }
    }
}

/// The orientation of the pages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Orientation {
    /// The longer edge is vertical.
    #[default]
    Portrait,
    /// The longer edge is horizontal.
    Landscape,
}

/// Settings that determine how a canvas lays out and serializes its pages.
#[derive(Copy, Clone, Debug)]
pub struct CanvasSettings {
    /// The paper size of every page.
    ///
    /// **Default**: `A4`.
    pub paper_size: PaperSize,
    /// The orientation of every page.
    ///
    /// **Default**: `Portrait`.
    pub orientation: Orientation,
    /// Whether content streams should be compressed. Disabling this is mostly
    /// useful for debugging and testing.
    ///
    /// **Default**: `true`.
    pub compress_content_streams: bool,
    /// Whether the PDF should be ASCII-compatible, i.e. only use a binary marker made
    /// of printable characters.
    ///
    /// **Default**: `false`.
    pub ascii_compatible: bool,
    /// Whether embedded fonts should be subsetted to the glyphs that were actually used.
    ///
    /// **Default**: `true`.
    pub font_subsetting: bool,
    /// The factor between the baseline offset of a font and its line height.
    ///
    /// **Default**: `1.1`.
    pub font_height_ratio: f32,
}

impl CanvasSettings {
    /// Settings that produce uncompressed, easily inspectable output.
    pub fn debug() -> Self {
        Self {
            compress_content_streams: false,
            ascii_compatible: true,
            ..Self::default()
        }
    }

    /// Builder-style method to change the paper size.
    pub fn with_paper_size(mut self, paper_size: PaperSize) -> Self {
        self.paper_size = paper_size;
        self
    }

    /// Builder-style method to change the orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// The width and height of a page, with the orientation applied.
    pub fn page_dimensions(&self) -> (f32, f32) {
        let (w, h) = self.paper_size.dimensions();

        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub(crate) fn validate(&self) -> CanvasResult<()> {
        let (w, h) = self.paper_size.dimensions();

        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(CanvasError::Configuration(format!(
                "page size must be positive and finite, got {w}x{h}"
            )));
        }

        if !(self.font_height_ratio.is_finite() && self.font_height_ratio > 0.0) {
            return Err(CanvasError::Configuration(format!(
                "font height ratio must be positive, got {}",
                self.font_height_ratio
            )));
        }

        Ok(())
    }
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            orientation: Orientation::Portrait,
            compress_content_streams: true,
            ascii_compatible: false,
            font_subsetting: true,
            font_height_ratio: 1.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_swaps_dimensions() {
        let settings = CanvasSettings::default()
            .with_paper_size(PaperSize::Letter)
            .with_orientation(Orientation::Landscape);
        assert_eq!(settings.page_dimensions(), (792.0, 612.0));
    }

    #[test]
    fn rejects_empty_page() {
        let settings = CanvasSettings::default().with_paper_size(PaperSize::Custom(0.0, 100.0));
        assert!(matches!(
            settings.validate(),
            Err(CanvasError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_invalid_font_height_ratio() {
        let settings = CanvasSettings {
            font_height_ratio: -1.0,
            ..CanvasSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
