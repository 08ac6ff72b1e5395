//! The interface between the canvas and a document backend.
//!
//! A [`Backend`] owns the document being produced: its pages, their content streams,
//! the embedded resources and the document-level metadata. The canvas never writes
//! anything itself; it translates layout-engine calls into the minimal sequence of
//! backend calls.
//!
//! All coordinates crossing this interface are in backend space, i.e. with the origin
//! in the bottom-left corner of the page and the y axis pointing up.

use std::path::Path;

use crate::color::BlendMode;
use crate::error::CanvasResult;
use crate::font::{FontMetrics, FontSource};
use crate::image::ImageKind;
use crate::interactive::{DefaultView, LinkTarget};

/// A font that has been loaded into a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub usize);

/// An image that has been embedded into a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub usize);

/// How the ends of open subpaths are drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum LineCap {
    /// The stroke ends exactly at the end point.
    #[default]
    Butt,
    /// A half circle is drawn around the end point.
    Round,
    /// A half square is drawn around the end point.
    Square,
}

impl LineCap {
    /// Parse a line cap from its name. Unknown names fall back to [`LineCap::Butt`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "round" => LineCap::Round,
            "square" => LineCap::Square,
            _ => LineCap::Butt,
        }
    }
}

/// How the corners of paths are drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum LineJoin {
    /// Sharp corners.
    #[default]
    Miter,
    /// Rounded corners.
    Round,
    /// Cut-off corners.
    Bevel,
}

impl LineJoin {
    /// Parse a line join from its name. Unknown names fall back to [`LineJoin::Miter`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "round" => LineJoin::Round,
            "bevel" => LineJoin::Bevel,
            _ => LineJoin::Miter,
        }
    }
}

/// The way a path is stroked.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    /// The line width.
    pub width: f32,
    /// The line cap.
    pub cap: LineCap,
    /// The line join.
    pub join: LineJoin,
    /// The dash pattern. `None` means a solid line.
    pub dash: Option<Vec<f32>>,
}

impl LineStyle {
    /// A solid line with butt caps and miter joins.
    pub fn new(width: f32) -> Self {
        Self {
            width,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            dash: None,
        }
    }

    /// Return the same style with a different cap.
    #[must_use]
    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    /// Return the same style with a different join.
    #[must_use]
    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    /// Return the same style with a dash pattern.
    #[must_use]
    pub fn with_dash(mut self, dash: Vec<f32>) -> Self {
        self.dash = Some(dash);
        self
    }

    /// The dash array as it should be written. A single length is used for both the
    /// dashes and the gaps. An empty array means a solid line.
    pub fn dash_array(&self) -> Vec<f32> {
        match self.dash.as_deref() {
            None => vec![],
            Some([d]) => vec![*d, *d],
            Some(dash) => dash.to_vec(),
        }
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// A document backend the canvas draws into.
///
/// Path construction calls only build up the current path. Nothing is painted until
/// one of the terminators ([`Backend::fill`], [`Backend::stroke`],
/// [`Backend::fill_and_stroke`], [`Backend::close_and_stroke`] or [`Backend::clip`])
/// is called.
pub trait Backend {
    /// Allocate a new page and make it the current one. Returns its zero-based index.
    fn new_page(&mut self, width: f32, height: f32) -> usize;
    /// Make an already allocated page the current one again.
    ///
    /// Content that is drawn afterwards is appended to that page.
    fn reopen_page(&mut self, index: usize);
    /// The number of pages that have been allocated.
    fn page_count(&self) -> usize;

    /// Push a copy of the graphics state.
    fn save_state(&mut self);
    /// Pop the graphics state.
    fn restore_state(&mut self);
    /// Concatenate a matrix to the current transformation matrix.
    fn concat_transform(&mut self, matrix: [f32; 6]);

    /// Select a stroking color in DeviceRGB, with components in the range 0–1.
    fn set_stroke_color(&mut self, rgb: [f32; 3]);
    /// Select a non-stroking color in DeviceRGB, with components in the range 0–1.
    fn set_fill_color(&mut self, rgb: [f32; 3]);
    /// Select width, cap, join and dash pattern for strokes.
    fn set_line_style(&mut self, style: &LineStyle);
    /// Select a blend mode together with a stroking and/or non-stroking opacity.
    fn set_transparency(
        &mut self,
        blend_mode: BlendMode,
        stroking_alpha: Option<f32>,
        non_stroking_alpha: Option<f32>,
    );

    /// Begin a new subpath.
    fn move_to(&mut self, x: f32, y: f32);
    /// Append a straight line.
    fn line_to(&mut self, x: f32, y: f32);
    /// Append a cubic bezier curve.
    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32);
    /// Close the current subpath.
    fn close_path(&mut self);
    /// Append a rectangle as a closed subpath.
    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    /// Fill the current path with the nonzero rule.
    fn fill(&mut self);
    /// Stroke the current path.
    fn stroke(&mut self);
    /// Fill, then stroke the current path.
    fn fill_and_stroke(&mut self);
    /// Close the current subpath, then stroke the path.
    fn close_and_stroke(&mut self);
    /// Intersect the clipping path with the current path without painting it.
    fn clip(&mut self);

    /// Begin a text object.
    fn begin_text(&mut self);
    /// Set the text matrix.
    fn set_text_matrix(&mut self, matrix: [f32; 6]);
    /// Move to the start of the next line, offset from the start of the current one.
    fn move_text(&mut self, x: f32, y: f32);
    /// Set the extra spacing added to each space character.
    fn set_word_spacing(&mut self, spacing: f32);
    /// Set the extra spacing added to each character.
    fn set_char_spacing(&mut self, spacing: f32);
    /// Select a font and size.
    fn set_font(&mut self, font: FontId, size: f32);
    /// Show a run of text in the current font.
    fn show_text(&mut self, text: &str);
    /// End the text object.
    fn end_text(&mut self);

    /// Load a font.
    fn load_font(&mut self, source: &FontSource) -> CanvasResult<FontId>;
    /// The vertical metrics of a loaded font, in thousandths of the font size.
    fn font_metrics(&self, font: FontId) -> FontMetrics;
    /// The summed advance width of the text, in thousandths of the font size.
    fn text_width(&self, font: FontId, text: &str) -> f32;
    /// Whether the font can display the character.
    fn supports_char(&self, font: FontId, c: char) -> bool;

    /// Embed an image from its encoded bytes.
    fn embed_image(&mut self, path: &Path, data: &[u8], kind: ImageKind) -> CanvasResult<ImageId>;
    /// Draw an embedded image, scaled to the rectangle.
    fn draw_image(&mut self, image: ImageId, x: f32, y: f32, width: f32, height: f32);

    /// Register a named destination that shows the whole current page.
    fn add_named_dest(&mut self, name: &str);
    /// Add a link annotation covering the rectangle on the current page.
    fn add_link(&mut self, target: &LinkTarget, x: f32, y: f32, width: f32, height: f32);
    /// Add an entry to the document information dictionary.
    fn add_info(&mut self, label: &str, value: &str);
    /// Set the view the document opens with, on the current page.
    fn set_default_view(&mut self, view: &DefaultView);
    /// Add a script that is run when the document is opened.
    fn add_javascript(&mut self, code: &str);

    /// Whether [`Backend::finish`] has already been called.
    fn is_finished(&self) -> bool;
    /// Serialize the document.
    ///
    /// # Panics
    ///
    /// Implementations may panic if this is called more than once.
    fn finish(&mut self) -> CanvasResult<Vec<u8>>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_dash_is_doubled() {
        let style = LineStyle::new(1.0).with_dash(vec![3.0]);
        assert_eq!(style.dash_array(), vec![3.0, 3.0]);
    }

    #[test]
    fn solid_line_has_empty_dash_array() {
        assert!(LineStyle::new(2.0).dash_array().is_empty());
        assert_eq!(
            LineStyle::new(1.0).with_dash(vec![2.0, 1.0]).dash_array(),
            vec![2.0, 1.0]
        );
    }

    #[test]
    fn cap_and_join_names() {
        assert_eq!(LineCap::from_name("round"), LineCap::Round);
        assert_eq!(LineCap::from_name("square"), LineCap::Square);
        assert_eq!(LineCap::from_name("whatever"), LineCap::Butt);
        assert_eq!(LineJoin::from_name("bevel"), LineJoin::Bevel);
        assert_eq!(LineJoin::from_name("round"), LineJoin::Round);
        assert_eq!(LineJoin::from_name(""), LineJoin::Miter);
    }
}
