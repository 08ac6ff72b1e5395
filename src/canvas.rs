//! The drawing surface.
//!
//! A [`Canvas`] is what a layout engine draws into. Its coordinate system has the
//! origin in the top-left corner of the page with the y axis pointing down, and every
//! coordinate is flipped before it reaches the [`Backend`], whose origin is in the
//! bottom-left corner.
//!
//! The canvas keeps track of the state it has already applied (see
//! [`GraphicsStateCache`]), so that drawing many shapes with the same color does not
//! repeat the same state changes over and over again.
//!
//! ```no_run
//! use vellum::{Canvas, CanvasSettings, Color, LineStyle, TextStyle};
//!
//! let mut canvas = Canvas::new(CanvasSettings::default()).unwrap();
//! canvas.filled_rectangle(50.0, 50.0, 100.0, 20.0, &Color::rgb(0.9, 0.9, 0.9));
//! canvas
//!     .text(55.0, 52.0, "Hello", &TextStyle::new("Helvetica", 12.0))
//!     .unwrap();
//! canvas.line(50.0, 80.0, 150.0, 80.0, &Color::black(), &LineStyle::new(0.5));
//! canvas.page_text(
//!     50.0,
//!     800.0,
//!     "Page {PAGE_NUM} of {PAGE_COUNT}",
//!     TextStyle::new("Helvetica", 8.0),
//! );
//!
//! std::fs::write("hello.pdf", canvas.output().unwrap()).unwrap();
//! ```

use std::io::Write;
use std::path::Path;

use crate::backend::{Backend, LineCap, LineJoin, LineStyle};
use crate::color::{BlendMode, Color, Transparency};
use crate::curve::Ellipse;
use crate::error::CanvasResult;
use crate::font::{FontCache, FontHandle};
use crate::graphics_state::{GraphicsStateCache, StateChange};
use crate::image::ImageCache;
use crate::interactive::{DefaultView, LinkTarget};
use crate::overlay::{Overlay, PageLineRequest, PageRequest, PageTextRequest};
use crate::pdf::PdfBackend;
use crate::settings::CanvasSettings;

/// How a closed shape is painted.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Paint {
    /// Fill the shape.
    #[default]
    Fill,
    /// Stroke the outline of the shape.
    Stroke(LineStyle),
    /// Fill the shape and stroke its outline in the same color.
    FillAndStroke(LineStyle),
}

impl Paint {
    fn fills(&self) -> bool {
        matches!(self, Paint::Fill | Paint::FillAndStroke(_))
    }

    fn line_style(&self) -> Option<&LineStyle> {
        match self {
            Paint::Fill => None,
            Paint::Stroke(style) | Paint::FillAndStroke(style) => Some(style),
        }
    }
}

/// How a text is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// The font identifier, either the name of one of the standard fonts or the
    /// path of a font file.
    pub font: String,
    /// The font size.
    pub size: f32,
    /// The text color.
    pub color: Color,
    /// Extra space added to every space character.
    pub word_spacing: f32,
    /// Extra space added to every character.
    pub char_spacing: f32,
    /// The rotation of the text in degrees.
    pub angle: f32,
}

impl TextStyle {
    /// A black, unrotated text without extra spacing.
    pub fn new(font: impl Into<String>, size: f32) -> Self {
        Self {
            font: font.into(),
            size,
            color: Color::black(),
            word_spacing: 0.0,
            char_spacing: 0.0,
            angle: 0.0,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_word_spacing(mut self, word_spacing: f32) -> Self {
        self.word_spacing = word_spacing;
        self
    }

    #[must_use]
    pub fn with_char_spacing(mut self, char_spacing: f32) -> Self {
        self.char_spacing = char_spacing;
        self
    }

    #[must_use]
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }
}

/// A stateful drawing surface spanning all pages of a document.
pub struct Canvas<B: Backend = PdfBackend> {
    pub(crate) backend: B,
    settings: CanvasSettings,
    width: f32,
    height: f32,
    page_number: usize,
    page_count: usize,
    cache: GraphicsStateCache,
    fonts: FontCache,
    images: ImageCache,
    pub(crate) overlay: Overlay,
    opacity: f32,
}

impl Canvas<PdfBackend> {
    /// Create a new canvas that produces a PDF document.
    pub fn new(settings: CanvasSettings) -> CanvasResult<Self> {
        settings.validate()?;
        Self::with_backend(settings, PdfBackend::new(settings))
    }
}

impl<B: Backend> Canvas<B> {
    /// Create a new canvas drawing into the given backend.
    ///
    /// The first page is allocated right away.
    pub fn with_backend(settings: CanvasSettings, mut backend: B) -> CanvasResult<Self> {
        settings.validate()?;

        let (width, height) = settings.page_dimensions();
        backend.new_page(width, height);

        Ok(Self {
            backend,
            settings,
            width,
            height,
            page_number: 1,
            page_count: 1,
            cache: GraphicsStateCache::new(),
            fonts: FontCache::new(),
            images: ImageCache::new(),
            overlay: Overlay::new(),
            opacity: 1.0,
        })
    }

    /// The backend the canvas draws into.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The settings of the canvas.
    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    /// The width of a page.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// The height of a page.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// The number of the current page, starting at 1.
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn set_page_number(&mut self, page_number: usize) {
        self.page_number = page_number;
    }

    /// The number of pages, as it is substituted for `{PAGE_COUNT}`.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn set_page_count(&mut self, page_count: usize) {
        self.page_count = page_count;
    }

    /// Flip a y coordinate between the top-left and the bottom-left origin.
    ///
    /// Applying it twice yields the original coordinate.
    pub fn y(&self, y: f32) -> f32 {
        self.height - y
    }

    fn reset_state(&mut self) {
        self.cache.reset();
        self.opacity = 1.0;
    }

    fn set_stroke_transparency(&mut self, blend_mode: BlendMode, opacity: f32) {
        let transparency = Transparency::new(blend_mode, opacity);
        if self
            .cache
            .update(StateChange::StrokeTransparency(transparency))
        {
            self.backend.set_transparency(blend_mode, Some(opacity), None);
        }
    }

    fn set_fill_transparency(&mut self, blend_mode: BlendMode, opacity: f32) {
        let transparency = Transparency::new(blend_mode, opacity);
        if self.cache.update(StateChange::FillTransparency(transparency)) {
            self.backend.set_transparency(blend_mode, None, Some(opacity));
        }
    }

    fn set_stroke_color(&mut self, color: &Color) {
        let components = color.components();
        if self.cache.update(StateChange::StrokeColor(components)) {
            self.backend.set_stroke_color(components);
        }

        self.set_stroke_transparency(BlendMode::Normal, color.alpha() * self.opacity);
    }

    fn set_fill_color(&mut self, color: &Color) {
        let components = color.components();
        if self.cache.update(StateChange::FillColor(components)) {
            self.backend.set_fill_color(components);
        }

        self.set_fill_transparency(BlendMode::Normal, color.alpha() * self.opacity);
    }

    fn apply_paint(&mut self, color: &Color, paint: &Paint) {
        if paint.fills() {
            self.set_fill_color(color);
        }

        if let Some(style) = paint.line_style() {
            self.set_stroke_color(color);
            self.backend.set_line_style(style);
        }
    }

    fn set_font(&mut self, font: &FontHandle, size: f32) {
        if self.cache.update(StateChange::Font(font.id, size)) {
            self.backend.set_font(font.id, size);
        }
    }

    /// Go back to plain blending after a shape with a translucent color.
    fn reset_transparency(&mut self) {
        self.set_stroke_transparency(BlendMode::Normal, self.opacity);
        self.set_fill_transparency(BlendMode::Normal, self.opacity);
    }

    /// Set the opacity and blend mode for everything drawn afterwards.
    ///
    /// The opacity is multiplied with the alpha of every color drawn from now on,
    /// until the next call to [`Canvas::save`], [`Canvas::restore`] or
    /// [`Canvas::new_page`].
    pub fn set_opacity(&mut self, opacity: f32, blend_mode: BlendMode) {
        self.set_stroke_transparency(blend_mode, opacity);
        self.set_fill_transparency(blend_mode, opacity);
        self.opacity = opacity;
    }

    /// Draw a line.
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: &Color, style: &LineStyle) {
        self.set_stroke_color(color);
        self.backend.set_line_style(style);

        self.backend.move_to(x1, self.y(y1));
        self.backend.line_to(x2, self.y(y2));
        self.backend.stroke();

        self.reset_transparency();
    }

    /// Stroke the outline of a rectangle whose top-left corner is at `(x, y)`.
    pub fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, color: &Color, style: &LineStyle) {
        self.set_stroke_color(color);
        self.backend.set_line_style(style);

        self.backend.rect(x, self.y(y) - h, w, h);
        self.backend.stroke();

        self.reset_transparency();
    }

    /// Fill a rectangle whose top-left corner is at `(x, y)`.
    pub fn filled_rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, color: &Color) {
        self.set_fill_color(color);

        self.backend.rect(x, self.y(y) - h, w, h);
        self.backend.fill();

        self.reset_transparency();
    }

    /// Draw a closed polygon through the given points.
    ///
    /// Polygons with fewer than two points are not drawn.
    pub fn polygon(&mut self, points: &[(f32, f32)], color: &Color, paint: &Paint) {
        if points.len() < 2 {
            return;
        }

        self.apply_paint(color, paint);
        self.polygon_path(points);

        match paint {
            Paint::Fill => {
                self.backend.close_path();
                self.backend.fill();
            }
            Paint::Stroke(_) => self.backend.close_and_stroke(),
            Paint::FillAndStroke(_) => {
                self.backend.close_path();
                self.backend.fill_and_stroke();
            }
        }

        self.reset_transparency();
    }

    fn polygon_path(&mut self, points: &[(f32, f32)]) {
        let mut iter = points.iter();
        if let Some((x, y)) = iter.next() {
            self.backend.move_to(*x, self.y(*y));
        }

        for (x, y) in iter {
            self.backend.line_to(*x, self.y(*y));
        }
    }

    /// Draw a circle around `(x, y)`.
    ///
    /// Stroked circles always use round caps and joins. A radius of zero draws
    /// nothing.
    pub fn circle(&mut self, x: f32, y: f32, r: f32, color: &Color, paint: &Paint) {
        let ellipse = Ellipse::circle(x, self.y(y), r);
        if ellipse.is_degenerate() {
            return;
        }

        let round = |style: &LineStyle| {
            style
                .clone()
                .with_cap(LineCap::Round)
                .with_join(LineJoin::Round)
        };
        let paint = match paint {
            Paint::Fill => Paint::Fill,
            Paint::Stroke(style) => Paint::Stroke(round(style)),
            Paint::FillAndStroke(style) => Paint::FillAndStroke(round(style)),
        };

        self.paint_ellipse(&ellipse, color, &paint, true);
    }

    /// Draw an ellipse around `(x, y)`, rotated by `angle` degrees.
    ///
    /// A vertical radius of zero draws a circle.
    #[allow(clippy::too_many_arguments)]
    pub fn ellipse(
        &mut self,
        x: f32,
        y: f32,
        r1: f32,
        r2: f32,
        angle: f32,
        color: &Color,
        paint: &Paint,
    ) {
        let ellipse = Ellipse::arc(x, self.y(y), r1, r2, 0.0, 360.0).rotated(angle);
        if ellipse.is_degenerate() {
            return;
        }

        self.paint_ellipse(&ellipse, color, paint, true);
    }

    /// Stroke an open elliptical arc around `(x, y)` from `start` to `end` degrees,
    /// counter-clockwise.
    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &mut self,
        x: f32,
        y: f32,
        r1: f32,
        r2: f32,
        start: f32,
        end: f32,
        color: &Color,
        style: &LineStyle,
    ) {
        let ellipse = Ellipse::arc(x, self.y(y), r1, r2, start, end);
        if ellipse.is_degenerate() {
            return;
        }

        self.paint_ellipse(&ellipse, color, &Paint::Stroke(style.clone()), false);
    }

    fn paint_ellipse(&mut self, ellipse: &Ellipse, color: &Color, paint: &Paint, close: bool) {
        self.apply_paint(color, paint);
        self.draw_ellipse(ellipse, paint.fills(), paint.line_style().is_some(), close);

        self.reset_transparency();
    }

    /// Build the full path of an ellipse and paint it.
    fn draw_ellipse(&mut self, ellipse: &Ellipse, fill: bool, stroke: bool, close: bool) {
        let Some(arc) = ellipse.approximate() else {
            return;
        };

        let transform = ellipse.local_transform();
        if let Some(transform) = transform {
            self.backend.save_state();
            self.backend.concat_transform(transform);
        }

        self.backend.move_to(arc.start.x, arc.start.y);
        for curve in &arc.curves {
            self.backend.curve_to(
                curve.ctrl1.x,
                curve.ctrl1.y,
                curve.ctrl2.x,
                curve.ctrl2.y,
                curve.end.x,
                curve.end.y,
            );
        }

        match (fill, stroke) {
            (true, true) => {
                if close {
                    self.backend.close_path();
                }
                self.backend.fill_and_stroke();
            }
            (true, false) => self.backend.fill(),
            (false, true) if close => self.backend.close_and_stroke(),
            (false, true) => self.backend.stroke(),
            (false, false) => {}
        }

        if transform.is_some() {
            self.backend.restore_state();
        }
    }

    /// Continue the current path with the curves of an arc, without moving to its
    /// start point first.
    fn arc_segments(&mut self, ellipse: &Ellipse) {
        let Some(arc) = ellipse.approximate() else {
            return;
        };

        for curve in &arc.curves {
            self.backend.curve_to(
                curve.ctrl1.x,
                curve.ctrl1.y,
                curve.ctrl2.x,
                curve.ctrl2.y,
                curve.end.x,
                curve.end.y,
            );
        }
    }

    /// Restrict drawing to a rectangle until the matching [`Canvas::clipping_end`].
    pub fn clipping_rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.backend.save_state();
        self.backend.rect(x, self.y(y) - h, w, h);
        self.backend.clip();
    }

    /// Restrict drawing to a rectangle with rounded corners until the matching
    /// [`Canvas::clipping_end`].
    ///
    /// The radii are given for the top-left, top-right, bottom-right and bottom-left
    /// corner. A radius of zero leaves the corner square.
    #[allow(clippy::too_many_arguments)]
    pub fn clipping_roundrectangle(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        r_tl: f32,
        r_tr: f32,
        r_br: f32,
        r_bl: f32,
    ) {
        let bottom = self.y(y) - h;
        let top = bottom + h;
        let right = x + w;
        let corner = |cx: f32, cy: f32, r: f32, start: f32| {
            Ellipse::arc(cx, cy, r, 0.0, start, start + 90.0)
        };

        self.backend.save_state();

        self.backend.move_to(x, top - r_tl);
        self.backend.line_to(x, bottom + r_bl);
        self.arc_segments(&corner(x + r_bl, bottom + r_bl, r_bl, 180.0));
        self.backend.line_to(right - r_br, bottom);
        self.arc_segments(&corner(right - r_br, bottom + r_br, r_br, 270.0));
        self.backend.line_to(right, top - r_tr);
        self.arc_segments(&corner(right - r_tr, top - r_tr, r_tr, 0.0));
        self.backend.line_to(x + r_tl, top);
        self.arc_segments(&corner(x + r_tl, top - r_tl, r_tl, 90.0));

        self.backend.close_path();
        self.backend.clip();
    }

    /// Restrict drawing to a polygon until the matching [`Canvas::clipping_end`].
    pub fn clipping_polygon(&mut self, points: &[(f32, f32)]) {
        self.backend.save_state();

        if points.len() >= 2 {
            self.polygon_path(points);
            self.backend.close_path();
            self.backend.clip();
        }
    }

    /// End the innermost clipping region.
    pub fn clipping_end(&mut self) {
        self.backend.restore_state();
        self.cache.reset();
    }

    /// Draw a text whose top-left corner is at `(x, y)`.
    pub fn text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) -> CanvasResult<()> {
        let font = self.fonts.resolve(&style.font, &mut self.backend)?;

        self.set_fill_color(&style.color);

        let baseline = self.y(y) - style.size * font.metrics.baseline_offset() / 1000.0;

        self.backend.begin_text();
        self.set_font(&font, style.size);

        if style.word_spacing != 0.0 {
            self.backend.set_word_spacing(style.word_spacing);
        }

        if style.char_spacing != 0.0 {
            self.backend.set_char_spacing(style.char_spacing);
        }

        if style.angle == 0.0 {
            self.backend.move_text(x, baseline);
        } else {
            let a = style.angle.to_radians();
            let (sin, cos) = a.sin_cos();
            self.backend
                .set_text_matrix([cos, -sin, sin, cos, x, baseline]);
        }

        self.backend.show_text(text);

        // Spacing is part of the text state and outlives this text object.
        if style.word_spacing != 0.0 {
            self.backend.set_word_spacing(0.0);
        }

        if style.char_spacing != 0.0 {
            self.backend.set_char_spacing(0.0);
        }

        self.backend.end_text();

        self.reset_transparency();

        Ok(())
    }

    /// Queue a text that is drawn on every page once the document is finished.
    ///
    /// The placeholders `{PAGE_NUM}` and `{PAGE_COUNT}` are replaced with the number
    /// of the respective page and the total number of pages.
    pub fn page_text(&mut self, x: f32, y: f32, text: &str, style: TextStyle) {
        self.overlay.push(PageRequest::Text(PageTextRequest {
            x,
            y,
            text: text.to_string(),
            style,
        }));
    }

    /// Queue a line that is drawn on every page once the document is finished.
    #[allow(clippy::too_many_arguments)]
    pub fn page_line(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Color,
        style: LineStyle,
    ) {
        self.overlay.push(PageRequest::Line(PageLineRequest {
            x1,
            y1,
            x2,
            y2,
            color,
            style,
        }));
    }

    /// The width of a text in points.
    pub fn text_width(
        &mut self,
        text: &str,
        font: &str,
        size: f32,
        word_spacing: f32,
        char_spacing: f32,
    ) -> CanvasResult<f32> {
        let font = self.fonts.resolve(font, &mut self.backend)?;

        let glyphs = self.backend.text_width(font.id, text) * size / 1000.0;
        let chars = text.chars().count() as f32;
        let spaces = text.chars().filter(|c| *c == ' ').count() as f32;

        Ok(glyphs + chars * char_spacing + spaces * word_spacing)
    }

    /// The height of a line of text.
    pub fn font_height(&mut self, font: &str, size: f32) -> CanvasResult<f32> {
        Ok(self.font_baseline(font, size)? * self.settings.font_height_ratio)
    }

    /// The distance between the top of a line of text and its baseline.
    pub fn font_baseline(&mut self, font: &str, size: f32) -> CanvasResult<f32> {
        let font = self.fonts.resolve(font, &mut self.backend)?;
        Ok(size * font.metrics.baseline_offset() / 1000.0)
    }

    /// Whether the font has a glyph for the character.
    pub fn font_supports_char(&mut self, font: &str, c: char) -> CanvasResult<bool> {
        let font = self.fonts.resolve(font, &mut self.backend)?;
        Ok(self.backend.supports_char(font.id, c))
    }

    /// Rotate everything drawn afterwards by `angle` degrees around `(x, y)`.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32) {
        let y = self.y(y);
        let (s, c) = angle.to_radians().sin_cos();

        self.backend
            .concat_transform([c, -s, s, c, x - x * c - y * s, y - y * c + x * s]);
    }

    /// Skew everything drawn afterwards by the given angles in degrees, relative to
    /// `(x, y)`.
    pub fn skew(&mut self, angle_x: f32, angle_y: f32, x: f32, y: f32) {
        let y = self.y(y);
        let tan_x = angle_x.to_radians().tan();
        let tan_y = angle_y.to_radians().tan();

        self.backend
            .concat_transform([1.0, tan_y, tan_x, 1.0, -y * tan_x, -x * tan_y]);
    }

    /// Scale everything drawn afterwards, keeping `(x, y)` in place.
    pub fn scale(&mut self, sx: f32, sy: f32, x: f32, y: f32) {
        let y = self.y(y);

        self.backend
            .concat_transform([sx, 0.0, 0.0, sy, x * (1.0 - sx), y * (1.0 - sy)]);
    }

    /// Move everything drawn afterwards.
    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.backend.concat_transform([1.0, 0.0, 0.0, 1.0, tx, -ty]);
    }

    /// Concatenate a raw matrix in backend coordinates.
    pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.backend.concat_transform([a, b, c, d, e, f]);
    }

    /// Draw an image file scaled into a rectangle whose top-left corner is at
    /// `(x, y)`.
    ///
    /// Every file is embedded once, no matter how often it is drawn. Files that
    /// cannot be read or decoded are skipped.
    pub fn image(&mut self, path: impl AsRef<Path>, x: f32, y: f32, w: f32, h: f32) {
        let Some(image) = self.images.get_or_embed(path.as_ref(), &mut self.backend) else {
            return;
        };

        self.backend.draw_image(image, x, self.y(y) - h, w, h);
    }

    /// Start a new page and make it the current one.
    pub fn new_page(&mut self) {
        self.page_number += 1;
        self.page_count += 1;
        self.reset_state();

        log::debug!("starting page {}", self.page_number);
        self.backend.new_page(self.width, self.height);
    }

    pub(crate) fn reopen_page(&mut self, index: usize) {
        self.backend.reopen_page(index);
        self.reset_state();
    }

    /// Save the graphics state.
    pub fn save(&mut self) {
        self.backend.save_state();
        self.reset_state();
    }

    /// Restore the last saved graphics state.
    pub fn restore(&mut self) {
        self.backend.restore_state();
        self.reset_state();
    }

    /// Define a named destination on the current page.
    pub fn add_named_dest(&mut self, name: &str) {
        self.backend.add_named_dest(name);
    }

    /// Turn a rectangle whose top-left corner is at `(x, y)` into a link.
    ///
    /// Urls starting with `#` link to the named destination after the `#`.
    pub fn add_link(&mut self, url: &str, x: f32, y: f32, w: f32, h: f32) {
        let Some(target) = LinkTarget::parse(url) else {
            log::warn!("ignoring link without a destination name");
            return;
        };

        self.backend.add_link(&target, x, self.y(y) - h, w, h);
    }

    /// Add an entry to the document information dictionary.
    pub fn add_info(&mut self, label: &str, value: &str) {
        self.backend.add_info(label, value);
    }

    /// Open the document on the current page with the given view.
    pub fn set_default_view(&mut self, view: &DefaultView) {
        self.backend.set_default_view(view);
    }

    /// Add JavaScript that is run when the document is opened.
    pub fn javascript(&mut self, code: &str) {
        self.backend.add_javascript(code);
    }

    /// Finish the document and return its bytes.
    ///
    /// Content queued with [`Canvas::page_text`] and [`Canvas::page_line`] is drawn
    /// on every page first.
    pub fn output(mut self) -> CanvasResult<Vec<u8>> {
        let overlay = std::mem::take(&mut self.overlay);
        overlay.replay(&mut self)?;

        self.backend.finish()
    }

    /// Finish the document and write it to `writer`.
    pub fn stream(self, mut writer: impl Write) -> CanvasResult<()> {
        let bytes = self.output()?;
        writer.write_all(&bytes)?;
        writer.flush()?;

        Ok(())
    }
}
