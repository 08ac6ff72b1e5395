//! A backend that produces PDF files.
//!
//! Content is written into one content stream per page as drawing calls come in.
//! Fonts, images and extended graphics states are collected in a single resource
//! dictionary that all pages share, and are only serialized once the document is
//! finished.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use pdf_writer::types::{ActionType, AnnotationType, LineCapStyle, LineJoinStyle};
use pdf_writer::{Content, Filter, Finish, Name, Null, Pdf, Rect, Ref, Str, TextStr};

use crate::backend::{Backend, FontId, ImageId, LineCap, LineJoin, LineStyle};
use crate::color::BlendMode;
use crate::error::{CanvasError, CanvasResult};
use crate::font::{FontMetrics, FontSource};
use crate::image::ImageKind;
use crate::interactive::{DefaultView, LinkTarget};
use crate::settings::CanvasSettings;

pub(crate) mod font;
pub(crate) mod image;
#[cfg(feature = "svg")]
pub(crate) mod svg;

use self::font::{EmbeddedFont, PdfFont};
use self::image::XObject;

/// Encodes stream data according to the settings.
pub(crate) struct StreamEncoder {
    compress_content_streams: bool,
    ascii_compatible: bool,
}

impl StreamEncoder {
    pub(crate) fn new(settings: &CanvasSettings) -> Self {
        Self {
            compress_content_streams: settings.compress_content_streams,
            ascii_compatible: settings.ascii_compatible,
        }
    }

    /// Encode a content stream. Content streams are left as they are if compression
    /// is disabled.
    pub(crate) fn content<'a>(&self, stream: &'a [u8]) -> (Cow<'a, [u8]>, Option<Filter>) {
        if !self.compress_content_streams {
            (Cow::Borrowed(stream), None)
        } else {
            let (stream, filter) = self.binary(stream);
            (Cow::Owned(stream), Some(filter))
        }
    }

    /// Encode binary data like images and fonts.
    pub(crate) fn binary(&self, stream: &[u8]) -> (Vec<u8>, Filter) {
        if self.ascii_compatible {
            (hex_encode(stream), Filter::AsciiHexDecode)
        } else {
            (deflate(stream), Filter::FlateDecode)
        }
    }
}

fn deflate(data: &[u8]) -> Vec<u8> {
    const COMPRESSION_LEVEL: u8 = 6;
    miniz_oxide::deflate::compress_to_vec_zlib(data, COMPRESSION_LEVEL)
}

fn hex_encode(data: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(index, byte)| {
            let mut formatted = format!("{:02X}", byte);
            if index % 35 == 34 {
                formatted.push('\n');
            }
            formatted
        })
        .collect::<String>()
        .into_bytes()
}

fn line_cap(cap: LineCap) -> LineCapStyle {
    match cap {
        LineCap::Butt => LineCapStyle::ButtCap,
        LineCap::Round => LineCapStyle::RoundCap,
        LineCap::Square => LineCapStyle::ProjectingSquareCap,
    }
}

fn line_join(join: LineJoin) -> LineJoinStyle {
    match join {
        LineJoin::Miter => LineJoinStyle::MiterJoin,
        LineJoin::Round => LineJoinStyle::RoundJoin,
        LineJoin::Bevel => LineJoinStyle::BevelJoin,
    }
}

/// An extended graphics state, with the opacity quantized so that it can be used
/// as a map key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct ExtGState {
    blend_mode: BlendMode,
    stroking_alpha: Option<u16>,
    non_stroking_alpha: Option<u16>,
}

const ALPHA_STEPS: f32 = 1000.0;

impl ExtGState {
    fn new(blend_mode: BlendMode, stroking: Option<f32>, non_stroking: Option<f32>) -> Self {
        let quantize = |a: f32| (a.clamp(0.0, 1.0) * ALPHA_STEPS).round() as u16;

        Self {
            blend_mode,
            stroking_alpha: stroking.map(quantize),
            non_stroking_alpha: non_stroking.map(quantize),
        }
    }
}

fn write_ext_g_state(chunk: &mut pdf_writer::Chunk, root_ref: Ref, gs: &ExtGState) {
    let mut ext_st = chunk.ext_graphics(root_ref);
    ext_st.blend_mode(gs.blend_mode.to_pdf());
    if let Some(sa) = gs.stroking_alpha {
        ext_st.stroking_alpha(sa as f32 / ALPHA_STEPS);
    }
    if let Some(nsa) = gs.non_stroking_alpha {
        ext_st.non_stroking_alpha(nsa as f32 / ALPHA_STEPS);
    }
    ext_st.finish();
}

#[derive(Debug)]
struct Annotation {
    target: LinkTarget,
    rect: Rect,
}

struct PageState {
    width: f32,
    height: f32,
    content: Content,
    annotations: Vec<Annotation>,
}

/// A backend that produces a PDF document.
pub struct PdfBackend {
    settings: CanvasSettings,
    pages: Vec<PageState>,
    current: usize,
    current_font: Option<FontId>,
    fonts: Vec<PdfFont>,
    images: Vec<XObject>,
    ext_g_states: Vec<ExtGState>,
    ext_g_state_names: HashMap<ExtGState, usize>,
    named_dests: Vec<(String, usize)>,
    info: Vec<(String, String)>,
    default_view: Option<(DefaultView, usize)>,
    javascript: Vec<String>,
    finished: bool,
}

impl PdfBackend {
    /// Create a new backend without any pages.
    pub fn new(settings: CanvasSettings) -> Self {
        Self {
            settings,
            pages: vec![],
            current: 0,
            current_font: None,
            fonts: vec![],
            images: vec![],
            ext_g_states: vec![],
            ext_g_state_names: HashMap::new(),
            named_dests: vec![],
            info: vec![],
            default_view: None,
            javascript: vec![],
            finished: false,
        }
    }

    fn content(&mut self) -> &mut Content {
        assert!(!self.finished, "attempted to draw into a finished document");
        assert!(
            !self.pages.is_empty(),
            "attempted to draw without a current page"
        );
        &mut self.pages[self.current].content
    }

    fn font_name(font: FontId) -> String {
        format!("F{}", font.0 + 1)
    }

    fn image_name(image: ImageId) -> String {
        format!("Im{}", image.0 + 1)
    }

    fn ext_g_state_name(index: usize) -> String {
        format!("GS{}", index + 1)
    }

    fn serialize(&mut self) -> CanvasResult<Vec<u8>> {
        let contents = self
            .pages
            .iter_mut()
            .map(|page| std::mem::replace(&mut page.content, Content::new()).finish())
            .collect::<Vec<_>>();

        let mut alloc = Ref::new(1);
        let catalog_ref = alloc.bump();
        let page_tree_ref = alloc.bump();
        let page_refs = self
            .pages
            .iter()
            .map(|_| (alloc.bump(), alloc.bump()))
            .collect::<Vec<_>>();
        let font_refs = self.fonts.iter().map(|_| alloc.bump()).collect::<Vec<_>>();
        let image_refs = self.images.iter().map(|_| alloc.bump()).collect::<Vec<_>>();
        let ext_g_state_refs = self
            .ext_g_states
            .iter()
            .map(|_| alloc.bump())
            .collect::<Vec<_>>();
        let javascript_refs = self
            .javascript
            .iter()
            .map(|_| alloc.bump())
            .collect::<Vec<_>>();
        let info_ref = alloc.bump();

        let mut pdf = Pdf::new();

        if self.settings.ascii_compatible {
            pdf.set_binary_marker(&[b'A', b'A', b'A', b'A']);
        }

        let mut catalog = pdf.catalog(catalog_ref);
        catalog.pages(page_tree_ref);

        if !self.named_dests.is_empty() {
            let mut dests = catalog.insert(Name(b"Dests")).dict();
            for (name, page) in &self.named_dests {
                dests
                    .insert(Name(name.as_bytes()))
                    .array()
                    .item(page_refs[*page].0)
                    .item(Name(b"Fit"));
            }
        }

        if let Some((view, page)) = &self.default_view {
            let mut open_action = catalog.insert(Name(b"OpenAction")).array();
            open_action.item(page_refs[*page].0);
            open_action.item(Name(view.name().as_bytes()));
            for param in view.parameters() {
                match param {
                    Some(v) => open_action.item(v),
                    None => open_action.item(Null),
                };
            }
        }

        if !self.javascript.is_empty() {
            let mut names = catalog.insert(Name(b"Names")).dict();
            let mut javascript = names.insert(Name(b"JavaScript")).dict();
            let mut entries = javascript.insert(Name(b"Names")).array();
            for (i, js_ref) in javascript_refs.iter().enumerate() {
                let key = format!("js{i:04}");
                entries.item(Str(key.as_bytes()));
                entries.item(*js_ref);
            }
        }

        catalog.finish();

        pdf.pages(page_tree_ref)
            .kids(page_refs.iter().map(|(page_ref, _)| *page_ref))
            .count(self.pages.len() as i32);

        let encoder = StreamEncoder::new(&self.settings);

        for ((page, content), (page_ref, content_ref)) in
            self.pages.iter().zip(&contents).zip(&page_refs)
        {
            let annotation_refs = page
                .annotations
                .iter()
                .map(|_| alloc.bump())
                .collect::<Vec<_>>();

            let mut page_writer = pdf.page(*page_ref);
            page_writer
                .media_box(Rect::new(0.0, 0.0, page.width, page.height))
                .parent(page_tree_ref)
                .contents(*content_ref);

            let mut resources = page_writer.resources();
            let mut fonts = resources.fonts();
            for (i, font_ref) in font_refs.iter().enumerate() {
                fonts.pair(Name(Self::font_name(FontId(i)).as_bytes()), *font_ref);
            }
            fonts.finish();

            let mut x_objects = resources.x_objects();
            for (i, image_ref) in image_refs.iter().enumerate() {
                x_objects.pair(Name(Self::image_name(ImageId(i)).as_bytes()), *image_ref);
            }
            x_objects.finish();

            let mut ext_g_states = resources.ext_g_states();
            for (i, gs_ref) in ext_g_state_refs.iter().enumerate() {
                ext_g_states.pair(Name(Self::ext_g_state_name(i).as_bytes()), *gs_ref);
            }
            ext_g_states.finish();
            resources.finish();

            if !annotation_refs.is_empty() {
                page_writer.annotations(annotation_refs.iter().copied());
            }
            page_writer.finish();

            for (annotation, annotation_ref) in page.annotations.iter().zip(&annotation_refs) {
                let mut writer = pdf.annotation(*annotation_ref);
                writer.subtype(AnnotationType::Link);
                writer.rect(annotation.rect);
                writer
                    .insert(Name(b"Border"))
                    .array()
                    .items([0.0f32, 0.0, 0.0]);

                match &annotation.target {
                    LinkTarget::Internal(name) => {
                        writer.pair(Name(b"Dest"), Name(name.as_bytes()));
                    }
                    LinkTarget::Uri(uri) => {
                        writer
                            .action()
                            .action_type(ActionType::Uri)
                            .uri(Str(uri.as_bytes()));
                    }
                }

                writer.finish();
            }

            let (data, filter) = encoder.content(content);
            let mut stream = pdf.stream(*content_ref, &data);
            if let Some(filter) = filter {
                stream.filter(filter);
            }
            stream.finish();
        }

        let mut chunk = pdf_writer::Chunk::new();

        for (font, font_ref) in self.fonts.iter().zip(&font_refs) {
            font.serialize(&mut chunk, *font_ref, &mut alloc, &self.settings)?;
        }

        for (image, image_ref) in self.images.iter().zip(&image_refs) {
            image.serialize(&mut chunk, *image_ref, &mut alloc, &self.settings);
        }

        for (gs, gs_ref) in self.ext_g_states.iter().zip(&ext_g_state_refs) {
            write_ext_g_state(&mut chunk, *gs_ref, gs);
        }

        for (code, js_ref) in self.javascript.iter().zip(&javascript_refs) {
            chunk
                .indirect(*js_ref)
                .dict()
                .pair(Name(b"Type"), Name(b"Action"))
                .pair(Name(b"S"), Name(b"JavaScript"))
                .pair(Name(b"JS"), TextStr(code));
        }

        pdf.extend(&chunk);

        let mut info = pdf.document_info(info_ref);
        if !self.info.iter().any(|(label, _)| label == "Producer") {
            info.producer(TextStr(concat!("vellum ", env!("CARGO_PKG_VERSION"))));
        }
        for (label, value) in &self.info {
            info.pair(Name(label.as_bytes()), TextStr(value));
        }
        info.finish();

        Ok(pdf.finish())
    }
}

impl Backend for PdfBackend {
    fn new_page(&mut self, width: f32, height: f32) -> usize {
        log::debug!("allocating page {} ({width}x{height})", self.pages.len() + 1);

        self.pages.push(PageState {
            width,
            height,
            content: Content::new(),
            annotations: vec![],
        });
        self.current = self.pages.len() - 1;
        self.current
    }

    fn reopen_page(&mut self, index: usize) {
        assert!(index < self.pages.len(), "page {index} does not exist");
        self.current = index;
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn save_state(&mut self) {
        self.content().save_state();
    }

    fn restore_state(&mut self) {
        self.content().restore_state();
    }

    fn concat_transform(&mut self, matrix: [f32; 6]) {
        self.content().transform(matrix);
    }

    fn set_stroke_color(&mut self, rgb: [f32; 3]) {
        let [r, g, b] = rgb;
        self.content().set_stroke_rgb(r, g, b);
    }

    fn set_fill_color(&mut self, rgb: [f32; 3]) {
        let [r, g, b] = rgb;
        self.content().set_fill_rgb(r, g, b);
    }

    fn set_line_style(&mut self, style: &LineStyle) {
        let dash = style.dash_array();
        let content = self.content();
        content.set_line_width(style.width);
        content.set_line_cap(line_cap(style.cap));
        content.set_line_join(line_join(style.join));
        content.set_dash_pattern(dash, 0.0);
    }

    fn set_transparency(
        &mut self,
        blend_mode: BlendMode,
        stroking_alpha: Option<f32>,
        non_stroking_alpha: Option<f32>,
    ) {
        let gs = ExtGState::new(blend_mode, stroking_alpha, non_stroking_alpha);
        let index = match self.ext_g_state_names.get(&gs) {
            Some(index) => *index,
            None => {
                self.ext_g_states.push(gs);
                let index = self.ext_g_states.len() - 1;
                self.ext_g_state_names.insert(gs, index);
                index
            }
        };

        let name = Self::ext_g_state_name(index);
        self.content().set_parameters(Name(name.as_bytes()));
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.content().move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.content().line_to(x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        self.content().cubic_to(x1, y1, x2, y2, x3, y3);
    }

    fn close_path(&mut self) {
        self.content().close_path();
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.content().rect(x, y, width, height);
    }

    fn fill(&mut self) {
        self.content().fill_nonzero();
    }

    fn stroke(&mut self) {
        self.content().stroke();
    }

    fn fill_and_stroke(&mut self) {
        self.content().fill_nonzero_and_stroke();
    }

    fn close_and_stroke(&mut self) {
        self.content().close_and_stroke();
    }

    fn clip(&mut self) {
        self.content().clip_nonzero().end_path();
    }

    fn begin_text(&mut self) {
        self.content().begin_text();
    }

    fn set_text_matrix(&mut self, matrix: [f32; 6]) {
        self.content().set_text_matrix(matrix);
    }

    fn move_text(&mut self, x: f32, y: f32) {
        self.content().next_line(x, y);
    }

    fn set_word_spacing(&mut self, spacing: f32) {
        self.content().set_word_spacing(spacing);
    }

    fn set_char_spacing(&mut self, spacing: f32) {
        self.content().set_char_spacing(spacing);
    }

    fn set_font(&mut self, font: FontId, size: f32) {
        let name = Self::font_name(font);
        self.content().set_font(Name(name.as_bytes()), size);
        self.current_font = Some(font);
    }

    fn show_text(&mut self, text: &str) {
        let Some(font) = self.current_font else {
            log::warn!("skipping text without a selected font");
            return;
        };

        let encoded = self.fonts[font.0].encode(text);
        self.content().show(Str(&encoded));
    }

    fn end_text(&mut self) {
        self.content().end_text();
    }

    fn load_font(&mut self, source: &FontSource) -> CanvasResult<FontId> {
        let font = match source {
            FontSource::Standard(font) => PdfFont::Standard(*font),
            FontSource::Embedded(path) => PdfFont::Embedded(Box::new(EmbeddedFont::load(
                path,
                self.settings.font_subsetting,
            )?)),
        };

        self.fonts.push(font);
        Ok(FontId(self.fonts.len() - 1))
    }

    fn font_metrics(&self, font: FontId) -> FontMetrics {
        self.fonts[font.0].metrics()
    }

    fn text_width(&self, font: FontId, text: &str) -> f32 {
        self.fonts[font.0].text_width(text)
    }

    fn supports_char(&self, font: FontId, c: char) -> bool {
        self.fonts[font.0].supports_char(c)
    }

    fn embed_image(&mut self, path: &Path, data: &[u8], kind: ImageKind) -> CanvasResult<ImageId> {
        let image = XObject::decode(kind, data, path)
            .map_err(|e| CanvasError::Image(path.to_path_buf(), e))?;
        log::debug!(
            "decoded image {} with intrinsic size {:?}",
            path.display(),
            image.size()
        );

        self.images.push(image);
        Ok(ImageId(self.images.len() - 1))
    }

    fn draw_image(&mut self, image: ImageId, x: f32, y: f32, width: f32, height: f32) {
        let name = Self::image_name(image);
        self.content()
            .save_state()
            .transform([width, 0.0, 0.0, height, x, y])
            .x_object(Name(name.as_bytes()))
            .restore_state();
    }

    fn add_named_dest(&mut self, name: &str) {
        self.named_dests.push((name.to_string(), self.current));
    }

    fn add_link(&mut self, target: &LinkTarget, x: f32, y: f32, width: f32, height: f32) {
        let page = &mut self.pages[self.current];
        page.annotations.push(Annotation {
            target: target.clone(),
            rect: Rect::new(x, y, x + width, y + height),
        });
    }

    fn add_info(&mut self, label: &str, value: &str) {
        match self.info.iter_mut().find(|(l, _)| l == label) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.info.push((label.to_string(), value.to_string())),
        }
    }

    fn set_default_view(&mut self, view: &DefaultView) {
        self.default_view = Some((view.clone(), self.current));
    }

    fn add_javascript(&mut self, code: &str) {
        self.javascript.push(code.to_string());
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) -> CanvasResult<Vec<u8>> {
        assert!(!self.finished, "attempted to finish a document twice");
        self.finished = true;

        log::debug!(
            "writing document with {} pages, {} fonts and {} images",
            self.pages.len(),
            self.fonts.len(),
            self.images.len()
        );

        self.serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(pdf: &[u8]) -> String {
        String::from_utf8_lossy(pdf).into_owned()
    }

    #[test]
    fn colors_are_device_rgb() {
        let mut backend = PdfBackend::new(CanvasSettings::debug());
        backend.new_page(100.0, 100.0);
        backend.set_stroke_color([0.0, 0.5, 1.0]);
        backend.set_fill_color([1.0, 0.0, 0.0]);
        backend.rect(0.0, 0.0, 10.0, 10.0);
        backend.fill_and_stroke();

        let text = text(&Backend::finish(&mut backend).unwrap());
        assert!(text.contains("0 0.5 1 RG"));
        assert!(text.contains("1 0 0 rg"));
        assert!(!text.contains(" G\n"));
        assert!(!text.contains(" k\n"));
    }

    #[test]
    fn ext_g_states_are_shared() {
        let mut backend = PdfBackend::new(CanvasSettings::debug());
        backend.new_page(100.0, 100.0);
        backend.set_transparency(BlendMode::Multiply, None, Some(0.25));
        backend.set_transparency(BlendMode::Normal, Some(1.0), None);
        backend.set_transparency(BlendMode::Multiply, None, Some(0.25));

        let text = text(&Backend::finish(&mut backend).unwrap());
        assert_eq!(text.matches("/Type /ExtGState").count(), 2);
        assert_eq!(text.matches("/GS1 gs").count(), 2);
        assert!(text.contains("/ca 0.25"));
    }
}
