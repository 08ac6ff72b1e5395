//! Writing fonts.
//!
//! Standard fonts are written as simple Type1 fonts without any font program. Other
//! fonts are embedded as CID-keyed Type0 fonts with the Identity-H encoding, so that
//! each glyph is addressed by a two-byte glyph id, and a ToUnicode CMap makes the text
//! extractable again.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::path::Path;
use std::sync::Arc;

use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Chunk, Finish, Name, Rect, Ref, Str};
use siphasher::sip128::{Hasher128, SipHasher13};
use skrifa::prelude::{LocationRef, Size};
use skrifa::raw::tables::cff::Cff;
use skrifa::raw::types::NameId;
use skrifa::raw::{TableProvider, TopLevelTable};
use skrifa::{FontRef, GlyphId, MetadataProvider};
use subsetter::GlyphRemapper;

use crate::error::{CanvasError, CanvasResult};
use crate::font::{win_ansi_byte, FontMetrics, StandardFont};
use crate::pdf::StreamEncoder;
use crate::settings::CanvasSettings;

const CMAP_NAME: Name = Name(b"Custom");
const SYSTEM_INFO: SystemInfo = SystemInfo {
    registry: Str(b"Adobe"),
    ordering: Str(b"Identity"),
    supplement: 0,
};

/// A font that has been loaded into a document.
#[derive(Debug)]
pub(crate) enum PdfFont {
    Standard(StandardFont),
    Embedded(Box<EmbeddedFont>),
}

impl PdfFont {
    pub(crate) fn metrics(&self) -> FontMetrics {
        match self {
            PdfFont::Standard(font) => font.metrics(),
            PdfFont::Embedded(font) => font.metrics,
        }
    }

    pub(crate) fn text_width(&self, text: &str) -> f32 {
        match self {
            PdfFont::Standard(font) => text.chars().map(|c| font.char_width(c)).sum(),
            PdfFont::Embedded(font) => font.text_width(text),
        }
    }

    pub(crate) fn supports_char(&self, c: char) -> bool {
        match self {
            PdfFont::Standard(font) => font.supports_char(c),
            PdfFont::Embedded(font) => font.glyph_id(c).is_some(),
        }
    }

    /// Encode text for a text showing operator, remembering which glyphs were used.
    pub(crate) fn encode(&mut self, text: &str) -> Vec<u8> {
        match self {
            PdfFont::Standard(font) if font.is_symbolic() => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            PdfFont::Standard(_) => text
                .chars()
                .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
                .collect(),
            PdfFont::Embedded(font) => font.encode(text),
        }
    }

    pub(crate) fn serialize(
        &self,
        chunk: &mut Chunk,
        root_ref: Ref,
        alloc: &mut Ref,
        settings: &CanvasSettings,
    ) -> CanvasResult<()> {
        match self {
            PdfFont::Standard(font) => {
                let mut type1 = chunk.type1_font(root_ref);
                type1.base_font(Name(font.postscript_name().as_bytes()));
                if !font.is_symbolic() {
                    type1.encoding_predefined(Name(b"WinAnsiEncoding"));
                }
                type1.finish();
                Ok(())
            }
            PdfFont::Embedded(font) => font.serialize(chunk, root_ref, alloc, settings),
        }
    }
}

/// A TrueType or OpenType font that is embedded into the document.
pub(crate) struct EmbeddedFont {
    name: String,
    data: Arc<Vec<u8>>,
    metrics: FontMetrics,
    units_per_em: f32,
    subset: bool,
    glyph_remapper: GlyphRemapper,
    /// The text each used glyph stands for, keyed by the glyph id written to the
    /// content stream.
    strings: BTreeMap<u16, String>,
    /// The original glyph id of each glyph id written to the content stream.
    glyphs: BTreeMap<u16, u16>,
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("name", &self.name)
            .field("glyphs", &self.glyphs.len())
            .finish()
    }
}

impl EmbeddedFont {
    /// Read and parse a font file.
    pub(crate) fn load(path: &Path, subset: bool) -> CanvasResult<Self> {
        let font_error = |msg: String| CanvasError::Font(path.display().to_string(), msg);

        let data = std::fs::read(path).map_err(|e| font_error(e.to_string()))?;
        let data = Arc::new(data);

        let (metrics, units_per_em, name) = {
            let font_ref =
                FontRef::from_index(&data, 0).map_err(|e| font_error(e.to_string()))?;
            let metrics = font_ref.metrics(Size::unscaled(), LocationRef::default());
            let units_per_em = metrics.units_per_em as f32;
            let convert = |val: f32| val / units_per_em * 1000.0;

            let name = find_name(&font_ref).unwrap_or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unknown")
                    .to_string()
            });

            (
                FontMetrics {
                    ascent: convert(metrics.ascent),
                    descent: convert(metrics.descent),
                    line_gap: convert(metrics.leading),
                    embedded: true,
                },
                units_per_em,
                name,
            )
        };

        Ok(Self {
            name,
            data,
            metrics,
            units_per_em,
            subset,
            glyph_remapper: GlyphRemapper::new(),
            strings: BTreeMap::new(),
            glyphs: BTreeMap::new(),
        })
    }

    fn font_ref(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, 0).ok()
    }

    fn glyph_id(&self, c: char) -> Option<GlyphId> {
        self.font_ref()?.charmap().map(c)
    }

    fn advance_width(&self, font_ref: &FontRef, glyph: GlyphId) -> f32 {
        let width = font_ref
            .glyph_metrics(Size::unscaled(), LocationRef::default())
            .advance_width(glyph)
            .unwrap_or(0.0);
        width / self.units_per_em * 1000.0
    }

    fn text_width(&self, text: &str) -> f32 {
        let Some(font_ref) = self.font_ref() else {
            return 0.0;
        };
        let charmap = font_ref.charmap();

        text.chars()
            .map(|c| {
                let glyph = charmap.map(c).unwrap_or(GlyphId::new(0));
                self.advance_width(&font_ref, glyph)
            })
            .sum()
    }

    fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(text.len() * 2);

        for c in text.chars() {
            let old_gid = self
                .glyph_id(c)
                .map(|g| g.to_u32() as u16)
                .unwrap_or(0);
            let new_gid = if self.subset {
                self.glyph_remapper.remap(old_gid)
            } else {
                old_gid
            };

            self.glyphs.insert(new_gid, old_gid);
            if old_gid != 0 {
                self.strings.entry(new_gid).or_insert_with(|| c.to_string());
            }
            encoded.extend(new_gid.to_be_bytes());
        }

        encoded
    }

    fn font_program(&self) -> CanvasResult<Vec<u8>> {
        let subset_error = |msg: String| CanvasError::Subset(self.name.clone(), msg);

        let program = if self.subset {
            subsetter::subset(&self.data, 0, &self.glyph_remapper)
                .map_err(|e| subset_error(format!("{e:?}")))?
        } else {
            self.data.as_ref().clone()
        };

        // Extract the standalone CFF font program if applicable.
        let face = FontRef::new(&program).map_err(|e| subset_error(e.to_string()))?;
        if let Some(cff) = face.data_for_tag(Cff::TAG) {
            return Ok(cff.as_bytes().to_vec());
        }

        Ok(program)
    }

    fn serialize(
        &self,
        chunk: &mut Chunk,
        root_ref: Ref,
        alloc: &mut Ref,
        settings: &CanvasSettings,
    ) -> CanvasResult<()> {
        let font_ref = self
            .font_ref()
            .ok_or_else(|| CanvasError::Font(self.name.clone(), "font became unreadable".into()))?;

        let cid_ref = alloc.bump();
        let descriptor_ref = alloc.bump();
        let cmap_ref = alloc.bump();
        let data_ref = alloc.bump();

        let is_cff = font_ref.cff().is_ok();

        let base_font = if self.subset {
            format!("{}+{}", subset_tag(&self.name, &self.glyphs), self.name)
        } else {
            self.name.clone()
        };
        let base_font_type0 = if is_cff {
            format!("{base_font}-Identity-H")
        } else {
            base_font.clone()
        };

        chunk
            .type0_font(root_ref)
            .base_font(Name(base_font_type0.as_bytes()))
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_ref)
            .to_unicode(cmap_ref);

        let mut cid = chunk.cid_font(cid_ref);
        cid.subtype(if is_cff {
            CidFontType::Type0
        } else {
            CidFontType::Type2
        });
        cid.base_font(Name(base_font.as_bytes()));
        cid.system_info(SYSTEM_INFO);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        if !is_cff {
            cid.cid_to_gid_map_predefined(Name(b"Identity"));
        }

        // Write runs of consecutive glyphs that share the same width.
        let widths = self
            .glyphs
            .iter()
            .map(|(new, old)| (*new, self.advance_width(&font_ref, GlyphId::new(*old as u32))))
            .collect::<Vec<_>>();

        let mut width_writer = cid.widths();
        let mut i = 0;
        while i < widths.len() {
            let (first, w) = widths[i];
            let mut last = first;
            while i + 1 < widths.len() && widths[i + 1].1 == w && widths[i + 1].0 == last + 1 {
                i += 1;
                last = widths[i].0;
            }
            if w != 0.0 {
                width_writer.same(first, last, w);
            }
            i += 1;
        }
        width_writer.finish();
        cid.finish();

        let metrics = font_ref.metrics(Size::unscaled(), LocationRef::default());
        let convert = |val: f32| val / self.units_per_em * 1000.0;

        let mut flags = FontFlags::empty();
        flags.set(FontFlags::SERIF, self.name.contains("Serif"));
        flags.set(FontFlags::FIXED_PITCH, metrics.is_monospace);
        flags.set(FontFlags::ITALIC, metrics.italic_angle != 0.0);
        flags.insert(FontFlags::SYMBOLIC);

        let bbox = metrics
            .bounds
            .map(|b| {
                Rect::new(
                    convert(b.x_min),
                    convert(b.y_min),
                    convert(b.x_max),
                    convert(b.y_max),
                )
            })
            .unwrap_or(Rect::new(0.0, self.metrics.descent, 1000.0, self.metrics.ascent));
        let weight = font_ref.attributes().weight.value();
        let cap_height = metrics
            .cap_height
            .map(convert)
            .unwrap_or(self.metrics.ascent);
        let stem_v = 10.0 + 0.244 * (weight - 50.0);

        let cmap = {
            let mut cmap = UnicodeCmap::new(CMAP_NAME, SYSTEM_INFO);
            for (g, text) in self.strings.iter() {
                cmap.pair_with_multiple(*g, text.chars());
            }

            cmap
        };

        chunk.cmap(cmap_ref, &cmap.finish());

        let mut font_descriptor = chunk.font_descriptor(descriptor_ref);
        font_descriptor
            .name(Name(base_font.as_bytes()))
            .flags(flags)
            .bbox(bbox)
            .italic_angle(metrics.italic_angle)
            .ascent(self.metrics.ascent)
            .descent(self.metrics.descent)
            .cap_height(cap_height)
            .stem_v(stem_v);

        if is_cff {
            font_descriptor.font_file3(data_ref);
        } else {
            font_descriptor.font_file2(data_ref);
        }

        font_descriptor.finish();

        let program = self.font_program()?;
        let (data, filter) = StreamEncoder::new(settings).binary(&program);
        let mut stream = chunk.stream(data_ref, &data);
        stream.filter(filter);
        if is_cff {
            stream.pair(Name(b"Subtype"), Name(b"CIDFontType0C"));
        }

        stream.finish();

        Ok(())
    }
}

fn find_name(font_ref: &FontRef) -> Option<String> {
    let name = font_ref.name().ok()?;

    name.name_record().iter().find_map(|n| {
        if n.name_id.get() == NameId::POSTSCRIPT_NAME {
            if let Ok(string) = n.string(name.string_data()) {
                return Some(string.to_string());
            }
        }

        None
    })
}

/// Calculate a 128-bit siphash of a value.
fn hash128<T: Hash + ?Sized>(value: &T) -> u128 {
    let mut state = SipHasher13::new();
    value.hash(&mut state);
    state.finish128().as_u128()
}

/// A six-letter tag that is stable for the same font and glyph set.
fn subset_tag(name: &str, glyphs: &BTreeMap<u16, u16>) -> String {
    const LEN: usize = 6;
    const BASE: u128 = 26;

    let mut hash = hash128(&(name, glyphs));
    let mut letter = [b'A'; LEN];
    for l in letter.iter_mut() {
        *l = b'A' + (hash % BASE) as u8;
        hash /= BASE;
    }

    letter.iter().map(|l| *l as char).collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::LazyLock;

    use float_cmp::assert_approx_eq;

    use super::*;

    static TUFFY: LazyLock<PathBuf> = LazyLock::new(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts/Tuffy.ttf")
    });

    #[test]
    fn standard_text_is_win_ansi_encoded() {
        let mut font = PdfFont::Standard(StandardFont::Helvetica);
        assert_eq!(font.encode("Aé€中"), vec![b'A', 0xE9, 0x80, b'?']);
    }

    #[test]
    fn symbolic_text_is_ascii() {
        let mut font = PdfFont::Standard(StandardFont::ZapfDingbats);
        assert_eq!(font.encode("a✓"), vec![b'a', b'?']);
    }

    #[test]
    fn standard_text_width() {
        let font = PdfFont::Standard(StandardFont::Courier);
        assert_eq!(font.text_width("abc"), 1800.0);
    }

    #[test]
    fn subset_tag_is_stable_per_glyph_set() {
        let glyphs = BTreeMap::from([(0, 0), (1, 36), (2, 72)]);
        let tag = subset_tag("Roboto", &glyphs);

        assert_eq!(tag.len(), 6);
        assert!(tag.bytes().all(|b| b.is_ascii_uppercase()));
        assert_eq!(tag, subset_tag("Roboto", &glyphs.clone()));
        assert_ne!(tag, subset_tag("Roboto", &BTreeMap::from([(0, 0), (1, 37)])));
        assert_ne!(tag, subset_tag("Lato", &glyphs));
    }

    #[test]
    fn embedded_font_metrics() {
        let font = EmbeddedFont::load(&TUFFY, true).unwrap();
        let metrics = font.metrics;

        // Tuffy uses its typographic metrics: 1597 / -505 / 0 at 2048 units per em.
        assert!(metrics.embedded);
        assert_approx_eq!(f32, metrics.ascent, 779.785, epsilon = 0.01);
        assert_approx_eq!(f32, metrics.descent, -246.582, epsilon = 0.01);
        assert_approx_eq!(f32, metrics.line_gap, 0.0);
        assert_approx_eq!(f32, metrics.baseline_offset(), 1026.367, epsilon = 0.01);
    }

    #[test]
    fn embedded_text_is_encoded_as_glyph_ids() {
        let mut subsetted = EmbeddedFont::load(&TUFFY, true).unwrap();
        assert_eq!(subsetted.encode("ABA"), vec![0, 1, 0, 2, 0, 1]);
        assert_eq!(subsetted.strings.get(&1).map(String::as_str), Some("A"));
        assert_eq!(subsetted.strings.get(&2).map(String::as_str), Some("B"));

        let mut full = EmbeddedFont::load(&TUFFY, false).unwrap();
        let gid = full.glyph_id('A').unwrap().to_u32() as u16;
        assert_ne!(gid, 0);
        assert_eq!(full.encode("A"), gid.to_be_bytes().to_vec());
    }

    #[test]
    fn embedded_font_supports_and_measures_chars() {
        let font = PdfFont::Embedded(Box::new(EmbeddedFont::load(&TUFFY, true).unwrap()));

        assert!(font.supports_char('A'));
        assert!(!font.supports_char('\u{10FFFF}'));
        assert!(font.text_width("AA") > 0.0);
        assert_approx_eq!(f32, font.text_width("AA"), 2.0 * font.text_width("A"));
    }

    #[test]
    fn embedded_font_is_written_as_type0() {
        let mut font = EmbeddedFont::load(&TUFFY, true).unwrap();
        font.encode("Hello");

        let settings = CanvasSettings::debug();
        let mut chunk = Chunk::new();
        let mut alloc = Ref::new(2);
        font.serialize(&mut chunk, Ref::new(1), &mut alloc, &settings)
            .unwrap();

        let text = String::from_utf8_lossy(chunk.as_bytes()).into_owned();
        let tag = subset_tag(&font.name, &font.glyphs);
        assert!(text.contains("/Subtype /Type0"));
        assert!(text.contains("/Subtype /CIDFontType2"));
        assert!(text.contains("/Encoding /Identity-H"));
        assert!(text.contains("/CIDToGIDMap /Identity"));
        assert!(text.contains("/FontFile2"));
        assert!(text.contains(&format!("/BaseFont /{tag}+")));
        assert!(text.contains("/ToUnicode"));
    }

    #[test]
    fn missing_font_file_is_a_font_error() {
        let err = EmbeddedFont::load(Path::new("/does/not/exist.ttf"), true).unwrap_err();
        assert!(matches!(err, CanvasError::Font(..)));
    }

    #[test]
    fn invalid_font_file_is_a_font_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"this is not a font").unwrap();

        let err = EmbeddedFont::load(&path, true).unwrap_err();
        assert!(matches!(err, CanvasError::Font(..)));
    }
}
