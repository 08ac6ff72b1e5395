//! Resolving font identifiers and the metrics of the standard fonts.
//!
//! Layout engines refer to fonts by an identifier string, which is usually the path of
//! a font file with its extension removed. Identifiers whose file name is one of the
//! 14 standard PDF fonts are resolved to that font, which every PDF viewer knows how
//! to render without embedding anything. Everything else is treated as a font file
//! that needs to be embedded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, FontId};
use crate::error::CanvasResult;

/// Vertical metrics of a font, in thousandths of the font size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FontMetrics {
    /// The distance from the baseline to the top of the tallest glyphs.
    pub ascent: f32,
    /// The distance from the baseline to the bottom of the lowest glyphs. Usually negative.
    pub descent: f32,
    /// The extra gap between lines recommended by the font.
    pub line_gap: f32,
    /// Whether the font is embedded into the document.
    pub embedded: bool,
}

impl FontMetrics {
    /// The distance between the top of a line and its baseline, in thousandths of
    /// the font size.
    ///
    /// The line gap is only part of this for embedded fonts.
    pub fn baseline_offset(&self) -> f32 {
        let gap = if self.embedded { self.line_gap } else { 0.0 };
        self.ascent - self.descent + gap
    }
}

/// One of the 14 fonts every PDF viewer provides.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StandardFont {
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Symbol,
    ZapfDingbats,
}

const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, //
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, //
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, //
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, //
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, //
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

const TIMES_BOLD_WIDTHS: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278, //
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500, //
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778, //
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500, //
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500, //
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

/// Characters of WinAnsiEncoding outside of Latin-1, with their codes.
const WIN_ANSI_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Encode a character with WinAnsiEncoding.
pub(crate) fn win_ansi_byte(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u8),
        _ => WIN_ANSI_EXTRAS
            .iter()
            .find(|(extra, _)| *extra == c)
            .map(|(_, code)| *code),
    }
}

impl StandardFont {
    /// All standard fonts.
    pub const ALL: [StandardFont; 14] = [
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];

    /// Look up a standard font by its PostScript name. The match is case-sensitive,
    /// except for the `times` alias of Times-Roman.
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "times" {
            return Some(StandardFont::TimesRoman);
        }

        Self::ALL.into_iter().find(|f| f.postscript_name() == name)
    }

    /// The PostScript name of the font.
    pub fn postscript_name(self) -> &'static str {
        match self {
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Whether the font uses its own built-in encoding instead of WinAnsiEncoding.
    pub fn is_symbolic(self) -> bool {
        matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }

    /// The vertical metrics of the font.
    pub fn metrics(self) -> FontMetrics {
        let (ascent, descent) = match self {
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => (629.0, -157.0),
            StandardFont::Helvetica
            | StandardFont::HelveticaBold
            | StandardFont::HelveticaOblique
            | StandardFont::HelveticaBoldOblique => (718.0, -207.0),
            StandardFont::TimesRoman
            | StandardFont::TimesBold
            | StandardFont::TimesItalic
            | StandardFont::TimesBoldItalic => (683.0, -217.0),
            StandardFont::Symbol | StandardFont::ZapfDingbats => (700.0, -200.0),
        };

        FontMetrics {
            ascent,
            descent,
            line_gap: 0.0,
            embedded: false,
        }
    }

    fn widths(self) -> Option<&'static [u16; 95]> {
        match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => Some(&HELVETICA_WIDTHS),
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => {
                Some(&HELVETICA_BOLD_WIDTHS)
            }
            StandardFont::TimesRoman | StandardFont::TimesItalic => Some(&TIMES_ROMAN_WIDTHS),
            StandardFont::TimesBold | StandardFont::TimesBoldItalic => Some(&TIMES_BOLD_WIDTHS),
            _ => None,
        }
    }

    fn default_width(self) -> f32 {
        match self {
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => 600.0,
            StandardFont::Helvetica
            | StandardFont::HelveticaBold
            | StandardFont::HelveticaOblique
            | StandardFont::HelveticaBoldOblique => 556.0,
            _ => 500.0,
        }
    }

    /// The advance width of a character, in thousandths of the font size.
    pub fn char_width(self, c: char) -> f32 {
        let code = c as u32;

        match self.widths() {
            Some(widths) if (0x20..=0x7E).contains(&code) => widths[(code - 0x20) as usize] as f32,
            _ => self.default_width(),
        }
    }

    /// Whether the character can be shown with the font.
    pub fn supports_char(self, c: char) -> bool {
        if self.is_symbolic() {
            (0x20..=0x7E).contains(&(c as u32))
        } else {
            win_ansi_byte(c).is_some()
        }
    }
}

/// Where a font comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FontSource {
    /// One of the standard fonts.
    Standard(StandardFont),
    /// A TrueType or OpenType font file that needs to be embedded.
    Embedded(PathBuf),
}

/// Resolve a font identifier to the font it refers to.
///
/// A trailing `.afm` or `.ufm` extension is stripped first. The remaining file name
/// is compared with the names of the standard fonts. For other fonts, the remaining
/// path is used as the font file if it exists, otherwise the path with `.ttf` or
/// `.otf` appended.
pub fn resolve_font_source(identifier: &str) -> FontSource {
    let file_name = Path::new(identifier)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(identifier);
    let stem = file_name
        .strip_suffix(".afm")
        .or_else(|| file_name.strip_suffix(".ufm"))
        .unwrap_or(file_name);

    if let Some(font) = StandardFont::from_name(stem) {
        return FontSource::Standard(font);
    }

    let base = if stem == file_name {
        PathBuf::from(identifier)
    } else {
        Path::new(identifier).with_file_name(stem)
    };
    if base.is_file() {
        return FontSource::Embedded(base);
    }

    ["ttf", "otf"]
        .into_iter()
        .map(|ext| {
            let mut name = base.clone().into_os_string();
            name.push(format!(".{ext}"));
            PathBuf::from(name)
        })
        .find(|p| p.is_file())
        .map(FontSource::Embedded)
        .unwrap_or(FontSource::Embedded(base))
}

/// A font that has been resolved and loaded into the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct FontHandle {
    /// The identifier of the font in the backend.
    pub id: FontId,
    /// Where the font was loaded from.
    pub source: FontSource,
    /// The vertical metrics of the font.
    pub metrics: FontMetrics,
}

/// Resolved fonts, keyed by identifier.
///
/// Every identifier is resolved and loaded at most once per document, and
/// identifiers that resolve to the same source share one backend font.
#[derive(Debug, Default)]
pub struct FontCache {
    by_identifier: HashMap<String, FontHandle>,
    by_source: HashMap<FontSource, FontId>,
}

impl FontCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an identifier, loading the font into the backend on the first use.
    pub fn resolve(
        &mut self,
        identifier: &str,
        backend: &mut dyn Backend,
    ) -> CanvasResult<FontHandle> {
        if let Some(handle) = self.by_identifier.get(identifier) {
            return Ok(handle.clone());
        }

        let source = resolve_font_source(identifier);
        let id = match self.by_source.get(&source) {
            Some(id) => *id,
            None => {
                log::debug!("loading font `{identifier}` from {source:?}");
                let id = backend.load_font(&source)?;
                self.by_source.insert(source.clone(), id);
                id
            }
        };

        let handle = FontHandle {
            id,
            source,
            metrics: backend.font_metrics(id),
        };
        self.by_identifier
            .insert(identifier.to_string(), handle.clone());

        Ok(handle)
    }

    /// The number of distinct identifiers that have been resolved.
    pub fn len(&self) -> usize {
        self.by_identifier.len()
    }

    /// Whether no identifier has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.by_identifier.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;

    #[test]
    fn standard_fonts_are_matched_case_sensitively() {
        assert_eq!(
            resolve_font_source("Helvetica"),
            FontSource::Standard(StandardFont::Helvetica)
        );
        assert_eq!(
            resolve_font_source("/usr/share/fonts/Times-BoldItalic.afm"),
            FontSource::Standard(StandardFont::TimesBoldItalic)
        );
        assert_eq!(
            resolve_font_source("fonts/Courier-Oblique.ufm"),
            FontSource::Standard(StandardFont::CourierOblique)
        );
        assert_eq!(
            resolve_font_source("times"),
            FontSource::Standard(StandardFont::TimesRoman)
        );
        assert!(matches!(
            resolve_font_source("helvetica"),
            FontSource::Embedded(_)
        ));
        assert!(matches!(
            resolve_font_source("Times"),
            FontSource::Embedded(_)
        ));
    }

    #[test]
    fn all_names_round_trip() {
        for font in StandardFont::ALL {
            assert_eq!(StandardFont::from_name(font.postscript_name()), Some(font));
        }
    }

    #[test]
    fn embedded_font_falls_back_to_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("MyFont");
        std::fs::write(dir.path().join("MyFont.otf"), b"").unwrap();

        let identifier = base.to_str().unwrap();
        assert_eq!(
            resolve_font_source(identifier),
            FontSource::Embedded(dir.path().join("MyFont.otf"))
        );

        std::fs::write(dir.path().join("MyFont.ttf"), b"").unwrap();
        assert_eq!(
            resolve_font_source(identifier),
            FontSource::Embedded(dir.path().join("MyFont.ttf"))
        );
    }

    #[test]
    fn metric_extensions_are_stripped_for_embedded_fonts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DejaVuSans.ttf"), b"").unwrap();
        std::fs::write(dir.path().join("DejaVuSans.ufm"), b"").unwrap();

        let identifier = dir.path().join("DejaVuSans.ufm");
        assert_eq!(
            resolve_font_source(identifier.to_str().unwrap()),
            FontSource::Embedded(dir.path().join("DejaVuSans.ttf"))
        );
        assert_eq!(
            resolve_font_source("/does/not/exist/Foo.afm"),
            FontSource::Embedded(PathBuf::from("/does/not/exist/Foo"))
        );
    }

    #[test]
    fn missing_font_file_keeps_identifier() {
        assert_eq!(
            resolve_font_source("/does/not/exist/Foo"),
            FontSource::Embedded(PathBuf::from("/does/not/exist/Foo"))
        );
    }

    #[test]
    fn standard_widths() {
        assert_eq!(StandardFont::Helvetica.char_width('A'), 667.0);
        assert_eq!(StandardFont::Helvetica.char_width(' '), 278.0);
        assert_eq!(StandardFont::HelveticaBold.char_width('m'), 889.0);
        assert_eq!(StandardFont::TimesRoman.char_width('~'), 541.0);
        assert_eq!(StandardFont::TimesBold.char_width('W'), 1000.0);
        assert_eq!(StandardFont::CourierBold.char_width('i'), 600.0);
    }

    #[test]
    fn baseline_offset_ignores_line_gap_of_standard_fonts() {
        let metrics = FontMetrics {
            line_gap: 100.0,
            ..StandardFont::Helvetica.metrics()
        };
        assert_eq!(metrics.baseline_offset(), 925.0);

        let embedded = FontMetrics {
            embedded: true,
            ..metrics
        };
        assert_eq!(embedded.baseline_offset(), 1025.0);
    }

    #[test]
    fn win_ansi() {
        assert_eq!(win_ansi_byte('a'), Some(b'a'));
        assert_eq!(win_ansi_byte('é'), Some(0xE9));
        assert_eq!(win_ansi_byte('€'), Some(0x80));
        assert_eq!(win_ansi_byte('\u{7F}'), None);
        assert_eq!(win_ansi_byte('中'), None);
        assert!(StandardFont::Helvetica.supports_char('ü'));
        assert!(!StandardFont::Symbol.supports_char('ü'));
    }

    #[test]
    fn cache_loads_each_font_once() {
        let mut backend = RecordingBackend::new();
        let mut cache = FontCache::new();

        let a = cache.resolve("Helvetica", &mut backend).unwrap();
        let b = cache.resolve("Helvetica", &mut backend).unwrap();
        let c = cache.resolve("fonts/Helvetica.afm", &mut backend).unwrap();
        let d = cache.resolve("Courier", &mut backend).unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(a.id, c.id);
        assert_ne!(a.id, d.id);
        assert_eq!(backend.fonts.len(), 2);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn unloadable_font_is_an_error() {
        let mut backend = RecordingBackend::new();
        let mut cache = FontCache::new();
        assert!(cache.resolve("/does/not/exist/Foo", &mut backend).is_err());
        assert!(cache.is_empty());
    }
}
