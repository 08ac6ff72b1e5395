use std::path::PathBuf;
use std::sync::LazyLock;

use vellum::{Canvas, CanvasSettings, PaperSize};

pub static FONT_PATH: LazyLock<PathBuf> =
    LazyLock::new(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));

pub trait CanvasSettingsExt {
    fn small_debug() -> Self;
}

impl CanvasSettingsExt for CanvasSettings {
    fn small_debug() -> Self {
        CanvasSettings::debug().with_paper_size(PaperSize::Custom(200.0, 100.0))
    }
}

pub fn canvas() -> Canvas {
    Canvas::new(CanvasSettings::small_debug()).unwrap()
}

/// The document as text, for searching operators and dictionary entries.
pub fn text(pdf: &[u8]) -> String {
    String::from_utf8_lossy(pdf).into_owned()
}

pub fn occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Write the document into `VELLUM_TEST_OUT`, if set, for manual inspection.
pub fn store(name: &str, pdf: &[u8]) {
    if let Some(dir) = std::env::var_os("VELLUM_TEST_OUT") {
        let _ = std::fs::write(std::path::Path::new(&dir).join(format!("{name}.pdf")), pdf);
    }
}
