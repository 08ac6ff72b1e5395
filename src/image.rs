//! Detecting image formats and caching embedded images.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, ImageId};

/// The formats of images that can be drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// A PNG image.
    Png,
    /// A JPEG image.
    Jpeg,
    /// A GIF image. Only the first frame is drawn.
    Gif,
    /// A BMP image.
    Bmp,
    /// An SVG image, which is embedded as vector graphics.
    Svg,
}

impl ImageKind {
    /// Detect the format of an image from its contents, falling back to the file
    /// extension for SVG files that do not start with a recognizable header.
    pub fn detect(path: &Path, data: &[u8]) -> Option<Self> {
        if let Some(kind) = Self::detect_raster(data) {
            return Some(kind);
        }

        if looks_like_svg(data) {
            return Some(ImageKind::Svg);
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => Some(ImageKind::Svg),
            _ => None,
        }
    }

    #[cfg(feature = "raster-images")]
    fn detect_raster(data: &[u8]) -> Option<Self> {
        match imagesize::image_type(data).ok()? {
            imagesize::ImageType::Png => Some(ImageKind::Png),
            imagesize::ImageType::Jpeg => Some(ImageKind::Jpeg),
            imagesize::ImageType::Gif => Some(ImageKind::Gif),
            imagesize::ImageType::Bmp => Some(ImageKind::Bmp),
            _ => None,
        }
    }

    #[cfg(not(feature = "raster-images"))]
    fn detect_raster(_: &[u8]) -> Option<Self> {
        None
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();

    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg"))
}

/// Embedded images, keyed by their canonical path.
///
/// Each distinct file is read and embedded at most once per document, no matter
/// under how many different paths it is referenced. Files that could not be read or
/// embedded are remembered too, so that they are only reported once.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<PathBuf, Option<ImageId>>,
}

impl ImageCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the image at `path`, embedding it into the backend on a cache miss.
    ///
    /// Returns `None` if the image cannot be drawn.
    pub fn get_or_embed(&mut self, path: &Path, backend: &mut dyn Backend) -> Option<ImageId> {
        let canonical = match std::fs::canonicalize(path) {
            Ok(canonical) => canonical,
            Err(e) => {
                log::warn!("skipping image {}: {e}", path.display());
                return None;
            }
        };

        if let Some(entry) = self.entries.get(&canonical) {
            return *entry;
        }

        let entry = embed(&canonical, backend);
        self.entries.insert(canonical, entry);

        entry
    }

    /// The number of distinct files that have been looked up.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no image has been looked up yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn embed(path: &Path, backend: &mut dyn Backend) -> Option<ImageId> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("skipping image {}: {e}", path.display());
            return None;
        }
    };

    let Some(kind) = ImageKind::detect(path, &data) else {
        log::warn!("skipping image {}: unsupported format", path.display());
        return None;
    };

    log::debug!("embedding {kind:?} image {}", path.display());

    match backend.embed_image(path, &data, kind) {
        Ok(id) => Some(id),
        Err(e) => {
            log::warn!("skipping image: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;

    const SVG: &[u8] = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;

    #[test]
    fn detects_svg() {
        assert_eq!(
            ImageKind::detect(Path::new("a.bin"), SVG),
            Some(ImageKind::Svg)
        );
        assert_eq!(
            ImageKind::detect(
                Path::new("a.bin"),
                b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>"
            ),
            Some(ImageKind::Svg)
        );
        assert_eq!(
            ImageKind::detect(Path::new("drawing.SVG"), b"<!-- comment -->"),
            Some(ImageKind::Svg)
        );
        assert_eq!(ImageKind::detect(Path::new("a.txt"), b"hello"), None);
    }

    #[cfg(feature = "raster-images")]
    #[test]
    fn detects_raster_formats() {
        let padded = |header: &[u8]| {
            let mut data = header.to_vec();
            data.resize(64, 0);
            data
        };

        assert_eq!(
            ImageKind::detect(
                Path::new("a.png"),
                &padded(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06")
            ),
            Some(ImageKind::Png)
        );
        assert_eq!(
            ImageKind::detect(Path::new("a"), &padded(b"GIF89a\x01\0\x01\0")),
            Some(ImageKind::Gif)
        );
        assert_eq!(
            ImageKind::detect(Path::new("a"), &padded(b"\xFF\xD8\xFF\xE0\0\x10JFIF\0")),
            Some(ImageKind::Jpeg)
        );
    }

    #[test]
    fn embeds_once_per_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.svg");
        std::fs::write(&path, SVG).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let indirect = dir.path().join("sub").join("..").join("image.svg");

        let mut backend = RecordingBackend::new();
        let mut cache = ImageCache::new();

        let a = cache.get_or_embed(&path, &mut backend);
        let b = cache.get_or_embed(&indirect, &mut backend);

        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(backend.images.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unsupported_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not an image").unwrap();

        let mut backend = RecordingBackend::new();
        let mut cache = ImageCache::new();

        assert_eq!(cache.get_or_embed(&path, &mut backend), None);
        assert_eq!(cache.get_or_embed(&path, &mut backend), None);
        assert_eq!(
            cache.get_or_embed(&dir.path().join("missing.png"), &mut backend),
            None
        );
        assert!(backend.images.is_empty());
        assert_eq!(cache.len(), 1);
    }
}
