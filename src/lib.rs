//! A stateful drawing canvas for page-layout engines that produces PDF documents.
//!
//! Layout engines draw into a [`Canvas`] using top-left-origin coordinates. The
//! canvas flips them into PDF space, avoids repeating state changes that are already
//! in effect, caches fonts and images per document and replays page headers and
//! footers on every page once the total number of pages is known.
//!
//! The actual document is written by a [`Backend`], which is [`PdfBackend`] by
//! default.

pub mod backend;
pub mod canvas;
pub mod color;
pub mod curve;
pub mod error;
pub mod font;
pub mod graphics_state;
pub mod image;
pub mod interactive;
pub mod overlay;
pub mod pdf;
pub mod settings;

pub use backend::{Backend, FontId, ImageId, LineCap, LineJoin, LineStyle};
pub use canvas::{Canvas, Paint, TextStyle};
pub use color::{BlendMode, Color, Transparency};
pub use error::{CanvasError, CanvasResult};
pub use font::{FontSource, StandardFont};
pub use interactive::{DefaultView, LinkTarget};
pub use pdf::PdfBackend;
pub use settings::{CanvasSettings, Orientation, PaperSize};
