//! Error handling.
//!
//! Most drawing operations cannot fail: degenerate geometry simply draws nothing,
//! and images that cannot be read are skipped with a warning. The errors below are
//! the ones that are surfaced to the caller.

use std::path::PathBuf;

/// A wrapper type for vellum results.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// An error in vellum.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// The canvas was configured with settings it cannot work with.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// A font could not be loaded or parsed.
    #[error("failed to load font `{0}`: {1}")]
    Font(String, String),
    /// An image could not be decoded.
    #[error("failed to decode image {0}: {1}")]
    Image(PathBuf, String),
    /// A font could not be subsetted while writing the document.
    #[error("failed to subset font `{0}`: {1}")]
    Subset(String, String),
    /// Writing the finished document failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
