//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the mirror needs from
//! an image library: classify a file by content, and transform it into a
//! resized artifact.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked. Tests drive the walkers through the recording [`tests::MockBackend`].

use super::params::TransformParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of a transform: the pixel size actually written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Content-sniffed type of a file under the source tree.
///
/// Only [`ImageKind::Jpeg`] and [`ImageKind::Png`] are mirrored; everything
/// else is skipped without a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    /// Readable, but not a supported image (text files, RAW, video…).
    Other,
    /// Could not be opened or read.
    Unreadable,
}

impl ImageKind {
    pub fn is_supported(self) -> bool {
        matches!(self, ImageKind::Jpeg | ImageKind::Png)
    }
}

/// Trait for image processing backends.
///
/// `Sync` so the generation walker can share one backend across the rayon
/// pool.
pub trait ImageBackend: Sync {
    /// Classify a file by its leading bytes, never by extension.
    fn classify(&self, path: &Path) -> ImageKind;

    /// Produce a resized copy of `params.source` at `params.target`.
    ///
    /// On error no file may be left at the target path.
    fn transform(&self, params: &TransformParams) -> Result<Dimensions, BackendError>;
}
