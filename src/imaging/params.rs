//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the generation walker (which decides which targets are
//! stale) and the [`backend`](super::backend) (which does the pixel work).
//! Keeping them separate lets the walker run against a mock backend in tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`TransformParams`]: Full specification for one mirror artifact: source,
//!   target path, bounding box, quality.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
///
/// Only JPEG output honors it; PNG is always lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for producing one resized artifact.
///
/// The output is scaled to fit within `max_width` × `max_height` with the
/// aspect ratio preserved, and encoded in the same format as the source.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub source: PathBuf,
    pub target: PathBuf,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}
