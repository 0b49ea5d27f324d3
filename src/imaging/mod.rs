//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Classify** | `image::guess_format` (content signature) |
//! | **Resize** | Lanczos3, fit within a bounding box |
//! | **Encode** | same format as the source (JPEG or PNG) |
//! | **Metadata** | custom block carry-over (JPEG APPn, PNG chunks) + EXIF size patch |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Metadata**: byte-level metadata parsing and splicing

pub mod backend;
mod calculations;
pub mod metadata;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageKind};
pub use calculations::fit_within;
pub use params::{Quality, TransformParams};
pub use rust_backend::RustBackend;
