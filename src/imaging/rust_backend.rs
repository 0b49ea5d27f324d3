//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Classify | `image::guess_format` on the leading bytes |
//! | Decode (JPEG, PNG) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode | `JpegEncoder` (configurable quality) / `PngEncoder` |
//! | Metadata | [`metadata`](super::metadata) block carry-over |
//! | Write | `tempfile` sibling + atomic rename |

use super::backend::{BackendError, Dimensions, ImageBackend, ImageKind};
use super::calculations::fit_within;
use super::metadata;
use super::params::{Quality, TransformParams};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Enough leading bytes for every signature `image::guess_format` knows.
const SNIFF_LEN: u64 = 32;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn image_format(kind: ImageKind) -> Option<ImageFormat> {
    match kind {
        ImageKind::Jpeg => Some(ImageFormat::Jpeg),
        ImageKind::Png => Some(ImageFormat::Png),
        ImageKind::Other | ImageKind::Unreadable => None,
    }
}

/// Encode in the given format. JPEG has no alpha channel or 16-bit mode, so
/// anything but 8-bit gray/RGB is flattened to RGB first.
fn encode(img: &DynamicImage, kind: ImageKind, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match kind {
        ImageKind::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            match img.color() {
                ColorType::L8 | ColorType::Rgb8 => img.write_with_encoder(encoder),
                _ => DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder),
            }
        }
        ImageKind::Png => img.write_with_encoder(PngEncoder::new(&mut buf)),
        ImageKind::Other | ImageKind::Unreadable => {
            return Err(BackendError::ProcessingFailed(format!(
                "Unsupported output format: {kind:?}"
            )));
        }
    };
    result.map_err(|e| BackendError::ProcessingFailed(format!("Encode failed: {e}")))?;
    Ok(buf)
}

/// Write `bytes` to `target` through a temporary sibling file.
///
/// The temporary file is renamed over the target only once it is complete,
/// so a failure at any point leaves either the previous artifact or nothing.
/// The result takes the permission bits of `permissions_from`.
fn write_atomically(
    target: &Path,
    bytes: &[u8],
    permissions_from: &Path,
) -> Result<(), BackendError> {
    let dir = target.parent().ok_or_else(|| {
        BackendError::ProcessingFailed(format!("No parent directory: {}", target.display()))
    })?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".photo-mirror-")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file()
        .set_permissions(fs::metadata(permissions_from)?.permissions())?;
    tmp.persist(target).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn classify(&self, path: &Path) -> ImageKind {
        let mut header = Vec::with_capacity(SNIFF_LEN as usize);
        let read = File::open(path).and_then(|f| f.take(SNIFF_LEN).read_to_end(&mut header));
        if read.is_err() {
            return ImageKind::Unreadable;
        }
        match image::guess_format(&header) {
            Ok(ImageFormat::Jpeg) => ImageKind::Jpeg,
            Ok(ImageFormat::Png) => ImageKind::Png,
            _ => ImageKind::Other,
        }
    }

    fn transform(&self, params: &TransformParams) -> Result<Dimensions, BackendError> {
        let source = fs::read(&params.source)?;
        let kind = match image::guess_format(&source) {
            Ok(ImageFormat::Jpeg) => ImageKind::Jpeg,
            Ok(ImageFormat::Png) => ImageKind::Png,
            _ => ImageKind::Other,
        };
        let format = image_format(kind).ok_or_else(|| {
            BackendError::ProcessingFailed(format!(
                "Not a JPEG or PNG: {}",
                params.source.display()
            ))
        })?;

        let img = image::load_from_memory_with_format(&source, format).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to decode {}: {}",
                params.source.display(),
                e
            ))
        })?;

        let original = (img.width(), img.height());
        let (width, height) = fit_within(original, (params.max_width, params.max_height));
        let resized = if (width, height) == original {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };

        let encoded = encode(&resized, kind, params.quality)?;

        let mut blocks = metadata::read_metadata(&source, kind);
        metadata::set_pixel_dimensions(&mut blocks, kind, width, height);
        let encoded = metadata::embed_metadata(encoded, kind, &blocks);

        write_atomically(&params.target, &encoded, &params.source)?;
        Ok(Dimensions { width, height })
    }
}
