//! Shared test utilities for the photo-mirror test suite.
//!
//! Provides synthetic image writers, an EXIF builder, mtime control and tree
//! listing for tests that exercise the walkers against a real filesystem.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_jpeg(&tmp.path().join("a.jpg"), 1000, 800);
//! set_mtime(&tmp.path().join("a.jpg"), hours_ago(2));
//!
//! assert_eq!(relative_files(tmp.path()), vec!["a.jpg"]);
//! ```

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// Encode a gradient JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Encode a gradient PNG with an alpha channel.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 200])
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

/// Write a valid JPEG file, creating parent directories.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    write_file(path, &jpeg_bytes(width, height));
}

/// Write a valid PNG file, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    write_file(path, &png_bytes(width, height));
}

/// Write a JPEG carrying the given TIFF structure as its EXIF block.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, tiff: Vec<u8>) {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend(tiff);
    let block = crate::imaging::metadata::MetadataBlock::JpegSegment {
        marker: 0xE1,
        payload,
    };
    let bytes = crate::imaging::metadata::embed_metadata(
        jpeg_bytes(width, height),
        crate::imaging::ImageKind::Jpeg,
        &[block],
    );
    write_file(path, &bytes);
}

/// Write arbitrary bytes, creating parent directories.
pub fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Minimal TIFF structure: IFD0 with an EXIF pointer, and an EXIF IFD
/// holding `PixelXDimension` / `PixelYDimension` as SHORT values.
pub fn exif_tiff(width: u16, height: u16, big_endian: bool) -> Vec<u8> {
    let u16b = |v: u16| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };
    let u32b = |v: u32| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };
    let entry = |tag: u16, typ: u16, value: [u8; 4]| {
        let mut e = Vec::with_capacity(12);
        e.extend(u16b(tag));
        e.extend(u16b(typ));
        e.extend(u32b(1));
        e.extend(value);
        e
    };
    let short = |v: u16| {
        let b = u16b(v);
        [b[0], b[1], 0, 0]
    };

    let mut tiff = Vec::new();
    tiff.extend(if big_endian { b"MM" } else { b"II" });
    tiff.extend(u16b(42));
    tiff.extend(u32b(8));
    // IFD0 at 8: one entry pointing at the EXIF IFD (8 + 2 + 12 + 4 = 26)
    tiff.extend(u16b(1));
    tiff.extend(entry(0x8769, 4, u32b(26)));
    tiff.extend(u32b(0));
    // EXIF IFD at 26
    tiff.extend(u16b(2));
    tiff.extend(entry(0xA002, 3, short(width)));
    tiff.extend(entry(0xA003, 3, short(height)));
    tiff.extend(u32b(0));
    tiff
}

// =========================================================================
// Timestamps
// =========================================================================

pub fn hours_ago(hours: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(hours * 3600)
}

/// Set a file's modification time.
pub fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

// =========================================================================
// Tree listing
// =========================================================================

/// All files under `root`, as sorted `/`-separated relative paths.
pub fn relative_files(root: &Path) -> Vec<String> {
    list(root, |e| e.file_type().is_file())
}

/// All directories under `root` (excluding `root`), as sorted relative paths.
pub fn relative_dirs(root: &Path) -> Vec<String> {
    list(root, |e| e.file_type().is_dir() && e.depth() > 0)
}

fn list(root: &Path, keep: impl Fn(&walkdir::DirEntry) -> bool) -> Vec<String> {
    let mut paths: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| keep(e))
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    paths.sort();
    paths
}
