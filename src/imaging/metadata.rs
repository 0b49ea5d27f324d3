//! Metadata carry-over from a source image to its resized copy.
//!
//! Re-encoding through the `image` crate drops every ancillary block, so the
//! transform lifts them from the source bytes and splices them back into the
//! encoded output:
//!
//! | Format | Blocks carried |
//! |---|---|
//! | JPEG | APP1 (EXIF, XMP), APP2 (ICC profile), APP13 (IPTC / Photoshop) |
//! | PNG | `eXIf`, `iCCP`, `tEXt`, `zTXt`, `iTXt` |
//!
//! The EXIF pixel-dimension tags (`PixelXDimension` 0xA002,
//! `PixelYDimension` 0xA003) are then set to the output size. Tags the source
//! lacks are added, and a source without any EXIF block gets a minimal one
//! holding just the two tags.
//!
//! Pure Rust, no external dependencies. Malformed input never fails: blocks
//! that cannot be parsed are skipped, and a damaged EXIF structure is carried
//! over unpatched.

use super::backend::ImageKind;

/// One ancillary block lifted from a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataBlock {
    /// JPEG APPn segment: marker byte (e.g. `0xE1`) and payload without the
    /// length field.
    JpegSegment { marker: u8, payload: Vec<u8> },
    /// PNG chunk: four-byte type and chunk data without length or CRC.
    PngChunk { kind: [u8; 4], data: Vec<u8> },
}

impl MetadataBlock {
    /// The TIFF-structured EXIF payload, if this block carries one.
    fn exif(&self) -> Option<&[u8]> {
        match self {
            MetadataBlock::JpegSegment { marker, payload }
                if *marker == APP1 && payload.starts_with(EXIF_HEADER) =>
            {
                Some(&payload[EXIF_HEADER.len()..])
            }
            MetadataBlock::PngChunk { kind, data } if kind == b"eXIf" => Some(data.as_slice()),
            _ => None,
        }
    }

    /// Replace the TIFF structure of an EXIF block, keeping its framing.
    fn set_exif(&mut self, tiff: Vec<u8>) {
        match self {
            MetadataBlock::JpegSegment { payload, .. } => {
                payload.truncate(EXIF_HEADER.len());
                payload.extend(tiff);
            }
            MetadataBlock::PngChunk { data, .. } => *data = tiff,
        }
    }

    /// A fresh EXIF block in the framing `kind` uses.
    fn new_exif(kind: ImageKind, tiff: Vec<u8>) -> Option<Self> {
        match kind {
            ImageKind::Jpeg => {
                let mut payload = EXIF_HEADER.to_vec();
                payload.extend(tiff);
                Some(MetadataBlock::JpegSegment {
                    marker: APP1,
                    payload,
                })
            }
            ImageKind::Png => Some(MetadataBlock::PngChunk {
                kind: *b"eXIf",
                data: tiff,
            }),
            ImageKind::Other | ImageKind::Unreadable => None,
        }
    }
}

/// Lift the carried metadata blocks out of an encoded image.
pub fn read_metadata(data: &[u8], kind: ImageKind) -> Vec<MetadataBlock> {
    match kind {
        ImageKind::Jpeg => read_jpeg_segments(data),
        ImageKind::Png => read_png_chunks(data),
        ImageKind::Other | ImageKind::Unreadable => Vec::new(),
    }
}

/// Set the EXIF pixel dimensions in every EXIF block, adding the tags where
/// they are missing.
///
/// Without any EXIF block, a minimal one is placed first. Returns `true` if
/// at least one block now carries the new dimensions.
pub fn set_pixel_dimensions(
    blocks: &mut Vec<MetadataBlock>,
    kind: ImageKind,
    width: u32,
    height: u32,
) -> bool {
    let mut has_exif = false;
    let mut updated = false;
    for block in blocks.iter_mut() {
        let Some(tiff) = block.exif() else {
            continue;
        };
        has_exif = true;
        if let Some(patched) = with_pixel_dimensions(tiff, width, height) {
            block.set_exif(patched);
            updated = true;
        }
    }
    if has_exif {
        return updated;
    }

    let Some(tiff) = with_pixel_dimensions(&empty_tiff(), width, height) else {
        return false;
    };
    match MetadataBlock::new_exif(kind, tiff) {
        Some(block) => {
            blocks.insert(0, block);
            true
        }
        None => false,
    }
}

/// Read the EXIF pixel dimensions from the first EXIF block that has both.
pub fn pixel_dimensions(blocks: &[MetadataBlock]) -> Option<(u32, u32)> {
    blocks
        .iter()
        .filter_map(MetadataBlock::exif)
        .find_map(read_exif_dimensions)
}

/// Splice metadata blocks into a freshly encoded image.
///
/// Blocks that do not belong to `kind` are ignored. If `encoded` does not
/// look like the expected format it is returned unchanged.
pub fn embed_metadata(encoded: Vec<u8>, kind: ImageKind, blocks: &[MetadataBlock]) -> Vec<u8> {
    if blocks.is_empty() {
        return encoded;
    }
    match kind {
        ImageKind::Jpeg => embed_jpeg_segments(encoded, blocks),
        ImageKind::Png => embed_png_chunks(encoded, blocks),
        ImageKind::Other | ImageKind::Unreadable => encoded,
    }
}

// ---------------------------------------------------------------------------
// JPEG: APPn segments
// ---------------------------------------------------------------------------

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP2: u8 = 0xE2;
const APP13: u8 = 0xED;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

fn is_carried_marker(marker: u8) -> bool {
    matches!(marker, APP1 | APP2 | APP13)
}

/// Markers that stand alone, without a length field.
fn is_standalone_marker(marker: u8) -> bool {
    marker == 0x01 || marker == 0xD8 || (0xD0..=0xD7).contains(&marker)
}

fn read_jpeg_segments(data: &[u8]) -> Vec<MetadataBlock> {
    let mut blocks = Vec::new();
    if !data.starts_with(&[0xFF, 0xD8]) {
        return blocks;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        if marker == 0xFF {
            // Fill byte
            pos += 1;
            continue;
        }
        // Image data starts: no more metadata segments
        if marker == SOS || marker == EOI {
            break;
        }
        if is_standalone_marker(marker) {
            pos += 2;
            continue;
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > data.len() {
            break;
        }
        if is_carried_marker(marker) {
            blocks.push(MetadataBlock::JpegSegment {
                marker,
                payload: data[pos + 4..pos + 2 + seg_len].to_vec(),
            });
        }
        pos += 2 + seg_len;
    }

    blocks
}

/// Insert segments after SOI, keeping a leading JFIF APP0 in first position.
fn embed_jpeg_segments(encoded: Vec<u8>, blocks: &[MetadataBlock]) -> Vec<u8> {
    if !encoded.starts_with(&[0xFF, 0xD8]) {
        return encoded;
    }

    let mut insert_at = 2;
    if encoded.len() >= 6 && encoded[2] == 0xFF && encoded[3] == APP0 {
        let app0_len = u16::from_be_bytes([encoded[4], encoded[5]]) as usize;
        if 4 + app0_len <= encoded.len() {
            insert_at = 4 + app0_len;
        }
    }

    let mut out = Vec::with_capacity(encoded.len() + 1024);
    out.extend_from_slice(&encoded[..insert_at]);
    for block in blocks {
        if let MetadataBlock::JpegSegment { marker, payload } = block {
            // Length field covers itself; oversized payloads cannot be written
            let Ok(seg_len) = u16::try_from(payload.len() + 2) else {
                continue;
            };
            out.extend_from_slice(&[0xFF, *marker]);
            out.extend_from_slice(&seg_len.to_be_bytes());
            out.extend_from_slice(payload);
        }
    }
    out.extend_from_slice(&encoded[insert_at..]);
    out
}

// ---------------------------------------------------------------------------
// PNG: ancillary chunks
// ---------------------------------------------------------------------------

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const CARRIED_CHUNKS: &[&[u8; 4]] = &[b"eXIf", b"iCCP", b"tEXt", b"zTXt", b"iTXt"];

fn read_png_chunks(data: &[u8]) -> Vec<MetadataBlock> {
    let mut blocks = Vec::new();
    if !data.starts_with(PNG_SIGNATURE) {
        return blocks;
    }

    let mut pos = PNG_SIGNATURE.len();
    while pos + 12 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let kind = [data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]];
        let data_start = pos + 8;
        let Some(data_end) = data_start.checked_add(len) else {
            break;
        };
        if data_end + 4 > data.len() {
            break;
        }
        if CARRIED_CHUNKS.contains(&&kind) {
            blocks.push(MetadataBlock::PngChunk {
                kind,
                data: data[data_start..data_end].to_vec(),
            });
        }
        if &kind == b"IEND" {
            break;
        }
        pos = data_end + 4;
    }

    blocks
}

/// Insert chunks directly after IHDR, ahead of any image data.
fn embed_png_chunks(encoded: Vec<u8>, blocks: &[MetadataBlock]) -> Vec<u8> {
    let ihdr_start = PNG_SIGNATURE.len();
    if !encoded.starts_with(PNG_SIGNATURE)
        || encoded.len() < ihdr_start + 12
        || &encoded[ihdr_start + 4..ihdr_start + 8] != b"IHDR"
    {
        return encoded;
    }
    let ihdr_len = u32::from_be_bytes([
        encoded[ihdr_start],
        encoded[ihdr_start + 1],
        encoded[ihdr_start + 2],
        encoded[ihdr_start + 3],
    ]) as usize;
    let insert_at = ihdr_start + 12 + ihdr_len;
    if insert_at > encoded.len() {
        return encoded;
    }

    let mut out = Vec::with_capacity(encoded.len() + 1024);
    out.extend_from_slice(&encoded[..insert_at]);
    for block in blocks {
        if let MetadataBlock::PngChunk { kind, data } = block {
            let Ok(len) = u32::try_from(data.len()) else {
                continue;
            };
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(kind);
            out.extend_from_slice(data);
            out.extend_from_slice(&png_crc(kind, data).to_be_bytes());
        }
    }
    out.extend_from_slice(&encoded[insert_at..]);
    out
}

/// CRC-32 (ISO 3309) over chunk type and data, as PNG requires.
fn png_crc(kind: &[u8; 4], data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in kind.iter().chain(data) {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// EXIF: TIFF-structured IFDs
// ---------------------------------------------------------------------------

const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_PIXEL_X: u16 = 0xA002;
const TAG_PIXEL_Y: u16 = 0xA003;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

/// Byte-order aware view over a TIFF structure.
struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl<'a> Tiff<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let big_endian = match &data[0..2] {
            b"MM" => true,
            b"II" => false,
            _ => return None,
        };
        let tiff = Self { data, big_endian };
        // TIFF magic (42)
        (tiff.u16_at(2)? == 42).then_some(tiff)
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes = [*self.data.get(offset)?, *self.data.get(offset + 1)?];
        Some(if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(offset..offset + 4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    /// Byte offset of the 12-byte entry for `tag` in the IFD at `ifd_offset`.
    fn find_entry(&self, ifd_offset: usize, tag: u16) -> Option<usize> {
        let count = self.u16_at(ifd_offset)? as usize;
        (0..count)
            .map(|i| ifd_offset + 2 + i * 12)
            .take_while(|entry| entry + 12 <= self.data.len())
            .find(|&entry| self.u16_at(entry) == Some(tag))
    }

    /// Offset of the EXIF sub-IFD, via the pointer tag in IFD0.
    fn exif_ifd(&self) -> Option<usize> {
        let ifd0 = self.u32_at(4)? as usize;
        let pointer = self.find_entry(ifd0, TAG_EXIF_IFD)?;
        let offset = self.u32_at(pointer + 8)? as usize;
        (offset + 2 <= self.data.len()).then_some(offset)
    }

    /// Every entry of the IFD at `ifd_offset`, keyed by tag, plus the
    /// next-IFD offset. `None` unless the whole IFD is in bounds.
    fn ifd_entries(&self, ifd_offset: usize) -> Option<(Vec<(u16, [u8; 12])>, u32)> {
        let count = self.u16_at(ifd_offset)? as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let at = ifd_offset + 2 + i * 12;
            let entry: [u8; 12] = self.data.get(at..at + 12)?.try_into().ok()?;
            entries.push((self.u16_at(at)?, entry));
        }
        let next = self.u32_at(ifd_offset + 2 + count * 12)?;
        Some((entries, next))
    }

    /// Inline SHORT or LONG value of a single-count entry.
    fn entry_value(&self, entry: usize) -> Option<u32> {
        match self.u16_at(entry + 2)? {
            TYPE_SHORT => self.u16_at(entry + 8).map(u32::from),
            TYPE_LONG => self.u32_at(entry + 8),
            _ => None,
        }
    }
}

fn read_exif_dimensions(tiff: &[u8]) -> Option<(u32, u32)> {
    let tiff = Tiff::parse(tiff)?;
    let ifd = tiff.exif_ifd()?;
    let x = tiff.entry_value(tiff.find_entry(ifd, TAG_PIXEL_X)?)?;
    let y = tiff.entry_value(tiff.find_entry(ifd, TAG_PIXEL_Y)?)?;
    Some((x, y))
}

/// Copy of `data` with the pixel-dimension tags set.
///
/// Existing entries are overwritten in place. Otherwise the EXIF IFD (and,
/// when IFD0 has no EXIF pointer, IFD0 too) is rebuilt at the end of the
/// structure and the pointer to it redirected. Value offsets are relative to
/// the TIFF header, so appending keeps every existing entry valid.
fn with_pixel_dimensions(data: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let tiff = Tiff::parse(data)?;
    let big_endian = tiff.big_endian;
    let ifd0 = tiff.u32_at(4)? as usize;
    let pixel_entries = || {
        vec![
            (TAG_PIXEL_X, value_entry(TAG_PIXEL_X, width, big_endian)),
            (TAG_PIXEL_Y, value_entry(TAG_PIXEL_Y, height, big_endian)),
        ]
    };
    let mut out = data.to_vec();

    match tiff.exif_ifd() {
        Some(ifd) => {
            if let (Some(x), Some(y)) = (
                tiff.find_entry(ifd, TAG_PIXEL_X),
                tiff.find_entry(ifd, TAG_PIXEL_Y),
            ) {
                out[x..x + 12].copy_from_slice(&value_entry(TAG_PIXEL_X, width, big_endian));
                out[y..y + 12].copy_from_slice(&value_entry(TAG_PIXEL_Y, height, big_endian));
                return Some(out);
            }

            let (mut entries, next) = tiff.ifd_entries(ifd)?;
            entries.retain(|(tag, _)| *tag != TAG_PIXEL_X && *tag != TAG_PIXEL_Y);
            entries.extend(pixel_entries());
            let new_ifd = append_ifd(&mut out, entries, next, big_endian)?;

            let pointer = tiff.find_entry(ifd0, TAG_EXIF_IFD)?;
            out[pointer..pointer + 12]
                .copy_from_slice(&long_entry(TAG_EXIF_IFD, new_ifd, big_endian));
        }
        None => {
            let (mut entries, next) = tiff.ifd_entries(ifd0)?;
            let exif_ifd = append_ifd(&mut out, pixel_entries(), 0, big_endian)?;
            entries.retain(|(tag, _)| *tag != TAG_EXIF_IFD);
            entries.push((TAG_EXIF_IFD, long_entry(TAG_EXIF_IFD, exif_ifd, big_endian)));
            let new_ifd0 = append_ifd(&mut out, entries, next, big_endian)?;
            out[4..8].copy_from_slice(&u32_bytes(new_ifd0, big_endian));
        }
    }

    Some(out)
}

/// Little-endian TIFF header followed by an empty IFD0.
fn empty_tiff() -> Vec<u8> {
    let mut tiff = b"II".to_vec();
    tiff.extend(42u16.to_le_bytes());
    tiff.extend(8u32.to_le_bytes());
    tiff.extend(0u16.to_le_bytes());
    tiff.extend(0u32.to_le_bytes());
    tiff
}

/// Append an IFD at the next word boundary and return its offset.
///
/// Entries are written in ascending tag order, as TIFF readers expect.
fn append_ifd(
    out: &mut Vec<u8>,
    mut entries: Vec<(u16, [u8; 12])>,
    next: u32,
    big_endian: bool,
) -> Option<u32> {
    entries.sort_by_key(|(tag, _)| *tag);
    if out.len() % 2 == 1 {
        out.push(0);
    }
    let offset = u32::try_from(out.len()).ok()?;
    let count = u16::try_from(entries.len()).ok()?;

    out.extend(u16_bytes(count, big_endian));
    for (_, entry) in &entries {
        out.extend(entry);
    }
    out.extend(u32_bytes(next, big_endian));
    Some(offset)
}

/// A single-count inline entry: SHORT when the value fits in 16 bits, LONG
/// otherwise.
fn value_entry(tag: u16, value: u32, big_endian: bool) -> [u8; 12] {
    match u16::try_from(value) {
        Ok(short) => {
            let b = u16_bytes(short, big_endian);
            encode_entry(tag, TYPE_SHORT, [b[0], b[1], 0, 0], big_endian)
        }
        Err(_) => long_entry(tag, value, big_endian),
    }
}

fn long_entry(tag: u16, value: u32, big_endian: bool) -> [u8; 12] {
    encode_entry(tag, TYPE_LONG, u32_bytes(value, big_endian), big_endian)
}

fn encode_entry(tag: u16, typ: u16, value: [u8; 4], big_endian: bool) -> [u8; 12] {
    let mut entry = [0u8; 12];
    entry[0..2].copy_from_slice(&u16_bytes(tag, big_endian));
    entry[2..4].copy_from_slice(&u16_bytes(typ, big_endian));
    entry[4..8].copy_from_slice(&u32_bytes(1, big_endian));
    entry[8..12].copy_from_slice(&value);
    entry
}

fn u16_bytes(value: u16, big_endian: bool) -> [u8; 2] {
    if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    }
}

fn u32_bytes(value: u32, big_endian: bool) -> [u8; 4] {
    if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{exif_tiff, jpeg_bytes, png_bytes};

    fn exif_app1(tiff: Vec<u8>) -> MetadataBlock {
        let mut payload = EXIF_HEADER.to_vec();
        payload.extend(tiff);
        MetadataBlock::JpegSegment {
            marker: APP1,
            payload,
        }
    }

    #[test]
    fn read_dimensions_little_endian() {
        let blocks = vec![exif_app1(exif_tiff(1000, 800, false))];
        assert_eq!(pixel_dimensions(&blocks), Some((1000, 800)));
    }

    #[test]
    fn read_dimensions_big_endian() {
        let blocks = vec![MetadataBlock::PngChunk {
            kind: *b"eXIf",
            data: exif_tiff(4000, 3000, true),
        }];
        assert_eq!(pixel_dimensions(&blocks), Some((4000, 3000)));
    }

    #[test]
    fn set_dimensions_rewrites_short_values() {
        for big_endian in [false, true] {
            let mut blocks = vec![exif_app1(exif_tiff(1000, 800, big_endian))];
            assert!(set_pixel_dimensions(&mut blocks, ImageKind::Jpeg, 750, 600));
            assert_eq!(pixel_dimensions(&blocks), Some((750, 600)));
        }
    }

    #[test]
    fn set_dimensions_widens_to_long() {
        let mut blocks = vec![exif_app1(exif_tiff(10, 10, false))];
        assert!(set_pixel_dimensions(&mut blocks, ImageKind::Jpeg, 70_000, 5));
        assert_eq!(pixel_dimensions(&blocks), Some((70_000, 5)));
    }

    /// Little-endian TIFF whose EXIF IFD holds only `ExifVersion`.
    fn tiff_without_pixel_tags() -> Vec<u8> {
        let mut tiff = b"II\x2a\x00\x08\x00\x00\x00".to_vec();
        // IFD0: EXIF pointer to 26
        tiff.extend([0x01, 0x00]);
        tiff.extend([0x69, 0x87, 0x04, 0x00, 0x01, 0x00, 0x00, 0x00, 0x1A, 0x00, 0x00, 0x00]);
        tiff.extend([0x00; 4]);
        // EXIF IFD: ExifVersion, UNDEFINED x4, "0231"
        tiff.extend([0x01, 0x00]);
        tiff.extend([0x00, 0x90, 0x07, 0x00, 0x04, 0x00, 0x00, 0x00]);
        tiff.extend(b"0231");
        tiff.extend([0x00; 4]);
        tiff
    }

    /// Little-endian TIFF whose IFD0 holds only `Orientation` = 6.
    fn tiff_without_exif_pointer() -> Vec<u8> {
        let mut tiff = b"II\x2a\x00\x08\x00\x00\x00".to_vec();
        tiff.extend([0x01, 0x00]);
        tiff.extend([0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00]);
        tiff.extend([0x00; 4]);
        tiff
    }

    #[test]
    fn set_dimensions_adds_missing_tags_to_exif_ifd() {
        let mut blocks = vec![exif_app1(tiff_without_pixel_tags())];
        assert_eq!(pixel_dimensions(&blocks), None);

        assert!(set_pixel_dimensions(&mut blocks, ImageKind::Jpeg, 750, 600));
        assert_eq!(blocks.len(), 1);
        assert_eq!(pixel_dimensions(&blocks), Some((750, 600)));

        // Existing entries survive the rebuild
        let tiff = Tiff::parse(blocks[0].exif().unwrap()).unwrap();
        let ifd = tiff.exif_ifd().unwrap();
        let version = tiff.find_entry(ifd, 0x9000).unwrap();
        assert_eq!(&tiff.data[version + 8..version + 12], b"0231");
    }

    #[test]
    fn set_dimensions_adds_exif_ifd_when_pointer_missing() {
        let mut blocks = vec![MetadataBlock::PngChunk {
            kind: *b"eXIf",
            data: tiff_without_exif_pointer(),
        }];

        assert!(set_pixel_dimensions(&mut blocks, ImageKind::Png, 70_000, 5));
        assert_eq!(pixel_dimensions(&blocks), Some((70_000, 5)));

        let tiff = Tiff::parse(blocks[0].exif().unwrap()).unwrap();
        let ifd0 = tiff.u32_at(4).unwrap() as usize;
        let orientation = tiff.find_entry(ifd0, 0x0112).unwrap();
        assert_eq!(tiff.entry_value(orientation), Some(6));
    }

    #[test]
    fn set_dimensions_creates_exif_block_for_jpeg() {
        let xmp = MetadataBlock::JpegSegment {
            marker: APP1,
            payload: b"http://ns.adobe.com/xap/1.0/\0<x:xmpmeta/>".to_vec(),
        };
        let mut blocks = vec![xmp.clone()];

        assert!(set_pixel_dimensions(&mut blocks, ImageKind::Jpeg, 640, 480));
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].exif().is_some());
        assert_eq!(blocks[1], xmp);
        assert_eq!(pixel_dimensions(&blocks), Some((640, 480)));
    }

    #[test]
    fn set_dimensions_creates_exif_chunk_for_png() {
        let mut blocks = Vec::new();

        assert!(set_pixel_dimensions(&mut blocks, ImageKind::Png, 12, 6));
        assert!(matches!(&blocks[..], [MetadataBlock::PngChunk { kind, .. }] if kind == b"eXIf"));
        assert_eq!(pixel_dimensions(&blocks), Some((12, 6)));

        // The new chunk embeds into a file the decoder still accepts
        let with_meta = embed_metadata(png_bytes(12, 6), ImageKind::Png, &blocks);
        assert_eq!(pixel_dimensions(&read_metadata(&with_meta, ImageKind::Png)), Some((12, 6)));
        assert!(image::load_from_memory(&with_meta).is_ok());
    }

    #[test]
    fn set_dimensions_without_container_adds_nothing() {
        let mut blocks = Vec::new();
        assert!(!set_pixel_dimensions(&mut blocks, ImageKind::Other, 1, 1));
        assert!(blocks.is_empty());
    }

    #[test]
    fn set_dimensions_on_garbage_is_noop() {
        let mut blocks = vec![exif_app1(b"not a tiff at all".to_vec())];
        assert!(!set_pixel_dimensions(&mut blocks, ImageKind::Jpeg, 1, 1));
        assert_eq!(pixel_dimensions(&blocks), None);
    }

    #[test]
    fn truncated_exif_ifd_is_noop() {
        let mut tiff = exif_tiff(1000, 800, false);
        tiff.truncate(30);
        let mut blocks = vec![exif_app1(tiff)];
        assert!(!set_pixel_dimensions(&mut blocks, ImageKind::Jpeg, 1, 1));
    }

    #[test]
    fn jpeg_embed_then_read_finds_segments() {
        let encoded = jpeg_bytes(16, 8);
        let blocks = vec![
            exif_app1(exif_tiff(16, 8, false)),
            MetadataBlock::JpegSegment {
                marker: APP13,
                payload: b"Photoshop 3.0\0".to_vec(),
            },
        ];

        let with_meta = embed_metadata(encoded, ImageKind::Jpeg, &blocks);
        assert_eq!(read_metadata(&with_meta, ImageKind::Jpeg), blocks);
        // Still a decodable JPEG
        let img = image::load_from_memory(&with_meta).unwrap();
        assert_eq!((img.width(), img.height()), (16, 8));
    }

    #[test]
    fn jpeg_embed_keeps_jfif_first() {
        let encoded = jpeg_bytes(8, 8);
        let had_app0 = encoded[3] == APP0;
        let with_meta = embed_metadata(
            encoded,
            ImageKind::Jpeg,
            &[exif_app1(exif_tiff(8, 8, false))],
        );
        if had_app0 {
            assert_eq!(with_meta[3], APP0);
        } else {
            assert_eq!(with_meta[3], APP1);
        }
    }

    #[test]
    fn jpeg_read_skips_jfif_and_stops_at_scan() {
        let blocks = read_metadata(&jpeg_bytes(8, 8), ImageKind::Jpeg);
        assert!(blocks.is_empty());
    }

    #[test]
    fn png_embed_then_read_finds_chunks() {
        let encoded = png_bytes(12, 6);
        let blocks = vec![
            MetadataBlock::PngChunk {
                kind: *b"eXIf",
                data: exif_tiff(12, 6, true),
            },
            MetadataBlock::PngChunk {
                kind: *b"tEXt",
                data: b"Author\0Someone".to_vec(),
            },
        ];

        let with_meta = embed_metadata(encoded, ImageKind::Png, &blocks);
        assert_eq!(read_metadata(&with_meta, ImageKind::Png), blocks);
        // CRCs must be valid for the decoder to accept the file
        let img = image::load_from_memory(&with_meta).unwrap();
        assert_eq!((img.width(), img.height()), (12, 6));
    }

    #[test]
    fn png_crc_matches_reference() {
        // CRC of an empty IEND chunk is fixed by the PNG spec
        assert_eq!(png_crc(b"IEND", &[]), 0xAE42_6082);
    }

    #[test]
    fn embed_into_wrong_format_is_unchanged() {
        let png = png_bytes(4, 4);
        let blocks = vec![exif_app1(exif_tiff(4, 4, false))];
        assert_eq!(embed_metadata(png.clone(), ImageKind::Jpeg, &blocks), png);
    }

    #[test]
    fn read_metadata_of_garbage_is_empty() {
        assert!(read_metadata(b"hello", ImageKind::Jpeg).is_empty());
        assert!(read_metadata(b"hello", ImageKind::Png).is_empty());
        assert!(read_metadata(b"hello", ImageKind::Other).is_empty());
    }
}
