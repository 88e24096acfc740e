//! Raw TIFF access for what `little_exif` does not carry across a rewrite:
//! the IFD1 thumbnail directory and the absolute position of the MakerNote.
//!
//! Maker notes such as Canon's address their own data with offsets counted
//! from the TIFF header, so the payload has to stay where the camera put it.

use std::collections::HashSet;
use std::ops::Range;

pub(crate) const TAG_EXIF_IFD: u16 = 0x8769;
pub(crate) const TAG_GPS_IFD: u16 = 0x8825;
pub(crate) const TAG_INTEROP_IFD: u16 = 0xA005;
pub(crate) const TAG_THUMBNAIL_OFFSET: u16 = 0x0201;
pub(crate) const TAG_THUMBNAIL_LENGTH: u16 = 0x0202;
const TAG_MAKER_NOTE: u16 = 0x927C;

const FORMAT_SHORT: u16 = 3;
const FORMAT_LONG: u16 = 4;

/// Byte width of one component of a TIFF field type.
pub(crate) fn format_size(format: u16) -> Option<usize> {
    match format {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 | 13 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

/// One directory entry with its value bytes in the block's byte order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawTag {
    pub tag: u16,
    pub format: u16,
    pub bytes: Vec<u8>,
}

/// IFD1: its tags minus the thumbnail pointer pair, and the JPEG thumbnail
/// that pair addresses.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ThumbnailDirectory {
    pub tags: Vec<RawTag>,
    pub image: Option<Vec<u8>>,
}

impl ThumbnailDirectory {
    pub(crate) fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.image.is_none()
    }
}

struct Entry {
    tag: u16,
    format: u16,
    /// Position of the 4-byte value or offset field.
    field: usize,
    value: Range<usize>,
}

impl Entry {
    fn is_out_of_line(&self) -> bool {
        self.value.start != self.field
    }
}

pub(crate) struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl<'a> Tiff<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Result<Self, String> {
        let big_endian = match data.get(..2) {
            Some(b"II") => false,
            Some(b"MM") => true,
            _ => return Err("invalid TIFF byte order".to_string()),
        };
        let tiff = Self { data, big_endian };
        if tiff.u16_at(2)? != 42 {
            return Err("invalid TIFF magic number".to_string());
        }
        Ok(tiff)
    }

    pub(crate) fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    fn slice(&self, range: Range<usize>) -> Result<&'a [u8], String> {
        self.data
            .get(range.clone())
            .ok_or_else(|| format!("bytes {}..{} out of bounds", range.start, range.end))
    }

    fn u16_at(&self, at: usize) -> Result<u16, String> {
        let b = self.slice(at..at + 2)?;
        Ok(if self.big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    }

    fn u32_at(&self, at: usize) -> Result<u32, String> {
        let b = self.slice(at..at + 4)?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(if self.big_endian { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) })
    }

    fn ifd0(&self) -> Result<usize, String> {
        Ok(self.u32_at(4)? as usize)
    }

    fn next_field(&self, ifd: usize) -> Result<usize, String> {
        Ok(ifd + 2 + usize::from(self.u16_at(ifd)?) * 12)
    }

    fn entries(&self, ifd: usize) -> Result<Vec<Entry>, String> {
        let count = usize::from(self.u16_at(ifd)?);
        (0..count)
            .map(|i| {
                let at = ifd + 2 + i * 12;
                let tag = self.u16_at(at)?;
                let format = self.u16_at(at + 2)?;
                let count = self.u32_at(at + 4)? as usize;
                let size = format_size(format)
                    .and_then(|size| size.checked_mul(count))
                    .ok_or_else(|| format!("tag 0x{tag:04x} has unknown format {format}"))?;
                let start = if size <= 4 { at + 8 } else { self.u32_at(at + 8)? as usize };
                Ok(Entry {
                    tag,
                    format,
                    field: at + 8,
                    value: start..start.saturating_add(size),
                })
            })
            .collect()
    }

    /// Single SHORT or LONG value: pointers and lengths.
    fn number(&self, entry: &Entry) -> Result<usize, String> {
        match entry.format {
            FORMAT_SHORT => Ok(usize::from(self.u16_at(entry.field)?)),
            FORMAT_LONG => Ok(self.u32_at(entry.field)? as usize),
            other => Err(format!("tag 0x{:04x} has format {other}, not a pointer", entry.tag)),
        }
    }

    /// The MakerNote entry's offset field and its out-of-line payload.
    fn maker_note(&self) -> Option<(usize, Range<usize>)> {
        let ifd0 = self.entries(self.ifd0().ok()?).ok()?;
        let pointer = ifd0.iter().find(|e| e.tag == TAG_EXIF_IFD)?;
        let exif = self.entries(self.number(pointer).ok()?).ok()?;
        let note = exif
            .into_iter()
            .find(|e| e.tag == TAG_MAKER_NOTE && e.is_out_of_line())?;
        (note.value.start >= 8 && note.value.end <= self.data.len()).then_some((note.field, note.value))
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16, big_endian: bool) {
    out.extend_from_slice(&if big_endian { value.to_be_bytes() } else { value.to_le_bytes() });
}

fn put_u32(out: &mut Vec<u8>, value: u32, big_endian: bool) {
    out.extend_from_slice(&if big_endian { value.to_be_bytes() } else { value.to_le_bytes() });
}

fn patch_u32(out: &mut [u8], at: usize, value: u32, big_endian: bool) -> Result<(), String> {
    let bytes = if big_endian { value.to_be_bytes() } else { value.to_le_bytes() };
    out.get_mut(at..at + 4)
        .ok_or_else(|| format!("offset field {at} out of bounds"))?
        .copy_from_slice(&bytes);
    Ok(())
}

fn offset_u32(offset: usize) -> Result<u32, String> {
    u32::try_from(offset).map_err(|_| "EXIF block exceeds 4 GiB".to_string())
}

/// Span of the MakerNote payload when it is stored out of line.
pub(crate) fn maker_note_span(data: &[u8]) -> Option<Range<usize>> {
    Tiff::new(data).ok()?.maker_note().map(|(_, span)| span)
}

/// Read IFD1, the directory chained after IFD0.
pub(crate) fn thumbnail_directory(data: &[u8]) -> Result<Option<ThumbnailDirectory>, String> {
    let tiff = Tiff::new(data)?;
    let ifd0 = tiff.ifd0()?;
    let ifd1 = tiff.u32_at(tiff.next_field(ifd0)?)? as usize;
    if ifd1 == 0 || ifd1 == ifd0 {
        return Ok(None);
    }

    let mut directory = ThumbnailDirectory::default();
    let (mut offset, mut length) = (None, None);
    for entry in tiff.entries(ifd1)? {
        match entry.tag {
            TAG_THUMBNAIL_OFFSET => offset = Some(tiff.number(&entry)?),
            TAG_THUMBNAIL_LENGTH => length = Some(tiff.number(&entry)?),
            _ => match tiff.slice(entry.value.clone()) {
                Ok(bytes) => directory.tags.push(RawTag {
                    tag: entry.tag,
                    format: entry.format,
                    bytes: bytes.to_vec(),
                }),
                Err(reason) => log::debug!("skipping thumbnail tag 0x{:04x}: {reason}", entry.tag),
            },
        }
    }
    if let (Some(offset), Some(length)) = (offset, length) {
        match tiff.slice(offset..offset.saturating_add(length)) {
            Ok(image) => directory.image = Some(image.to_vec()),
            Err(reason) => log::debug!("dropping thumbnail image: {reason}"),
        }
    }
    Ok(Some(directory))
}

/// Append `directory` as IFD1 of `block`, in the block's byte order. A block
/// that already chains an IFD1 is left alone.
pub(crate) fn append_thumbnail_directory(block: &mut Vec<u8>, directory: &ThumbnailDirectory) -> Result<(), String> {
    let (big_endian, next_field) = {
        let tiff = Tiff::new(block)?;
        let next_field = tiff.next_field(tiff.ifd0()?)?;
        if tiff.u32_at(next_field)? != 0 {
            log::debug!("EXIF block already has an IFD1");
            return Ok(());
        }
        (tiff.big_endian, next_field)
    };
    if block.len() % 2 == 1 {
        block.push(0);
    }

    let mut tags: Vec<(u16, u16, u32, Vec<u8>)> = Vec::with_capacity(directory.tags.len() + 2);
    for raw in &directory.tags {
        let size = format_size(raw.format).ok_or_else(|| format!("tag 0x{:04x} has unknown format", raw.tag))?;
        let count = offset_u32(raw.bytes.len() / size)?;
        tags.push((raw.tag, raw.format, count, raw.bytes.clone()));
    }
    let start = block.len();
    let table_len = 2 + 12 * (tags.len() + if directory.image.is_some() { 2 } else { 0 }) + 4;
    let values_len: usize = tags
        .iter()
        .filter(|(.., bytes)| bytes.len() > 4)
        .map(|(.., bytes)| bytes.len() + bytes.len() % 2)
        .sum();
    if let Some(image) = &directory.image {
        let image_at = offset_u32(start + table_len + values_len)?;
        let mut pointer = Vec::new();
        put_u32(&mut pointer, image_at, big_endian);
        tags.push((TAG_THUMBNAIL_OFFSET, FORMAT_LONG, 1, pointer));
        let mut length = Vec::new();
        put_u32(&mut length, offset_u32(image.len())?, big_endian);
        tags.push((TAG_THUMBNAIL_LENGTH, FORMAT_LONG, 1, length));
    }
    tags.sort_by_key(|(tag, ..)| *tag);

    let count = u16::try_from(tags.len()).map_err(|_| "too many thumbnail tags".to_string())?;
    let mut table = Vec::with_capacity(table_len);
    let mut values = Vec::with_capacity(values_len);
    put_u16(&mut table, count, big_endian);
    for (tag, format, count, bytes) in &tags {
        put_u16(&mut table, *tag, big_endian);
        put_u16(&mut table, *format, big_endian);
        put_u32(&mut table, *count, big_endian);
        if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(bytes);
            table.extend_from_slice(&inline);
        } else {
            put_u32(&mut table, offset_u32(start + table_len + values.len())?, big_endian);
            values.extend_from_slice(bytes);
            if bytes.len() % 2 == 1 {
                values.push(0);
            }
        }
    }
    put_u32(&mut table, 0, big_endian);

    block.extend_from_slice(&table);
    block.extend_from_slice(&values);
    if let Some(image) = &directory.image {
        block.extend_from_slice(image);
    }
    patch_u32(block, next_field, offset_u32(start)?, big_endian)
}

/// Shift every offset in `block` by `delta`, as if the block were moved
/// `delta` bytes further from its TIFF header.
fn relocate(block: &[u8], delta: usize) -> Result<Vec<u8>, String> {
    let tiff = Tiff::new(block)?;
    let delta = offset_u32(delta)?;
    let mut out = block.to_vec();
    let shift = |out: &mut Vec<u8>, at: usize| -> Result<(), String> {
        let moved = tiff
            .u32_at(at)?
            .checked_add(delta)
            .ok_or_else(|| "EXIF block exceeds 4 GiB".to_string())?;
        patch_u32(out, at, moved, tiff.big_endian)
    };

    shift(&mut out, 4)?;
    let mut pending = vec![tiff.ifd0()?];
    let mut visited = HashSet::new();
    while let Some(ifd) = pending.pop() {
        if ifd == 0 || !visited.insert(ifd) {
            continue;
        }
        for entry in tiff.entries(ifd)? {
            match entry.tag {
                TAG_EXIF_IFD | TAG_GPS_IFD | TAG_INTEROP_IFD | TAG_THUMBNAIL_OFFSET => {
                    if entry.format != FORMAT_LONG {
                        return Err(format!("pointer tag 0x{:04x} is not a LONG", entry.tag));
                    }
                    if entry.tag != TAG_THUMBNAIL_OFFSET {
                        pending.push(tiff.number(&entry)?);
                    }
                    shift(&mut out, entry.field)?;
                }
                _ if entry.is_out_of_line() => shift(&mut out, entry.field)?,
                _ => {}
            }
        }
        let next_field = tiff.next_field(ifd)?;
        let next = tiff.u32_at(next_field)? as usize;
        if next != 0 {
            pending.push(next);
            shift(&mut out, next_field)?;
        }
    }
    Ok(out)
}

/// Put the MakerNote of the rewritten `rebuilt` block back at the offset it
/// had in `original`.
///
/// The original bytes up to the end of the MakerNote are kept as they were
/// and the rewritten directories follow them. An edited or removed MakerNote
/// is left where the writer put it.
pub(crate) fn pin_maker_note(original: &[u8], rebuilt: Vec<u8>) -> Result<Vec<u8>, String> {
    let Some(span) = maker_note_span(original) else {
        return Ok(rebuilt);
    };
    let Some(moved) = maker_note_span(&rebuilt) else {
        return Ok(rebuilt);
    };
    if moved.start == span.start || rebuilt[moved] != original[span.clone()] {
        return Ok(rebuilt);
    }

    let base = span.end + span.end % 2;
    let relocated = relocate(&rebuilt, base - 8)?;
    let mut out = original[..span.end].to_vec();
    out.resize(base, 0);
    out[..8].copy_from_slice(&relocated[..8]);
    out.extend_from_slice(&relocated[8..]);

    let (field, big_endian) = {
        let tiff = Tiff::new(&out)?;
        let (field, _) = tiff
            .maker_note()
            .ok_or_else(|| "MakerNote lost while relocating".to_string())?;
        (field, tiff.big_endian)
    };
    patch_u32(&mut out, field, offset_u32(span.start)?, big_endian)?;
    log::debug!("MakerNote kept at offset {}", span.start);
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::testing::{field, link, tiff, u16s, u32s};
    use super::*;

    const NOTE: [u8; 32] = [0xAB; 32];

    /// IFD0 (Make, Exif pointer) → Exif IFD (MakerNote) in the given order.
    fn camera_block(big_endian: bool, make: &str) -> Vec<u8> {
        let mut make = make.as_bytes().to_vec();
        make.push(0);
        tiff(
            big_endian,
            &[
                vec![field(0x010F, 2, make), link(TAG_EXIF_IFD, 1)],
                vec![
                    field(0x829A, 5, u32s(big_endian, &[1, 250])),
                    field(TAG_MAKER_NOTE, 7, NOTE.to_vec()),
                ],
            ],
            None,
            &[],
        )
    }

    fn ascii_at(block: &[u8], tag: u16) -> Option<String> {
        let tiff = Tiff::new(block).ok()?;
        let entry = tiff.entries(tiff.ifd0().ok()?).ok()?.into_iter().find(|e| e.tag == tag)?;
        let bytes = tiff.slice(entry.value).ok()?;
        Some(String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string())
    }

    // ── reading ─────────────────────────────────────────────────────

    #[test]
    fn maker_note_span_in_both_byte_orders() {
        for big_endian in [false, true] {
            let block = camera_block(big_endian, "Canon");
            let span = maker_note_span(&block).unwrap();
            assert_eq!(&block[span], NOTE.as_slice());
        }
        assert_eq!(maker_note_span(b"II\x2a\x00\x08\x00\x00\x00\x00\x00"), None);
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(Tiff::new(b"II").is_err());
        assert!(Tiff::new(b"XX\x2a\x00\x08\x00\x00\x00").is_err());
        assert!(Tiff::new(b"II\x2b\x00\x08\x00\x00\x00").is_err());
        assert!(thumbnail_directory(b"II\x2a\x00\xff\x00\x00\x00").is_err());
    }

    #[test]
    fn thumbnail_directory_splits_pointer_pair() {
        let thumb = [0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9];
        let block = tiff(
            true,
            &[
                vec![field(0x010F, 2, b"Nikon\0".to_vec())],
                vec![
                    field(0x0103, 3, u16s(true, &[6])),
                    testing::Field {
                        tag: TAG_THUMBNAIL_OFFSET,
                        format: 4,
                        value: testing::FieldValue::Tail,
                    },
                    field(TAG_THUMBNAIL_LENGTH, 4, u32s(true, &[thumb.len() as u32])),
                ],
            ],
            Some(1),
            &thumb,
        );
        let directory = thumbnail_directory(&block).unwrap().unwrap();
        assert_eq!(directory.image.as_deref(), Some(thumb.as_slice()));
        assert_eq!(directory.tags, [RawTag {
            tag: 0x0103,
            format: 3,
            bytes: vec![0, 6]
        }]);
        assert_eq!(thumbnail_directory(&camera_block(false, "Canon")).unwrap(), None);
    }

    // ── writing ─────────────────────────────────────────────────────

    #[test]
    fn appended_thumbnail_directory_reads_back() {
        let directory = ThumbnailDirectory {
            tags: vec![RawTag {
                tag: 0x011A,
                format: 5,
                bytes: u32s(false, &[72, 1]),
            }],
            image: Some(vec![0xFF, 0xD8, 9, 0xFF, 0xD9]),
        };
        let mut block = camera_block(false, "Canon");
        append_thumbnail_directory(&mut block, &directory).unwrap();
        assert_eq!(thumbnail_directory(&block).unwrap(), Some(directory.clone()));

        // a second append keeps the first IFD1
        let len = block.len();
        append_thumbnail_directory(&mut block, &ThumbnailDirectory::default()).unwrap();
        assert_eq!(block.len(), len);
    }

    #[test]
    fn relocate_shifts_every_offset() {
        let block = camera_block(true, "Canon");
        let mut moved = vec![0u8; 8];
        let relocated = relocate(&block, 100).unwrap();
        moved.extend_from_slice(&[0; 100]);
        moved.extend_from_slice(&relocated[8..]);
        moved[..8].copy_from_slice(&relocated[..8]);

        assert_eq!(ascii_at(&moved, 0x010F).as_deref(), Some("Canon"));
        let span = maker_note_span(&moved).unwrap();
        assert_eq!(span.start, maker_note_span(&block).unwrap().start + 100);
        assert_eq!(&moved[span], NOTE.as_slice());
    }

    // ── MakerNote position ──────────────────────────────────────────

    #[test]
    fn maker_note_keeps_its_original_offset() {
        let original = camera_block(true, "Canon");
        let span = maker_note_span(&original).unwrap();
        // a longer Make pushes the rewritten MakerNote further out
        let rebuilt = camera_block(false, "Canon EOS 5D Mark IV");
        assert_ne!(maker_note_span(&rebuilt).unwrap().start, span.start);

        let pinned = pin_maker_note(&original, rebuilt).unwrap();
        assert_eq!(&pinned[..2], b"II");
        assert_eq!(maker_note_span(&pinned), Some(span.clone()));
        assert_eq!(&pinned[span], NOTE.as_slice());
        assert_eq!(ascii_at(&pinned, 0x010F).as_deref(), Some("Canon EOS 5D Mark IV"));
    }

    #[test]
    fn edited_or_unmoved_maker_note_is_left_alone() {
        let original = camera_block(false, "Canon");
        let same = pin_maker_note(&original, original.clone()).unwrap();
        assert_eq!(same, original);

        let without_note = tiff(false, &[vec![field(0x010F, 2, b"Canon EOS\0".to_vec())]], None, &[]);
        let rebuilt = pin_maker_note(&original, without_note.clone()).unwrap();
        assert_eq!(rebuilt, without_note);
    }
}
