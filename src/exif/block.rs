//! The EXIF block of a container, held as `little_exif` tags.
//!
//! `little_exif` decodes and re-encodes IFD0 with its Exif, GPS and
//! Interoperability sub-IFDs. The IFD1 thumbnail directory and the position
//! of the MakerNote are carried across a rewrite by [`layout`].

use std::panic::{self, AssertUnwindSafe};

use little_exif::endian::Endian;
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;

use super::layout::{self, RawTag, ThumbnailDirectory, Tiff};
use crate::codec::{TagType, Value};
use crate::registry::exif::{self as tags, Ifd};

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
const JPEG_EXIF_OVERHEAD: usize = 10;

const UNICODE_CODE: &[u8; 8] = b"UNICODE\0";

/// Directory links and thumbnail pointers; rebuilt on every write.
const POINTER_TAGS: [u16; 5] = [
    layout::TAG_EXIF_IFD,
    layout::TAG_GPS_IFD,
    layout::TAG_INTEROP_IFD,
    layout::TAG_THUMBNAIL_OFFSET,
    layout::TAG_THUMBNAIL_LENGTH,
];

/// Run a `little_exif` call with panics turned into errors.
fn quietly<T>(call: impl FnOnce() -> T) -> Result<T, String> {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let result = panic::catch_unwind(AssertUnwindSafe(call));
    panic::set_hook(previous);
    result.map_err(|_| "EXIF library panicked".to_string())
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ExifBlock {
    tags: Vec<ExifTag>,
    /// IFD1 tags, minus the thumbnail pointer pair.
    thumbnail_tags: Vec<ExifTag>,
    thumbnail: Option<Vec<u8>>,
    /// The block as read, so an untouched MakerNote can stay in place.
    original: Option<Vec<u8>>,
}

impl ExifBlock {
    pub(crate) fn parse(data: &[u8]) -> Result<Self, String> {
        let source = if Tiff::new(data)?.is_big_endian() { Endian::Big } else { Endian::Little };

        // APP1 length covers itself and the `Exif\0\0` header
        let segment_len = u16::try_from(data.len() + 8)
            .map_err(|_| format!("EXIF block of {} bytes does not fit one segment", data.len()))?;
        let mut jpeg = Vec::with_capacity(data.len() + 14);
        jpeg.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE1]);
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(data);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        let metadata = quietly(|| Metadata::new_from_vec(&jpeg, FileExtension::JPEG))?.map_err(|e| e.to_string())?;
        log::debug!("little_exif read {} EXIF tags", metadata.data().len());

        let mut block = Self {
            original: Some(data.to_vec()),
            ..Self::default()
        };
        for tag in metadata.data() {
            if POINTER_TAGS.contains(&tag.as_u16()) {
                continue;
            }
            block.tags.push(match source {
                Endian::Big => little_endian_comment(tag),
                _ => tag.clone(),
            });
        }

        match layout::thumbnail_directory(data) {
            Ok(Some(directory)) => {
                for raw in &directory.tags {
                    match thumbnail_tag(raw, &source) {
                        Ok(tag) => block.thumbnail_tags.push(tag),
                        Err(reason) => log::debug!("skipping thumbnail tag 0x{:04x}: {reason}", raw.tag),
                    }
                }
                block.thumbnail = directory.image;
            }
            Ok(None) => {}
            Err(reason) => log::debug!("skipping thumbnail IFD: {reason}"),
        }
        Ok(block)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (Ifd, &ExifTag)> + '_ {
        let main = self
            .tags
            .iter()
            .filter_map(|tag| Ifd::of(&tag.get_group()).map(|ifd| (ifd, tag)));
        main.chain(self.thumbnail_tags.iter().map(|tag| (Ifd::Thumbnail, tag)))
    }

    fn find(&self, ifd: Ifd, id: u16) -> Option<&ExifTag> {
        self.entries()
            .find(|(at, tag)| *at == ifd && tag.as_u16() == id)
            .map(|(_, tag)| tag)
    }

    /// Stored type and value of a tag.
    pub(crate) fn get(&self, ifd: Ifd, id: u16) -> Option<(TagType, Value)> {
        let tag = self.find(ifd, id)?;
        let tag_type = tags::stored_type(ifd, tag);
        Some((tag_type, decode_value(tag_type, &tag.value_as_u8_vec(&Endian::Little))))
    }

    pub(crate) fn set(&mut self, ifd: Ifd, id: u16, tag_type: TagType, value: &Value) -> Result<(), String> {
        let format = tags::format_for(tag_type).ok_or_else(|| format!("{tag_type} is not an EXIF type"))?;
        let bytes = encode_value(tag_type, value)?;
        let group = ifd.tag_group();
        let tag = quietly(|| ExifTag::from_u16_with_data(id, &format, &bytes, &Endian::Little, &group))??;

        let list = match ifd {
            Ifd::Thumbnail => &mut self.thumbnail_tags,
            _ => &mut self.tags,
        };
        let same = |existing: &ExifTag| existing.as_u16() == id && (ifd == Ifd::Thumbnail || Ifd::of(&existing.get_group()) == Some(ifd));
        match list.iter_mut().find(|existing| same(existing)) {
            Some(existing) => *existing = tag,
            None => list.push(tag),
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, ifd: Ifd, id: u16) -> bool {
        let before = self.tags.len() + self.thumbnail_tags.len();
        match ifd {
            Ifd::Thumbnail => self.thumbnail_tags.retain(|tag| tag.as_u16() != id),
            _ => self
                .tags
                .retain(|tag| tag.as_u16() != id || Ifd::of(&tag.get_group()) != Some(ifd)),
        }
        before != self.tags.len() + self.thumbnail_tags.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.thumbnail_tags.is_empty() && self.thumbnail.is_none()
    }

    /// Encode the block with `little_exif`, then put back what it does not
    /// write itself: the MakerNote offset and IFD1.
    pub(crate) fn serialize(&self) -> Result<Vec<u8>, String> {
        let mut metadata = Metadata::new();
        for tag in &self.tags {
            metadata.set_tag(tag.clone());
        }
        let encoded = quietly(|| metadata.as_u8_vec(FileExtension::JPEG))?;
        let mut block = encoded
            .get(JPEG_EXIF_OVERHEAD..)
            .filter(|tiff| !tiff.is_empty())
            .ok_or_else(|| "EXIF encoder returned no data".to_string())?
            .to_vec();

        if let Some(original) = &self.original {
            block = layout::pin_maker_note(original, block)?;
        }

        let endian = if Tiff::new(&block)?.is_big_endian() { Endian::Big } else { Endian::Little };
        let directory = ThumbnailDirectory {
            tags: self
                .thumbnail_tags
                .iter()
                .map(|tag| RawTag {
                    tag: tag.as_u16(),
                    format: tags::format_code(&tag.format()),
                    bytes: tag.value_as_u8_vec(&endian),
                })
                .collect(),
            image: self.thumbnail.clone(),
        };
        if !directory.is_empty() {
            layout::append_thumbnail_directory(&mut block, &directory)?;
        }
        Ok(block)
    }
}

fn thumbnail_tag(raw: &RawTag, endian: &Endian) -> Result<ExifTag, String> {
    let format = tags::format_of(raw.format).ok_or_else(|| format!("unknown format {}", raw.format))?;
    quietly(|| ExifTag::from_u16_with_data(raw.tag, &format, &raw.bytes, endian, &ExifTagGroup::IFD0))?
}

/// A UTF-16 comment read from a big-endian block, with its body turned
/// little-endian to match the blocks this crate writes.
fn little_endian_comment(tag: &ExifTag) -> ExifTag {
    let Some(ifd) = Ifd::of(&tag.get_group()) else {
        return tag.clone();
    };
    if tags::stored_type(ifd, tag) != TagType::Comment {
        return tag.clone();
    }
    let mut bytes = tag.value_as_u8_vec(&Endian::Little);
    if !bytes.starts_with(UNICODE_CODE) {
        return tag.clone();
    }
    swap_pairs(&mut bytes[UNICODE_CODE.len()..]);
    quietly(|| ExifTag::from_u16_with_data(tag.as_u16(), &tag.format(), &bytes, &Endian::Little, &tag.get_group()))
        .ok()
        .and_then(Result::ok)
        .unwrap_or_else(|| tag.clone())
}

fn swap_pairs(bytes: &mut [u8]) {
    for pair in bytes.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

// ── value conversion ────────────────────────────────────────────────

/// Decode little-endian value bytes as `tag_type`.
fn decode_value(tag_type: TagType, data: &[u8]) -> Value {
    let u16s = || data.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
    let u32s = || data.chunks_exact(4).map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
    let pairs = || {
        data.chunks_exact(8).map(|c| {
            (
                u32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                u32::from_le_bytes([c[4], c[5], c[6], c[7]]),
            )
        })
    };
    match tag_type {
        TagType::Ascii => {
            let end = data.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
            Value::Text(data[..end].to_vec())
        }
        TagType::Short => Value::Unsigned(u16s().map(u32::from).collect()),
        TagType::Long => Value::Unsigned(u32s().collect()),
        TagType::Rational => Value::Rational(pairs().collect()),
        TagType::SByte => Value::Signed(data.iter().map(|&b| i32::from(b as i8)).collect()),
        TagType::SShort => Value::Signed(u16s().map(|v| i32::from(v as i16)).collect()),
        TagType::SLong => Value::Signed(u32s().map(|v| v as i32).collect()),
        TagType::SRational => Value::SRational(pairs().map(|(n, d)| (n as i32, d as i32)).collect()),
        TagType::Float => Value::Float(u32s().map(|v| f64::from(f32::from_bits(v))).collect()),
        TagType::Double => Value::Float(
            data.chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        _ => Value::Bytes(data.to_vec()),
    }
}

/// Little-endian value bytes for `value`; ASCII gains its NUL terminator.
fn encode_value(tag_type: TagType, value: &Value) -> Result<Vec<u8>, String> {
    let mismatch = || format!("value does not match type {tag_type}");
    Ok(match (tag_type, value) {
        (TagType::Ascii, Value::Text(text)) => {
            let mut data = text.clone();
            data.push(0);
            data
        }
        (TagType::Byte | TagType::Undefined | TagType::Comment, Value::Bytes(bytes)) => bytes.clone(),
        (TagType::Short, Value::Unsigned(values)) => values
            .iter()
            .map(|&v| u16::try_from(v).map(u16::to_le_bytes).map_err(|_| mismatch()))
            .collect::<Result<Vec<_>, _>>()?
            .concat(),
        (TagType::Long, Value::Unsigned(values)) => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        (TagType::Rational, Value::Rational(values)) => values
            .iter()
            .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
            .collect(),
        (TagType::SByte, Value::Signed(values)) => values
            .iter()
            .map(|&v| i8::try_from(v).map(|v| v as u8).map_err(|_| mismatch()))
            .collect::<Result<_, _>>()?,
        (TagType::SShort, Value::Signed(values)) => values
            .iter()
            .map(|&v| i16::try_from(v).map(i16::to_le_bytes).map_err(|_| mismatch()))
            .collect::<Result<Vec<_>, _>>()?
            .concat(),
        (TagType::SLong, Value::Signed(values)) => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        (TagType::SRational, Value::SRational(values)) => values
            .iter()
            .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
            .collect(),
        (TagType::Float, Value::Float(values)) => values.iter().flat_map(|&v| (v as f32).to_le_bytes()).collect(),
        (TagType::Double, Value::Float(values)) => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        _ => return Err(mismatch()),
    })
}

#[cfg(test)]
mod tests {
    use super::layout::testing::{field, link, tiff, u16s, u32s};
    use super::*;

    fn ascii(text: &str) -> Value {
        Value::Text(text.as_bytes().to_vec())
    }

    fn sample() -> ExifBlock {
        let mut block = ExifBlock::default();
        block.set(Ifd::Image, 0x013B, TagType::Ascii, &ascii("Anna")).unwrap();
        block.set(Ifd::Image, 0x0112, TagType::Short, &Value::Unsigned(vec![6])).unwrap();
        block.set(Ifd::Photo, 0x829D, TagType::Rational, &Value::Rational(vec![(28, 10)])).unwrap();
        block.set(Ifd::GpsInfo, 0x0000, TagType::Byte, &Value::Bytes(vec![2, 2, 0, 0])).unwrap();
        block
    }

    fn sorted(block: &ExifBlock) -> Vec<(Ifd, u16, Option<(TagType, Value)>)> {
        let mut entries: Vec<_> = block
            .entries()
            .map(|(ifd, tag)| (ifd, tag.as_u16(), block.get(ifd, tag.as_u16())))
            .collect();
        entries.sort_by_key(|(ifd, id, _)| (*ifd, *id));
        entries
    }

    // ── round trip ──────────────────────────────────────────────────

    #[test]
    fn serialize_then_parse_keeps_every_ifd() {
        let block = sample();
        let bytes = block.serialize().unwrap();
        let parsed = ExifBlock::parse(&bytes).unwrap();
        assert_eq!(sorted(&parsed), sorted(&block));
        assert_eq!(
            parsed.get(Ifd::Photo, 0x829D),
            Some((TagType::Rational, Value::Rational(vec![(28, 10)])))
        );
    }

    #[test]
    fn pointer_tags_are_hidden() {
        let parsed = ExifBlock::parse(&sample().serialize().unwrap()).unwrap();
        assert!(parsed.entries().all(|(_, tag)| !POINTER_TAGS.contains(&tag.as_u16())));
    }

    #[test]
    fn unknown_ids_keep_their_type() {
        let mut block = ExifBlock::default();
        block.set(Ifd::Image, 0x9999, TagType::Ascii, &ascii("hello")).unwrap();
        block.set(Ifd::Photo, 0x9998, TagType::SRational, &Value::SRational(vec![(-1, 3)])).unwrap();
        let parsed = ExifBlock::parse(&block.serialize().unwrap()).unwrap();
        assert_eq!(parsed.get(Ifd::Image, 0x9999), Some((TagType::Ascii, ascii("hello"))));
        assert_eq!(
            parsed.get(Ifd::Photo, 0x9998),
            Some((TagType::SRational, Value::SRational(vec![(-1, 3)])))
        );
    }

    #[test]
    fn removing_last_tag_empties_block() {
        let mut block = ExifBlock::default();
        block.set(Ifd::Image, 0x013B, TagType::Ascii, &ascii("Anna")).unwrap();
        assert!(block.remove(Ifd::Image, 0x013B));
        assert!(!block.remove(Ifd::Image, 0x013B));
        assert!(block.is_empty());
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let mut block = ExifBlock::default();
        assert!(block.set(Ifd::Image, 0x0112, TagType::Short, &Value::Unsigned(vec![70_000])).is_err());
        assert!(block.set(Ifd::Image, 0x0112, TagType::Short, &ascii("6")).is_err());
        assert!(block.is_empty());
    }

    // ── camera blocks ───────────────────────────────────────────────

    fn big_endian_camera() -> Vec<u8> {
        let mut comment = UNICODE_CODE.to_vec();
        comment.extend_from_slice(&[0x00, b'h', 0x00, b'i']);
        tiff(
            true,
            &[
                vec![
                    field(0x010F, 2, b"Canon\0".to_vec()),
                    field(0x0112, 3, u16s(true, &[6])),
                    link(layout::TAG_EXIF_IFD, 1),
                ],
                vec![
                    field(0x829A, 5, u32s(true, &[1, 250])),
                    field(0x927C, 7, vec![0xAB; 32]),
                    field(0x9286, 7, comment),
                ],
                vec![
                    field(0x0103, 3, u16s(true, &[6])),
                    testing_tail(),
                    field(layout::TAG_THUMBNAIL_LENGTH, 4, u32s(true, &[4])),
                ],
            ],
            Some(2),
            &[0xFF, 0xD8, 0xFF, 0xD9],
        )
    }

    fn testing_tail() -> layout::testing::Field {
        layout::testing::Field {
            tag: layout::TAG_THUMBNAIL_OFFSET,
            format: 4,
            value: layout::testing::FieldValue::Tail,
        }
    }

    #[test]
    fn big_endian_block_reads_and_rewrites() {
        let original = big_endian_camera();
        let mut block = ExifBlock::parse(&original).unwrap();
        assert_eq!(block.get(Ifd::Image, 0x0112), Some((TagType::Short, Value::Unsigned(vec![6]))));
        assert_eq!(
            block.get(Ifd::Photo, 0x829A),
            Some((TagType::Rational, Value::Rational(vec![(1, 250)])))
        );
        let mut comment = UNICODE_CODE.to_vec();
        comment.extend_from_slice(&[b'h', 0x00, b'i', 0x00]);
        assert_eq!(block.get(Ifd::Photo, 0x9286), Some((TagType::Comment, Value::Bytes(comment))));
        assert_eq!(
            block.get(Ifd::Thumbnail, 0x0103),
            Some((TagType::Short, Value::Unsigned(vec![6])))
        );

        block.set(Ifd::Image, 0x013B, TagType::Ascii, &ascii("Anna Smith")).unwrap();
        let rewritten = block.serialize().unwrap();
        let reparsed = ExifBlock::parse(&rewritten).unwrap();
        let mut expected = sorted(&block);
        expected.retain(|(ifd, ..)| *ifd != Ifd::Thumbnail);
        let mut actual = sorted(&reparsed);
        actual.retain(|(ifd, ..)| *ifd != Ifd::Thumbnail);
        assert_eq!(actual, expected);
        assert_eq!(reparsed.thumbnail, Some(vec![0xFF, 0xD8, 0xFF, 0xD9]));
        assert_eq!(
            reparsed.get(Ifd::Thumbnail, 0x0103),
            Some((TagType::Short, Value::Unsigned(vec![6])))
        );
        assert_eq!(layout::maker_note_span(&rewritten), layout::maker_note_span(&original));
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(ExifBlock::parse(b"II").is_err());
        assert!(ExifBlock::parse(b"XX\x2a\x00\x08\x00\x00\x00").is_err());
    }
}
