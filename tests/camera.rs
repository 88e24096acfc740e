use std::fs;
use std::io::Cursor;
use std::path::Path;

use exif_editor::{EditorContext, MetadataImage, TagType};
use img_parts::jpeg::{Jpeg, JpegSegment, markers};
use img_parts::{Bytes, ImageEXIF};

// ── big-endian TIFF builder ─────────────────────────────────────────

enum Field {
    Bytes(Vec<u8>),
    /// Offset of another directory.
    Dir(usize),
    /// Offset of the trailing thumbnail bytes.
    Tail,
}

struct Entry {
    tag: u16,
    format: u16,
    count: u32,
    field: Field,
}

fn ascii(tag: u16, text: &str) -> Entry {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    Entry { tag, format: 2, count: bytes.len() as u32, field: Field::Bytes(bytes) }
}

fn short(tag: u16, value: u16) -> Entry {
    Entry { tag, format: 3, count: 1, field: Field::Bytes(value.to_be_bytes().to_vec()) }
}

fn long(tag: u16, value: u32) -> Entry {
    Entry { tag, format: 4, count: 1, field: Field::Bytes(value.to_be_bytes().to_vec()) }
}

fn rational(tag: u16, parts: &[(u32, u32)]) -> Entry {
    let bytes = parts
        .iter()
        .flat_map(|(n, d)| n.to_be_bytes().into_iter().chain(d.to_be_bytes()))
        .collect();
    Entry { tag, format: 5, count: parts.len() as u32, field: Field::Bytes(bytes) }
}

fn undefined(tag: u16, bytes: &[u8]) -> Entry {
    Entry { tag, format: 7, count: bytes.len() as u32, field: Field::Bytes(bytes.to_vec()) }
}

fn link(tag: u16, field: Field) -> Entry {
    Entry { tag, format: 4, count: 1, field }
}

fn out_of_line(entry: &Entry) -> usize {
    match &entry.field {
        Field::Bytes(bytes) if bytes.len() > 4 => bytes.len() + bytes.len() % 2,
        _ => 0,
    }
}

/// Directories laid out back to back after the header, each followed by
/// its out-of-line values; IFD0 chains to `next`.
fn tiff(dirs: &[Vec<Entry>], next: usize, tail: &[u8]) -> Vec<u8> {
    let mut offsets = Vec::new();
    let mut at = 8;
    for dir in dirs {
        offsets.push(at);
        at += 2 + 12 * dir.len() + 4 + dir.iter().map(out_of_line).sum::<usize>();
    }
    let tail_at = at;

    let mut out = b"MM\0\x2a\0\0\0\x08".to_vec();
    for (index, dir) in dirs.iter().enumerate() {
        let mut data_at = offsets[index] + 2 + 12 * dir.len() + 4;
        let mut data = Vec::new();
        out.extend_from_slice(&(dir.len() as u16).to_be_bytes());
        for entry in dir {
            out.extend_from_slice(&entry.tag.to_be_bytes());
            out.extend_from_slice(&entry.format.to_be_bytes());
            out.extend_from_slice(&entry.count.to_be_bytes());
            match &entry.field {
                Field::Bytes(bytes) if bytes.len() > 4 => {
                    out.extend_from_slice(&(data_at as u32).to_be_bytes());
                    data.extend_from_slice(bytes);
                    if bytes.len() % 2 == 1 {
                        data.push(0);
                    }
                    data_at += out_of_line(entry);
                }
                Field::Bytes(bytes) => {
                    let mut inline = bytes.clone();
                    inline.resize(4, 0);
                    out.extend_from_slice(&inline);
                }
                Field::Dir(target) => out.extend_from_slice(&(offsets[*target] as u32).to_be_bytes()),
                Field::Tail => out.extend_from_slice(&(tail_at as u32).to_be_bytes()),
            }
        }
        let chained = if index == 0 { offsets[next] } else { 0 };
        out.extend_from_slice(&(chained as u32).to_be_bytes());
        out.extend_from_slice(&data);
    }
    out.extend_from_slice(tail);
    out
}

// ── TIFF reader for assertions ──────────────────────────────────────

struct Reader<'a> {
    data: &'a [u8],
    big: bool,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, big: data.starts_with(b"MM") }
    }

    fn u16_at(&self, at: usize) -> u16 {
        let bytes = [self.data[at], self.data[at + 1]];
        if self.big { u16::from_be_bytes(bytes) } else { u16::from_le_bytes(bytes) }
    }

    fn u32_at(&self, at: usize) -> u32 {
        let bytes = [self.data[at], self.data[at + 1], self.data[at + 2], self.data[at + 3]];
        if self.big { u32::from_be_bytes(bytes) } else { u32::from_le_bytes(bytes) }
    }

    /// Position of the entry for `tag` in the directory at `ifd`.
    fn entry(&self, ifd: usize, tag: u16) -> Option<usize> {
        let count = self.u16_at(ifd) as usize;
        (0..count)
            .map(|i| ifd + 2 + 12 * i)
            .find(|&at| self.u16_at(at) == tag)
    }

    fn ifd0(&self) -> usize {
        self.u32_at(4) as usize
    }

    fn exif_ifd(&self) -> usize {
        let at = self.entry(self.ifd0(), 0x8769).unwrap();
        self.u32_at(at + 8) as usize
    }

    /// (offset, bytes) of the MakerNote payload.
    fn maker_note(&self) -> (usize, Vec<u8>) {
        let at = self.entry(self.exif_ifd(), 0x927C).unwrap();
        let count = self.u32_at(at + 4) as usize;
        let offset = self.u32_at(at + 8) as usize;
        (offset, self.data[offset..offset + count].to_vec())
    }

    fn thumbnail(&self) -> Vec<u8> {
        let ifd0 = self.ifd0();
        let ifd1 = self.u32_at(ifd0 + 2 + 12 * self.u16_at(ifd0) as usize) as usize;
        let start = self.u32_at(self.entry(ifd1, 0x0201).unwrap() + 8) as usize;
        let length = self.u32_at(self.entry(ifd1, 0x0202).unwrap() + 8) as usize;
        self.data[start..start + length].to_vec()
    }
}

// ── camera-style fixture ────────────────────────────────────────────

const MAKER_NOTE: [u8; 32] = [0xAB; 32];
const THUMBNAIL: &[u8] = b"\xff\xd8\xff\xdbthumbnail\xff\xd9";
const LAYER_STATE: &[u8] = b"8BIM\x04\x00\x00\x00\x00\x00\x00\x02\x00\x01";
const RESOLUTION_INFO: &[u8] = b"8BIM\x03\xed\x00\x00\x00\x00\x00\x04\x00\x48\x00\x01";

fn camera_tiff() -> Vec<u8> {
    let ifd0 = vec![
        ascii(0x010F, "Canon"),
        ascii(0x0110, "Canon EOS 5D"),
        short(0x0112, 6),
        link(0x8769, Field::Dir(1)),
        link(0x8825, Field::Dir(2)),
    ];
    let exif = vec![
        rational(0x829A, &[(1, 250)]),
        rational(0x829D, &[(28, 10)]),
        ascii(0x9003, "2021:06:01 12:30:00"),
        undefined(0x927C, &MAKER_NOTE),
        undefined(0x9286, b"ASCII\0\0\0sunset"),
    ];
    let gps = vec![
        ascii(0x0001, "N"),
        rational(0x0002, &[(48, 1), (51, 1), (2400, 100)]),
    ];
    let ifd1 = vec![
        short(0x0103, 6),
        link(0x0201, Field::Tail),
        long(0x0202, THUMBNAIL.len() as u32),
    ];
    tiff(&[ifd0, exif, gps, ifd1], 3, THUMBNAIL)
}

fn photoshop_block() -> Vec<u8> {
    let iptc = b"\x1c\x02\x00\x00\x02\x00\x04\x1c\x02\x19\x00\x03sea\x1c\x02\x78\x00\x04Surf";
    let mut block = b"Photoshop 3.0\0".to_vec();
    block.extend_from_slice(RESOLUTION_INFO);
    block.extend_from_slice(b"8BIM\x04\x04\x00\x00");
    block.extend_from_slice(&(iptc.len() as u32).to_be_bytes());
    block.extend_from_slice(iptc);
    if iptc.len() % 2 == 1 {
        block.push(0);
    }
    block.extend_from_slice(LAYER_STATE);
    block
}

fn camera_jpeg() -> Vec<u8> {
    let mut encoded = Vec::new();
    image::RgbImage::new(8, 8)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
        .unwrap();
    let mut jpeg = Jpeg::from_bytes(Bytes::from(encoded)).unwrap();
    jpeg.set_exif(Some(Bytes::from(camera_tiff())));
    let at = jpeg
        .segments()
        .iter()
        .position(|segment| segment.marker() == markers::APP1)
        .map_or(0, |index| index + 1);
    let app13 = JpegSegment::new_with_contents(markers::APP13, Bytes::from(photoshop_block()));
    jpeg.segments_mut().insert(at, app13);
    jpeg.encoder().bytes().to_vec()
}

fn sections(path: &Path) -> (Vec<u8>, Vec<u8>) {
    let jpeg = Jpeg::from_bytes(Bytes::from(fs::read(path).unwrap())).unwrap();
    let tiff = jpeg.exif().unwrap().to_vec();
    let app13 = jpeg.segment_by_marker(markers::APP13).unwrap().contents().to_vec();
    (tiff, app13)
}

fn snapshot(image: &MetadataImage, skip: &str) -> Vec<(String, Option<TagType>, String)> {
    image
        .tags()
        .into_iter()
        .filter(|key| key != skip)
        .map(|key| {
            let tag_type = image.tag_type(&key);
            let raw = image.get_value(&key).map(|value| value.raw).unwrap_or_default();
            (key, tag_type, raw)
        })
        .collect()
}

fn reopen(path: &Path) -> MetadataImage {
    MetadataImage::open(path, EditorContext::default()).unwrap()
}

// ── single edit on a camera file ────────────────────────────────────

#[test]
fn fixture_reads_every_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("camera.jpg");
    fs::write(&path, camera_jpeg()).unwrap();

    let image = reopen(&path);
    assert_eq!(image.get_value("Exif.Image.Model").unwrap().raw, "Canon EOS 5D");
    assert_eq!(image.get_value("Exif.Image.Orientation").unwrap().raw, "6");
    assert_eq!(image.get_value("Exif.Photo.DateTimeOriginal").unwrap().raw, "2021:06:01 12:30:00");
    assert_eq!(image.tag_type("Exif.GPSInfo.GPSLatitude"), Some(TagType::Rational));
    assert_eq!(image.get_value("Exif.Thumbnail.Compression").unwrap().raw, "6");
    assert_eq!(image.get_value("Iptc.Application2.Keywords").unwrap().raw, "sea");
    assert!(image.tags().iter().all(|key| !key.ends_with("ExifOffset")));
}

#[test]
fn one_edit_leaves_everything_else_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("camera.jpg");
    fs::write(&path, camera_jpeg()).unwrap();
    let (tiff_before, app13_before) = sections(&path);

    let mut image = reopen(&path);
    let before = snapshot(&image, "Exif.Image.Artist");
    assert!(before.len() >= 12);
    image.set_value("Exif.Image.Artist", "Anna").unwrap();
    image.save().unwrap();

    let image = reopen(&path);
    assert_eq!(image.artist().as_deref(), Some("Anna"));
    assert_eq!(snapshot(&image, "Exif.Image.Artist"), before);

    let (tiff_after, app13_after) = sections(&path);
    assert_eq!(app13_after, app13_before);
    let (reader_before, reader_after) = (Reader::new(&tiff_before), Reader::new(&tiff_after));
    assert_eq!(reader_after.maker_note(), reader_before.maker_note());
    assert_eq!(reader_after.maker_note().1, MAKER_NOTE);
    assert_eq!(reader_after.thumbnail(), THUMBNAIL);
}

#[test]
fn maker_note_stays_put_across_repeated_saves() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("camera.jpg");
    fs::write(&path, camera_jpeg()).unwrap();
    let (tiff, _) = sections(&path);
    let expected = Reader::new(&tiff).maker_note();

    for artist in ["Anna", "Ben", "A much longer artist name than before"] {
        let mut image = reopen(&path);
        image.set_value("Exif.Image.Artist", artist).unwrap();
        image.set_value("Exif.Image.ImageDescription", artist).unwrap();
        image.save().unwrap();
        let (tiff, _) = sections(&path);
        assert_eq!(Reader::new(&tiff).maker_note(), expected);
    }
}
