//! Image file formats that carry metadata sections, and the splicing of
//! those sections in and out of the file with img-parts.

use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};

use crate::key::Family;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const PHOTOSHOP_HEADER: &[u8] = super::iptc::PHOTOSHOP_HEADER;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP13: u8 = 0xED;
/// Largest JPEG segment payload (the 16-bit length covers itself).
const MAX_SEGMENT_CONTENTS: usize = 0xFFFF - 2;

const PNG_ITXT: [u8; 4] = *b"iTXt";
const PNG_IEND: [u8; 4] = *b"IEND";
const PNG_XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    /// Recognise a format by its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
        }
    }

    /// Whether files of this format can hold tags of `family`.
    pub fn supports(self, family: Family) -> bool {
        match self {
            Self::Jpeg => true,
            Self::Png => family != Family::Iptc,
            Self::WebP => family == Family::Exif,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata sections as stored in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Sections {
    /// TIFF structure, without any `Exif\0\0` prefix.
    pub exif: Option<Vec<u8>>,
    /// Whole Photoshop resource block (APP13 payload).
    pub iptc: Option<Vec<u8>>,
    /// XMP packet text.
    pub xmp: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum Update {
    #[default]
    Keep,
    Remove,
    Replace(Vec<u8>),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SectionUpdates {
    pub exif: Update,
    pub iptc: Update,
    pub xmp: Update,
}

pub(crate) fn extract(format: ImageFormat, bytes: &[u8]) -> Result<Sections, String> {
    let bytes = Bytes::copy_from_slice(bytes);
    match format {
        ImageFormat::Jpeg => {
            let jpeg = Jpeg::from_bytes(bytes).map_err(|e| format!("failed to parse JPEG: {e}"))?;
            let segment = |marker: u8, header: &[u8]| {
                jpeg.segments()
                    .iter()
                    .find(|s| s.marker() == marker && s.contents().starts_with(header))
                    .map(|s| s.contents()[header.len()..].to_vec())
            };
            Ok(Sections {
                exif: segment(APP1, EXIF_HEADER),
                iptc: jpeg
                    .segments()
                    .iter()
                    .find(|s| s.marker() == APP13 && s.contents().starts_with(PHOTOSHOP_HEADER))
                    .map(|s| s.contents().to_vec()),
                xmp: segment(APP1, XMP_HEADER),
            })
        }
        ImageFormat::Png => {
            let png = Png::from_bytes(bytes).map_err(|e| format!("failed to parse PNG: {e}"))?;
            let xmp = png
                .chunks()
                .iter()
                .filter(|c| c.kind() == PNG_ITXT)
                .find_map(|c| xmp_from_itxt(c.contents()))
                .transpose()?;
            Ok(Sections {
                exif: png.exif().map(|b| strip_exif_header(&b).to_vec()),
                iptc: None,
                xmp,
            })
        }
        ImageFormat::WebP => {
            let webp = WebP::from_bytes(bytes).map_err(|e| format!("failed to parse WebP: {e}"))?;
            Ok(Sections {
                exif: webp.exif().map(|b| strip_exif_header(&b).to_vec()),
                ..Sections::default()
            })
        }
    }
}

/// Apply `updates` to the file `bytes`, keeping everything else intact.
pub(crate) fn rewrite(format: ImageFormat, bytes: Vec<u8>, updates: &SectionUpdates) -> Result<Vec<u8>, String> {
    let bytes = Bytes::from(bytes);
    match format {
        ImageFormat::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(bytes).map_err(|e| format!("failed to parse JPEG: {e}"))?;
            let segments = jpeg.segments_mut();
            update_segment(segments, APP1, EXIF_HEADER, &updates.exif, None)?;
            let after_exif = find_segment(segments, APP1, EXIF_HEADER).map(|p| p + 1);
            update_segment(segments, APP1, XMP_HEADER, &updates.xmp, after_exif)?;
            update_segment(segments, APP13, PHOTOSHOP_HEADER, &updates.iptc, None)?;
            Ok(jpeg.encoder().bytes().to_vec())
        }
        ImageFormat::Png => {
            let mut png = Png::from_bytes(bytes).map_err(|e| format!("failed to parse PNG: {e}"))?;
            match &updates.exif {
                Update::Keep => {}
                Update::Remove => png.set_exif(None),
                Update::Replace(tiff) => png.set_exif(Some(Bytes::from(tiff.clone()))),
            }
            if updates.xmp != Update::Keep {
                let chunks = png.chunks_mut();
                let existing = chunks
                    .iter()
                    .position(|c| c.kind() == PNG_ITXT && is_xmp_itxt(c.contents()));
                match (&updates.xmp, existing) {
                    (Update::Replace(xmp), Some(pos)) => chunks[pos] = PngChunk::new(PNG_ITXT, itxt_for_xmp(xmp)),
                    (Update::Replace(xmp), None) => {
                        let end = chunks.iter().position(|c| c.kind() == PNG_IEND).unwrap_or(chunks.len());
                        chunks.insert(end, PngChunk::new(PNG_ITXT, itxt_for_xmp(xmp)));
                    }
                    (Update::Remove, Some(pos)) => {
                        chunks.remove(pos);
                    }
                    _ => {}
                }
            }
            reject_update("IPTC", format, &updates.iptc)?;
            Ok(png.encoder().bytes().to_vec())
        }
        ImageFormat::WebP => {
            let mut webp = WebP::from_bytes(bytes).map_err(|e| format!("failed to parse WebP: {e}"))?;
            match &updates.exif {
                Update::Keep => {}
                Update::Remove => webp.set_exif(None),
                Update::Replace(tiff) => webp.set_exif(Some(Bytes::from(tiff.clone()))),
            }
            reject_update("XMP", format, &updates.xmp)?;
            reject_update("IPTC", format, &updates.iptc)?;
            Ok(webp.encoder().bytes().to_vec())
        }
    }
}

fn reject_update(section: &str, format: ImageFormat, update: &Update) -> Result<(), String> {
    match update {
        Update::Replace(_) => Err(format!("{format} files cannot hold {section} metadata")),
        _ => Ok(()),
    }
}

fn strip_exif_header(data: &[u8]) -> &[u8] {
    data.strip_prefix(EXIF_HEADER).unwrap_or(data)
}

fn find_segment(segments: &[JpegSegment], marker: u8, header: &[u8]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == marker && s.contents().starts_with(header))
}

/// Replace, remove or insert the segment identified by `marker` + `header`.
/// New segments go to `insert_at`, or right after APP0.
fn update_segment(
    segments: &mut Vec<JpegSegment>,
    marker: u8,
    header: &[u8],
    update: &Update,
    insert_at: Option<usize>,
) -> Result<(), String> {
    let existing = find_segment(segments, marker, header);
    match update {
        Update::Keep => {}
        Update::Remove => {
            if let Some(pos) = existing {
                segments.remove(pos);
            }
        }
        Update::Replace(data) => {
            let mut contents = Vec::with_capacity(header.len() + data.len());
            if !data.starts_with(header) {
                contents.extend_from_slice(header);
            }
            contents.extend_from_slice(data);
            if contents.len() > MAX_SEGMENT_CONTENTS {
                return Err(format!(
                    "metadata segment of {} bytes exceeds the JPEG limit of {MAX_SEGMENT_CONTENTS}",
                    contents.len()
                ));
            }
            let segment = JpegSegment::new_with_contents(marker, Bytes::from(contents));
            match existing {
                Some(pos) => segments[pos] = segment,
                None => {
                    let default = segments
                        .iter()
                        .position(|s| s.marker() == APP0)
                        .map_or(0, |p| p + 1);
                    let pos = insert_at.unwrap_or(default).min(segments.len());
                    segments.insert(pos, segment);
                }
            }
        }
    }
    Ok(())
}

fn is_xmp_itxt(contents: &[u8]) -> bool {
    contents.starts_with(PNG_XMP_KEYWORD) && contents.get(PNG_XMP_KEYWORD.len()) == Some(&0)
}

/// XMP text of an `iTXt` chunk, when the chunk holds the XMP packet.
fn xmp_from_itxt(contents: &[u8]) -> Option<Result<Vec<u8>, String>> {
    if !is_xmp_itxt(contents) {
        return None;
    }
    // keyword\0, compression flag, compression method, language\0, translated keyword\0, text
    let rest = &contents[PNG_XMP_KEYWORD.len() + 1..];
    let [flag, _method, rest @ ..] = rest else {
        return Some(Err("truncated XMP iTXt chunk".to_string()));
    };
    if *flag != 0 {
        return Some(Err("compressed XMP iTXt chunks are not supported".to_string()));
    }
    let mut fields = rest.splitn(3, |&b| b == 0);
    let (Some(_language), Some(_translated), Some(text)) = (fields.next(), fields.next(), fields.next()) else {
        return Some(Err("truncated XMP iTXt chunk".to_string()));
    };
    Some(Ok(text.to_vec()))
}

fn itxt_for_xmp(xmp: &[u8]) -> Bytes {
    let mut contents = Vec::with_capacity(PNG_XMP_KEYWORD.len() + 5 + xmp.len());
    contents.extend_from_slice(PNG_XMP_KEYWORD);
    contents.extend_from_slice(&[0, 0, 0, 0, 0]);
    contents.extend_from_slice(xmp);
    Bytes::from(contents)
}
