//! Static tables of known EXIF, IPTC and XMP tags.
//!
//! Each entry carries the tag's display label, a one-line description, the
//! declared [`TagType`] used when a tag is created from scratch, and the
//! [`Print`] routine that renders binary values for display. EXIF ids, names
//! and types come from `little_exif`.

pub mod exif;
pub mod iptc;
pub mod xmp;

use std::borrow::Cow;

use crate::codec::TagType;
use crate::key::{Family, TagKey};

/// Display routine for a binary tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Print {
    /// Generic rendering: numbers, rationals or Latin text.
    Value,
    Orientation,
    ResolutionUnit,
    YCbCrPositioning,
    ExposureTime,
    FNumber,
    /// APEX aperture value shown as an F-number.
    ApexAperture,
    /// APEX shutter speed shown as an exposure time.
    ApexShutter,
    ExposureBias,
    ExposureProgram,
    MeteringMode,
    LightSource,
    Flash,
    FocalLength,
    Millimetres,
    SubjectDistance,
    ColorSpace,
    /// Four ASCII digits such as `0231` shown as `2.31`.
    Version,
    ComponentsConfiguration,
    SensingMethod,
    FileSource,
    SceneType,
    CustomRendered,
    ExposureMode,
    WhiteBalance,
    SceneCaptureType,
    GainControl,
    /// Normal / Soft / Hard (Contrast, Sharpness).
    SoftHard,
    /// Normal / Low / High (Saturation).
    LowHigh,
    SubjectDistanceRange,
    /// UTF-16LE text stored as bytes (Windows XP* tags).
    XpText,
    /// EXIF comment with 8-byte charset code.
    Comment,
    GpsVersion,
    GpsCoordinate,
    GpsAltitudeRef,
    GpsAltitude,
    GpsTimeStamp,
}

/// Registry entry for one tag, independent of family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub label: Cow<'static, str>,
    pub description: &'static str,
    pub tag_type: TagType,
    pub print: Print,
}

/// Look up a tag by its full key.
pub fn lookup(key: &str) -> Option<TagInfo> {
    let key = TagKey::parse(key)?;
    match key.family {
        Family::Exif => {
            let ifd = exif::Ifd::from_group(key.group)?;
            let id = exif::id_of(ifd, key.name)?;
            let tag_type = exif::tag_type(ifd, id)?;
            let name = exif::name_of(ifd, id);
            let details = exif::details(&name);
            Some(TagInfo {
                label: exif::label(&name),
                description: details.map_or("", |d| d.description),
                tag_type,
                print: details.map_or(Print::Value, |d| d.print),
            })
        }
        Family::Iptc => {
            let record = iptc::record_from_group(key.group)?;
            iptc::by_name(record, key.name).map(|info| TagInfo {
                label: Cow::Borrowed(info.label),
                description: info.description,
                tag_type: info.tag_type,
                print: Print::Value,
            })
        }
        Family::Xmp => xmp::property(key.group, key.name).map(|info| TagInfo {
            label: Cow::Borrowed(info.label),
            description: info.description,
            tag_type: info.tag_type,
            print: Print::Value,
        }),
    }
}

/// Parse a `0x1234` style tag name used for tags missing from the tables.
pub(crate) fn parse_hex_name(name: &str) -> Option<u16> {
    let digits = name.strip_prefix("0x")?;
    if digits.len() != 4 {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

pub(crate) fn hex_name(id: u16) -> String {
    format!("0x{id:04x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_each_family() {
        let artist = lookup("Exif.Image.Artist").unwrap();
        assert_eq!(artist.label, "Artist");
        assert_eq!(artist.tag_type, TagType::Ascii);

        let orientation = lookup("Exif.Image.Orientation").unwrap();
        assert_eq!(orientation.tag_type, TagType::Short);
        assert_eq!(orientation.print, Print::Orientation);

        let latitude = lookup("Exif.GPSInfo.GPSLatitude").unwrap();
        assert_eq!(latitude.print, Print::GpsCoordinate);

        let keywords = lookup("Iptc.Application2.Keywords").unwrap();
        assert_eq!(keywords.tag_type, TagType::String);

        let title = lookup("Xmp.dc.title").unwrap();
        assert_eq!(title.tag_type, TagType::LangAlt);
    }

    #[test]
    fn thumbnail_group_shares_image_table() {
        assert!(lookup("Exif.Thumbnail.Compression").is_some());
    }

    #[test]
    fn unknown_keys() {
        assert!(lookup("Exif.Image.NoSuchTag").is_none());
        assert!(lookup("Exif.Image.0x9999").is_none());
        assert!(lookup("Xmp.nope.title").is_none());
        assert!(lookup("garbage").is_none());
    }

    #[test]
    fn hex_names() {
        assert_eq!(parse_hex_name("0x9c9b"), Some(0x9C9B));
        assert_eq!(parse_hex_name("0x12"), None);
        assert_eq!(hex_name(0x0A), "0x000a");
    }
}
