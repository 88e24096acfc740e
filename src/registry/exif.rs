//! EXIF tag names, ids and types, taken from `little_exif`'s tag list.
//!
//! Key names are the `little_exif` variant names (`Exif.Photo.CreateDate`);
//! ids it does not know use the `0x1234` form. The table below only adds what
//! the crate's list lacks: display labels, descriptions, print routines, the
//! comment type of charset-prefixed payloads and the Windows XP tags.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::exif_tag_format::ExifTagFormat;

use super::{Print, hex_name, parse_hex_name};
use crate::codec::TagType;

/// Image file directory a tag lives in; doubles as the key's group segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ifd {
    /// IFD0, the primary image.
    Image,
    /// Exif sub-IFD.
    Photo,
    GpsInfo,
    /// Interoperability sub-IFD.
    Iop,
    /// IFD1, the embedded thumbnail.
    Thumbnail,
}

impl Ifd {
    pub const ALL: [Ifd; 5] = [Ifd::Image, Ifd::Photo, Ifd::GpsInfo, Ifd::Iop, Ifd::Thumbnail];

    pub fn group(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Photo => "Photo",
            Self::GpsInfo => "GPSInfo",
            Self::Iop => "Iop",
            Self::Thumbnail => "Thumbnail",
        }
    }

    pub fn from_group(group: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ifd| ifd.group() == group)
    }

    /// `little_exif` group of this directory's tags. IFD1 uses the IFD0 list.
    pub(crate) fn tag_group(self) -> ExifTagGroup {
        match self {
            Self::Image | Self::Thumbnail => ExifTagGroup::IFD0,
            Self::Photo => ExifTagGroup::ExifIFD,
            Self::GpsInfo => ExifTagGroup::GPSIFD,
            Self::Iop => ExifTagGroup::InteropIFD,
        }
    }

    #[allow(unreachable_patterns)]
    pub(crate) fn of(group: &ExifTagGroup) -> Option<Self> {
        match group {
            ExifTagGroup::IFD0 => Some(Self::Image),
            ExifTagGroup::ExifIFD => Some(Self::Photo),
            ExifTagGroup::GPSIFD => Some(Self::GpsInfo),
            ExifTagGroup::InteropIFD => Some(Self::Iop),
            _ => None,
        }
    }

    fn table(self) -> Self {
        match self {
            Self::Thumbnail => Self::Image,
            other => other,
        }
    }
}

// ── names ───────────────────────────────────────────────────────────

/// Windows XP tags: UCS-2 text stored as BYTE, absent from `little_exif`.
const XP_TAGS: [(u16, &str); 5] = [
    (0x9C9B, "XPTitle"),
    (0x9C9C, "XPComment"),
    (0x9C9D, "XPAuthor"),
    (0x9C9E, "XPKeywords"),
    (0x9C9F, "XPSubject"),
];

/// Variant name of a tag, `Artist` for `Artist("..")`.
fn variant_name(tag: &ExifTag) -> String {
    let debug = format!("{tag:?}");
    debug.split(['(', ' ', '{']).next().unwrap_or_default().to_string()
}

/// The crate's tag for `id` in `ifd`, when its list has one.
fn known(ifd: Ifd, id: u16) -> Option<ExifTag> {
    let ifd = ifd.table();
    let tag = ExifTag::from_u16(id, &ifd.tag_group()).ok()?;
    let name = variant_name(&tag);
    (Ifd::of(&tag.get_group()) == Some(ifd) && !name.is_empty() && !name.starts_with("Unknown")).then_some(tag)
}

fn xp_name(ifd: Ifd, id: u16) -> Option<&'static str> {
    (ifd.table() == Ifd::Image)
        .then(|| XP_TAGS.iter().find(|(xp, _)| *xp == id).map(|(_, name)| *name))
        .flatten()
}

/// Every name in the crate's list, per directory.
fn names() -> &'static HashMap<(Ifd, String), u16> {
    static NAMES: OnceLock<HashMap<(Ifd, String), u16>> = OnceLock::new();
    NAMES.get_or_init(|| {
        let mut names = HashMap::new();
        for ifd in [Ifd::Image, Ifd::Photo, Ifd::GpsInfo, Ifd::Iop] {
            for id in 0..=u16::MAX {
                if let Some(tag) = known(ifd, id) {
                    names.entry((ifd, variant_name(&tag))).or_insert(id);
                }
            }
        }
        log::debug!("indexed {} EXIF tag names", names.len());
        names
    })
}

/// Resolve a key name to a tag id: a known name or a `0x1234` literal.
pub fn id_of(ifd: Ifd, name: &str) -> Option<u16> {
    if let Some(id) = parse_hex_name(name) {
        return Some(id);
    }
    if let Some((id, _)) = XP_TAGS.iter().find(|(_, xp)| *xp == name) {
        return (ifd.table() == Ifd::Image).then_some(*id);
    }
    names().get(&(ifd.table(), name.to_string())).copied()
}

/// Key name for a tag id; unknown ids use the hex form.
pub fn name_of(ifd: Ifd, id: u16) -> String {
    known(ifd, id)
        .map(|tag| variant_name(&tag))
        .or_else(|| xp_name(ifd, id).map(str::to_string))
        .unwrap_or_else(|| hex_name(id))
}

// ── types ───────────────────────────────────────────────────────────

const COMMENT_TAGS: [&str; 3] = ["UserComment", "GPSProcessingMethod", "GPSAreaInformation"];

/// Type a tag is created with: the crate's format, refined for comments.
pub fn tag_type(ifd: Ifd, id: u16) -> Option<TagType> {
    if xp_name(ifd, id).is_some() {
        return Some(TagType::Byte);
    }
    let tag = known(ifd, id)?;
    Some(refine(&variant_name(&tag), type_of_format(&tag.format())))
}

/// Type of a stored tag.
pub(crate) fn stored_type(ifd: Ifd, tag: &ExifTag) -> TagType {
    refine(&name_of(ifd, tag.as_u16()), type_of_format(&tag.format()))
}

fn refine(name: &str, tag_type: TagType) -> TagType {
    if tag_type == TagType::Undefined && COMMENT_TAGS.contains(&name) {
        TagType::Comment
    } else {
        tag_type
    }
}

#[allow(unreachable_patterns)]
fn type_of_format(format: &ExifTagFormat) -> TagType {
    match format {
        ExifTagFormat::INT8U => TagType::Byte,
        ExifTagFormat::STRING => TagType::Ascii,
        ExifTagFormat::INT16U => TagType::Short,
        ExifTagFormat::INT32U => TagType::Long,
        ExifTagFormat::RATIONAL64U => TagType::Rational,
        ExifTagFormat::INT8S => TagType::SByte,
        ExifTagFormat::UNDEF => TagType::Undefined,
        ExifTagFormat::INT16S => TagType::SShort,
        ExifTagFormat::INT32S => TagType::SLong,
        ExifTagFormat::RATIONAL64S => TagType::SRational,
        ExifTagFormat::IEEE32FLOAT => TagType::Float,
        ExifTagFormat::IEEE64FLOAT => TagType::Double,
        _ => TagType::Undefined,
    }
}

/// `little_exif` format a value of `tag_type` is stored as.
pub(crate) fn format_for(tag_type: TagType) -> Option<ExifTagFormat> {
    Some(match tag_type {
        TagType::Byte => ExifTagFormat::INT8U,
        TagType::Ascii => ExifTagFormat::STRING,
        TagType::Short => ExifTagFormat::INT16U,
        TagType::Long => ExifTagFormat::INT32U,
        TagType::Rational => ExifTagFormat::RATIONAL64U,
        TagType::SByte => ExifTagFormat::INT8S,
        TagType::Undefined | TagType::Comment => ExifTagFormat::UNDEF,
        TagType::SShort => ExifTagFormat::INT16S,
        TagType::SLong => ExifTagFormat::INT32S,
        TagType::SRational => ExifTagFormat::RATIONAL64S,
        TagType::Float => ExifTagFormat::IEEE32FLOAT,
        TagType::Double => ExifTagFormat::IEEE64FLOAT,
        _ => return None,
    })
}

/// TIFF field type code of a format.
pub(crate) fn format_code(format: &ExifTagFormat) -> u16 {
    match type_of_format(format) {
        TagType::Byte => 1,
        TagType::Ascii => 2,
        TagType::Short => 3,
        TagType::Long => 4,
        TagType::Rational => 5,
        TagType::SByte => 6,
        TagType::SShort => 8,
        TagType::SLong => 9,
        TagType::SRational => 10,
        TagType::Float => 11,
        TagType::Double => 12,
        _ => 7,
    }
}

pub(crate) fn format_of(code: u16) -> Option<ExifTagFormat> {
    let tag_type = match code {
        1 => TagType::Byte,
        2 => TagType::Ascii,
        3 => TagType::Short,
        4 => TagType::Long,
        5 => TagType::Rational,
        6 => TagType::SByte,
        7 => TagType::Undefined,
        8 => TagType::SShort,
        9 => TagType::SLong,
        10 => TagType::SRational,
        11 => TagType::Float,
        12 => TagType::Double,
        _ => return None,
    };
    format_for(tag_type)
}

// ── display ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Details {
    pub label: &'static str,
    pub description: &'static str,
    pub print: Print,
}

pub(crate) fn details(name: &str) -> Option<&'static Details> {
    DETAILS.iter().find(|(n, _)| *n == name).map(|(_, details)| details)
}

/// Display label: the table's, or the name split into words.
pub(crate) fn label(name: &str) -> Cow<'static, str> {
    match details(name) {
        Some(details) => Cow::Borrowed(details.label),
        None => Cow::Owned(split_words(name)),
    }
}

/// `GPSLatitude` → `GPS Latitude`, `ExifImageWidth` → `Exif Image Width`.
fn split_words(name: &str) -> String {
    if parse_hex_name(name).is_some() {
        return name.to_string();
    }
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_lower) {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

use Print as P;

const fn d(label: &'static str, description: &'static str, print: Print) -> Details {
    Details { label, description, print }
}

const DETAILS: &[(&str, Details)] = &[
    // IFD0
    ("ImageWidth", d("Image Width", "The number of columns of image data.", P::Value)),
    ("ImageHeight", d("Image Height", "The number of rows of image data.", P::Value)),
    ("Compression", d("Compression", "The compression scheme used for the image data.", P::Value)),
    ("ImageDescription", d("Image Description", "A character string giving the title of the image.", P::Value)),
    ("Make", d("Manufacturer", "The manufacturer of the recording equipment.", P::Value)),
    ("Model", d("Model", "The model name or model number of the equipment.", P::Value)),
    ("Orientation", d("Orientation", "The image orientation viewed in terms of rows and columns.", P::Orientation)),
    ("XResolution", d("X-Resolution", "The number of pixels per resolution unit in the image width direction.", P::Value)),
    ("YResolution", d("Y-Resolution", "The number of pixels per resolution unit in the image height direction.", P::Value)),
    ("ResolutionUnit", d("Resolution Unit", "The unit for measuring XResolution and YResolution.", P::ResolutionUnit)),
    ("Software", d("Software", "The name and version of the software used to post-process the picture.", P::Value)),
    ("ModifyDate", d("Date and Time", "The date and time of image creation.", P::Value)),
    ("Artist", d("Artist", "The name of the camera owner, photographer or image creator.", P::Value)),
    ("YCbCrPositioning", d("YCbCr Positioning", "The position of chrominance components in relation to the luminance component.", P::YCbCrPositioning)),
    ("Copyright", d("Copyright", "Copyright information.", P::Value)),
    ("XPTitle", d("Windows Title", "Title tag used by Windows, encoded in UCS2.", P::XpText)),
    ("XPComment", d("Windows Comment", "Comment tag used by Windows, encoded in UCS2.", P::XpText)),
    ("XPAuthor", d("Windows Author", "Author tag used by Windows, encoded in UCS2.", P::XpText)),
    ("XPKeywords", d("Windows Keywords", "Keywords tag used by Windows, encoded in UCS2.", P::XpText)),
    ("XPSubject", d("Windows Subject", "Subject tag used by Windows, encoded in UCS2.", P::XpText)),
    // Exif sub-IFD
    ("ExposureTime", d("Exposure Time", "Exposure time, given in seconds.", P::ExposureTime)),
    ("FNumber", d("FNumber", "The F number.", P::FNumber)),
    ("ExposureProgram", d("Exposure Program", "The class of the program used by the camera to set exposure.", P::ExposureProgram)),
    ("ISO", d("ISO Speed", "The ISO speed of the camera or input device.", P::Value)),
    ("ExifVersion", d("Exif Version", "The version of this standard supported.", P::Version)),
    ("DateTimeOriginal", d("Date and Time (original)", "The date and time when the original image data was generated.", P::Value)),
    ("CreateDate", d("Date and Time (digitized)", "The date and time when the image was stored as digital data.", P::Value)),
    ("ComponentsConfiguration", d("Components Configuration", "Information specific to compressed data.", P::ComponentsConfiguration)),
    ("ShutterSpeedValue", d("Shutter speed", "Shutter speed in APEX units.", P::ApexShutter)),
    ("ApertureValue", d("Aperture", "The lens aperture in APEX units.", P::ApexAperture)),
    ("ExposureCompensation", d("Exposure Bias", "The exposure bias in APEX units.", P::ExposureBias)),
    ("MaxApertureValue", d("Max Aperture Value", "The smallest F number of the lens.", P::ApexAperture)),
    ("SubjectDistance", d("Subject Distance", "The distance to the subject, given in meters.", P::SubjectDistance)),
    ("MeteringMode", d("Metering Mode", "The metering mode.", P::MeteringMode)),
    ("LightSource", d("Light Source", "The kind of light source.", P::LightSource)),
    ("Flash", d("Flash", "The status of flash when the image was shot.", P::Flash)),
    ("FocalLength", d("Focal Length", "The actual focal length of the lens, in mm.", P::FocalLength)),
    ("MakerNote", d("Maker Note", "Manufacturer specific information.", P::Value)),
    ("UserComment", d("User Comment", "Keywords or comments on the image.", P::Comment)),
    ("FlashpixVersion", d("FlashPix Version", "The FlashPix format version supported.", P::Version)),
    ("ColorSpace", d("Color Space", "The color space information tag.", P::ColorSpace)),
    ("ExifImageWidth", d("Pixel X Dimension", "The valid width of the meaningful image.", P::Value)),
    ("ExifImageHeight", d("Pixel Y Dimension", "The valid height of the meaningful image.", P::Value)),
    ("FocalPlaneResolutionUnit", d("Focal Plane Resolution Unit", "The unit for measuring the focal plane resolution.", P::ResolutionUnit)),
    ("SensingMethod", d("Sensing Method", "The image sensor type on the camera.", P::SensingMethod)),
    ("FileSource", d("File Source", "The image source.", P::FileSource)),
    ("SceneType", d("Scene Type", "The type of scene.", P::SceneType)),
    ("CustomRendered", d("Custom Rendered", "The use of special processing on image data.", P::CustomRendered)),
    ("ExposureMode", d("Exposure Mode", "The exposure mode set when the image was shot.", P::ExposureMode)),
    ("WhiteBalance", d("White Balance", "The white balance mode set when the image was shot.", P::WhiteBalance)),
    ("FocalLengthIn35mmFormat", d("Focal Length In 35mm Film", "The equivalent focal length assuming a 35mm film camera, in mm.", P::Millimetres)),
    ("SceneCaptureType", d("Scene Capture Type", "The type of scene that was shot.", P::SceneCaptureType)),
    ("GainControl", d("Gain Control", "The degree of overall image gain adjustment.", P::GainControl)),
    ("Contrast", d("Contrast", "The direction of contrast processing applied by the camera.", P::SoftHard)),
    ("Saturation", d("Saturation", "The direction of saturation processing applied by the camera.", P::LowHigh)),
    ("Sharpness", d("Sharpness", "The direction of sharpness processing applied by the camera.", P::SoftHard)),
    ("SubjectDistanceRange", d("Subject Distance Range", "The distance to the subject.", P::SubjectDistanceRange)),
    ("OwnerName", d("Camera Owner Name", "The owner of the camera.", P::Value)),
    ("SerialNumber", d("Body Serial Number", "The serial number of the camera body.", P::Value)),
    ("LensInfo", d("Lens Specification", "Minimum and maximum focal length and F number of the lens.", P::Value)),
    ("LensMake", d("Lens Make", "The lens manufacturer.", P::Value)),
    ("LensModel", d("Lens Model", "The lens model name and model number.", P::Value)),
    // GPS sub-IFD
    ("GPSVersionID", d("GPS Version ID", "The version of the GPS info IFD.", P::GpsVersion)),
    ("GPSLatitudeRef", d("GPS Latitude Reference", "Whether the latitude is north or south.", P::Value)),
    ("GPSLatitude", d("GPS Latitude", "The latitude as degrees, minutes and seconds.", P::GpsCoordinate)),
    ("GPSLongitudeRef", d("GPS Longitude Reference", "Whether the longitude is east or west.", P::Value)),
    ("GPSLongitude", d("GPS Longitude", "The longitude as degrees, minutes and seconds.", P::GpsCoordinate)),
    ("GPSAltitudeRef", d("GPS Altitude Reference", "The altitude reference.", P::GpsAltitudeRef)),
    ("GPSAltitude", d("GPS Altitude", "The altitude in meters.", P::GpsAltitude)),
    ("GPSTimeStamp", d("GPS Time Stamp", "The time as UTC.", P::GpsTimeStamp)),
    ("GPSDestLatitude", d("GPS Destination Latitude", "The latitude of the destination point.", P::GpsCoordinate)),
    ("GPSDestLongitude", d("GPS Destination Longitude", "The longitude of the destination point.", P::GpsCoordinate)),
    ("GPSProcessingMethod", d("GPS Processing Method", "The name of the method used for location finding.", P::Comment)),
    ("GPSAreaInformation", d("GPS Area Information", "The name of the GPS area.", P::Comment)),
    ("GPSDateStamp", d("GPS Date Stamp", "Date and time information relative to UTC.", P::Value)),
    // Interoperability sub-IFD
    ("InteropIndex", d("Interoperability Index", "The identification of the interoperability rule.", P::Value)),
    ("InteropVersion", d("Interoperability Version", "The interoperability version.", P::Version)),
];
