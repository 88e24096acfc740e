use crate::codec::TagType;

pub const ENVELOPE: u8 = 1;
pub const APPLICATION: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetInfo {
    pub record: u8,
    pub number: u8,
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub tag_type: TagType,
    /// The dataset may occur several times (one value per occurrence).
    pub repeatable: bool,
}

pub fn record_name(record: u8) -> Option<&'static str> {
    match record {
        ENVELOPE => Some("Envelope"),
        APPLICATION => Some("Application2"),
        _ => None,
    }
}

pub fn record_from_group(group: &str) -> Option<u8> {
    match group {
        "Envelope" => Some(ENVELOPE),
        "Application2" => Some(APPLICATION),
        _ => None,
    }
}

pub fn by_number(record: u8, number: u8) -> Option<&'static DatasetInfo> {
    DATASETS.iter().find(|d| d.record == record && d.number == number)
}

pub fn by_name(record: u8, name: &str) -> Option<&'static DatasetInfo> {
    DATASETS.iter().find(|d| d.record == record && d.name == name)
}

/// Dataset number for a key name: registered name or `0x0012` literal.
pub fn number_of(record: u8, name: &str) -> Option<u8> {
    by_name(record, name)
        .map(|d| d.number)
        .or_else(|| super::parse_hex_name(name).and_then(|id| u8::try_from(id).ok()))
}

pub fn name_of(record: u8, number: u8) -> String {
    by_number(record, number)
        .map_or_else(|| super::hex_name(u16::from(number)), |d| d.name.to_string())
}

pub fn is_repeatable(record: u8, number: u8) -> bool {
    by_number(record, number).is_some_and(|d| d.repeatable)
}

const fn ds(
    record: u8,
    number: u8,
    name: &'static str,
    label: &'static str,
    description: &'static str,
    tag_type: TagType,
    repeatable: bool,
) -> DatasetInfo {
    DatasetInfo { record, number, name, label, description, tag_type, repeatable }
}

use TagType::{Short, String as Str};

const DATASETS: &[DatasetInfo] = &[
    ds(1, 0, "ModelVersion", "Model Version", "Version of the IIM envelope record.", Short, false),
    ds(1, 5, "Destination", "Destination", "Routing information.", Str, true),
    ds(1, 20, "FileFormat", "File Format", "File format of the object data.", Short, false),
    ds(1, 22, "FileVersion", "File Version", "Version of the file format.", Short, false),
    ds(1, 30, "ServiceId", "Service ID", "Identifies the provider and product.", Str, false),
    ds(1, 40, "EnvelopeNumber", "Envelope Number", "Number unique for the date and the service ID.", Str, false),
    ds(1, 50, "ProductId", "Product ID", "Subset of provider's overall service.", Str, true),
    ds(1, 60, "EnvelopePriority", "Envelope Priority", "Envelope handling priority.", Str, false),
    ds(1, 70, "DateSent", "Date Sent", "Date the service sent the material.", Str, false),
    ds(1, 80, "TimeSent", "Time Sent", "Time the service sent the material.", Str, false),
    ds(1, 90, "CharacterSet", "Character Set", "Control functions used for the announcement of the coded character set.", Str, false),
    ds(1, 100, "UNO", "Unique Name of Object", "Eternal, globally unique identification for the object.", Str, false),
    ds(1, 120, "ARMId", "ARM Identifier", "Abstract Relationship Method identifier.", Short, false),
    ds(1, 122, "ARMVersion", "ARM Version", "Abstract Relationship Method version.", Short, false),
    ds(2, 0, "RecordVersion", "Record Version", "Version of the IIM application record.", Short, false),
    ds(2, 3, "ObjectType", "Object Type", "Object type reference.", Str, false),
    ds(2, 4, "ObjectAttribute", "Object Attribute", "Object attribute reference.", Str, true),
    ds(2, 5, "ObjectName", "Object Name", "Shorthand reference for the object.", Str, false),
    ds(2, 7, "EditStatus", "Edit Status", "Status of the object data.", Str, false),
    ds(2, 10, "Urgency", "Urgency", "Editorial urgency of content.", Str, false),
    ds(2, 12, "Subject", "Subject", "Structured definition of the subject matter.", Str, true),
    ds(2, 15, "Category", "Category", "Subject of the object data as identified by the provider.", Str, false),
    ds(2, 20, "SuppCategory", "Supplemental Category", "Further refinement of the subject.", Str, true),
    ds(2, 22, "FixtureId", "Fixture Id", "Identifies object data that recurs often and predictably.", Str, false),
    ds(2, 25, "Keywords", "Keywords", "Keywords to express the subject of the content.", Str, true),
    ds(2, 26, "LocationCode", "Location Code", "Country, geographical or location code.", Str, true),
    ds(2, 27, "LocationName", "Location Name", "Country, geographical or location name.", Str, true),
    ds(2, 30, "ReleaseDate", "Release Date", "Earliest date the provider intends the object to be used.", Str, false),
    ds(2, 35, "ReleaseTime", "Release Time", "Earliest time the provider intends the object to be used.", Str, false),
    ds(2, 37, "ExpirationDate", "Expiration Date", "Latest date the provider intends the object to be used.", Str, false),
    ds(2, 38, "ExpirationTime", "Expiration Time", "Latest time the provider intends the object to be used.", Str, false),
    ds(2, 40, "SpecialInstructions", "Special Instructions", "Other editorial instructions concerning the use of the object.", Str, false),
    ds(2, 42, "ActionAdvised", "Action Advised", "Type of action this object provides to a previous object.", Str, false),
    ds(2, 45, "ReferenceService", "Reference Service", "Service identifier of a prior envelope.", Str, true),
    ds(2, 47, "ReferenceDate", "Reference Date", "Date of a prior envelope.", Str, true),
    ds(2, 50, "ReferenceNumber", "Reference Number", "Envelope number of a prior envelope.", Str, true),
    ds(2, 55, "DateCreated", "Date Created", "Date the intellectual content was created.", Str, false),
    ds(2, 60, "TimeCreated", "Time Created", "Time the intellectual content was created.", Str, false),
    ds(2, 62, "DigitizationDate", "Digital Creation Date", "Date the digital representation was created.", Str, false),
    ds(2, 63, "DigitizationTime", "Digital Creation Time", "Time the digital representation was created.", Str, false),
    ds(2, 65, "Program", "Program", "Program used to create the object data.", Str, false),
    ds(2, 70, "ProgramVersion", "Program Version", "Version of the program.", Str, false),
    ds(2, 75, "ObjectCycle", "Object Cycle", "Editorial cycle of the object data.", Str, false),
    ds(2, 80, "Byline", "By-line", "Name of the creator of the object.", Str, true),
    ds(2, 85, "BylineTitle", "By-line Title", "Title of the creator of the object.", Str, true),
    ds(2, 90, "City", "City", "City of origin of the object.", Str, false),
    ds(2, 92, "SubLocation", "Sub-location", "Location within a city.", Str, false),
    ds(2, 95, "ProvinceState", "Province/State", "Province or state of origin.", Str, false),
    ds(2, 100, "CountryCode", "Country Code", "Code of the country of origin.", Str, false),
    ds(2, 101, "CountryName", "Country Name", "Full name of the country of origin.", Str, false),
    ds(2, 103, "TransmissionReference", "Transmission Reference", "Code representing the location of original transmission.", Str, false),
    ds(2, 105, "Headline", "Headline", "Publishable entry providing a synopsis of the contents.", Str, false),
    ds(2, 110, "Credit", "Credit", "Provider of the object, not necessarily the owner.", Str, false),
    ds(2, 115, "Source", "Source", "Original owner of the intellectual content.", Str, false),
    ds(2, 116, "Copyright", "Copyright", "Copyright notice.", Str, false),
    ds(2, 118, "Contact", "Contact", "Person or organisation to contact for further information.", Str, true),
    ds(2, 120, "Caption", "Caption", "Textual description of the object data.", Str, false),
    ds(2, 122, "Writer", "Writer", "Name of the person involved in writing the caption.", Str, true),
    ds(2, 130, "ImageType", "Image Type", "Color components of the image.", Str, false),
    ds(2, 131, "ImageOrientation", "Image Orientation", "Layout of the image area.", Str, false),
    ds(2, 135, "Language", "Language", "Major national language of the object.", Str, false),
];
