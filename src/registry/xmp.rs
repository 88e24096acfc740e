use crate::codec::TagType;

pub const RDF_URI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const META_URI: &str = "adobe:ns:meta/";

/// Known XMP schemas as `(canonical prefix, namespace URI)`.
pub const NAMESPACES: &[(&str, &str)] = &[
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("xmp", "http://ns.adobe.com/xap/1.0/"),
    ("xmpRights", "http://ns.adobe.com/xap/1.0/rights/"),
    ("xmpMM", "http://ns.adobe.com/xap/1.0/mm/"),
    ("photoshop", "http://ns.adobe.com/photoshop/1.0/"),
    ("tiff", "http://ns.adobe.com/tiff/1.0/"),
    ("exif", "http://ns.adobe.com/exif/1.0/"),
    ("exifEX", "http://cipa.jp/exif/1.0/"),
    ("aux", "http://ns.adobe.com/exif/1.0/aux/"),
    ("crs", "http://ns.adobe.com/camera-raw-settings/1.0/"),
    ("lr", "http://ns.adobe.com/lightroom/1.0/"),
    ("Iptc4xmpCore", "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/"),
    ("Iptc4xmpExt", "http://iptc.org/std/Iptc4xmpExt/2008-02-29/"),
];

pub fn uri_for_prefix(prefix: &str) -> Option<&'static str> {
    NAMESPACES.iter().find(|(p, _)| *p == prefix).map(|(_, uri)| *uri)
}

pub fn prefix_for_uri(uri: &str) -> Option<&'static str> {
    NAMESPACES.iter().find(|(_, u)| *u == uri).map(|(prefix, _)| *prefix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub prefix: &'static str,
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub tag_type: TagType,
}

/// Registered property, or a plain-text entry for an unlisted property of a
/// known schema.
pub fn property(prefix: &str, name: &str) -> Option<PropertyInfo> {
    if let Some(info) = PROPERTIES.iter().find(|p| p.prefix == prefix && p.name == name) {
        return Some(*info);
    }
    let (prefix, _) = NAMESPACES.iter().find(|(p, _)| *p == prefix)?;
    Some(PropertyInfo {
        prefix,
        name: "",
        label: "",
        description: "",
        tag_type: TagType::XmpText,
    })
    .filter(|_| !name.is_empty())
}

const fn prop(
    prefix: &'static str,
    name: &'static str,
    label: &'static str,
    description: &'static str,
    tag_type: TagType,
) -> PropertyInfo {
    PropertyInfo { prefix, name, label, description, tag_type }
}

use TagType::{LangAlt, XmpBag as Bag, XmpSeq as Seq, XmpText as Text};

const PROPERTIES: &[PropertyInfo] = &[
    prop("dc", "contributor", "Contributor", "Contributors to the resource (other than the authors).", Bag),
    prop("dc", "coverage", "Coverage", "The spatial or temporal topic of the resource.", Text),
    prop("dc", "creator", "Creator", "The authors of the resource, listed in order of precedence.", Seq),
    prop("dc", "date", "Date", "Dates associated with events in the life cycle of the resource.", Seq),
    prop("dc", "description", "Description", "A textual description of the content of the resource.", LangAlt),
    prop("dc", "format", "Format", "The file format used when saving the resource.", Text),
    prop("dc", "identifier", "Identifier", "Unique identifier of the resource.", Text),
    prop("dc", "language", "Language", "Languages used in the resource.", Bag),
    prop("dc", "publisher", "Publisher", "Publishers of the resource.", Bag),
    prop("dc", "relation", "Relation", "Relationships to other documents.", Bag),
    prop("dc", "rights", "Rights", "Informal rights statement.", LangAlt),
    prop("dc", "source", "Source", "Unique identifier of the work from which this resource was derived.", Text),
    prop("dc", "subject", "Subject", "Descriptive phrases or keywords that specify the topic of the content.", Bag),
    prop("dc", "title", "Title", "The title of the document, or the name given to the resource.", LangAlt),
    prop("dc", "type", "Type", "A document type.", Bag),
    prop("xmp", "CreateDate", "Create Date", "The date and time the resource was originally created.", Text),
    prop("xmp", "CreatorTool", "Creator Tool", "The name of the first known tool used to create the resource.", Text),
    prop("xmp", "Identifier", "Identifier", "Unambiguous identifiers of the resource.", Bag),
    prop("xmp", "Label", "Label", "A word or short phrase that identifies a document as a member of a collection.", Text),
    prop("xmp", "MetadataDate", "Metadata Date", "The date and time that any metadata for this resource was last changed.", Text),
    prop("xmp", "ModifyDate", "Modify Date", "The date and time the resource was last modified.", Text),
    prop("xmp", "Nickname", "Nickname", "A short informal name for the resource.", Text),
    prop("xmp", "Rating", "Rating", "A number that indicates a document's status relative to other documents.", Text),
    prop("xmpRights", "Certificate", "Certificate", "Online rights management certificate.", Text),
    prop("xmpRights", "Marked", "Marked", "Whether the resource is rights-managed.", Text),
    prop("xmpRights", "Owner", "Owner", "Legal owners of the resource.", Bag),
    prop("xmpRights", "UsageTerms", "Usage Terms", "Text instructions on how the resource can be legally used.", LangAlt),
    prop("xmpRights", "WebStatement", "Web Statement", "The location of a web page describing the owner and rights statement.", Text),
    prop("xmpMM", "DocumentID", "Document ID", "The common identifier for all versions and renditions of a document.", Text),
    prop("xmpMM", "InstanceID", "Instance ID", "An identifier for a specific incarnation of a document.", Text),
    prop("xmpMM", "OriginalDocumentID", "Original Document ID", "The common identifier for the original document.", Text),
    prop("photoshop", "AuthorsPosition", "Authors Position", "By-line title.", Text),
    prop("photoshop", "CaptionWriter", "Caption Writer", "Writer/editor.", Text),
    prop("photoshop", "Category", "Category", "Category.", Text),
    prop("photoshop", "City", "City", "City.", Text),
    prop("photoshop", "Country", "Country", "Country/primary location.", Text),
    prop("photoshop", "Credit", "Credit", "Credit.", Text),
    prop("photoshop", "DateCreated", "Date Created", "The date the intellectual content of the document was created.", Text),
    prop("photoshop", "Headline", "Headline", "Headline.", Text),
    prop("photoshop", "Instructions", "Instructions", "Special instructions.", Text),
    prop("photoshop", "Source", "Source", "Source.", Text),
    prop("photoshop", "State", "State", "Province/state.", Text),
    prop("photoshop", "SupplementalCategories", "Supplemental Categories", "Supplemental category.", Bag),
    prop("photoshop", "TransmissionReference", "Transmission Reference", "Original transmission reference.", Text),
    prop("photoshop", "Urgency", "Urgency", "Urgency.", Text),
    prop("lr", "hierarchicalSubject", "Hierarchical Subject", "Keywords as pipe-separated hierarchies.", Bag),
    prop("Iptc4xmpCore", "CountryCode", "Country Code", "Code of the country the content is focusing on.", Text),
    prop("Iptc4xmpCore", "IntellectualGenre", "Intellectual Genre", "Describes the nature, intellectual or journalistic characteristic of an item.", Text),
    prop("Iptc4xmpCore", "Location", "Location", "Name of a location the content is focusing on.", Text),
    prop("Iptc4xmpCore", "Scene", "IPTC Scene", "Describes the scene of a photo content.", Bag),
    prop("Iptc4xmpCore", "SubjectCode", "IPTC Subject Code", "Specifies one or more subjects from the IPTC Subject-NewsCodes taxonomy.", Bag),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_round_trip() {
        let uri = uri_for_prefix("dc").unwrap();
        assert_eq!(prefix_for_uri(uri), Some("dc"));
        assert!(uri_for_prefix("nope").is_none());
    }

    #[test]
    fn unlisted_property_of_known_schema_is_text() {
        let info = property("tiff", "Make").unwrap();
        assert_eq!(info.tag_type, TagType::XmpText);
        assert!(info.label.is_empty());
        assert!(property("unknown", "Make").is_none());
        assert!(property("dc", "").is_none());
    }
}
