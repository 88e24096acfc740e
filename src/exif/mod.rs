//! The metadata container of one image file: EXIF, IPTC and XMP sections,
//! addressed by `<Family>.<Group>.<Name>` keys.
//!
//! Every tag is exposed through its raw textual form (see
//! [`TagType`](crate::codec::TagType)). EXIF tags are decoded and encoded by
//! `little_exif`. Saving re-reads the file, replaces only the sections that
//! were edited and writes the result back in place:
//!
//! | Format | EXIF | IPTC | XMP |
//! |--------|------|------|-----|
//! | JPEG | APP1 `Exif` | APP13 `8BIM` 0x0404 | APP1 XMP |
//! | PNG | `eXIf` | - | `iTXt` |
//! | WebP | `EXIF` | - | - |

mod block;
mod carrier;
mod iptc;
mod layout;
mod xmp;

use std::path::Path;

pub use carrier::ImageFormat;

use block::ExifBlock;
use carrier::{SectionUpdates, Update};
use iptc::IptcData;
use xmp::{XmpPacket, XmpValue};

use crate::codec::{TagType, Value, format_raw, join_items, parse_value, split_items};
use crate::error::{ContainerParseError, ExifSaveError, TagUpdateError};
use crate::key::{Family, TagKey};
use crate::registry::{self, exif::Ifd};

/// Where a key lives inside the container.
#[derive(Clone, Copy)]
enum Location<'a> {
    Exif(Ifd, u16),
    Iptc(u8, u8),
    Xmp(&'a str, &'a str),
}

impl<'a> Location<'a> {
    fn of(key: &'a str) -> Result<Self, TagUpdateError> {
        let parsed = TagKey::parse(key).ok_or_else(|| TagUpdateError::InvalidKey { key: key.to_string() })?;
        let unknown = || TagUpdateError::UnknownTag { key: key.to_string() };
        match parsed.family {
            Family::Exif => {
                let ifd = Ifd::from_group(parsed.group).ok_or_else(unknown)?;
                let id = registry::exif::id_of(ifd, parsed.name).ok_or_else(unknown)?;
                Ok(Self::Exif(ifd, id))
            }
            Family::Iptc => {
                let record = registry::iptc::record_from_group(parsed.group).ok_or_else(unknown)?;
                let number = registry::iptc::number_of(record, parsed.name).ok_or_else(unknown)?;
                Ok(Self::Iptc(record, number))
            }
            Family::Xmp => Ok(Self::Xmp(parsed.group, parsed.name)),
        }
    }

    fn family(&self) -> Family {
        match self {
            Self::Exif(..) => Family::Exif,
            Self::Iptc(..) => Family::Iptc,
            Self::Xmp(..) => Family::Xmp,
        }
    }
}

/// What a source container knows about a tag that the destination's
/// registry may not: its stored type and, for XMP, the namespace URI of its
/// prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TagHint {
    pub tag_type: Option<TagType>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Dirty {
    exif: bool,
    iptc: bool,
    xmp: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Container {
    format: ImageFormat,
    exif: Option<ExifBlock>,
    iptc: Option<IptcData>,
    xmp: Option<XmpPacket>,
    dirty: Dirty,
}

impl Container {
    pub(crate) fn load(path: &Path) -> Result<Self, ContainerParseError> {
        let bytes = std::fs::read(path).map_err(|source| ContainerParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &bytes)
    }

    pub(crate) fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, ContainerParseError> {
        let format = ImageFormat::sniff(bytes).ok_or_else(|| ContainerParseError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let sections = carrier::extract(format, bytes).map_err(|reason| ContainerParseError::Carrier {
            path: path.to_path_buf(),
            format,
            reason,
        })?;
        let malformed = |family: Family| {
            move |reason: String| ContainerParseError::Malformed {
                path: path.to_path_buf(),
                family,
                reason,
            }
        };

        let exif = sections
            .exif
            .filter(|data| !data.is_empty())
            .map(|data| ExifBlock::parse(&data))
            .transpose()
            .map_err(malformed(Family::Exif))?;
        let iptc = sections
            .iptc
            .map(|data| IptcData::from_app13(&data))
            .transpose()
            .map_err(malformed(Family::Iptc))?
            .flatten();
        let xmp = sections
            .xmp
            .map(|data| XmpPacket::parse(String::from_utf8_lossy(&data).trim_end_matches(['\0', ' ', '\n'])))
            .transpose()
            .map_err(malformed(Family::Xmp))?;

        log::debug!(
            "{}: {format} with exif={} iptc={} xmp={}",
            path.display(),
            exif.is_some(),
            iptc.is_some(),
            xmp.is_some()
        );
        Ok(Self {
            format,
            exif,
            iptc,
            xmp,
            dirty: Dirty::default(),
        })
    }

    pub(crate) fn format(&self) -> ImageFormat {
        self.format
    }

    /// Every key present, in container order (unsorted).
    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(exif) = &self.exif {
            for (ifd, tag) in exif.entries() {
                keys.push(format!("Exif.{}.{}", ifd.group(), registry::exif::name_of(ifd, tag.as_u16())));
            }
        }
        if let Some(iptc) = &self.iptc {
            for dataset in iptc.datasets() {
                let Some(record) = registry::iptc::record_name(dataset.record) else {
                    continue;
                };
                let key = format!("Iptc.{record}.{}", registry::iptc::name_of(dataset.record, dataset.number));
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        if let Some(xmp) = &self.xmp {
            for property in xmp.properties() {
                let key = format!("Xmp.{}.{}", property.prefix, property.name);
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Declared type and raw textual form of `key`, when present.
    pub(crate) fn get(&self, key: &str) -> Option<(TagType, Vec<u8>)> {
        match Location::of(key).ok()? {
            Location::Exif(ifd, id) => {
                let (tag_type, value) = self.exif.as_ref()?.get(ifd, id)?;
                Some((tag_type, format_raw(tag_type, &value)))
            }
            Location::Iptc(record, number) => {
                let values: Vec<&[u8]> = self.iptc.as_ref()?.values(record, number).collect();
                if values.is_empty() {
                    return None;
                }
                let tag_type = iptc_type(record, number);
                let raw = if tag_type == TagType::Short {
                    let numbers = values
                        .iter()
                        .map(|v| match v {
                            [hi, lo] => u16::from_be_bytes([*hi, *lo]).to_string(),
                            _ => String::from_utf8_lossy(v).into_owned(),
                        })
                        .collect::<Vec<_>>();
                    numbers.join(" ").into_bytes()
                } else if values.len() == 1 && !registry::iptc::is_repeatable(record, number) {
                    values[0].to_vec()
                } else {
                    let items: Vec<_> = values.iter().map(|v| String::from_utf8_lossy(v)).collect();
                    join_items(&items).into_bytes()
                };
                Some((tag_type, raw))
            }
            Location::Xmp(prefix, name) => {
                let (tag_type, value) = match self.xmp.as_ref()?.get(prefix, name)? {
                    XmpValue::Text(text) => (TagType::XmpText, Value::Text(text.clone().into_bytes())),
                    XmpValue::Bag(items) => (TagType::XmpBag, Value::Items(items.clone())),
                    XmpValue::Seq(items) => (TagType::XmpSeq, Value::Items(items.clone())),
                    XmpValue::Alt(alts) => (TagType::LangAlt, Value::LangAlt(alts.clone())),
                };
                Some((tag_type, format_raw(tag_type, &value)))
            }
        }
    }

    /// Type a value written to `key` is parsed as: the stored type when the
    /// tag exists, the registered one otherwise.
    pub(crate) fn tag_type(&self, key: &str) -> Option<TagType> {
        self.get(key)
            .map(|(tag_type, _)| tag_type)
            .or_else(|| registry::lookup(key).map(|info| info.tag_type))
    }

    /// Stored type of `key` and the namespace URI of its XMP prefix, for
    /// recreating the tag in another container.
    pub(crate) fn hint(&self, key: &str) -> TagHint {
        let namespace = match Location::of(key) {
            Ok(Location::Xmp(prefix, _)) => self.xmp.as_ref().and_then(|xmp| xmp.namespace_uri(prefix)),
            _ => None,
        };
        TagHint {
            tag_type: self.get(key).map(|(tag_type, _)| tag_type),
            namespace,
        }
    }

    /// Store the raw textual form `text` under `key`. On error the
    /// container is left untouched.
    pub(crate) fn set(&mut self, key: &str, text: &str) -> Result<(), TagUpdateError> {
        self.set_with(key, text, &TagHint::default())
    }

    /// [`set`](Self::set) for a tag the registry may not know: the type is
    /// the stored one, then the hinted one, then the registered one.
    pub(crate) fn set_with(&mut self, key: &str, text: &str, hint: &TagHint) -> Result<(), TagUpdateError> {
        let location = Location::of(key)?;
        let family = location.family();
        if !self.format.supports(family) {
            return Err(TagUpdateError::UnsupportedFamily {
                key: key.to_string(),
                family,
                format: self.format,
            });
        }
        let namespace = match location {
            Location::Xmp(prefix, _) => self
                .xmp
                .as_ref()
                .and_then(|xmp| xmp.namespace_uri(prefix))
                .or_else(|| hint.namespace.clone()),
            _ => None,
        };
        let tag_type = self
            .get(key)
            .map(|(tag_type, _)| tag_type)
            .or(hint.tag_type)
            .or_else(|| registry::lookup(key).map(|info| info.tag_type))
            .or_else(|| namespace.as_ref().map(|_| TagType::XmpText));
        let tag_type = tag_type.ok_or_else(|| TagUpdateError::UnknownTag { key: key.to_string() })?;
        let invalid = |reason: String| TagUpdateError::InvalidValue {
            key: key.to_string(),
            tag_type,
            reason,
        };
        let value = parse_value(tag_type, text).map_err(invalid)?;

        match location {
            Location::Exif(ifd, id) => {
                // a rejected value leaves the block as it was
                match self.exif.as_mut() {
                    Some(exif) => exif.set(ifd, id, tag_type, &value).map_err(invalid)?,
                    None => {
                        let mut exif = ExifBlock::default();
                        exif.set(ifd, id, tag_type, &value).map_err(invalid)?;
                        self.exif = Some(exif);
                    }
                }
                self.dirty.exif = true;
            }
            Location::Iptc(record, number) => {
                let datasets = iptc_datasets(record, number, tag_type, text, value).map_err(invalid)?;
                let iptc = self.iptc.get_or_insert_with(IptcData::default);
                if datasets.iter().any(|d| !d.is_ascii()) {
                    iptc.ensure_utf8();
                }
                iptc.set(record, number, datasets);
                self.dirty.iptc = true;
            }
            Location::Xmp(prefix, name) => {
                let value = match (tag_type, value) {
                    (TagType::XmpBag, Value::Items(items)) => XmpValue::Bag(items),
                    (TagType::XmpSeq, Value::Items(items)) => XmpValue::Seq(items),
                    (TagType::LangAlt, Value::LangAlt(alts)) => XmpValue::Alt(alts),
                    _ => XmpValue::Text(text.to_string()),
                };
                let mut packet = self.xmp.clone().unwrap_or_default();
                if let Some(uri) = &namespace {
                    packet.bind(prefix, uri);
                }
                packet
                    .set(prefix, name, value)
                    .map_err(|_| TagUpdateError::UnknownTag { key: key.to_string() })?;
                self.xmp = Some(packet);
                self.dirty.xmp = true;
            }
        }
        Ok(())
    }

    /// Remove `key`; returns whether it was present.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        let Ok(location) = Location::of(key) else {
            return false;
        };
        let removed = match location {
            Location::Exif(ifd, id) => self.exif.as_mut().is_some_and(|exif| exif.remove(ifd, id)),
            Location::Iptc(record, number) => self
                .iptc
                .as_mut()
                .is_some_and(|iptc| iptc.remove(record, number)),
            Location::Xmp(prefix, name) => self.xmp.as_mut().is_some_and(|xmp| xmp.remove(prefix, name)),
        };
        if removed {
            match location.family() {
                Family::Exif => self.dirty.exif = true,
                Family::Iptc => self.dirty.iptc = true,
                Family::Xmp => self.dirty.xmp = true,
            }
        }
        removed
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty != Dirty::default()
    }

    /// Write the edited sections into the file at `path`.
    pub(crate) fn save(&mut self, path: &Path) -> Result<(), ExifSaveError> {
        if !self.is_dirty() {
            return Ok(());
        }
        let container_error = |reason: String| ExifSaveError::Container {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|source| ExifSaveError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if ImageFormat::sniff(&bytes) != Some(self.format) {
            return Err(container_error(format!("file is no longer a {} image", self.format)));
        }
        let on_disk = carrier::extract(self.format, &bytes).map_err(container_error)?;

        let mut updates = SectionUpdates::default();
        if self.dirty.exif {
            updates.exif = match self.exif.as_ref().filter(|exif| !exif.is_empty()) {
                Some(exif) => Update::Replace(exif.serialize().map_err(container_error)?),
                None => Update::Remove,
            };
        }
        if self.dirty.iptc {
            let empty = IptcData::default();
            let iptc = self.iptc.as_ref().unwrap_or(&empty);
            updates.iptc = match iptc::build_app13(on_disk.iptc.as_deref(), iptc) {
                Some(contents) => Update::Replace(contents),
                None => Update::Remove,
            };
        }
        if self.dirty.xmp {
            updates.xmp = match self.xmp.as_ref().filter(|xmp| !xmp.is_empty()) {
                Some(xmp) => Update::Replace(xmp.serialize().into_bytes()),
                None => Update::Remove,
            };
        }

        let output = carrier::rewrite(self.format, bytes, &updates).map_err(container_error)?;
        std::fs::write(path, &output).map_err(|source| ExifSaveError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("{}: wrote {} bytes", path.display(), output.len());
        self.dirty = Dirty::default();
        Ok(())
    }
}

fn iptc_type(record: u8, number: u8) -> TagType {
    registry::iptc::by_number(record, number).map_or(TagType::String, |info| info.tag_type)
}

/// Dataset payloads for a parsed IPTC value.
fn iptc_datasets(record: u8, number: u8, tag_type: TagType, text: &str, value: Value) -> Result<Vec<Vec<u8>>, String> {
    let repeatable = registry::iptc::is_repeatable(record, number);
    let datasets: Vec<Vec<u8>> = match value {
        Value::Unsigned(numbers) => numbers
            .into_iter()
            .map(|n| u16::try_from(n).map(|n| n.to_be_bytes().to_vec()))
            .collect::<Result<_, _>>()
            .map_err(|_| format!("{tag_type} value out of range"))?,
        _ if repeatable => split_items(text)
            .into_iter()
            .filter(|item| !item.is_empty())
            .map(String::into_bytes)
            .collect(),
        _ => vec![text.as_bytes().to_vec()],
    };
    if datasets.len() > 1 && !repeatable {
        return Err("dataset holds a single value".to_string());
    }
    Ok(datasets)
}
