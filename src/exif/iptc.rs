//! IPTC-IIM datasets, carried in a Photoshop image resource block
//! (APP13 segment, `8BIM` resource 0x0404).

pub(crate) const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
const IPTC_RESOURCE: u16 = 0x0404;
const DATASET_MARKER: u8 = 0x1C;

/// Coded character set escape announcing UTF-8 (dataset 1:90).
pub(crate) const UTF8_CHARSET: &[u8] = b"\x1b%G";
const CHARSET_DATASET: (u8, u8) = (1, 90);
const RECORD_VERSION_DATASET: (u8, u8) = (2, 0);
const RECORD_VERSION: u16 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dataset {
    pub record: u8,
    pub number: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IptcData {
    datasets: Vec<Dataset>,
}

impl IptcData {
    /// IIM data from a Photoshop resource block; `None` when the block has
    /// no IPTC resource.
    pub(crate) fn from_app13(contents: &[u8]) -> Result<Option<Self>, String> {
        let Some(body) = contents.strip_prefix(PHOTOSHOP_HEADER) else {
            return Err("missing Photoshop 3.0 header".to_string());
        };
        resources(body)
            .into_iter()
            .find(|r| r.id == IPTC_RESOURCE)
            .map(|r| Self::parse(&body[r.data.clone()]))
            .transpose()
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Self, String> {
        let mut datasets = Vec::new();
        let mut pos = 0;
        // trailing padding ends the dataset stream
        while pos + 5 <= data.len() && data[pos] == DATASET_MARKER {
            let record = data[pos + 1];
            let number = data[pos + 2];
            let declared = u16::from_be_bytes([data[pos + 3], data[pos + 4]]);
            pos += 5;
            let len = if declared & 0x8000 != 0 {
                let size = usize::from(declared & 0x7FFF);
                if size > 4 || pos + size > data.len() {
                    return Err(format!("dataset {record}:{number} has a bad extended length"));
                }
                let len = data[pos..pos + size]
                    .iter()
                    .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
                pos += size;
                len
            } else {
                usize::from(declared)
            };
            let Some(value) = data.get(pos..pos + len) else {
                return Err(format!("dataset {record}:{number} is truncated"));
            };
            datasets.push(Dataset {
                record,
                number,
                data: value.to_vec(),
            });
            pos += len;
        }
        Ok(Self { datasets })
    }

    pub(crate) fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub(crate) fn values(&self, record: u8, number: u8) -> impl Iterator<Item = &[u8]> + '_ {
        self.datasets
            .iter()
            .filter(move |d| d.record == record && d.number == number)
            .map(|d| d.data.as_slice())
    }

    /// Replace every occurrence of `record:number` with `values`, keeping the
    /// position of the first occurrence.
    pub(crate) fn set(&mut self, record: u8, number: u8, values: Vec<Vec<u8>>) {
        let position = self
            .datasets
            .iter()
            .position(|d| d.record == record && d.number == number)
            .unwrap_or(self.datasets.len());
        self.datasets.retain(|d| d.record != record || d.number != number);
        let position = position.min(self.datasets.len());
        let replacement = values.into_iter().map(|data| Dataset { record, number, data });
        self.datasets.splice(position..position, replacement);
    }

    pub(crate) fn remove(&mut self, record: u8, number: u8) -> bool {
        let before = self.datasets.len();
        self.datasets.retain(|d| d.record != record || d.number != number);
        self.datasets.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Announce UTF-8 text unless the block already declares a charset.
    pub(crate) fn ensure_utf8(&mut self) {
        let (record, number) = CHARSET_DATASET;
        if self.values(record, number).next().is_none() {
            self.set(record, number, vec![UTF8_CHARSET.to_vec()]);
        }
    }

    /// Datasets ordered by record and number; application records get the
    /// mandatory record version first.
    pub(crate) fn serialize(&self) -> Vec<u8> {
        let mut datasets: Vec<&Dataset> = self.datasets.iter().collect();
        let version = Dataset {
            record: RECORD_VERSION_DATASET.0,
            number: RECORD_VERSION_DATASET.1,
            data: RECORD_VERSION.to_be_bytes().to_vec(),
        };
        let (record, number) = RECORD_VERSION_DATASET;
        if datasets.iter().any(|d| d.record == record) && self.values(record, number).next().is_none() {
            datasets.push(&version);
        }
        datasets.sort_by_key(|d| (d.record, d.number));

        let mut out = Vec::new();
        for dataset in datasets {
            out.extend_from_slice(&[DATASET_MARKER, dataset.record, dataset.number]);
            match u16::try_from(dataset.data.len()) {
                Ok(len) if len < 0x8000 => out.extend_from_slice(&len.to_be_bytes()),
                _ => {
                    out.extend_from_slice(&0x8004u16.to_be_bytes());
                    out.extend_from_slice(&(dataset.data.len() as u32).to_be_bytes());
                }
            }
            out.extend_from_slice(&dataset.data);
        }
        out
    }
}

/// Build APP13 contents: the other resources of `existing` are preserved
/// and the IPTC resource is replaced. `None` when nothing is left to store.
pub(crate) fn build_app13(existing: Option<&[u8]>, iptc: &IptcData) -> Option<Vec<u8>> {
    let mut result = PHOTOSHOP_HEADER.to_vec();
    let mut preserved = 0;

    if let Some(body) = existing.and_then(|data| data.strip_prefix(PHOTOSHOP_HEADER)) {
        for resource in resources(body) {
            if resource.id != IPTC_RESOURCE {
                result.extend_from_slice(&body[resource.span]);
                preserved += 1;
            }
        }
    }

    if iptc.is_empty() {
        return (preserved > 0).then_some(result);
    }

    let iim = iptc.serialize();
    result.extend_from_slice(RESOURCE_SIGNATURE);
    result.extend_from_slice(&IPTC_RESOURCE.to_be_bytes());
    result.push(0x00); // empty pascal name
    result.push(0x00); // padded to even
    result.extend_from_slice(&(iim.len() as u32).to_be_bytes());
    result.extend_from_slice(&iim);
    if iim.len() % 2 != 0 {
        result.push(0x00);
    }
    Some(result)
}

struct Resource {
    id: u16,
    /// Whole resource including padding.
    span: std::ops::Range<usize>,
    /// Resource payload.
    data: std::ops::Range<usize>,
}

/// Walk the `8BIM` resources of a Photoshop block body.
fn resources(body: &[u8]) -> Vec<Resource> {
    let mut found = Vec::new();
    let mut pos = 0;
    while pos + 12 <= body.len() {
        if &body[pos..pos + 4] != RESOURCE_SIGNATURE {
            break;
        }
        let id = u16::from_be_bytes([body[pos + 4], body[pos + 5]]);
        // pascal string: length byte + text, padded to even
        let name_len = usize::from(body[pos + 6]);
        let name_padded = if (name_len + 1) % 2 == 0 { name_len + 1 } else { name_len + 2 };
        let data_start = pos + 6 + name_padded;
        if data_start + 4 > body.len() {
            break;
        }
        let data_len = u32::from_be_bytes([
            body[data_start],
            body[data_start + 1],
            body[data_start + 2],
            body[data_start + 3],
        ]) as usize;
        let payload_start = data_start + 4;
        let payload_end = payload_start.saturating_add(data_len).min(body.len());
        let end = (payload_start.saturating_add(data_len + data_len % 2)).min(body.len());
        found.push(Resource {
            id,
            span: pos..end,
            data: payload_start..payload_end,
        });
        pos = end;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> IptcData {
        let mut iptc = IptcData::default();
        iptc.set(2, 25, vec![b"sea".to_vec(), b"sunset".to_vec()]);
        iptc.set(2, 120, vec![b"Evening at the beach".to_vec()]);
        iptc
    }

    // ── datasets ────────────────────────────────────────────────────

    #[test]
    fn serialize_adds_record_version() {
        let parsed = IptcData::parse(&keywords().serialize()).unwrap();
        let first = &parsed.datasets()[0];
        assert_eq!((first.record, first.number), (2, 0));
        assert_eq!(first.data, vec![0, 4]);
        let words: Vec<&[u8]> = parsed.values(2, 25).collect();
        assert_eq!(words, vec![b"sea".as_slice(), b"sunset".as_slice()]);
    }

    #[test]
    fn set_replaces_all_occurrences_in_place() {
        let mut iptc = keywords();
        iptc.set(2, 25, vec![b"dune".to_vec()]);
        assert_eq!(iptc.values(2, 25).count(), 1);
        assert_eq!(iptc.datasets()[0].data, b"dune");
        assert!(iptc.remove(2, 25));
        assert!(!iptc.remove(2, 25));
    }

    #[test]
    fn extended_length_dataset() {
        let mut iptc = IptcData::default();
        iptc.set(2, 202, vec![vec![7u8; 40_000]]);
        let parsed = IptcData::parse(&iptc.serialize()).unwrap();
        assert_eq!(parsed.values(2, 202).next().map(<[u8]>::len), Some(40_000));
    }

    #[test]
    fn truncated_dataset_is_an_error() {
        assert!(IptcData::parse(&[0x1C, 2, 120, 0, 10, b'a']).is_err());
        assert!(IptcData::parse(&[0, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn utf8_charset_added_once() {
        let mut iptc = keywords();
        iptc.ensure_utf8();
        iptc.ensure_utf8();
        assert_eq!(iptc.values(1, 90).collect::<Vec<_>>(), vec![UTF8_CHARSET]);
    }

    // ── resource block ──────────────────────────────────────────────

    #[test]
    fn app13_preserves_other_resources() {
        let mut existing = PHOTOSHOP_HEADER.to_vec();
        existing.extend_from_slice(b"8BIM\x03\xed\x00\x00\x00\x00\x00\x02\xab\xcd");
        let contents = build_app13(Some(&existing), &keywords()).unwrap();
        assert!(contents.windows(4).any(|w| w == b"\x03\xed\x00\x00"));
        let iptc = IptcData::from_app13(&contents).unwrap().unwrap();
        assert_eq!(iptc.values(2, 120).next(), Some(b"Evening at the beach".as_slice()));

        let emptied = build_app13(Some(&contents), &IptcData::default()).unwrap();
        assert!(IptcData::from_app13(&emptied).unwrap().is_none());
    }

    #[test]
    fn app13_without_anything_left_is_dropped() {
        assert!(build_app13(None, &IptcData::default()).is_none());
        assert!(IptcData::from_app13(b"not photoshop").is_err());
    }
}
