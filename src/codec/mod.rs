//! Decoding of raw tag payloads into display values.
//!
//! [`TagCodec::decode`] turns the raw textual form of a tag into a
//! [`TagValue`]. Decoding never fails: payloads that cannot be understood
//! still produce a display string, and the problem is recorded as a
//! [`DecodeAnomaly`] on the returned value.
//!
//! The [`fields`] module holds the codecs for the named single-value fields
//! (description, comment, artist, copyright, timestamp).

mod charset;
pub mod fields;
mod interpret;
mod value;

use std::fmt;

pub use charset::FallbackCharset;
pub use value::{DecodeStrategy, TagType};
pub(crate) use value::{Value, format_raw, join_items, parse as parse_value, split_items};

use crate::registry::{self, Print};

/// Display string used when a LangAlt payload carries no language qualifier.
pub const LANG_ALT_PLACEHOLDER: &str = "\u{FFFD}";

/// Something odd noticed while decoding. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeAnomaly {
    /// LangAlt payload without a `lang="..."` qualifier.
    MissingLangPrefix,
    /// Text payload that is not valid UTF-8; shown with replacement characters.
    InvalidUtf8,
    /// Raw form does not parse for the declared type; shown as Latin text.
    UnparsableRaw(String),
}

impl fmt::Display for DecodeAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLangPrefix => f.write_str("LangAlt value without lang qualifier"),
            Self::InvalidUtf8 => f.write_str("text value is not valid UTF-8"),
            Self::UnparsableRaw(reason) => write!(f, "raw value does not parse: {reason}"),
        }
    }
}

/// A tag value as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagValue {
    /// Raw textual form, UTF-8 with replacement characters.
    pub raw: String,
    /// Display form derived from `raw`.
    pub interpreted: String,
    pub anomaly: Option<DecodeAnomaly>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagCodec {
    charset: FallbackCharset,
}

impl TagCodec {
    pub fn new(charset: FallbackCharset) -> Self {
        Self { charset }
    }

    pub fn charset(&self) -> FallbackCharset {
        self.charset
    }

    /// Decode the raw textual form of the tag `key` declared as `tag_type`.
    pub fn decode(&self, key: &str, tag_type: TagType, raw: &[u8]) -> TagValue {
        let raw_text = String::from_utf8_lossy(raw);
        let mut anomaly = None;
        let interpreted = match tag_type.strategy() {
            DecodeStrategy::Text => {
                if std::str::from_utf8(raw).is_err() {
                    anomaly = Some(DecodeAnomaly::InvalidUtf8);
                }
                raw_text.to_string()
            }
            DecodeStrategy::LangAlt => {
                if raw_text.contains("lang=\"") {
                    raw_text
                        .split_once(' ')
                        .map_or_else(String::new, |(_, text)| text.to_string())
                } else {
                    anomaly = Some(DecodeAnomaly::MissingLangPrefix);
                    LANG_ALT_PLACEHOLDER.to_string()
                }
            }
            DecodeStrategy::Interpret => match parse_value(tag_type, &raw_text) {
                Ok(value) => {
                    let print = registry::lookup(key).map_or(Print::Value, |info| info.print);
                    interpret::interpret(print, &value, self.charset)
                }
                Err(reason) => {
                    anomaly = Some(DecodeAnomaly::UnparsableRaw(reason));
                    self.charset.decode(raw)
                }
            },
        };
        TagValue {
            raw: raw_text.into_owned(),
            interpreted,
            anomaly,
        }
    }

    /// Registered label of `key`, or the key itself.
    pub fn decode_label(key: &str) -> String {
        registry::lookup(key)
            .map(|info| info.label.into_owned())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| key.to_string())
    }

    /// Registered description of `key`, or an empty string.
    pub fn decode_description(key: &str) -> String {
        registry::lookup(key)
            .map(|info| info.description.to_string())
            .unwrap_or_default()
    }
}
