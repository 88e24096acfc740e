use std::fmt;
use std::str::FromStr;

use super::fields;

/// Declared type of a tag value.
///
/// The EXIF binary formats share the decode path of `Undefined`: their
/// display string comes from the generic interpretation routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Ascii,
    String,
    /// EXIF undefined payload with an 8-byte charset code (UserComment).
    Comment,
    XmpText,
    XmpSeq,
    XmpBag,
    LangAlt,
    Byte,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
}

/// How [`TagCodec::decode`](super::TagCodec::decode) derives the display
/// string for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Lossy UTF-8 of the raw payload.
    Text,
    /// Strip the leading `lang="..."` qualifier.
    LangAlt,
    /// Per-tag interpretation of the parsed value.
    Interpret,
}

impl TagType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ascii => "Ascii",
            Self::String => "String",
            Self::Comment => "Comment",
            Self::XmpText => "XmpText",
            Self::XmpSeq => "XmpSeq",
            Self::XmpBag => "XmpBag",
            Self::LangAlt => "LangAlt",
            Self::Byte => "Byte",
            Self::Short => "Short",
            Self::Long => "Long",
            Self::Rational => "Rational",
            Self::SByte => "SByte",
            Self::Undefined => "Undefined",
            Self::SShort => "SShort",
            Self::SLong => "SLong",
            Self::SRational => "SRational",
            Self::Float => "Float",
            Self::Double => "Double",
        }
    }

    pub fn strategy(self) -> DecodeStrategy {
        match self {
            Self::Ascii | Self::String | Self::XmpText | Self::XmpSeq | Self::XmpBag => {
                DecodeStrategy::Text
            }
            Self::LangAlt => DecodeStrategy::LangAlt,
            _ => DecodeStrategy::Interpret,
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed value as held by the container.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Ascii, String and XmpText payloads, kept as stored.
    Text(Vec<u8>),
    /// Byte, Undefined and Comment payloads.
    Bytes(Vec<u8>),
    Unsigned(Vec<u32>),
    Signed(Vec<i32>),
    Rational(Vec<(u32, u32)>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f64>),
    /// XmpSeq / XmpBag items.
    Items(Vec<String>),
    /// LangAlt alternatives as `(lang, text)`.
    LangAlt(Vec<(String, String)>),
}

const ITEM_SEPARATOR: &str = ", ";

/// Parse the raw textual form of a value for `tag_type`.
pub fn parse(tag_type: TagType, text: &str) -> Result<Value, String> {
    match tag_type {
        TagType::Ascii | TagType::String | TagType::XmpText => {
            Ok(Value::Text(text.as_bytes().to_vec()))
        }
        TagType::Comment => fields::encode_comment_binary(text).map(Value::Bytes),
        TagType::XmpSeq | TagType::XmpBag => Ok(Value::Items(split_items(text))),
        TagType::LangAlt => Ok(Value::LangAlt(parse_lang_alt(text))),
        TagType::Byte | TagType::Undefined => numbers::<u8>(text).map(Value::Bytes),
        TagType::Short => numbers::<u16>(text)
            .map(|v| Value::Unsigned(v.into_iter().map(u32::from).collect())),
        TagType::Long => numbers::<u32>(text).map(Value::Unsigned),
        TagType::SByte => {
            numbers::<i8>(text).map(|v| Value::Signed(v.into_iter().map(i32::from).collect()))
        }
        TagType::SShort => {
            numbers::<i16>(text).map(|v| Value::Signed(v.into_iter().map(i32::from).collect()))
        }
        TagType::SLong => numbers::<i32>(text).map(Value::Signed),
        TagType::Rational => items(text)?
            .into_iter()
            .map(parse_unsigned_rational)
            .collect::<Result<_, _>>()
            .map(Value::Rational),
        TagType::SRational => items(text)?
            .into_iter()
            .map(parse_signed_rational)
            .collect::<Result<_, _>>()
            .map(Value::SRational),
        TagType::Float | TagType::Double => numbers::<f64>(text).map(Value::Float),
    }
}

/// Render the raw textual form of `value`.
pub fn format_raw(tag_type: TagType, value: &Value) -> Vec<u8> {
    match value {
        Value::Text(bytes) => bytes.clone(),
        Value::Bytes(bytes) if tag_type == TagType::Comment => {
            fields::format_comment_binary(bytes).into_bytes()
        }
        Value::Bytes(bytes) => join(bytes.iter(), " "),
        Value::Unsigned(v) => join(v.iter(), " "),
        Value::Signed(v) => join(v.iter(), " "),
        Value::Rational(v) => join(v.iter().map(|(n, d)| format!("{n}/{d}")), " "),
        Value::SRational(v) => join(v.iter().map(|(n, d)| format!("{n}/{d}")), " "),
        // single precision values print at their own precision
        Value::Float(v) if tag_type == TagType::Float => join(v.iter().map(|&x| x as f32), " "),
        Value::Float(v) => join(v.iter(), " "),
        Value::Items(items) => join_items(items).into_bytes(),
        Value::LangAlt(alts) => join(
            alts.iter().map(|(lang, text)| format!("lang=\"{lang}\" {text}")),
            ITEM_SEPARATOR,
        ),
    }
}

fn join<T: fmt::Display>(items: impl Iterator<Item = T>, separator: &str) -> Vec<u8> {
    items
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator)
        .into_bytes()
}

fn items(text: &str) -> Result<Vec<&str>, String> {
    let items: Vec<&str> = text.split_whitespace().collect();
    if items.is_empty() {
        return Err("empty value".to_string());
    }
    Ok(items)
}

fn numbers<T: FromStr>(text: &str) -> Result<Vec<T>, String> {
    items(text)?
        .into_iter()
        .map(|item| {
            item.parse::<T>()
                .map_err(|_| format!("`{item}` is not a valid number for this type"))
        })
        .collect()
}

/// Join list items into one raw value. A comma or backslash inside an item
/// is escaped with a backslash so the value splits back into the same items.
pub(crate) fn join_items<S: AsRef<str>>(items: &[S]) -> String {
    let escaped: Vec<String> = items
        .iter()
        .map(|item| {
            let mut out = String::with_capacity(item.as_ref().len());
            for c in item.as_ref().chars() {
                if matches!(c, ',' | '\\') {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        })
        .collect();
    escaped.join(ITEM_SEPARATOR)
}

/// Split a raw list on unescaped `, `. A backslash before anything but a
/// comma or another backslash is kept as is.
pub(crate) fn split_items(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some(',' | '\\')) => current.extend(chars.next()),
            ',' if chars.peek() == Some(&' ') => {
                chars.next();
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    items.push(current);
    items
}

/// `lang="x-default" A, lang="pl" B` → alternatives; text without a
/// qualifier becomes the `x-default` entry.
fn parse_lang_alt(text: &str) -> Vec<(String, String)> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut alts = Vec::new();
    for chunk in split_lang_chunks(text) {
        match chunk
            .strip_prefix("lang=\"")
            .and_then(|rest| rest.split_once('"'))
        {
            Some((lang, rest)) => {
                let text = rest.strip_prefix(' ').unwrap_or(rest);
                alts.push((lang.to_string(), text.to_string()));
            }
            None => alts.push(("x-default".to_string(), chunk.to_string())),
        }
    }
    alts
}

fn split_lang_chunks(text: &str) -> Vec<&str> {
    const NEXT: &str = ", lang=\"";
    let mut chunks = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(NEXT) {
        chunks.push(&rest[..pos]);
        rest = &rest[pos + ITEM_SEPARATOR.len()..];
    }
    chunks.push(rest);
    chunks
}

fn parse_unsigned_rational(item: &str) -> Result<(u32, u32), String> {
    let invalid = || format!("`{item}` is not a valid rational");
    if let Some((n, d)) = item.split_once('/') {
        return Ok((n.parse().map_err(|_| invalid())?, d.parse().map_err(|_| invalid())?));
    }
    let (n, d) = decimal_fraction(item).ok_or_else(invalid)?;
    Ok((u32::try_from(n).map_err(|_| invalid())?, d))
}

fn parse_signed_rational(item: &str) -> Result<(i32, i32), String> {
    let invalid = || format!("`{item}` is not a valid rational");
    if let Some((n, d)) = item.split_once('/') {
        return Ok((n.parse().map_err(|_| invalid())?, d.parse().map_err(|_| invalid())?));
    }
    let (n, d) = decimal_fraction(item).ok_or_else(invalid)?;
    Ok((
        i32::try_from(n).map_err(|_| invalid())?,
        i32::try_from(d).map_err(|_| invalid())?,
    ))
}

/// `"2.8"` → `(28, 10)`, `"-4"` → `(-4, 1)`; at most six fractional digits.
fn decimal_fraction(item: &str) -> Option<(i64, u32)> {
    let (negative, digits) = match item.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, item.strip_prefix('+').unwrap_or(item)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if (int_part.is_empty() && frac_part.is_empty())
        || frac_part.len() > 6
        || !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let denominator = 10u32.pow(frac_part.len() as u32);
    let int_value: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let frac_value: i64 = if frac_part.is_empty() { 0 } else { frac_part.parse().ok()? };
    let mut numerator = int_value
        .checked_mul(i64::from(denominator))?
        .checked_add(frac_value)?;
    let divisor = gcd(numerator.unsigned_abs(), u64::from(denominator));
    numerator /= divisor as i64;
    let denominator = denominator / divisor as u32;
    if negative {
        numerator = -numerator;
    }
    Some((numerator, denominator))
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a.max(1) } else { gcd(b, a % b) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(tag_type: TagType, text: &str) -> String {
        let value = parse(tag_type, text).unwrap();
        String::from_utf8(format_raw(tag_type, &value)).unwrap()
    }

    #[test]
    fn strategy_table() {
        assert_eq!(TagType::Ascii.strategy(), DecodeStrategy::Text);
        assert_eq!(TagType::XmpBag.strategy(), DecodeStrategy::Text);
        assert_eq!(TagType::LangAlt.strategy(), DecodeStrategy::LangAlt);
        assert_eq!(TagType::Undefined.strategy(), DecodeStrategy::Interpret);
        assert_eq!(TagType::Rational.strategy(), DecodeStrategy::Interpret);
    }

    // ── numeric types ───────────────────────────────────────────────

    #[test]
    fn short_rejects_out_of_range() {
        assert!(parse(TagType::Short, "70000").is_err());
        assert!(parse(TagType::Short, "abc").is_err());
        assert!(parse(TagType::Short, "").is_err());
        assert_eq!(parse(TagType::Short, "1 6").unwrap(), Value::Unsigned(vec![1, 6]));
    }

    #[test]
    fn rational_accepts_fraction_integer_and_decimal() {
        assert_eq!(
            parse(TagType::Rational, "72/1 5 2.8").unwrap(),
            Value::Rational(vec![(72, 1), (5, 1), (14, 5)])
        );
        assert!(parse(TagType::Rational, "-1/3").is_err());
        assert_eq!(
            parse(TagType::SRational, "-1/3 -0.5").unwrap(),
            Value::SRational(vec![(-1, 3), (-1, 2)])
        );
    }

    #[test]
    fn undefined_is_decimal_byte_list() {
        assert_eq!(raw(TagType::Undefined, "48 50  50 49"), "48 50 50 49");
        assert!(parse(TagType::Undefined, "256").is_err());
    }

    // ── XMP types ───────────────────────────────────────────────────

    #[test]
    fn bag_splits_on_comma_space() {
        assert_eq!(
            parse(TagType::XmpBag, "sea, sunset").unwrap(),
            Value::Items(vec!["sea".into(), "sunset".into()])
        );
        assert_eq!(parse(TagType::XmpBag, "").unwrap(), Value::Items(Vec::new()));
    }

    #[test]
    fn items_with_commas_survive_join_and_split() {
        let items = vec!["Smith, John".to_string(), "C:\\photos".to_string(), "sea".to_string()];
        let raw = join_items(&items);
        assert_eq!(raw, "Smith\\, John, C:\\\\photos, sea");
        assert_eq!(split_items(&raw), items);
        assert_eq!(
            parse(TagType::XmpSeq, &raw).unwrap(),
            Value::Items(items.clone())
        );
        assert_eq!(format_raw(TagType::XmpSeq, &Value::Items(items)), raw.as_bytes());
        // a lone backslash is literal
        assert_eq!(split_items("a\\b, c"), ["a\\b", "c"]);
    }

    #[test]
    fn lang_alt_with_and_without_qualifier() {
        assert_eq!(
            parse(TagType::LangAlt, "Sunset").unwrap(),
            Value::LangAlt(vec![("x-default".into(), "Sunset".into())])
        );
        assert_eq!(
            parse(TagType::LangAlt, "lang=\"x-default\" Hi, there, lang=\"pl\" Cześć").unwrap(),
            Value::LangAlt(vec![
                ("x-default".into(), "Hi, there".into()),
                ("pl".into(), "Cześć".into()),
            ])
        );
        assert_eq!(raw(TagType::LangAlt, "Sunset"), "lang=\"x-default\" Sunset");
    }

    #[test]
    fn text_keeps_embedded_nul() {
        assert_eq!(raw(TagType::Ascii, "A\0B"), "A\0B");
    }
}
