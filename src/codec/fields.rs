//! Codecs for the named single-value fields: description, user comment,
//! artist, copyright and capture timestamp.

use chrono::NaiveDateTime;

use super::charset::trim_nul;

pub const DESCRIPTION_KEY: &str = "Exif.Image.ImageDescription";
pub const COMMENT_KEY: &str = "Exif.Photo.UserComment";
pub const ARTIST_KEY: &str = "Exif.Image.Artist";
pub const COPYRIGHT_KEY: &str = "Exif.Image.Copyright";
pub const TIMESTAMP_KEY: &str = "Exif.Photo.DateTimeOriginal";

/// Textual layout of EXIF date/time values.
pub const TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

// 8-byte character codes that open an EXIF comment payload
const CODE_ASCII: &[u8; 8] = b"ASCII\0\0\0";
const CODE_UNICODE: &[u8; 8] = b"UNICODE\0";
const CODE_JIS: &[u8; 8] = b"JIS\0\0\0\0\0";
const CODE_UNDEFINED: &[u8; 8] = &[0; 8];

// ── description / copyright ─────────────────────────────────────────

pub fn decode_description(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

pub fn encode_description(text: &str) -> String {
    text.to_string()
}

pub fn decode_copyright(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

pub fn encode_copyright(text: &str) -> String {
    text.to_string()
}

// ── artist ──────────────────────────────────────────────────────────

/// Multiple artists are NUL-separated in the stored value; shown one per line.
pub fn decode_artist(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace('\0', "\n")
}

pub fn encode_artist(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\0")
}

// ── timestamp ───────────────────────────────────────────────────────

pub fn decode_timestamp(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT).ok()
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

// ── user comment ────────────────────────────────────────────────────

/// Strip whichever charset marker the comment carries and return the text.
///
/// Accepts the textual raw form (`charset="Ascii" text`), the binary
/// 8-byte character codes and the legacy `"ASCII "` / `"Unicode "` prefixes.
pub fn decode_comment(raw: &[u8]) -> String {
    if raw.starts_with(b"charset=") {
        let text = String::from_utf8_lossy(raw);
        let (_, body) = split_charset_marker(&text);
        return body.to_string();
    }
    if raw.len() >= 8 {
        let (code, body) = raw.split_at(8);
        if code == CODE_UNICODE {
            return decode_utf16(body);
        }
        if code == CODE_ASCII || code == CODE_JIS || code == CODE_UNDEFINED {
            return String::from_utf8_lossy(trim_nul(body)).into_owned();
        }
    }
    if let Some(body) = raw.strip_prefix(b"ASCII ") {
        return String::from_utf8_lossy(trim_nul(body)).into_owned();
    }
    if let Some(body) = raw.strip_prefix(b"Unicode ") {
        return String::from_utf8_lossy(trim_nul(body)).into_owned();
    }
    String::from_utf8_lossy(trim_nul(raw)).into_owned()
}

/// Raw textual form for a new comment: ASCII when the text is strict ASCII,
/// Unicode otherwise.
pub fn encode_comment(text: &str) -> String {
    if text.is_ascii() {
        format!("charset=\"Ascii\" {text}")
    } else {
        format!("charset=\"Unicode\" {text}")
    }
}

/// Build the stored comment payload (8-byte code + body) from its textual
/// raw form. Unicode bodies are UTF-16LE.
pub(crate) fn encode_comment_binary(text: &str) -> Result<Vec<u8>, String> {
    let (charset, body) = split_charset_marker(text);
    let charset = match charset {
        Some(name) => name.to_ascii_lowercase(),
        None if body.is_ascii() => "ascii".to_string(),
        None => "unicode".to_string(),
    };
    let (code, payload) = match charset.as_str() {
        "ascii" if body.is_ascii() => (CODE_ASCII, body.as_bytes().to_vec()),
        "ascii" => return Err("comment text is not plain ASCII".to_string()),
        "unicode" => (CODE_UNICODE, encode_utf16le(body)),
        "jis" => (CODE_JIS, body.as_bytes().to_vec()),
        "undefined" => (CODE_UNDEFINED, body.as_bytes().to_vec()),
        other => return Err(format!("unknown comment charset `{other}`")),
    };
    let mut bytes = Vec::with_capacity(8 + payload.len());
    bytes.extend_from_slice(code);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Textual raw form of a stored comment payload.
pub(crate) fn format_comment_binary(bytes: &[u8]) -> String {
    if bytes.len() < 8 {
        return String::from_utf8_lossy(trim_nul(bytes)).into_owned();
    }
    let (code, body) = bytes.split_at(8);
    if code == CODE_ASCII {
        format!("charset=\"Ascii\" {}", String::from_utf8_lossy(trim_nul(body)))
    } else if code == CODE_UNICODE {
        format!("charset=\"Unicode\" {}", decode_utf16(body))
    } else if code == CODE_JIS {
        format!("charset=\"Jis\" {}", String::from_utf8_lossy(trim_nul(body)))
    } else if code == CODE_UNDEFINED {
        String::from_utf8_lossy(trim_nul(body)).into_owned()
    } else {
        String::from_utf8_lossy(trim_nul(bytes)).into_owned()
    }
}

/// `charset="Ascii" text` → `(Some("Ascii"), "text")`; no marker → `(None, text)`.
fn split_charset_marker(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text.strip_prefix("charset=") else {
        return (None, text);
    };
    let (name, after) = match rest.strip_prefix('"') {
        Some(quoted) => match quoted.split_once('"') {
            Some((name, after)) => (name, after),
            None => (quoted, ""),
        },
        None => rest.split_once(' ').map_or((rest, ""), |(name, after)| (name, after)),
    };
    let body = after.strip_prefix(' ').unwrap_or(after);
    (Some(name), body)
}

// ── UTF-16 ──────────────────────────────────────────────────────────

pub(crate) fn encode_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// Decode UTF-16 of unknown byte order: a BOM wins, otherwise the position
/// of zero bytes decides (ASCII-range text has its zero byte second in LE).
pub(crate) fn decode_utf16(bytes: &[u8]) -> String {
    let (big_endian, body) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (true, rest),
        [0xFF, 0xFE, rest @ ..] => (false, rest),
        _ => {
            let zeros_even = bytes.iter().step_by(2).filter(|&&b| b == 0).count();
            let zeros_odd = bytes.iter().skip(1).step_by(2).filter(|&&b| b == 0).count();
            (zeros_even > zeros_odd, bytes)
        }
    };
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    let end = units.iter().rposition(|&u| u != 0).map_or(0, |p| p + 1);
    String::from_utf16_lossy(&units[..end])
}
