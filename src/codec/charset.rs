use serde::{Deserialize, Serialize};

/// Single-byte charset used when a binary payload has to be shown as text.
///
/// Decoding never fails: C1 control bytes and other unmapped values become
/// U+FFFD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackCharset {
    /// ISO-8859-1 (Western European).
    Latin1,
    /// ISO-8859-2 (Central European).
    #[default]
    Latin2,
}

// ISO-8859-2, bytes 0xA0..=0xFF
const LATIN2_HIGH: [char; 96] = [
    '\u{00A0}', 'Ą', '˘', 'Ł', '¤', 'Ľ', 'Ś', '§', '¨', 'Š', 'Ş', 'Ť', 'Ź', '\u{00AD}', 'Ž', 'Ż',
    '°', 'ą', '˛', 'ł', '´', 'ľ', 'ś', 'ˇ', '¸', 'š', 'ş', 'ť', 'ź', '˝', 'ž', 'ż',
    'Ŕ', 'Á', 'Â', 'Ă', 'Ä', 'Ĺ', 'Ć', 'Ç', 'Č', 'É', 'Ę', 'Ë', 'Ě', 'Í', 'Î', 'Ď',
    'Đ', 'Ń', 'Ň', 'Ó', 'Ô', 'Ő', 'Ö', '×', 'Ř', 'Ů', 'Ú', 'Ű', 'Ü', 'Ý', 'Ţ', 'ß',
    'ŕ', 'á', 'â', 'ă', 'ä', 'ĺ', 'ć', 'ç', 'č', 'é', 'ę', 'ë', 'ě', 'í', 'î', 'ď',
    'đ', 'ń', 'ň', 'ó', 'ô', 'ő', 'ö', '÷', 'ř', 'ů', 'ú', 'ű', 'ü', 'ý', 'ţ', '˙',
];

impl FallbackCharset {
    /// Decode `bytes` lossily. Embedded NULs are kept as `\0`.
    pub fn decode(self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| self.decode_byte(b)).collect()
    }

    fn decode_byte(self, byte: u8) -> char {
        match byte {
            0x00 | b'\t' | b'\n' | b'\r' => byte as char,
            0x01..=0x1F | 0x7F..=0x9F => char::REPLACEMENT_CHARACTER,
            0x20..=0x7E => byte as char,
            _ => match self {
                Self::Latin1 => byte as char,
                Self::Latin2 => LATIN2_HIGH[(byte - 0xA0) as usize],
            },
        }
    }
}

/// True when every byte is printable in the fallback charset (trailing NULs
/// allowed).
pub(crate) fn is_printable(bytes: &[u8]) -> bool {
    let trimmed = trim_nul(bytes);
    !trimmed.is_empty()
        && trimmed
            .iter()
            .all(|&b| matches!(b, b'\t' | b'\n' | b'\r' | 0x20..=0x7E | 0xA0..=0xFF))
}

pub(crate) fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin2_maps_polish_letters() {
        // "Będkowski" in ISO-8859-2
        let bytes = [0x42, 0xEA, 0x64, 0x6B, 0x6F, 0x77, 0x73, 0x6B, 0x69];
        assert_eq!(FallbackCharset::Latin2.decode(&bytes), "Będkowski");
    }

    #[test]
    fn latin1_is_identity_above_a0() {
        assert_eq!(FallbackCharset::Latin1.decode(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn control_bytes_become_replacement() {
        let decoded = FallbackCharset::Latin2.decode(&[0x41, 0x85, 0x01]);
        assert_eq!(decoded, "A\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn printable_ignores_trailing_nul() {
        assert!(is_printable(b"0221\0\0"));
        assert!(!is_printable(&[1, 2, 3, 0]));
        assert!(!is_printable(b"\0\0"));
    }
}
