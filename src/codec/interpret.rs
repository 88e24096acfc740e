//! Human-readable rendering of binary tag values.

use super::charset::{FallbackCharset, is_printable, trim_nul};
use super::fields;
use super::value::Value;
use crate::registry::Print;

/// Render `value` with the tag's printer, falling back to the generic form
/// when the printer does not apply to the stored shape.
pub(crate) fn interpret(print: Print, value: &Value, charset: FallbackCharset) -> String {
    specific(print, value).unwrap_or_else(|| generic(value, charset))
}

fn generic(value: &Value, charset: FallbackCharset) -> String {
    match value {
        Value::Text(bytes) => match std::str::from_utf8(trim_nul(bytes)) {
            Ok(text) => text.to_string(),
            Err(_) => charset.decode(trim_nul(bytes)),
        },
        Value::Bytes(bytes) if is_printable(bytes) => charset.decode(trim_nul(bytes)),
        Value::Bytes(bytes) => join(bytes.iter(), " "),
        Value::Unsigned(v) => join(v.iter(), " "),
        Value::Signed(v) => join(v.iter(), " "),
        Value::Rational(v) => join(v.iter().map(|(n, d)| format!("{n}/{d}")), " "),
        Value::SRational(v) => join(v.iter().map(|(n, d)| format!("{n}/{d}")), " "),
        Value::Float(v) => join(v.iter(), " "),
        Value::Items(items) => items.join(", "),
        Value::LangAlt(alts) => alts.first().map(|(_, text)| text.clone()).unwrap_or_default(),
    }
}

fn specific(print: Print, value: &Value) -> Option<String> {
    match print {
        Print::Value => None,
        Print::Orientation => enumerated(value, ORIENTATION),
        Print::ResolutionUnit => enumerated(value, RESOLUTION_UNIT),
        Print::YCbCrPositioning => enumerated(value, YCBCR_POSITIONING),
        Print::ExposureProgram => enumerated(value, EXPOSURE_PROGRAM),
        Print::MeteringMode => enumerated(value, METERING_MODE),
        Print::LightSource => enumerated(value, LIGHT_SOURCE),
        Print::ColorSpace => enumerated(value, COLOR_SPACE),
        Print::SensingMethod => enumerated(value, SENSING_METHOD),
        Print::FileSource => enumerated(value, FILE_SOURCE),
        Print::SceneType => enumerated(value, SCENE_TYPE),
        Print::CustomRendered => enumerated(value, CUSTOM_RENDERED),
        Print::ExposureMode => enumerated(value, EXPOSURE_MODE),
        Print::WhiteBalance => enumerated(value, WHITE_BALANCE),
        Print::SceneCaptureType => enumerated(value, SCENE_CAPTURE_TYPE),
        Print::GainControl => enumerated(value, GAIN_CONTROL),
        Print::SoftHard => enumerated(value, SOFT_HARD),
        Print::LowHigh => enumerated(value, LOW_HIGH),
        Print::SubjectDistanceRange => enumerated(value, SUBJECT_DISTANCE_RANGE),
        Print::GpsAltitudeRef => enumerated(value, GPS_ALTITUDE_REF),
        Print::ExposureTime => {
            let seconds = first_ratio(value)?;
            Some(format_exposure(seconds))
        }
        Print::FNumber => Some(format!("F{:.1}", first_ratio(value)?)),
        Print::ApexAperture => Some(format!("F{:.1}", 2f64.powf(first_ratio(value)? / 2.0))),
        Print::ApexShutter => Some(format_exposure(2f64.powf(-first_ratio(value)?))),
        Print::ExposureBias => exposure_bias(value),
        Print::Flash => first_unsigned(value).map(flash),
        Print::FocalLength => Some(format!("{:.1} mm", first_ratio(value)?)),
        Print::Millimetres => Some(format!("{} mm", first_unsigned(value)?)),
        Print::SubjectDistance => subject_distance(value),
        Print::Version => version(value),
        Print::ComponentsConfiguration => components(value),
        Print::XpText => match value {
            Value::Bytes(bytes) => Some(utf16le(bytes)),
            _ => None,
        },
        Print::Comment => match value {
            Value::Bytes(bytes) => Some(fields::decode_comment(bytes)),
            _ => None,
        },
        Print::GpsVersion => match value {
            Value::Bytes(bytes) if !bytes.is_empty() => Some(join(bytes.iter(), ".")),
            _ => None,
        },
        Print::GpsCoordinate => gps_coordinate(value),
        Print::GpsAltitude => Some(format!("{} m", number(first_ratio(value)?))),
        Print::GpsTimeStamp => gps_time(value),
    }
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>, separator: &str) -> String {
    items.map(|item| item.to_string()).collect::<Vec<_>>().join(separator)
}

// ── value access ────────────────────────────────────────────────────

fn first_unsigned(value: &Value) -> Option<u32> {
    match value {
        Value::Unsigned(v) => v.first().copied(),
        Value::Bytes(v) => v.first().map(|&b| u32::from(b)),
        Value::Signed(v) => v.first().and_then(|&n| u32::try_from(n).ok()),
        _ => None,
    }
}

fn ratios(value: &Value) -> Option<Vec<f64>> {
    let ratio = |n: f64, d: f64| if d == 0.0 { None } else { Some(n / d) };
    match value {
        Value::Rational(v) => v.iter().map(|&(n, d)| ratio(f64::from(n), f64::from(d))).collect(),
        Value::SRational(v) => v.iter().map(|&(n, d)| ratio(f64::from(n), f64::from(d))).collect(),
        Value::Float(v) => Some(v.clone()),
        _ => None,
    }
}

fn first_ratio(value: &Value) -> Option<f64> {
    ratios(value)?.first().copied()
}

/// Whole numbers without decimals, everything else with up to four.
fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.4}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

// ── printers ────────────────────────────────────────────────────────

fn enumerated(value: &Value, table: &[(u32, &str)]) -> Option<String> {
    let n = first_unsigned(value)?;
    Some(
        table
            .iter()
            .find(|(code, _)| *code == n)
            .map_or_else(|| format!("({n})"), |(_, label)| (*label).to_string()),
    )
}

fn format_exposure(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "0 s".to_string();
    }
    if seconds >= 1.0 {
        return format!("{} s", number((seconds * 10.0).round() / 10.0));
    }
    format!("1/{:.0} s", (1.0 / seconds).round())
}

fn exposure_bias(value: &Value) -> Option<String> {
    let (n, d) = match value {
        Value::SRational(v) => *v.first()?,
        Value::Rational(v) => {
            let (n, d) = *v.first()?;
            (i32::try_from(n).ok()?, i32::try_from(d).ok()?)
        }
        _ => return None,
    };
    if d == 0 {
        return None;
    }
    if n == 0 {
        return Some("0 EV".to_string());
    }
    let divisor = gcd(n.unsigned_abs(), d.unsigned_abs()) as i32;
    let (n, d) = (n / divisor, d / divisor);
    let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
    let sign = if n > 0 { "+" } else { "" };
    if d == 1 {
        Some(format!("{sign}{n} EV"))
    } else {
        Some(format!("{sign}{n}/{d} EV"))
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a.max(1) } else { gcd(b, a % b) }
}

fn flash(bits: u32) -> String {
    if bits & 0x20 != 0 {
        return "No flash function".to_string();
    }
    let mut text = if bits & 0x01 != 0 { "Fired" } else { "No flash" }.to_string();
    match (bits >> 3) & 0x03 {
        1 => text.push_str(", compulsory"),
        2 => text.push_str(", suppressed"),
        3 => text.push_str(", auto"),
        _ => {}
    }
    match (bits >> 1) & 0x03 {
        2 => text.push_str(", return light not detected"),
        3 => text.push_str(", return light detected"),
        _ => {}
    }
    if bits & 0x40 != 0 {
        text.push_str(", red-eye reduction");
    }
    text
}

fn subject_distance(value: &Value) -> Option<String> {
    let Value::Rational(v) = value else {
        return None;
    };
    let &(n, d) = v.first()?;
    match (n, d) {
        (0, _) => Some("Unknown".to_string()),
        (u32::MAX, _) => Some("Infinity".to_string()),
        (_, 0) => None,
        _ => Some(format!("{:.2} m", f64::from(n) / f64::from(d))),
    }
}

fn version(value: &Value) -> Option<String> {
    let Value::Bytes(bytes) = value else {
        return None;
    };
    if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let major = std::str::from_utf8(&bytes[..2]).ok()?.trim_start_matches('0');
    let minor = std::str::from_utf8(&bytes[2..]).ok()?;
    let major = if major.is_empty() { "0" } else { major };
    Some(format!("{major}.{minor}"))
}

fn components(value: &Value) -> Option<String> {
    let Value::Bytes(bytes) = value else {
        return None;
    };
    bytes
        .iter()
        .filter(|&&b| b != 0)
        .map(|b| match b {
            1 => Some("Y"),
            2 => Some("Cb"),
            3 => Some("Cr"),
            4 => Some("R"),
            5 => Some("G"),
            6 => Some("B"),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.concat())
}

fn utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let end = units.iter().rposition(|&u| u != 0).map_or(0, |p| p + 1);
    String::from_utf16_lossy(&units[..end])
}

fn gps_coordinate(value: &Value) -> Option<String> {
    let parts = ratios(value)?;
    let [degrees, minutes, seconds] = parts.as_slice() else {
        return None;
    };
    Some(format!(
        "{}deg {}' {:.2}\"",
        number(*degrees),
        number(*minutes),
        seconds
    ))
}

fn gps_time(value: &Value) -> Option<String> {
    let parts = ratios(value)?;
    let [hours, minutes, seconds] = parts.as_slice() else {
        return None;
    };
    let seconds = if seconds.fract() == 0.0 {
        format!("{seconds:02.0}")
    } else {
        format!("{seconds:05.2}")
    };
    Some(format!("{hours:02.0}:{minutes:02.0}:{seconds}"))
}

// ── enumeration tables ──────────────────────────────────────────────

const ORIENTATION: &[(u32, &str)] = &[
    (1, "top, left"),
    (2, "top, right"),
    (3, "bottom, right"),
    (4, "bottom, left"),
    (5, "left, top"),
    (6, "right, top"),
    (7, "right, bottom"),
    (8, "left, bottom"),
];

const RESOLUTION_UNIT: &[(u32, &str)] = &[(1, "none"), (2, "inch"), (3, "cm")];

const YCBCR_POSITIONING: &[(u32, &str)] = &[(1, "Centered"), (2, "Co-sited")];

const EXPOSURE_PROGRAM: &[(u32, &str)] = &[
    (0, "Not defined"),
    (1, "Manual"),
    (2, "Auto"),
    (3, "Aperture priority"),
    (4, "Shutter priority"),
    (5, "Creative program"),
    (6, "Action program"),
    (7, "Portrait mode"),
    (8, "Landscape mode"),
];

const METERING_MODE: &[(u32, &str)] = &[
    (0, "Unknown"),
    (1, "Average"),
    (2, "Center weighted average"),
    (3, "Spot"),
    (4, "Multi-spot"),
    (5, "Multi-segment"),
    (6, "Partial"),
    (255, "Other"),
];

const LIGHT_SOURCE: &[(u32, &str)] = &[
    (0, "Unknown"),
    (1, "Daylight"),
    (2, "Fluorescent"),
    (3, "Tungsten (incandescent light)"),
    (4, "Flash"),
    (9, "Fine weather"),
    (10, "Cloudy weather"),
    (11, "Shade"),
    (12, "Daylight fluorescent"),
    (13, "Day white fluorescent"),
    (14, "Cool white fluorescent"),
    (15, "White fluorescent"),
    (17, "Standard light A"),
    (18, "Standard light B"),
    (19, "Standard light C"),
    (20, "D55"),
    (21, "D65"),
    (22, "D75"),
    (23, "D50"),
    (24, "ISO studio tungsten"),
    (255, "Other light source"),
];

const COLOR_SPACE: &[(u32, &str)] = &[(1, "sRGB"), (2, "Adobe RGB"), (65535, "Uncalibrated")];

const SENSING_METHOD: &[(u32, &str)] = &[
    (1, "Not defined"),
    (2, "One-chip color area"),
    (3, "Two-chip color area"),
    (4, "Three-chip color area"),
    (5, "Color sequential area"),
    (7, "Trilinear sensor"),
    (8, "Color sequential linear"),
];

const FILE_SOURCE: &[(u32, &str)] = &[
    (1, "Film scanner"),
    (2, "Reflexion print scanner"),
    (3, "Digital still camera"),
];

const SCENE_TYPE: &[(u32, &str)] = &[(1, "Directly photographed")];

const CUSTOM_RENDERED: &[(u32, &str)] = &[(0, "Normal process"), (1, "Custom process")];

const EXPOSURE_MODE: &[(u32, &str)] = &[(0, "Auto"), (1, "Manual"), (2, "Auto bracket")];

const WHITE_BALANCE: &[(u32, &str)] = &[(0, "Auto"), (1, "Manual")];

const SCENE_CAPTURE_TYPE: &[(u32, &str)] =
    &[(0, "Standard"), (1, "Landscape"), (2, "Portrait"), (3, "Night scene")];

const GAIN_CONTROL: &[(u32, &str)] = &[
    (0, "None"),
    (1, "Low gain up"),
    (2, "High gain up"),
    (3, "Low gain down"),
    (4, "High gain down"),
];

const SOFT_HARD: &[(u32, &str)] = &[(0, "Normal"), (1, "Soft"), (2, "Hard")];

const LOW_HIGH: &[(u32, &str)] = &[(0, "Normal"), (1, "Low"), (2, "High")];

const SUBJECT_DISTANCE_RANGE: &[(u32, &str)] =
    &[(0, "Unknown"), (1, "Macro"), (2, "Close view"), (3, "Distant view")];

const GPS_ALTITUDE_REF: &[(u32, &str)] = &[(0, "Above sea level"), (1, "Below sea level")];

#[cfg(test)]
mod tests {
    use super::*;

    fn show(print: Print, value: Value) -> String {
        interpret(print, &value, FallbackCharset::Latin2)
    }

    // ── enumerations ────────────────────────────────────────────────

    #[test]
    fn orientation_and_unknown_code() {
        assert_eq!(show(Print::Orientation, Value::Unsigned(vec![6])), "right, top");
        assert_eq!(show(Print::Orientation, Value::Unsigned(vec![42])), "(42)");
    }

    #[test]
    fn flash_bits() {
        assert_eq!(show(Print::Flash, Value::Unsigned(vec![0])), "No flash");
        assert_eq!(show(Print::Flash, Value::Unsigned(vec![0x19])), "Fired, auto");
        assert_eq!(show(Print::Flash, Value::Unsigned(vec![0x20])), "No flash function");
    }

    // ── rationals ───────────────────────────────────────────────────

    #[test]
    fn exposure_and_aperture() {
        assert_eq!(show(Print::ExposureTime, Value::Rational(vec![(10, 600)])), "1/60 s");
        assert_eq!(show(Print::ExposureTime, Value::Rational(vec![(5, 2)])), "2.5 s");
        assert_eq!(show(Print::FNumber, Value::Rational(vec![(28, 10)])), "F2.8");
        assert_eq!(show(Print::FocalLength, Value::Rational(vec![(50, 1)])), "50.0 mm");
        assert_eq!(show(Print::ExposureBias, Value::SRational(vec![(-2, 6)])), "-1/3 EV");
        assert_eq!(show(Print::ExposureBias, Value::SRational(vec![(3, 3)])), "+1 EV");
    }

    #[test]
    fn zero_denominator_falls_back() {
        assert_eq!(show(Print::FNumber, Value::Rational(vec![(28, 0)])), "28/0");
    }

    #[test]
    fn gps_values() {
        let coordinate = Value::Rational(vec![(52, 1), (13, 1), (505, 100)]);
        assert_eq!(show(Print::GpsCoordinate, coordinate), "52deg 13' 5.05\"");
        let time = Value::Rational(vec![(14, 1), (5, 1), (9, 1)]);
        assert_eq!(show(Print::GpsTimeStamp, time), "14:05:09");
        assert_eq!(show(Print::GpsVersion, Value::Bytes(vec![2, 2, 0, 0])), "2.2.0.0");
    }

    // ── byte payloads ───────────────────────────────────────────────

    #[test]
    fn version_and_components() {
        assert_eq!(show(Print::Version, Value::Bytes(b"0231".to_vec())), "2.31");
        assert_eq!(show(Print::ComponentsConfiguration, Value::Bytes(vec![1, 2, 3, 0])), "YCbCr");
    }

    #[test]
    fn xp_text_is_utf16le() {
        let bytes = fields::encode_utf16le("Zażółć");
        assert_eq!(show(Print::XpText, Value::Bytes(bytes)), "Zażółć");
    }

    #[test]
    fn generic_bytes_use_fallback_charset() {
        assert_eq!(show(Print::Value, Value::Bytes(vec![0x42, 0xEA, 0x64])), "Będ");
        assert_eq!(show(Print::Value, Value::Bytes(vec![1, 2, 200])), "1 2 200");
        assert_eq!(
            interpret(Print::Value, &Value::Bytes(vec![0x63, 0xE9]), FallbackCharset::Latin1),
            "cé"
        );
    }
}
