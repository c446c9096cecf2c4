//! Frame codec
//!
//! Encodes outgoing `<NAME..>>` command frames and decodes the detector's
//! fixed-format replies.
//!
//! Decoders are pure; what a caller does with a [`FrameError`] (substitute a
//! sentinel, skip the cycle) is up to the session and scheduler.

use byteorder::{BigEndian, ByteOrder};
use chrono::{Datelike, NaiveDateTime, Timelike};

use super::{
    commands::Command, FrameError, COUNT_MASK, MARKER_BYTE, MAX_BATTERY_VOLTAGE, SERIAL_ID_LEN,
};

/// µSv/h per CPM for the GMC-300's M4011 tube
pub const USVH_PER_CPM: f64 = 0.0065;

/// Build a command frame: `<` + name + two uppercase hex digits per field + `>>`
pub fn encode_command(name: &str, fields: &[u8]) -> Vec<u8> {
    let mut frame = String::with_capacity(name.len() + fields.len() * 2 + 3);
    frame.push('<');
    frame.push_str(name);
    for field in fields {
        frame.push_str(&format!("{:02X}", field));
    }
    frame.push_str(">>");
    frame.into_bytes()
}

/// Build the clock-set command for a wall-clock instant.
///
/// Fields are year % 100, month, day, hour, minute, second, each as one hex byte.
pub fn encode_set_datetime(now: &NaiveDateTime) -> Vec<u8> {
    // year % 100 always fits in a byte; the rest are calendar fields < 60
    let fields = [
        now.year().rem_euclid(100) as u8,
        now.month() as u8,
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
    ];
    encode_command(Command::SetDateTime.name(), &fields)
}

/// Decode a `<GETSERIAL>>` reply into 14 uppercase hex characters
pub fn decode_identity_serial(bytes: &[u8]) -> Result<String, FrameError> {
    if bytes.len() != SERIAL_ID_LEN {
        return Err(FrameError::ShortFrame {
            expected: SERIAL_ID_LEN,
            actual: bytes.len(),
        });
    }
    Ok(bytes.iter().map(|b| format!("{:02X}", b)).collect())
}

/// Decode a `<GETVER>>` reply; undecodable bytes become U+FFFD
pub fn decode_version(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Decode a `<GETVOLT>>` byte into volts
pub fn decode_battery(byte: u8) -> Result<f64, FrameError> {
    let voltage = byte as f64 / 10.0;
    if voltage > MAX_BATTERY_VOLTAGE {
        return Err(FrameError::OutOfRange(voltage));
    }
    Ok(voltage)
}

/// Decode a `<GETCPM>>` reply.
///
/// The first two bytes are a big-endian value of which only the low 14 bits
/// count; any padding after them is ignored. A lone `0xAA` is the idle marker.
pub fn decode_count(bytes: &[u8]) -> Result<u16, FrameError> {
    match bytes {
        [] => Err(FrameError::NoData),
        [MARKER_BYTE] => Err(FrameError::MarkerByte),
        [other] => Err(FrameError::UnexpectedShortFrame(*other)),
        _ => Ok(BigEndian::read_u16(&bytes[..2]) & COUNT_MASK),
    }
}

/// Convert counts per minute into µSv/h, rounded to 2 decimals.
///
/// Rounds the exact binary product; scaling by 100 first would push values
/// like 0.58499.. onto a half and round them up.
pub fn dose_rate_usv_per_hour(cpm: u16) -> f64 {
    let usvh = cpm as f64 * USVH_PER_CPM;
    format!("{:.2}", usvh).parse().unwrap_or(usvh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_encode_plain_command() {
        assert_eq!(encode_command("GETVER", &[]), b"<GETVER>>".to_vec());
    }

    #[test]
    fn test_encode_fields_are_uppercase_two_digit_hex() {
        assert_eq!(
            encode_command("X", &[0x00, 0x0a, 0xff]),
            b"<X000AFF>>".to_vec()
        );
    }

    #[test]
    fn test_encode_set_datetime() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(14, 7, 9))
            .unwrap();
        let cmd = encode_set_datetime(&now);
        assert_eq!(
            String::from_utf8(cmd).unwrap(),
            "<SETDATETIME1803050E0709>>"
        );
    }

    #[test]
    fn test_encode_set_datetime_end_of_year() {
        let now = NaiveDate::from_ymd_opt(2099, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .unwrap();
        assert_eq!(encode_set_datetime(&now), b"<SETDATETIME630C1F173B3B>>".to_vec());
    }

    #[test]
    fn test_decode_serial() {
        let id = decode_identity_serial(&[0xF4, 0x88, 0x12, 0x00, 0x3B, 0x0A, 0x7C]).unwrap();
        assert_eq!(id, "F48812003B0A7C");
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn test_decode_serial_short() {
        assert_eq!(
            decode_identity_serial(&[1, 2, 3]),
            Err(FrameError::ShortFrame {
                expected: 7,
                actual: 3
            })
        );
    }

    #[test]
    fn test_decode_version_trims_and_replaces() {
        assert_eq!(decode_version(b"  GMC-300Re 4.54\r\n"), "GMC-300Re 4.54");
        assert_eq!(decode_version(b"Rev\xff 1\n"), "Rev\u{FFFD} 1");
        assert_eq!(decode_version(b""), "");
    }

    #[test]
    fn test_decode_battery_range() {
        for b in 0u8..=50 {
            assert_eq!(decode_battery(b), Ok(b as f64 / 10.0));
        }
        for b in 51u8..=255 {
            assert!(matches!(decode_battery(b), Err(FrameError::OutOfRange(_))));
        }
    }

    #[test]
    fn test_decode_count_masks_all_inputs() {
        for hi in 0u8..=255 {
            for lo in [0x00u8, 0x01, 0x64, 0xAA, 0xFF] {
                let raw = u16::from_be_bytes([hi, lo]);
                let cpm = decode_count(&[hi, lo]).unwrap();
                assert_eq!(cpm, raw & 0x3FFF);
                assert!(cpm <= 16383);
            }
        }
    }

    #[test]
    fn test_decode_count_ignores_padding() {
        assert_eq!(decode_count(&[0x00, 0x64, 0xAA]), Ok(100));
        assert_eq!(decode_count(&[0xC0, 0x64, 0x00, 0x00]), Ok(100));
    }

    #[test]
    fn test_decode_count_short_frames() {
        assert_eq!(decode_count(&[0xAA]), Err(FrameError::MarkerByte));
        assert_eq!(
            decode_count(&[0x12]),
            Err(FrameError::UnexpectedShortFrame(0x12))
        );
        assert_eq!(decode_count(&[]), Err(FrameError::NoData));
    }

    #[test]
    fn test_dose_rate() {
        assert_eq!(dose_rate_usv_per_hour(100), 0.65);
        assert_eq!(dose_rate_usv_per_hour(1000), 6.5);
        assert_eq!(dose_rate_usv_per_hour(0), 0.0);
        assert_eq!(dose_rate_usv_per_hour(16383), 106.49);
    }

    #[test]
    fn test_dose_rate_just_below_half() {
        // 90 * 0.0065 and 230 * 0.0065 sit just under .xx5 in binary
        assert_eq!(dose_rate_usv_per_hour(90), 0.58);
        assert_eq!(dose_rate_usv_per_hour(230), 1.49);
    }
}
