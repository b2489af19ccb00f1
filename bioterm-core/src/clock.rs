//! Packed device clock codec
//!
//! The terminal stores timestamps as a single u32 built on a fictitious
//! calendar where every month has 31 days:
//!
//! ```text
//! ((year-2000)*12*31 + (month-1)*31 + day-1) * 86400
//!   + hour*3600 + minute*60 + second
//! ```
//!
//! Real-time event frames use a different, byte-per-field 6-byte form
//! handled by [`decode_timehex`].

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// Encode a timestamp into the packed u32 form.
///
/// # Errors
///
/// Returns an error for years outside 2000-2099, the only range the
/// packed encoding can represent.
pub fn encode_time(t: NaiveDateTime) -> Result<u32> {
    if !(2000..=2099).contains(&t.year()) {
        return Err(Error::TimestampOutOfRange(t.year()));
    }
    let days = (t.year() as u32 - 2000) * 12 * 31 + (t.month() - 1) * 31 + t.day() - 1;
    Ok(days * 86400 + t.hour() * 3600 + t.minute() * 60 + t.second())
}

/// Decode a packed u32 timestamp.
///
/// # Errors
///
/// Returns a decode error when the packed value names a day that does not
/// exist (the 31-days-per-month arithmetic can express e.g. February 30).
pub fn decode_time(packed: u32) -> Result<NaiveDateTime> {
    let mut t = packed;

    let second = t % 60;
    t /= 60;
    let minute = t % 60;
    t /= 60;
    let hour = t % 24;
    t /= 24;
    let day = t % 31 + 1;
    t /= 31;
    let month = t % 12 + 1;
    t /= 12;
    let year = t + 2000;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or(Error::InvalidTimestamp(packed))
}

/// Decode the 6-byte `[yy mm dd hh mm ss]` timestamp used by event frames.
pub fn decode_timehex(raw: &[u8; 6]) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000 + raw[0] as i32, raw[1] as u32, raw[2] as u32)
        .and_then(|d| d.and_hms_opt(raw[3] as u32, raw[4] as u32, raw[5] as u32))
        .ok_or_else(|| {
            Error::InvalidTimestamp(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_encode_epoch() {
        assert_eq!(encode_time(dt(2000, 1, 1, 0, 0, 0)).unwrap(), 0);
    }

    #[test]
    fn test_encode_known_vectors() {
        assert_eq!(
            encode_time(dt(2026, 8, 30, 12, 34, 56)).unwrap(),
            856_960_496
        );
        assert_eq!(
            encode_time(dt(2010, 10, 26, 20, 33, 58)).unwrap(),
            347_747_638
        );
    }

    #[test]
    fn test_encode_rejects_out_of_range_years() {
        assert!(matches!(
            encode_time(dt(1999, 12, 31, 23, 59, 59)),
            Err(Error::TimestampOutOfRange(1999))
        ));
        assert!(matches!(
            encode_time(dt(2100, 1, 1, 0, 0, 0)),
            Err(Error::TimestampOutOfRange(2100))
        ));
    }

    #[test]
    fn test_decode_known_vector() {
        assert_eq!(
            decode_time(856_960_496).unwrap(),
            dt(2026, 8, 30, 12, 34, 56)
        );
    }

    #[test]
    fn test_decode_rejects_phantom_day() {
        // February 30 is expressible in packed form but not a real date
        let packed = encode_time(dt(2020, 2, 28, 0, 0, 0)).unwrap() + 2 * 86400;
        assert!(matches!(
            decode_time(packed),
            Err(Error::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_decode_timehex() {
        let raw = [26u8, 8, 30, 23, 59, 1];
        assert_eq!(decode_timehex(&raw).unwrap(), dt(2026, 8, 30, 23, 59, 1));
    }

    #[test]
    fn test_decode_timehex_invalid_month() {
        let raw = [26u8, 13, 1, 0, 0, 0];
        assert!(decode_timehex(&raw).is_err());
    }

    proptest! {
        /// Exact round trip over every representable datetime in 2000-2099.
        #[test]
        fn prop_time_roundtrip(
            year in 2000i32..2100,
            month in 1u32..=12,
            day in 1u32..=31,
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
        ) {
            // Skip day/month combinations that don't exist
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                let t = date.and_hms_opt(hour, minute, second).unwrap();
                prop_assert_eq!(decode_time(encode_time(t).unwrap()).unwrap(), t);
            }
        }
    }
}
