//! Gateway timestamps.
//!
//! The gateway writes wall-clock times as `yyyyMMddHHmmss` in a fixed offset,
//! GMT+7 unless configured otherwise. Internally every instant is UTC.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::error::{CoreError, Result};

/// `strftime` pattern for gateway timestamps.
pub const GATEWAY_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// GMT+7, in seconds east of UTC.
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 7 * 3600;

fn offset(secs: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(secs).ok_or(CoreError::InvalidOffset(secs))
}

/// Format a UTC instant as a gateway timestamp in the given offset.
pub fn format_gateway_time(instant: DateTime<Utc>, offset_secs: i32) -> Result<String> {
    let tz = offset(offset_secs)?;
    Ok(instant.with_timezone(&tz).format(GATEWAY_TIME_FORMAT).to_string())
}

/// Parse a gateway timestamp written in the given offset.
pub fn parse_gateway_time(value: &str, offset_secs: i32) -> Result<DateTime<Utc>> {
    let tz = offset(offset_secs)?;
    let invalid = || CoreError::InvalidTimestamp {
        value: value.to_string(),
    };
    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let naive = NaiveDateTime::parse_from_str(value, GATEWAY_TIME_FORMAT).map_err(|_| invalid())?;
    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_format_shifts_to_gmt7() {
        let instant = utc(2024, 1, 1, 0, 0, 0);
        assert_eq!(
            format_gateway_time(instant, DEFAULT_UTC_OFFSET_SECS).unwrap(),
            "20240101070000"
        );
    }

    #[test]
    fn test_format_crosses_midnight() {
        let instant = utc(2024, 12, 31, 20, 30, 5);
        assert_eq!(
            format_gateway_time(instant, DEFAULT_UTC_OFFSET_SECS).unwrap(),
            "20250101033005"
        );
    }

    #[test]
    fn test_parse_inverts_format() {
        let instant = utc(2024, 6, 15, 9, 41, 12);
        let text = format_gateway_time(instant, DEFAULT_UTC_OFFSET_SECS).unwrap();
        assert_eq!(parse_gateway_time(&text, DEFAULT_UTC_OFFSET_SECS).unwrap(), instant);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "2024010107000", "202401010700000", "2024-01-01 07:00", "20241301070000"] {
            assert!(parse_gateway_time(bad, DEFAULT_UTC_OFFSET_SECS).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_invalid_offset() {
        assert!(matches!(
            format_gateway_time(utc(2024, 1, 1, 0, 0, 0), 100_000),
            Err(CoreError::InvalidOffset(100_000))
        ));
    }
}
