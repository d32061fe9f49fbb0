use crate::error::StoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// `YYYYMMDDHHMMSS` prefix of a numeric device timestamp
const NUMERIC_DATETIME_LEN: usize = 14;
/// Longest fractional part accepted after the datetime prefix (microseconds)
const MAX_FRACTION_DIGITS: usize = 6;

const ISO_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Normalize a device timestamp to the numeric `YYYYMMDDHHMMSSmmm` form.
///
/// ISO-8601 input is rewritten keeping its wall-clock fields (an explicit
/// offset is dropped, not applied). Anything that is not ISO-8601 is
/// returned unchanged, which covers timestamps already in numeric form.
pub fn to_numeric(timestamp: &str) -> String {
    match parse_iso(timestamp) {
        Some(datetime) => datetime.format("%Y%m%d%H%M%S%3f").to_string(),
        None => timestamp.to_string(),
    }
}

fn parse_iso(timestamp: &str) -> Option<NaiveDateTime> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(datetime.naive_local());
    }

    if let Ok(datetime) = DateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(datetime.naive_local());
    }

    for layout in ISO_LAYOUTS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(timestamp, layout) {
            return Some(datetime);
        }
    }

    NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parse a numeric `YYYYMMDDHHMMSS` + 1..6 fractional digits timestamp as UTC,
/// truncated to millisecond precision.
pub fn parse_numeric(timestamp: &str) -> Result<DateTime<Utc>, StoreError> {
    let invalid = || StoreError::InvalidTimestamp {
        timestamp: timestamp.to_string(),
    };

    let len = timestamp.len();
    if !(NUMERIC_DATETIME_LEN + 1..=NUMERIC_DATETIME_LEN + MAX_FRACTION_DIGITS).contains(&len)
        || !timestamp.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let field = |range: std::ops::Range<usize>| -> Result<u32, StoreError> {
        timestamp[range].parse().map_err(|_| invalid())
    };

    let year = field(0..4)? as i32;
    let month = field(4..6)?;
    let day = field(6..8)?;
    let hour = field(8..10)?;
    let minute = field(10..12)?;
    let second = field(12..14)?;

    // Right-pad the fraction to microseconds, then drop below milliseconds
    let fraction = &timestamp[NUMERIC_DATETIME_LEN..];
    let micros: u32 = format!("{:0<width$}", fraction, width = MAX_FRACTION_DIGITS)
        .parse()
        .map_err(|_| invalid())?;
    let millis = micros / 1000;

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_milli_opt(hour, minute, second, millis))
        .ok_or_else(invalid)?;

    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_iso_timestamps_become_numeric() {
        let cases = [
            ("2023-01-01T00:00:00", "20230101000000000"),
            ("2023-01-01T00:00:00.1", "20230101000000100"),
            ("2023-01-01T00:00:00.12", "20230101000000120"),
            ("2023-01-01T00:00:00.123", "20230101000000123"),
            ("2023-01-01T00:00:00.123456", "20230101000000123"),
            ("2023-01-01 08:30:15.5", "20230101083015500"),
        ];

        for (input, expected) in cases {
            assert_eq!(to_numeric(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_offset_is_dropped_not_applied() {
        assert_eq!(to_numeric("2024-10-22T14:54:43.870+09:00"), "20241022145443870");
        assert_eq!(to_numeric("2024-10-22T14:54:43.870Z"), "20241022145443870");
    }

    #[test]
    fn test_non_iso_timestamps_pass_through() {
        assert_eq!(to_numeric("20241022145443870"), "20241022145443870");
        assert_eq!(to_numeric("not a timestamp"), "not a timestamp");
        assert_eq!(to_numeric(""), "");
    }

    #[test]
    fn test_parse_numeric_millisecond_precision() {
        let parsed = parse_numeric("20241022145443870").unwrap();

        assert_eq!(
            parsed,
            Utc.with_ymd_and_hms(2024, 10, 22, 14, 54, 43).unwrap()
                + chrono::Duration::milliseconds(870)
        );
    }

    #[test]
    fn test_parse_numeric_pads_and_truncates_fraction() {
        let short = parse_numeric("202410221454431").unwrap();
        assert_eq!(short.nanosecond(), 100_000_000);

        let long = parse_numeric("20241022145443123456").unwrap();
        assert_eq!(long.nanosecond(), 123_000_000);
    }

    #[test]
    fn test_parse_numeric_rejects_malformed_input() {
        assert!(parse_numeric("").is_err());
        assert!(parse_numeric("20241022145443").is_err());
        assert!(parse_numeric("2024-10-22T14:54:43").is_err());
        assert!(parse_numeric("20241322145443870").is_err());
        assert!(parse_numeric("202410221454438701234").is_err());
    }
}
