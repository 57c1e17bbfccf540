//! Lenient timestamp parsing.
//!
//! The desktop client sends RFC 3339 (`2025-01-01T12:00:00.000Z`); scripted
//! callers often send naive ISO-8601 without an offset. Naive values are
//! taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
}

pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw))),
        None => Ok(None),
    }
}

/// Seconds since the epoch with at most microsecond precision, trailing
/// zeros trimmed (`1718000000.5`, `1718000000.0`).
pub fn unix_seconds(ts: &DateTime<Utc>) -> String {
    let total = ts.timestamp_micros();
    let sign = if total < 0 { "-" } else { "" };
    let secs = total.unsigned_abs() / 1_000_000;
    let micros = total.unsigned_abs() % 1_000_000;
    if micros == 0 {
        return format!("{}{}.0", sign, secs);
    }
    let fraction = format!("{:06}", micros);
    format!("{}{}.{}", sign, secs, fraction.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse("2025-03-01T10:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_as_utc() {
        let ts = parse("2025-03-01T10:00:00.250").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
        assert_eq!(ts, parse("2025-03-01T10:00:00.250Z").unwrap());
        assert!(parse("2025-03-01 10:00:00").is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("yesterday").is_none());
    }

    #[test]
    fn test_unix_seconds_formatting() {
        let whole = Utc.timestamp_opt(1_718_000_000, 0).unwrap();
        assert_eq!(unix_seconds(&whole), "1718000000.0");

        let half = Utc.timestamp_opt(1_718_000_000, 500_000_000).unwrap();
        assert_eq!(unix_seconds(&half), "1718000000.5");

        let micro = Utc.timestamp_opt(1_718_000_000, 123_456_000).unwrap();
        assert_eq!(unix_seconds(&micro), "1718000000.123456");

        let before_epoch = Utc.timestamp_opt(-2, 500_000_000).unwrap();
        assert_eq!(unix_seconds(&before_epoch), "-1.5");

        let just_before = Utc.timestamp_opt(-1, 750_000_000).unwrap();
        assert_eq!(unix_seconds(&just_before), "-0.25");

        let whole_before = Utc.timestamp_opt(-60, 0).unwrap();
        assert_eq!(unix_seconds(&whole_before), "-60.0");
    }
}
