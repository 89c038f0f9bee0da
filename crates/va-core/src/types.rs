//! Common types used throughout SmartVA RS

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::VaError;

/// Primary key type
pub type Id = uuid::Uuid;

/// Parse a path identifier, rejecting malformed ids with a 400
pub fn parse_id(raw: &str, entity: &'static str) -> Result<Id, VaError> {
    raw.trim()
        .parse()
        .map_err(|_| VaError::bad_request(format!("Invalid {} ID", entity)))
}

/// Parse a client supplied timestamp.
///
/// Accepts RFC 3339 (`2025-01-05T15:00:00Z`), a naive datetime which is
/// taken as UTC (`2025-01-05T15:00` or with seconds), or a plain date
/// (`2025-01-05`, midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Start (inclusive) and end (exclusive) of a UTC calendar day
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
    (start, start + chrono::Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_id() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "Task").unwrap(), id);

        let err = parse_id("not-an-id", "Contact").unwrap_err();
        assert_eq!(err.to_string(), "Invalid Contact ID");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_parse_datetime_formats() {
        let rfc = parse_datetime("2025-01-05T15:00:00Z").unwrap();
        assert_eq!(rfc.hour(), 15);

        let offset = parse_datetime("2025-01-05T15:00:00+02:00").unwrap();
        assert_eq!(offset.hour(), 13);

        let naive = parse_datetime("2025-01-05T09:30").unwrap();
        assert_eq!(naive.minute(), 30);

        let date = parse_datetime("2025-01-05").unwrap();
        assert_eq!(date.day(), 5);
        assert_eq!(date.hour(), 0);

        assert!(parse_datetime("yesterday").is_none());
        assert!(parse_datetime("").is_none());
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start.day(), 9);
        assert_eq!(end.day(), 10);
    }
}
