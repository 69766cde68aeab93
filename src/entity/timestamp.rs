//! Time values as they travel to and from the document store.
//!
//! The store hands timestamps back in its own `{seconds, nanoseconds}` form.
//! Older documents carry plain RFC 3339 strings or bare `YYYY-MM-DD` dates.
//! Everything in memory is a `DateTime<Utc>`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// The provider's wire representation of an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl WireTimestamp {
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }

    pub fn to_value(self) -> Value {
        json!({ "seconds": self.seconds, "nanoseconds": self.nanoseconds })
    }

    /// Recognise the wire form: an object with exactly `seconds` and `nanoseconds`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 2 {
            return None;
        }
        let seconds = map.get("seconds")?.as_i64()?;
        let nanoseconds = map.get("nanoseconds")?.as_u64()?;
        if nanoseconds >= NANOS_PER_SECOND {
            return None;
        }
        Some(Self {
            seconds,
            nanoseconds: nanoseconds as u32,
        })
    }
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(&dt)
    }
}

/// Normalize any accepted time representation to a `DateTime<Utc>`.
pub fn normalize_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_time_str(s),
        Value::Object(_) => WireTimestamp::from_value(value)?.to_datetime(),
        _ => None,
    }
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_wire_timestamp_preserves_nanoseconds() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let wire = WireTimestamp::from_datetime(&dt);
        assert_eq!(wire.nanoseconds, 123_456_789);
        assert_eq!(wire.to_datetime(), Some(dt));
    }

    #[test]
    fn test_normalize_wire_object() {
        let value = json!({ "seconds": 1_700_000_000i64, "nanoseconds": 500 });
        let dt = normalize_time(&value).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_nanos(), 500);
    }

    #[test]
    fn test_normalize_rfc3339_and_plain_date() {
        let dt = normalize_time(&json!("2024-05-01T08:00:00+02:00")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap());

        let date = normalize_time(&json!("2024-05-01")).unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_normalize_rejects_other_shapes() {
        assert!(normalize_time(&json!(42)).is_none());
        assert!(normalize_time(&json!("yesterday")).is_none());
        assert!(normalize_time(&json!({ "seconds": 1 })).is_none());
        assert!(normalize_time(&json!({ "seconds": 1, "nanoseconds": 2_000_000_000u64 })).is_none());
        assert!(normalize_time(&json!({ "seconds": 1, "nanoseconds": 0, "extra": true })).is_none());
    }
}
