//! Date normalization for raw document timestamps.
//!
//! Documents exported from the hosted document database carry timestamps in several
//! shapes: native timestamp objects (`{"seconds": .., "nanoseconds": ..}`, or the
//! `_seconds` variant of the admin SDK), ISO date strings, or nothing usable at all.
//! [`to_date`] turns any of them into a single `DateTime<Utc>` and never fails.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// The Unix epoch, the fallback the document import uses for missing or
/// unparseable timestamps.
#[must_use]
pub const fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Converts a raw timestamp value into a point in time.
///
/// * objects with a numeric `seconds` or `_seconds` field are read as seconds since
///   the epoch (sub-second precision is dropped)
/// * strings are parsed as RFC 3339, then as a naive `YYYY-MM-DDTHH:MM:SS`, then as
///   a bare `YYYY-MM-DD` date, all in UTC
/// * everything else, including unparseable strings, yields `default`
#[must_use]
pub fn to_date(input: &Value, default: DateTime<Utc>) -> DateTime<Utc> {
    match input {
        Value::Object(map) => map
            .get("seconds")
            .or_else(|| map.get("_seconds"))
            .and_then(seconds_of)
            .and_then(|seconds| DateTime::from_timestamp_millis(seconds.saturating_mul(1000)))
            .unwrap_or(default),
        Value::String(s) => parse_date_str(s).unwrap_or(default),
        _ => default,
    }
}

fn seconds_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            #[allow(clippy::cast_possible_truncation)] // out-of-range floats saturate
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        _ => None,
    }
}

/// Parses the string forms accepted by [`to_date`].
#[must_use]
pub fn parse_date_str(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `YYYY-MM` bucket key used by the summary histograms.
#[must_use]
pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}
