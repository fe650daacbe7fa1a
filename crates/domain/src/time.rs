//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// UTC timestamp used for `last_updated`, event times and wire messages.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp the way the controller expects it
/// (`2025-03-01T18:04:05.120Z`).
#[must_use]
pub fn to_wire(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a wire timestamp.
///
/// Accepts RFC 3339 and, since some controllers omit the offset, naive
/// ISO-8601 date-times which are read as UTC.
#[must_use]
pub fn from_wire(value: &str) -> Option<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}
