//! Identifier and timestamp generation.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use uuid::Uuid;

/// Render a timestamp the way records store it: UTC, millisecond precision.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// A timestamp strictly after `previous`, normally the current time.
///
/// If the clock has not moved past `previous` (same millisecond, or a clock
/// step backwards) the result is one millisecond after it. An unparseable
/// `previous` is ignored.
pub fn next_timestamp(previous: Option<&str>) -> String {
    let now = Utc::now();
    let floor = previous
        .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
        .map(|p| p.with_timezone(&Utc) + Duration::milliseconds(1));
    match floor {
        Some(floor) if floor > now => format_timestamp(floor),
        _ => format_timestamp(now),
    }
}

/// Fresh opaque record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
