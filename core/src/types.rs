//! Shared primitive types used across the generator.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// A stable player identifier, e.g. `player_0042`.
pub type PlayerId = String;

/// A session identifier (hyphenated UUID).
pub type SessionId = String;

/// Render a UTC instant as ISO-8601 with microseconds and offset.
pub fn iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Render a naive wall-clock datetime as ISO-8601 without offset.
pub fn iso_naive(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// `2025-08-08` -> `20250808`, used in per-day file names.
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
