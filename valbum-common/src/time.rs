//! Timestamp formatting helpers
//!
//! VRChat log timestamps are host-local wall-clock values with no timezone
//! marker, so they travel through the system as `NaiveDateTime` and are stored
//! as TEXT. All storage formats sort lexicographically in chronological order,
//! which lets SQL `MAX()` and `ORDER BY` operate on the raw column.

use chrono::NaiveDateTime;

/// Format written at the head of every VRChat client log line.
pub const RAW_LOG_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Storage format for world/player log records (second resolution).
pub const RECORD_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format for photo timestamps (millisecond resolution).
pub const PHOTO_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format a record timestamp for database storage.
pub fn format_record(ts: NaiveDateTime) -> String {
    ts.format(RECORD_FORMAT).to_string()
}

/// Parse a record timestamp from its database representation.
pub fn parse_record(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, RECORD_FORMAT)
}

/// Format a photo timestamp for database storage.
pub fn format_photo(ts: NaiveDateTime) -> String {
    ts.format(PHOTO_FORMAT).to_string()
}

/// Parse a photo timestamp from its database representation.
pub fn parse_photo(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, PHOTO_FORMAT)
}
