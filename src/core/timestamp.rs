//! Timestamp rendering used in log rows and rotated file names

use chrono::{DateTime, Utc};

/// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
#[must_use]
pub fn iso8601(datetime: &DateTime<Utc>) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// ISO 8601 timestamp with colons and periods replaced by hyphens, safe for
/// use inside a blob name: `2025-01-08T10-30-45-123Z`
#[must_use]
pub fn file_name_suffix(datetime: &DateTime<Utc>) -> String {
    iso8601(datetime).replace([':', '.'], "-")
}
