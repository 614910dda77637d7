//! Timestamp helpers shared by the domain crates.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{DomainError, DomainResult};

/// Format a timestamp as ISO 8601 with millisecond precision and a `Z` suffix
/// (e.g. `2024-05-01T09:30:00.000Z`).
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a calendar date given either as `YYYY-MM-DD` or as a full RFC 3339
/// timestamp (the date part in UTC is kept).
pub fn parse_date(field: &str, raw: &str) -> DomainResult<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| DomainError::validation(format!("{field} must be a date (YYYY-MM-DD)")))
}
