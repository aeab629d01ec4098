//! Timestamp formatting helpers.
//!
//! All timestamps are stored as TEXT in the canonical
//! `%Y-%m-%d %H:%M:%S` UTC format (spec §3).

use crate::{DatabaseError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// The canonical on-disk timestamp format: `%Y-%m-%d %H:%M:%S` in UTC.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC instant into the canonical storage representation.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp string back into a UTC instant.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| DatabaseError::Sqlx(sqlx::Error::Decode(Box::new(e))))?;
    Ok(naive.and_utc())
}
