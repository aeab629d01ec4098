//! Input validation for tenant-supplied fields.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty value where one is required.
    Empty(String),
    /// Value too long.
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
    /// Malformed "HH:MM" time-of-day string.
    InvalidTimeOfDay(String),
    /// Weekday number outside 0..=6.
    InvalidWorkDay(u8),
    /// Id that must be positive was not.
    NonPositiveId(String),
    /// Unknown enumerated value (rule type, owner type, ...).
    UnknownValue { field: String, value: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::InvalidTimeOfDay(raw) => {
                write!(f, "invalid time of day: {} (expected HH:MM)", raw)
            }
            ValidationError::InvalidWorkDay(day) => {
                write!(f, "invalid work day: {} (expected 0-6, 0 = Sunday)", day)
            }
            ValidationError::NonPositiveId(field) => {
                write!(f, "{} must be a positive id", field)
            }
            ValidationError::UnknownValue { field, value } => {
                write!(f, "unknown {}: {}", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for names (rules, flows, departments).
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum allowed length for descriptions and transfer reasons.
pub const MAX_TEXT_LENGTH: usize = 1000;

/// Maximum allowed length for internal note bodies.
pub const MAX_NOTE_LENGTH: usize = 4000;

/// Validate a required name field.
pub fn validate_name(field: &str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Validate a free-text field that may be empty.
pub fn validate_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Parse an "HH:MM" time-of-day string into minutes since midnight.
///
/// "24:00" is accepted as the exclusive end of a full-day window.
pub fn parse_time_of_day(raw: &str) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::InvalidTimeOfDay(raw.to_string());

    let (hours, minutes) = raw.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;

    if minutes > 59 || hours > 24 || (hours == 24 && minutes != 0) {
        return Err(invalid());
    }

    Ok(hours * 60 + minutes)
}

/// Validate a weekday set (0 = Sunday ... 6 = Saturday).
pub fn validate_work_days(days: &[u8]) -> Result<(), ValidationError> {
    for &day in days {
        if day > 6 {
            return Err(ValidationError::InvalidWorkDay(day));
        }
    }
    Ok(())
}

/// Validate that an id is positive.
pub fn validate_positive_id(field: &str, id: i64) -> Result<(), ValidationError> {
    if id <= 0 {
        return Err(ValidationError::NonPositiveId(field.to_string()));
    }
    Ok(())
}
