//! Error types for dispatch operations.

use database::{DatabaseError, ValidationError};
use thiserror::Error;

/// Errors that can occur while distributing or acting on conversations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Underlying store failure.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// The queue entry was resolved by a concurrent assignment.
    #[error("queue entry already assigned: {0}")]
    AlreadyAssigned(i64),

    /// The target attendant is missing, blocked, or foreign to the tenant.
    #[error("attendant not eligible: {0}")]
    AttendantNotEligible(i64),

    /// The conversation is closed, resolved, or already has an attendant.
    #[error("conversation {0} is not awaiting distribution")]
    NotDistributable(i64),

    /// Invalid caller-supplied field.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
