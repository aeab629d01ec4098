//! Error types for flow operations.

use database::{DatabaseError, ValidationError};
use thiserror::Error;

/// Errors that can occur while editing or publishing flows.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Underlying store failure.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// A submitted block's configuration does not match its declared type.
    #[error("invalid {node_type} block configuration: {reason}")]
    InvalidConfig { node_type: String, reason: String },

    /// Invalid caller-supplied field.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
