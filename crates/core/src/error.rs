//! Error types for Strata records
//!
//! This module defines all error types used by the record layer.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Recovery policy
//!
//! - `NotFound` is recoverable inside reference collections (skip, retain or sweep)
//! - every other variant propagates to the caller unchanged

use crate::types::RecordId;
use thiserror::Error;

/// Result type alias for Strata record operations
pub type StrataResult<T> = std::result::Result<T, StrataError>;

/// Error types for the record layer
#[derive(Debug, Error)]
pub enum StrataError {
    /// Record referenced by id no longer exists
    #[error("Record not found: {id}")]
    NotFound {
        /// Identity that failed to resolve
        id: RecordId,
    },

    /// Store-level failure other than a missing record
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable description
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// API used out of order (programmer error)
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// What was attempted
        message: String,
    },

    /// Malformed input (ids, configuration)
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong
        message: String,
    },

    /// Internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Description
        message: String,
    },
}

impl StrataError {
    /// Record `id` does not resolve to a live record
    pub fn not_found(id: RecordId) -> Self {
        StrataError::NotFound { id }
    }

    /// Store failure without an underlying cause
    pub fn storage(message: impl Into<String>) -> Self {
        StrataError::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Store failure wrapping an underlying cause
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StrataError::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// API misuse
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        StrataError::InvalidOperation {
            message: message.into(),
        }
    }

    /// Malformed input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        StrataError::InvalidInput {
            message: message.into(),
        }
    }

    /// Internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        StrataError::Internal {
            message: message.into(),
        }
    }

    /// True for the recoverable "record does not exist" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, StrataError::NotFound { .. })
    }
}
