//! # Error Types
//!
//! Structured error types for wall_core. Every fallible operation returns
//! [`WallResult`], and every variant carries enough context for a caller
//! (human or tool) to understand what went wrong without parsing strings.
//!
//! Only a few things in the core can actually fail:
//!
//! - loading a malformed scene document (the "load error" class, see
//!   [`WallError::is_load_error`]),
//! - invalid configuration or an invalid mutation request,
//! - file I/O on project files.
//!
//! Redundant destroys and duplicate creations are not errors; the graph
//! resolves them by doing nothing or by reuse.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::errors::{WallError, WallResult};
//!
//! fn validate_spacing(spacing: f64) -> WallResult<()> {
//!     if spacing <= 0.0 {
//!         return Err(WallError::invalid_input(
//!             "min_column_distance",
//!             spacing.to_string(),
//!             "Spacing must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_spacing(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for wall_core operations
pub type WallResult<T> = Result<T, WallError>;

/// Structured error type for graph, codec and file operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum WallError {
    /// An input value is invalid (out of range, wrong shape, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A column id does not exist in the graph
    #[error("Column not found: {column_id}")]
    ColumnNotFound { column_id: String },

    /// A scene document references a column index outside its column list
    #[error("Block '{block_id}' has {field} = {index}, but the document only has {column_count} columns")]
    ColumnIndexOutOfRange {
        block_id: String,
        field: String,
        index: i64,
        column_count: usize,
    },

    /// A scene document is structurally invalid for another reason
    #[error("Invalid scene document: {reason}")]
    InvalidDocument { reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Settings file could not be parsed
    #[error("Config error in '{path}': {reason}")]
    ConfigError { path: String, reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl WallError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        WallError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a ColumnNotFound error
    pub fn column_not_found(column_id: impl ToString) -> Self {
        WallError::ColumnNotFound {
            column_id: column_id.to_string(),
        }
    }

    /// Create an InvalidDocument error
    pub fn invalid_document(reason: impl Into<String>) -> Self {
        WallError::InvalidDocument {
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        WallError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        WallError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError from any displayable cause
    pub fn serialization(reason: impl ToString) -> Self {
        WallError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WallError::FileLocked { .. })
    }

    /// True for errors caused by a malformed scene document.
    ///
    /// A load that fails with one of these never touches the installed graph.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            WallError::ColumnIndexOutOfRange { .. }
                | WallError::InvalidDocument { .. }
                | WallError::SerializationError { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            WallError::InvalidInput { .. } => "INVALID_INPUT",
            WallError::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            WallError::ColumnIndexOutOfRange { .. } => "COLUMN_INDEX_OUT_OF_RANGE",
            WallError::InvalidDocument { .. } => "INVALID_DOCUMENT",
            WallError::FileError { .. } => "FILE_ERROR",
            WallError::FileLocked { .. } => "FILE_LOCKED",
            WallError::SerializationError { .. } => "SERIALIZATION_ERROR",
            WallError::ConfigError { .. } => "CONFIG_ERROR",
            WallError::VersionMismatch { .. } => "VERSION_MISMATCH",
            WallError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
