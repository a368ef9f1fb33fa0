//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Granary.
//! All errors are structured and map to stable error codes for JSON output.
//!
//! # Error Categories
//! - `NotFound`: Referenced database, table, or prepared-statement session does not exist
//! - `AlreadyExists`: Database file or statement identifier is already in use
//! - `Validation`: Malformed input detected before any mutation begins
//! - `IntegrityViolation`: SQLite constraint failure (uniqueness, NOT NULL, ...)
//! - `ExecutionFailure`: Any other engine error during statement execution
//! - `PermissionDenied`: Filesystem denied a write (CSV export paths, deletion)

use thiserror::Error;

/// Main error type for Granary operations
#[derive(Error, Debug)]
pub enum GranaryError {
    /// Referenced database, table, or session identifier does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to create something that already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Malformed input or missing required parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage engine constraint failure
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Statement execution failed for any other reason
    #[error("Execution failed: {0}")]
    ExecutionFailure(String),

    /// Filesystem permission failure
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl GranaryError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling by agents.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::Validation(_) => "VALIDATION",
            Self::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            Self::ExecutionFailure(_) => "EXECUTION_FAILURE",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
        }
    }

    /// Get human-readable error message (agent-appropriate)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an already-exists error
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an integrity-violation error
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::IntegrityViolation(message.into())
    }

    /// Create an execution-failure error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionFailure(message.into())
    }

    /// Create a permission-denied error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }
}

impl From<rusqlite::Error> for GranaryError {
    /// Constraint violations keep their own category so callers can tell bad
    /// data from broken SQL; everything else is an execution failure.
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::IntegrityViolation(err.to_string())
            }
            _ => Self::ExecutionFailure(err.to_string()),
        }
    }
}

impl From<std::io::Error> for GranaryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::ExecutionFailure(err.to_string()),
        }
    }
}

/// Result type alias for Granary operations
pub type Result<T> = std::result::Result<T, GranaryError>;
