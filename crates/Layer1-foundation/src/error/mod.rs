//! Error types for Trail
//!
//! Every layer reports failures through the single [`Error`] enum below.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trail error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Search input
    // ========================================================================
    #[error("Invalid date for {field}: '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: String, value: String },

    #[error("Unknown search field: {0}")]
    UnknownField(String),

    // ========================================================================
    // Collaborators
    // ========================================================================
    #[error("Lookup failed: {source_name} - {message}")]
    LookupFailed {
        source_name: String,
        message: String,
    },

    // ========================================================================
    // Config / storage
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // External error conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // ========================================================================
    // Other
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// A collaborator was unreachable; the caller may retry the whole query.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LookupFailed { .. })
    }

    /// Errors caused by what the operator typed
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::InvalidDate { .. } | Error::UnknownField(_))
    }

    pub fn invalid_date(field: impl Into<String>, value: impl Into<String>) -> Self {
        Error::InvalidDate {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lookup_failed(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::LookupFailed {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}
