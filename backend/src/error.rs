//! Error types for the employee directory.
//!
//! - [`SourceError`] - Reading or fetching a CSV source failed
//! - [`LoadError`] - A cache load failed (source or parse failure)
//! - [`ConfigError`] - Invalid environment / CLI configuration
//! - [`ServerError`] - HTTP layer errors
//!
//! Load errors are `Clone`: a single in-flight load hands the same outcome
//! to every caller waiting on it.

use thiserror::Error;

use crate::models::SourceKind;
use crate::parser::CsvError;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors raised by a [`crate::source::CsvSource`].
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The remote source wants an interactive sign-in (login page, 401/403).
    #[error("Sign-in required to read the {kind} CSV: {message}")]
    AuthRequired { kind: SourceKind, message: String },

    /// Transport-level failure: I/O error, non-2xx response, timeout.
    #[error("Failed to read the {kind} CSV: {message}")]
    Unavailable { kind: SourceKind, message: String },
}

impl SourceError {
    pub fn unavailable(kind: SourceKind, message: impl Into<String>) -> Self {
        Self::Unavailable {
            kind,
            message: message.into(),
        }
    }

    pub fn auth_required(kind: SourceKind, message: impl Into<String>) -> Self {
        Self::AuthRequired {
            kind,
            message: message.into(),
        }
    }

    /// Which table the failing source feeds.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::AuthRequired { kind, .. } | Self::Unavailable { kind, .. } => *kind,
        }
    }
}

// =============================================================================
// Load Errors
// =============================================================================

/// A failed cache load. The cache is left untouched when one of these is returned.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Reading or fetching one of the sources failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A source was read but is not valid CSV.
    #[error("Invalid {kind} CSV: {source}")]
    Parse {
        kind: SourceKind,
        #[source]
        source: CsvError,
    },
}

impl LoadError {
    /// True when the caller should be sent through sign-in again.
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Source(SourceError::AuthRequired { .. }))
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    /// The HTTP client for remote sources could not be built.
    #[error("Cannot build HTTP client: {0}")]
    HttpClient(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The directory data could not be loaded.
    #[error("{0}")]
    Load(#[from] LoadError),

    /// Invalid request.
    #[error("{0}")]
    BadRequest(String),

    /// Nothing to return.
    #[error("{0}")]
    NotFound(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source reads.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for cache loads.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_required_is_distinguishable() {
        let err: LoadError = SourceError::auth_required(SourceKind::Employees, "login page").into();
        assert!(err.requires_auth());
        assert!(err.to_string().contains("employees"));

        let err: LoadError = SourceError::unavailable(SourceKind::Projects, "HTTP 500").into();
        assert!(!err.requires_auth());
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn test_parse_error_format() {
        let err = LoadError::Parse {
            kind: SourceKind::Assignments,
            source: CsvError::new(4, "found 3 fields, expected 2"),
        };
        let msg = err.to_string();
        assert!(msg.contains("assignments"));
        assert!(msg.contains("Line 4"));
        assert!(!err.requires_auth());
    }
}
