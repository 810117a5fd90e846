//! Shared primitives for all Rust crates in the audio wipeout workspace.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use thiserror::Error;
use uuid::Uuid;

/// Result type used across wipeout crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Identifier attached to one wipeout invocation for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a random run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration value or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Inbound request payload is missing or malformed.
    #[error("Bad Request: {0}")]
    InvalidRequest(String),

    /// Brand selector does not match any configured brand.
    #[error(
        "Configuration Error: Invalid brand '{brand}'. Available brands: {}",
        available.join(", ")
    )]
    UnknownBrand {
        /// Normalized selector received from the caller.
        brand: String,
        /// Brand names known to the registry, sorted.
        available: Vec<String>,
    },

    /// Brand configuration lacks a mandatory resource identifier.
    #[error("Configuration Error: {0}")]
    MisconfiguredBrand(String),

    /// Backing cloud clients are absent or failed their readiness probe.
    #[error("{0}")]
    Unavailable(String),

    /// Candidate query could not be executed or decoded.
    #[error("query error: {0}")]
    Query(String),

    /// Object listing or deletion failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Wipeout log append failed.
    #[error("audit log error: {0}")]
    AuditLog(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
