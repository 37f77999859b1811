//! Error handling for Vetter Core.
//!
//! This module provides:
//! - The crate-wide error type with machine-readable error codes
//! - Advisory HTTP-style status hints for API-facing callers
//! - A clean split between recoverable validation failures and fatal
//!   configuration/usage errors

use serde::{Deserialize, Serialize};

use crate::store::StoreError;
use crate::validation::ErrorBag;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Vetter operations.
pub type Result<T> = std::result::Result<T, VetterError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and can be used by clients for programmatic error
/// handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation (recoverable)
    ValidationFailed,

    // Configuration (fatal, programmer error)
    UnknownAttribute,
    DuplicateUniqueGroup,
    OverlappingSets,
    MalformedDocumentSchema,
    InvalidConfiguration,

    // Usage (fatal, programmer error at call site)
    IncorrectUsage,

    // Persistence collaborator
    StoreError,
}

impl ErrorCode {
    /// Advisory HTTP-style status hint for this code.
    ///
    /// This is a convenience for API-facing callers only; the core has no
    /// network protocol of its own.
    pub const fn status_hint(&self) -> u16 {
        match self {
            Self::ValidationFailed => 422,
            Self::UnknownAttribute
            | Self::DuplicateUniqueGroup
            | Self::OverlappingSets
            | Self::MalformedDocumentSchema
            | Self::InvalidConfiguration
            | Self::IncorrectUsage
            | Self::StoreError => 500,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Vetter Error
// ═══════════════════════════════════════════════════════════════════════════════

/// The crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum VetterError {
    /// A validation stage failed. Carries the full aggregated error bag;
    /// nothing is partially swallowed.
    #[error("validation failed: {0}")]
    Validation(ErrorBag),

    /// Invalid static configuration. Intended to be caught in CI/startup,
    /// never recovered at runtime.
    #[error("configuration error: {message}")]
    Configuration { code: ErrorCode, message: String },

    /// Programmer error at the call site.
    #[error("incorrect usage: {0}")]
    Usage(String),

    /// The persistence collaborator failed during a uniqueness check.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl VetterError {
    /// Create a configuration error with the given code.
    pub fn configuration(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Configuration {
            code,
            message: message.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Get the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Configuration { code, .. } => *code,
            Self::Usage(_) => ErrorCode::IncorrectUsage,
            Self::Store(_) => ErrorCode::StoreError,
        }
    }

    /// Advisory HTTP-style status hint (400-class for validation failures).
    pub fn status_hint(&self) -> u16 {
        self.code().status_hint()
    }

    /// Borrow the error bag when this is a validation failure.
    pub fn errors(&self) -> Option<&ErrorBag> {
        match self {
            Self::Validation(bag) => Some(bag),
            _ => None,
        }
    }

    /// Consume the error and return the error bag when this is a validation
    /// failure.
    pub fn into_errors(self) -> Option<ErrorBag> {
        match self {
            Self::Validation(bag) => Some(bag),
            _ => None,
        }
    }
}

impl From<ErrorBag> for VetterError {
    fn from(bag: ErrorBag) -> Self {
        Self::Validation(bag)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ErrorKind;

    #[test]
    fn test_validation_status_hint_is_400_class() {
        let mut bag = ErrorBag::new();
        bag.add_kind("amount", ErrorKind::Unchangeable);
        let err = VetterError::from(bag);
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!((400..500).contains(&err.status_hint()));
    }

    #[test]
    fn test_configuration_status_hint_is_500_class() {
        let err = VetterError::configuration(ErrorCode::UnknownAttribute, "no such field: foo");
        assert_eq!(err.status_hint(), 500);
        assert_eq!(err.code(), ErrorCode::UnknownAttribute);
    }

    #[test]
    fn test_errors_accessor() {
        let mut bag = ErrorBag::new();
        bag.add_kind("name", ErrorKind::Required);
        let err = VetterError::from(bag);
        assert!(err.errors().is_some());
        assert!(err.into_errors().unwrap().has_errors("name"));

        let err = VetterError::usage("bad call");
        assert!(err.errors().is_none());
    }
}
