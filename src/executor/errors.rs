//! Query error types
//!
//! Error codes:
//! - NUTRI_NOT_FOUND
//! - NUTRI_DUPLICATE_KEY
//! - NUTRI_VALIDATION_FAILED
//! - NUTRI_TYPE_MISMATCH
//!
//! Every error surfaces synchronously to the caller of the operation that
//! triggered it. Nothing is retried.

use std::fmt;

/// Query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorCode {
    /// Collection absent (only raised in strict mode)
    NotFound,
    /// Unique index violation
    DuplicateKey,
    /// Malformed filter, projection, update, pipeline or index spec
    Validation,
    /// Arithmetic or accumulator applied to a non-numeric value
    TypeMismatch,
}

impl QueryErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::NotFound => "NUTRI_NOT_FOUND",
            QueryErrorCode::DuplicateKey => "NUTRI_DUPLICATE_KEY",
            QueryErrorCode::Validation => "NUTRI_VALIDATION_FAILED",
            QueryErrorCode::TypeMismatch => "NUTRI_TYPE_MISMATCH",
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error with code and context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
}

impl QueryError {
    /// Create a collection-not-found error
    pub fn not_found(collection: impl AsRef<str>) -> Self {
        Self {
            code: QueryErrorCode::NotFound,
            message: format!("collection '{}' does not exist", collection.as_ref()),
        }
    }

    /// Create a duplicate key error
    pub fn duplicate_key(reason: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::DuplicateKey,
            message: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::Validation,
            message: reason.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::TypeMismatch,
            message: reason.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true for malformed-input errors
    pub fn is_validation(&self) -> bool {
        self.code == QueryErrorCode::Validation
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for QueryError {}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
