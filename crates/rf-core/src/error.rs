//! # AppError
//!
//! Centralized error handling for the Rusty-Forum ecosystem.
//! Every port returns these so adapters and the API layer agree on meaning.

use thiserror::Error;

/// The primary error type for all rf-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., Magazine, Thread, Comment, Reply, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The requested state already holds (duplicate boost, subscription, vote row)
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor is not the author of the content it tries to change
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A reply's thread / parent comment / parent reply disagree
    #[error("mismatched parent: {0}")]
    ValidationMismatch(String),

    /// Malformed input (empty title, oversized body)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// No authenticated principal where one is required
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down, broken row)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }
}

/// A specialized Result type for Rusty-Forum logic.
pub type Result<T> = std::result::Result<T, AppError>;
