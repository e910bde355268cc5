//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including identifier validation and malformed source payloads.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid document identifier
    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    /// Invalid block identifier
    #[error("Invalid block ID: {0}")]
    InvalidBlockId(String),

    /// Invalid category identifier
    #[error("Invalid category ID: {0}")]
    InvalidCategoryId(String),

    /// A block payload did not contain the expected link pattern
    #[error("Malformed payload for {kind} block: {detail}")]
    MalformedPayload {
        /// The block type whose payload was malformed
        kind: String,
        /// What was missing
        detail: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
