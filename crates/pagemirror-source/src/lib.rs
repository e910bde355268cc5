//! Pagemirror Source - Notion content source
//!
//! Provides the driven adapter behind `IContentSource`:
//! - Paginated database queries for documents and categories
//! - Recursive block children traversal
//! - Block to markdown payload rendering
//! - Page icon/cover retrieval
//!
//! ## Modules
//!
//! - [`client`] - Notion REST API HTTP client
//! - [`markdown`] - Rich text and block payload rendering
//! - [`source`] - `IContentSource` implementation

pub mod client;
pub mod markdown;
pub mod source;

use std::time::Duration;

use thiserror::Error;

pub use client::NotionClient;
pub use source::NotionContentSource;

/// Errors that can occur when communicating with the Notion API
#[derive(Debug, Error)]
pub enum SourceError {
    /// The integration token is missing, invalid or revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The integration has no access to the resource, or it does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
