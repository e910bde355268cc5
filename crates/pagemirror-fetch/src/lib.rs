//! Pagemirror Fetch - External asset fetching
//!
//! Implements the `IAssetFetcher` port over HTTP:
//! - Streaming blob downloads to disk
//! - Open Graph link previews scraped from HTML
//! - oEmbed embed snapshots
//!
//! ## Modules
//!
//! - [`fetcher`] - `HttpAssetFetcher`, the port implementation
//! - [`html`] - Lightweight `<meta>`/`<link>` scanning

pub mod fetcher;
pub mod html;

use std::path::PathBuf;

use thiserror::Error;

pub use fetcher::HttpAssetFetcher;

/// Errors that can occur while fetching external assets
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Writing the downloaded body failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The response body could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
