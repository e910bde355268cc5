//! Asset fetcher port
//!
//! Given a URL, fetch bytes or metadata. Failures surface as errors; the
//! reconciler decides whether they are fatal (they never are).

use std::path::Path;

use crate::domain::{EmbedSnapshot, LinkPreview};

/// Port trait for fetching external assets
#[async_trait::async_trait]
pub trait IAssetFetcher: Send + Sync {
    /// Streams the body at `url` into `path`, creating parent directories
    ///
    /// Returns the number of bytes written.
    async fn download_to_path(&self, url: &str, path: &Path) -> anyhow::Result<u64>;

    /// Scrapes link-preview metadata for `url`
    ///
    /// Returns `None` when the page yields no preview at all.
    async fn fetch_link_preview(&self, url: &str) -> anyhow::Result<Option<LinkPreview>>;

    /// Fetches an embed snapshot (title and markup) for `url`
    async fn fetch_embed_snapshot(&self, url: &str) -> anyhow::Result<Option<EmbedSnapshot>>;
}
