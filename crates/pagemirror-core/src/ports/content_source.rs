//! Content source port (driven/secondary port)
//!
//! This module defines the interface for reading the remote document
//! database. The primary implementation targets the Notion API, but the
//! trait only speaks in domain types.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - `list_documents` returns every document regardless of publish state;
//!   filtering is the orchestrator's decision.

use crate::domain::{Block, Category, Document, DocumentId, PageChrome};

/// Port trait for the content source being mirrored
#[async_trait::async_trait]
pub trait IContentSource: Send + Sync {
    /// Lists every document with its metadata and last edit time
    async fn list_documents(&self) -> anyhow::Result<Vec<Document>>;

    /// Lists every category
    async fn list_categories(&self) -> anyhow::Result<Vec<Category>>;

    /// Fetches a document's full block tree, children included, in source order
    async fn fetch_block_tree(&self, document_id: &DocumentId) -> anyhow::Result<Vec<Block>>;

    /// Fetches the icon and cover of a document or nested page
    async fn fetch_page_chrome(&self, page_id: &DocumentId) -> anyhow::Result<PageChrome>;

    /// Finds a document by its exact title
    ///
    /// Returns `None` when no document has that title.
    async fn find_document_by_title(&self, title: &str) -> anyhow::Result<Option<Document>>;
}
