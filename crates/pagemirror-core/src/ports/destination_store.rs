//! Destination store port (driven/secondary port)
//!
//! The store receiving mirrored rows. All writes are upserts or deletes by
//! key, so replaying a pipeline is idempotent.

use crate::domain::{BlockRow, Category, CategoryId, Document, DocumentId};

/// Port trait for the destination store
///
/// ## Implementation Notes
///
/// - Block rows are keyed by `block_id`; upserting the same id twice must
///   leave a single row.
/// - `delete_blocks_by_document` removes every row whose owning
///   `document_id` matches, nested pages included.
#[async_trait::async_trait]
pub trait IDestinationStore: Send + Sync {
    /// Inserts or updates a document's metadata row
    async fn upsert_document(&self, document: &Document) -> anyhow::Result<()>;

    /// Fetches a document's metadata row, if present
    async fn get_document(&self, id: &DocumentId) -> anyhow::Result<Option<Document>>;

    /// Deletes a document's metadata row
    async fn delete_document(&self, id: &DocumentId) -> anyhow::Result<()>;

    /// Inserts or updates a single block row
    async fn upsert_block(&self, row: &BlockRow) -> anyhow::Result<()>;

    /// Deletes every block row owned by a document
    ///
    /// Returns the number of rows removed.
    async fn delete_blocks_by_document(&self, id: &DocumentId) -> anyhow::Result<u64>;

    /// Lists a document's block rows ordered by parent and position
    async fn list_blocks(&self, id: &DocumentId) -> anyhow::Result<Vec<BlockRow>>;

    /// Inserts or updates a category
    async fn upsert_category(&self, category: &Category) -> anyhow::Result<()>;

    /// Deletes a category
    async fn delete_category(&self, id: &CategoryId) -> anyhow::Result<()>;

    /// Lists every stored category ordered by title
    async fn list_categories(&self) -> anyhow::Result<Vec<Category>>;
}
