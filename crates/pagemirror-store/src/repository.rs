//! SQLite implementation of IDestinationStore
//!
//! ## Type Mapping
//!
//! | Domain Type                 | SQL Type | Strategy                                   |
//! |-----------------------------|----------|--------------------------------------------|
//! | DocumentId, BlockId, CategoryId | TEXT | `.as_str()` / `::new()`                    |
//! | BlockKind                   | TEXT     | Source type tag via `.as_str()`            |
//! | DateTime<Utc>               | TEXT     | RFC 3339 with milliseconds                 |
//! | BTreeSet<String>            | TEXT     | serde_json array                           |
//! | bool                        | INTEGER  | 0 / 1                                      |
//!
//! Every write is `INSERT OR REPLACE` keyed by the primary key, so replaying
//! the same rows leaves the tables unchanged.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use pagemirror_core::domain::{
    BlockId, BlockKind, BlockRow, Category, CategoryId, Document, DocumentId,
};
use pagemirror_core::ports::IDestinationStore;

use crate::StoreError;

/// SQLite-based implementation of the destination store port
pub struct SqliteDestinationStore {
    pool: SqlitePool,
}

impl SqliteDestinationStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of block rows currently stored
    pub async fn count_blocks(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn set_to_json(set: &BTreeSet<String>) -> Result<String, StoreError> {
    serde_json::to_string(set)
        .map_err(|e| StoreError::SerializationError(format!("Failed to serialize set: {}", e)))
}

fn set_from_json(s: &str) -> Result<BTreeSet<String>, StoreError> {
    serde_json::from_str(s)
        .map_err(|e| StoreError::SerializationError(format!("Invalid set JSON '{}': {}", s, e)))
}

fn document_id(s: String) -> Result<DocumentId, StoreError> {
    DocumentId::new(s.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid DocumentId '{}': {}", s, e))
    })
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn document_from_row(row: &SqliteRow) -> Result<Document, StoreError> {
    let id: String = row.get("id");
    let tags: String = row.get("tags");
    let visibility: String = row.get("visibility");
    let last_edited_time: String = row.get("last_edited_time");
    let is_basic_curriculum: i64 = row.get("is_basic_curriculum");
    let published: i64 = row.get("published");

    Ok(Document {
        id: document_id(id)?,
        title: row.get("title"),
        tags: set_from_json(&tags)?,
        category: row.get("category"),
        is_basic_curriculum: is_basic_curriculum != 0,
        visibility: set_from_json(&visibility)?,
        last_edited_time: parse_datetime(&last_edited_time)?,
        published: published != 0,
    })
}

fn block_row_from_row(row: &SqliteRow) -> Result<BlockRow, StoreError> {
    let block_id: String = row.get("block_id");
    let owner: String = row.get("document_id");
    let page_id: String = row.get("page_id");
    let kind: String = row.get("kind");
    let position: i64 = row.get("position");

    let block_id = BlockId::new(block_id.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid BlockId '{}': {}", block_id, e))
    })?;
    let order = u32::try_from(position).map_err(|_| {
        StoreError::SerializationError(format!("Invalid block position {}", position))
    })?;

    Ok(BlockRow {
        document_id: document_id(owner)?,
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        block_id,
        kind: BlockKind::from_type_name(&kind),
        page_id: document_id(page_id)?,
        order,
    })
}

fn category_from_row(row: &SqliteRow) -> Result<Category, StoreError> {
    let id: String = row.get("id");
    let id = CategoryId::new(id.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid CategoryId '{}': {}", id, e))
    })?;
    Ok(Category {
        id,
        title: row.get("title"),
    })
}

// ============================================================================
// IDestinationStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IDestinationStore for SqliteDestinationStore {
    // --- Documents ---

    async fn upsert_document(&self, document: &Document) -> anyhow::Result<()> {
        let tags = set_to_json(&document.tags)?;
        let visibility = set_to_json(&document.visibility)?;

        sqlx::query(
            "INSERT OR REPLACE INTO documents \
             (id, title, tags, category, is_basic_curriculum, visibility, \
              last_edited_time, published) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(document.id.as_str())
        .bind(&document.title)
        .bind(&tags)
        .bind(&document.category)
        .bind(document.is_basic_curriculum as i64)
        .bind(&visibility)
        .bind(format_datetime(&document.last_edited_time))
        .bind(document.published as i64)
        .execute(&self.pool)
        .await?;

        tracing::debug!(document_id = %document.id, title = %document.title, "Upserted document");
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> anyhow::Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(document_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn delete_document(&self, id: &DocumentId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        tracing::debug!(document_id = %id, "Deleted document");
        Ok(())
    }

    // --- Blocks ---

    async fn upsert_block(&self, row: &BlockRow) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO blocks \
             (block_id, document_id, parent_id, page_id, kind, content, position) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.block_id.as_str())
        .bind(row.document_id.as_str())
        .bind(&row.parent_id)
        .bind(row.page_id.as_str())
        .bind(row.kind.as_str())
        .bind(&row.content)
        .bind(i64::from(row.order))
        .execute(&self.pool)
        .await?;

        tracing::trace!(block_id = %row.block_id, order = row.order, "Upserted block");
        Ok(())
    }

    async fn delete_blocks_by_document(&self, id: &DocumentId) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM blocks WHERE document_id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        tracing::debug!(document_id = %id, removed, "Deleted block rows");
        Ok(removed)
    }

    async fn list_blocks(&self, id: &DocumentId) -> anyhow::Result<Vec<BlockRow>> {
        let rows = sqlx::query(
            "SELECT * FROM blocks WHERE document_id = ? ORDER BY parent_id, position",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut blocks = Vec::with_capacity(rows.len());
        for row in &rows {
            blocks.push(block_row_from_row(row)?);
        }
        Ok(blocks)
    }

    // --- Categories ---

    async fn upsert_category(&self, category: &Category) -> anyhow::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO categories (id, title) VALUES (?, ?)")
            .bind(category.id.as_str())
            .bind(&category.title)
            .execute(&self.pool)
            .await?;

        tracing::trace!(category_id = %category.id, "Upserted category");
        Ok(())
    }

    async fn delete_category(&self, id: &CategoryId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY title, id")
            .fetch_all(&self.pool)
            .await?;

        let mut categories = Vec::with_capacity(rows.len());
        for row in &rows {
            categories.push(category_from_row(row)?);
        }
        Ok(categories)
    }
}
