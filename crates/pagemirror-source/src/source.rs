//! IContentSource implementation backed by the Notion API
//!
//! ## Property mapping
//!
//! | Document field        | Notion property                  | When absent  |
//! |-----------------------|----------------------------------|--------------|
//! | `title`               | `title` (title)                  | `"untitled"` |
//! | `tags`                | `tag` (multi_select)             | empty        |
//! | `category`            | `category` (select)              | `""`         |
//! | `is_basic_curriculum` | `is_basic_curriculum` (checkbox) | `false`      |
//! | `visibility`          | `visibility` (multi_select)      | empty        |
//! | `published`           | `published` (checkbox)           | `true`       |
//!
//! When no property is literally named `title`, the first property of type
//! `title` is used instead.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use anyhow::Context;
use pagemirror_core::domain::{
    Block, BlockId, BlockKind, Category, CategoryId, Document, DocumentId, PageChrome,
};
use pagemirror_core::ports::IContentSource;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::client::{NotionClient, RawPage};
use crate::markdown::{plain_text, render_block};
use crate::SourceError;

const TITLE_PROPERTY: &str = "title";
const UNTITLED: &str = "untitled";

/// Content source reading documents and categories from Notion databases
pub struct NotionContentSource {
    client: NotionClient,
    documents_database_id: String,
    categories_database_id: Option<String>,
}

impl NotionContentSource {
    /// Creates a source over the documents database
    pub fn new(client: NotionClient, documents_database_id: impl Into<String>) -> Self {
        Self {
            client,
            documents_database_id: documents_database_id.into(),
            categories_database_id: None,
        }
    }

    /// Enables category listing from a second database
    pub fn with_categories_database(mut self, database_id: impl Into<String>) -> Self {
        self.categories_database_id = Some(database_id.into());
        self
    }

    /// Fetches the children of `parent_id` and, recursively, theirs
    fn fetch_children<'a>(
        &'a self,
        parent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Block>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let raw_blocks = self.client.list_block_children(parent_id).await?;
            let mut blocks = Vec::with_capacity(raw_blocks.len());

            for raw in raw_blocks {
                let id = BlockId::new(raw.id.clone())
                    .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
                let content = render_block(&raw);
                let mut block = Block::new(id, BlockKind::from_type_name(&raw.block_type), content);

                if raw.has_children {
                    block.children = self.fetch_children(&raw.id).await?;
                }
                blocks.push(block);
            }

            Ok(blocks)
        })
    }
}

// ============================================================================
// Property extraction
// ============================================================================

fn title_of(properties: &Map<String, Value>) -> String {
    let property = properties.get(TITLE_PROPERTY).or_else(|| {
        properties
            .values()
            .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
    });

    let title = property
        .and_then(|p| p.get("title"))
        .and_then(Value::as_array)
        .map(|items| plain_text(items))
        .unwrap_or_default();

    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

fn multi_select(properties: &Map<String, Value>, name: &str) -> BTreeSet<String> {
    properties
        .get(name)
        .and_then(|p| p.get("multi_select"))
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn select(properties: &Map<String, Value>, name: &str) -> String {
    properties
        .get(name)
        .and_then(|p| p.pointer("/select/name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn checkbox(properties: &Map<String, Value>, name: &str) -> Option<bool> {
    properties
        .get(name)
        .and_then(|p| p.get("checkbox"))
        .and_then(Value::as_bool)
}

/// Maps a page of the documents database onto a [`Document`]
pub fn document_from_page(page: &RawPage) -> Result<Document, SourceError> {
    let id = DocumentId::new(page.id.clone())
        .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
    let props = &page.properties;

    Ok(Document {
        id,
        title: title_of(props),
        tags: multi_select(props, "tag"),
        category: select(props, "category"),
        is_basic_curriculum: checkbox(props, "is_basic_curriculum").unwrap_or(false),
        visibility: multi_select(props, "visibility"),
        last_edited_time: page.last_edited_time,
        published: checkbox(props, "published").unwrap_or(true),
    })
}

fn category_from_page(page: &RawPage) -> Result<Category, SourceError> {
    let id = CategoryId::new(page.id.clone())
        .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
    Ok(Category {
        id,
        title: title_of(&page.properties),
    })
}

// ============================================================================
// IContentSource implementation
// ============================================================================

#[async_trait::async_trait]
impl IContentSource for NotionContentSource {
    #[instrument(skip(self))]
    async fn list_documents(&self) -> anyhow::Result<Vec<Document>> {
        let pages = self
            .client
            .query_database(&self.documents_database_id, None)
            .await
            .context("Failed to list documents")?;

        let documents = pages
            .iter()
            .map(document_from_page)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = documents.len(), "Listed documents");
        Ok(documents)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        let Some(ref database_id) = self.categories_database_id else {
            debug!("No categories database configured");
            return Ok(Vec::new());
        };

        let pages = self
            .client
            .query_database(database_id, None)
            .await
            .context("Failed to list categories")?;

        Ok(pages
            .iter()
            .map(category_from_page)
            .collect::<Result<Vec<_>, _>>()?)
    }

    #[instrument(skip_all, fields(document_id = %document_id))]
    async fn fetch_block_tree(&self, document_id: &DocumentId) -> anyhow::Result<Vec<Block>> {
        let blocks = self
            .fetch_children(document_id.as_str())
            .await
            .with_context(|| format!("Failed to fetch block tree of {document_id}"))?;
        debug!(
            total = blocks.iter().map(Block::subtree_len).sum::<usize>(),
            "Fetched block tree"
        );
        Ok(blocks)
    }

    async fn fetch_page_chrome(&self, page_id: &DocumentId) -> anyhow::Result<PageChrome> {
        let page = self
            .client
            .retrieve_page(page_id.as_str())
            .await
            .with_context(|| format!("Failed to retrieve page {page_id}"))?;
        Ok(PageChrome {
            icon: page.icon,
            cover: page.cover,
        })
    }

    async fn find_document_by_title(&self, title: &str) -> anyhow::Result<Option<Document>> {
        // The query filter must name the title property as the database calls it.
        let database = self
            .client
            .retrieve_database(&self.documents_database_id)
            .await
            .with_context(|| format!("Failed to retrieve database {}", self.documents_database_id))?;
        let property = database.title_property().unwrap_or(TITLE_PROPERTY);
        debug!(property, "Resolved title property");

        let filter = serde_json::json!({
            "property": property,
            "title": { "equals": title },
        });
        let pages = self
            .client
            .query_database(&self.documents_database_id, Some(filter))
            .await
            .with_context(|| format!("Failed to look up document titled '{title}'"))?;

        for page in &pages {
            let document = document_from_page(page)?;
            if document.title == title {
                return Ok(Some(document));
            }
        }
        Ok(None)
    }
}
