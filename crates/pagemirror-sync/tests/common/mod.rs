//! Shared fakes and fixtures for engine tests

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use pagemirror_core::domain::{
    Block, BlockId, BlockKind, Category, CategoryId, Document, DocumentId, EmbedSnapshot,
    LinkPreview, ManifestEntry, PageChrome, SnapshotManifest,
};
use pagemirror_core::ports::{IAssetFetcher, IContentSource};
use pagemirror_store::{DatabasePool, SqliteDestinationStore};
use pagemirror_sync::assets::AssetLayout;
use pagemirror_sync::{InMemorySnapshotStore, SyncEngine, Unthrottled};

// ============================================================================
// Fixtures
// ============================================================================

pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

pub fn doc_id(id: &str) -> DocumentId {
    DocumentId::new(id.to_string()).unwrap()
}

pub fn document(id: &str, title: &str, edited: &str) -> Document {
    Document {
        id: doc_id(id),
        title: title.to_string(),
        tags: BTreeSet::from(["rust".to_string()]),
        category: "Language".to_string(),
        is_basic_curriculum: false,
        visibility: BTreeSet::new(),
        last_edited_time: ts(edited),
        published: true,
    }
}

pub fn block(id: &str, kind: BlockKind, content: &str) -> Block {
    Block::new(BlockId::new(id.to_string()).unwrap(), kind, content)
}

pub fn manifest(entries: &[(&str, &str)]) -> SnapshotManifest {
    SnapshotManifest::new(
        entries
            .iter()
            .map(|(id, t)| ManifestEntry {
                id: doc_id(id),
                last_edited_time: ts(t),
            })
            .collect(),
    )
}

// ============================================================================
// Fake content source
// ============================================================================

/// In-memory source; a document without a registered tree fails to fetch
#[derive(Default)]
pub struct FakeSource {
    pub documents: Mutex<Vec<Document>>,
    pub categories: Vec<Category>,
    pub trees: Mutex<HashMap<String, Vec<Block>>>,
    pub chrome: HashMap<String, PageChrome>,
}

impl FakeSource {
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Mutex::new(documents),
            ..Self::default()
        }
    }

    pub fn set_documents(&self, documents: Vec<Document>) {
        *self.documents.lock().unwrap() = documents;
    }

    pub fn set_tree(&self, id: &str, blocks: Vec<Block>) {
        self.trees.lock().unwrap().insert(id.to_string(), blocks);
    }

    pub fn category(mut self, id: &str, title: &str) -> Self {
        self.categories.push(Category {
            id: CategoryId::new(id.to_string()).unwrap(),
            title: title.to_string(),
        });
        self
    }
}

#[async_trait::async_trait]
impl IContentSource for FakeSource {
    async fn list_documents(&self) -> anyhow::Result<Vec<Document>> {
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        Ok(self.categories.clone())
    }

    async fn fetch_block_tree(&self, document_id: &DocumentId) -> anyhow::Result<Vec<Block>> {
        self.trees
            .lock()
            .unwrap()
            .get(document_id.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("object_not_found: {document_id}"))
    }

    async fn fetch_page_chrome(&self, page_id: &DocumentId) -> anyhow::Result<PageChrome> {
        Ok(self
            .chrome
            .get(page_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn find_document_by_title(&self, title: &str) -> anyhow::Result<Option<Document>> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.title == title)
            .cloned())
    }
}

// ============================================================================
// Fake asset fetcher
// ============================================================================

/// Serves canned previews and embeds; downloads write the URL as the body
#[derive(Default)]
pub struct FakeFetcher {
    pub previews: HashMap<String, LinkPreview>,
    pub embeds: HashMap<String, EmbedSnapshot>,
    pub failing: HashSet<String>,
    pub downloads: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeFetcher {
    fn check(&self, url: &str) -> anyhow::Result<()> {
        if self.failing.contains(url) {
            anyhow::bail!("connection reset: {url}");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IAssetFetcher for FakeFetcher {
    async fn download_to_path(&self, url: &str, path: &Path) -> anyhow::Result<u64> {
        self.check(url)?;
        tokio::fs::create_dir_all(path.parent().unwrap()).await?;
        tokio::fs::write(path, url.as_bytes()).await?;
        self.downloads
            .lock()
            .unwrap()
            .push((url.to_string(), path.to_path_buf()));
        Ok(url.len() as u64)
    }

    async fn fetch_link_preview(&self, url: &str) -> anyhow::Result<Option<LinkPreview>> {
        self.check(url)?;
        Ok(self.previews.get(url).cloned())
    }

    async fn fetch_embed_snapshot(&self, url: &str) -> anyhow::Result<Option<EmbedSnapshot>> {
        self.check(url)?;
        Ok(self.embeds.get(url).cloned())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: SyncEngine,
    pub source: Arc<FakeSource>,
    pub fetcher: Arc<FakeFetcher>,
    pub store: Arc<SqliteDestinationStore>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub layout: AssetLayout,
    _assets: TempDir,
}

impl Harness {
    pub async fn new(source: FakeSource, fetcher: FakeFetcher, prior: SnapshotManifest) -> Self {
        let pool = DatabasePool::in_memory()
            .await
            .expect("Failed to create in-memory database");
        let store = Arc::new(SqliteDestinationStore::new(pool.pool().clone()));
        let source = Arc::new(source);
        let fetcher = Arc::new(fetcher);
        let snapshots = Arc::new(InMemorySnapshotStore::new(prior));
        let assets = tempfile::tempdir().unwrap();
        let layout = AssetLayout::new(assets.path());

        let engine = SyncEngine::new(
            source.clone(),
            store.clone(),
            snapshots.clone(),
            fetcher.clone(),
            layout.clone(),
            Arc::new(Unthrottled),
        );

        Self {
            engine,
            source,
            fetcher,
            store,
            snapshots,
            layout,
            _assets: assets,
        }
    }

    pub fn asset(&self, document: &str, relative: &str) -> PathBuf {
        self.layout.document_dir(&doc_id(document)).join(relative)
    }

    pub fn read_json(&self, document: &str, relative: &str) -> serde_json::Value {
        let text = std::fs::read_to_string(self.asset(document, relative)).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}
