//! Pagemirror Sync - Incremental mirroring engine
//!
//! Provides:
//! - Change-driven insert, edit and delete pipelines per document
//! - Depth-first block tree replication into the destination store
//! - Clear-then-repopulate asset reconciliation on disk
//! - Token-bucket throttling of source and destination calls
//!
//! ## Modules
//!
//! - [`engine`] - Run orchestrator sequencing detection, pipelines and snapshot finalization
//! - [`replicator`] - Ordered upsert of a block tree with scope switching at nested pages
//! - [`reconciler`] - Image downloads, link previews, embed snapshots and page chrome
//! - [`assets`] - Per-document asset directory layout
//! - [`snapshot`] - JSON and in-memory snapshot stores
//! - [`rate_limit`] - Throttle trait, token bucket and a no-op throttle for tests

pub mod assets;
pub mod engine;
pub mod rate_limit;
pub mod reconciler;
pub mod replicator;
pub mod snapshot;

use std::path::PathBuf;

use thiserror::Error;

pub use engine::{RunOutcome, RunReport, SyncEngine};
pub use rate_limit::{Throttle, TokenBucket, Unthrottled};
pub use snapshot::{InMemorySnapshotStore, JsonSnapshotStore};

/// Fatal errors that abort a run before its snapshot is written
#[derive(Debug, Error)]
pub enum SyncError {
    /// The content source failed while listing or fetching
    #[error("Source error: {0:#}")]
    Source(anyhow::Error),

    /// The destination store rejected a document-level write
    #[error("Store error: {0:#}")]
    Store(anyhow::Error),

    /// The snapshot manifest could not be loaded or saved
    #[error("Snapshot error: {0:#}")]
    Snapshot(anyhow::Error),

    /// An asset directory could not be prepared or removed
    #[error("Asset directory error at {}: {source}", path.display())]
    AssetDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single-document lookup matched nothing
    #[error("No document titled '{0}'")]
    DocumentNotFound(String),

    /// A domain-level error propagated from pagemirror-core
    #[error("Domain error: {0}")]
    DomainError(#[from] pagemirror_core::domain::DomainError),
}

impl SyncError {
    pub(crate) fn asset_dir(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::AssetDirectory { path, source }
    }
}
