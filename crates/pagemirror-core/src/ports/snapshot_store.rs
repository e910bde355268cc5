//! Snapshot store port
//!
//! Access to the manifest of the previous successful run, injected instead
//! of read from a well-known file so tests can substitute memory.

use crate::domain::SnapshotManifest;

/// Port trait for the snapshot manifest
#[async_trait::async_trait]
pub trait ISnapshotStore: Send + Sync {
    /// Loads the last saved manifest; an absent manifest is empty
    async fn load(&self) -> anyhow::Result<SnapshotManifest>;

    /// Replaces the saved manifest
    async fn save(&self, manifest: &SnapshotManifest) -> anyhow::Result<()>;
}
