//! Snapshot store adapters
//!
//! [`JsonSnapshotStore`] keeps the manifest as a pretty-printed JSON array
//! on disk. Saving writes a sibling temp file and renames it over the
//! target so a crash never leaves a half-written manifest. A missing file
//! loads as an empty manifest. [`InMemorySnapshotStore`] backs tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use pagemirror_core::domain::SnapshotManifest;
use pagemirror_core::ports::ISnapshotStore;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Manifest persisted as a JSON file
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    }
}

#[async_trait::async_trait]
impl ISnapshotStore for JsonSnapshotStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> anyhow::Result<SnapshotManifest> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot yet; starting from an empty manifest");
                return Ok(SnapshotManifest::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read snapshot {}", self.path.display()))
            }
        };

        let manifest: SnapshotManifest = serde_json::from_slice(&data)
            .with_context(|| format!("Failed to parse snapshot {}", self.path.display()))?;
        debug!(entries = manifest.len(), "Loaded snapshot");
        Ok(manifest)
    }

    #[instrument(skip_all, fields(path = %self.path.display(), entries = manifest.len()))]
    async fn save(&self, manifest: &SnapshotManifest) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let json = serde_json::to_vec_pretty(manifest).context("Failed to serialize snapshot")?;
        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!("Saved snapshot");
        Ok(())
    }
}

/// Manifest held in memory
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    manifest: Mutex<SnapshotManifest>,
    saves: AtomicUsize,
}

impl InMemorySnapshotStore {
    pub fn new(manifest: SnapshotManifest) -> Self {
        Self {
            manifest: Mutex::new(manifest),
            saves: AtomicUsize::new(0),
        }
    }

    /// The manifest as of the last save (or construction)
    pub async fn current(&self) -> SnapshotManifest {
        self.manifest.lock().await.clone()
    }

    /// Number of times `save` was called
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ISnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> anyhow::Result<SnapshotManifest> {
        Ok(self.manifest.lock().await.clone())
    }

    async fn save(&self, manifest: &SnapshotManifest) -> anyhow::Result<()> {
        *self.manifest.lock().await = manifest.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pagemirror_core::domain::{DocumentId, ManifestEntry};

    use super::*;

    fn manifest(ids: &[(&str, &str)]) -> SnapshotManifest {
        SnapshotManifest::new(
            ids.iter()
                .map(|(id, ts)| ManifestEntry {
                    id: DocumentId::new(id.to_string()).unwrap(),
                    last_edited_time: ts.parse().unwrap(),
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("manifest.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("nested").join("manifest.json"));
        let saved = manifest(&[
            ("doc-a", "2024-05-01T10:00:00Z"),
            ("doc-b", "2024-05-02T11:30:00Z"),
        ]);

        store.save(&saved).await.unwrap();
        assert_eq!(store.load().await.unwrap(), saved);
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_saved_file_is_pretty_legacy_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let store = JsonSnapshotStore::new(&path);
        store
            .save(&manifest(&[("doc-a", "2024-05-01T10:00:00Z")]))
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n"));
        assert!(text.contains("\"Last_edited_time\": \"2024-05-01T10:00:00Z\""));
    }

    #[tokio::test]
    async fn test_reads_existing_manifest_with_millis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"[{"id":"doc-a","Last_edited_time":"2024-05-01T10:00:00.000Z"}]"#,
        )
        .unwrap();

        let loaded = JsonSnapshotStore::new(&path).load().await.unwrap();
        assert_eq!(loaded, manifest(&[("doc-a", "2024-05-01T10:00:00Z")]));
    }

    #[tokio::test]
    async fn test_corrupt_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(JsonSnapshotStore::new(&path).load().await.is_err());
    }

    #[tokio::test]
    async fn test_in_memory_counts_saves() {
        let store = InMemorySnapshotStore::default();
        let m = manifest(&[("doc-a", "2024-05-01T10:00:00Z")]);
        store.save(&m).await.unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.current().await, m);
    }
}
