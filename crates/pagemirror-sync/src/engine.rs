//! Run orchestrator
//!
//! The [`SyncEngine`] mirrors the content source into the destination
//! store and the asset tree, one run at a time.
//!
//! ## Run Flow
//!
//! 1. **Detect**: load the snapshot, list every document, classify changes
//! 2. **Categories**: delete and reinsert every listed category
//! 3. **Insert**: for each new document, fetch its tree, upsert its row,
//!    prepare its asset directories, replicate blocks, reconcile assets
//! 4. **Edit**: as insert, after purging the document's existing block rows
//! 5. **Delete**: remove the document row, its block rows and its asset tree
//! 6. **Finalize**: save the full current listing as the new snapshot
//!
//! Any error in steps 1-5 aborts the run before step 6, leaving the prior
//! snapshot in place. Per-block and per-asset failures are not errors;
//! they are collected in the run report.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use pagemirror_core::domain::{
    Block, Document, DocumentId, SnapshotManifest, StepOutcome,
};
use pagemirror_core::ports::{IAssetFetcher, IContentSource, IDestinationStore, ISnapshotStore};
use pagemirror_core::usecases::{ChangeDetector, ChangeSet};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::assets::AssetLayout;
use crate::rate_limit::Throttle;
use crate::reconciler::{AssetReconciler, ReconcileReport};
use crate::replicator::{BlockReplicator, ReplicationReport};
use crate::SyncError;

/// Overall result class of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one document was inserted, edited or deleted
    Applied,
    /// No document changed
    NoChanges,
}

impl RunOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Applied => 0,
            Self::NoChanges => 2,
        }
    }
}

/// Pipeline applied to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentAction {
    Insert,
    Edit,
    Delete,
}

impl Display for DocumentAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Edit => "edit",
            Self::Delete => "delete",
        })
    }
}

/// What happened to one document during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentResult {
    pub document_id: DocumentId,
    pub action: DocumentAction,
    pub outcome: StepOutcome,
    pub replication: Option<ReplicationReport>,
    pub assets: Option<ReconcileReport>,
}

impl DocumentResult {
    fn skipped(document_id: &DocumentId, action: DocumentAction, reason: &str) -> Self {
        Self {
            document_id: document_id.clone(),
            action,
            outcome: StepOutcome::skipped(reason),
            replication: None,
            assets: None,
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub changes: ChangeSet,
    /// Categories refreshed
    pub categories: usize,
    pub documents: Vec<DocumentResult>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn outcome(&self) -> RunOutcome {
        if self.changes.is_empty() {
            RunOutcome::NoChanges
        } else {
            RunOutcome::Applied
        }
    }

    /// Block rows that failed to upsert across all documents
    pub fn block_failures(&self) -> usize {
        self.documents
            .iter()
            .filter_map(|d| d.replication.as_ref())
            .map(|r| r.failures.len())
            .sum()
    }

    /// Assets left missing across all documents
    pub fn asset_skips(&self) -> usize {
        self.documents
            .iter()
            .filter_map(|d| d.assets.as_ref())
            .map(|r| r.skipped.len())
            .sum()
    }
}

/// Incremental mirroring engine
///
/// ## Dependencies
///
/// - `source`: Documents, categories, block trees and page chrome
/// - `store`: Destination rows
/// - `snapshots`: Manifest of the last successful run
/// - `fetcher`: Asset downloads, link previews and embed snapshots
/// - `throttle`: Shared by every stage
pub struct SyncEngine {
    source: Arc<dyn IContentSource>,
    store: Arc<dyn IDestinationStore>,
    snapshots: Arc<dyn ISnapshotStore>,
    throttle: Arc<dyn Throttle>,
    replicator: BlockReplicator,
    reconciler: AssetReconciler,
    detector: ChangeDetector,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn IContentSource>,
        store: Arc<dyn IDestinationStore>,
        snapshots: Arc<dyn ISnapshotStore>,
        fetcher: Arc<dyn IAssetFetcher>,
        layout: AssetLayout,
        throttle: Arc<dyn Throttle>,
    ) -> Self {
        Self {
            replicator: BlockReplicator::new(store.clone(), throttle.clone()),
            reconciler: AssetReconciler::new(source.clone(), fetcher, layout, throttle.clone()),
            source,
            store,
            snapshots,
            throttle,
            detector: ChangeDetector::new(),
        }
    }

    fn layout(&self) -> &AssetLayout {
        self.reconciler.layout()
    }

    /// Lists the source and classifies it against the snapshot
    async fn detect(&self) -> Result<(Vec<Document>, SnapshotManifest, ChangeSet), SyncError> {
        let prior = self.snapshots.load().await.map_err(SyncError::Snapshot)?;
        let documents = self
            .source
            .list_documents()
            .await
            .map_err(SyncError::Source)?;
        let current = SnapshotManifest::from_documents(&documents);
        let changes = self.detector.detect(&current, &prior);

        info!(
            listed = documents.len(),
            new = changes.new.len(),
            edited = changes.edited.len(),
            deleted = changes.deleted.len(),
            unchanged = changes.unchanged.len(),
            "Detected changes"
        );
        Ok((documents, current, changes))
    }

    /// Computes the change set without writing anything
    #[tracing::instrument(skip(self))]
    pub async fn plan(&self) -> Result<ChangeSet, SyncError> {
        let (_, _, changes) = self.detect().await?;
        Ok(changes)
    }

    /// Performs one full run
    ///
    /// # Errors
    /// Any source, store, snapshot or asset-directory failure outside the
    /// per-block and per-asset steps. The snapshot is then left untouched.
    pub async fn run(&self) -> Result<RunReport, SyncError> {
        let run_id = Uuid::new_v4();
        self.run_inner(run_id)
            .instrument(info_span!("run", run_id = %run_id))
            .await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunReport, SyncError> {
        let start = Instant::now();
        info!("Starting run");

        let (documents, current, changes) = self.detect().await?;
        let categories = self.refresh_categories().await?;

        let by_id: HashMap<&DocumentId, &Document> =
            documents.iter().map(|d| (&d.id, d)).collect();
        let mut results = Vec::with_capacity(changes.pending());

        for (entries, action) in [
            (&changes.new, DocumentAction::Insert),
            (&changes.edited, DocumentAction::Edit),
        ] {
            for entry in entries {
                let Some(document) = by_id.get(&entry.id) else {
                    continue;
                };
                results.push(self.mirror_document(document, action).await?);
            }
        }

        for entry in &changes.deleted {
            results.push(self.remove_document(&entry.id).await?);
        }

        self.snapshots
            .save(&current)
            .await
            .map_err(SyncError::Snapshot)?;

        let report = RunReport {
            run_id,
            changes,
            categories,
            documents: results,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        match report.outcome() {
            RunOutcome::NoChanges => info!(
                categories,
                duration_ms = report.duration_ms,
                "No document changes"
            ),
            RunOutcome::Applied => info!(
                documents = report.documents.len(),
                block_failures = report.block_failures(),
                asset_skips = report.asset_skips(),
                duration_ms = report.duration_ms,
                "Run complete"
            ),
        }
        Ok(report)
    }

    /// Runs the edit pipeline for the document with exactly this title
    ///
    /// The snapshot is not read or written.
    ///
    /// # Errors
    /// [`SyncError::DocumentNotFound`] when no document has that title.
    #[tracing::instrument(skip(self))]
    pub async fn resync_by_title(&self, title: &str) -> Result<DocumentResult, SyncError> {
        let document = self
            .source
            .find_document_by_title(title)
            .await
            .map_err(SyncError::Source)?
            .ok_or_else(|| SyncError::DocumentNotFound(title.to_string()))?;

        info!(document_id = %document.id, "Resyncing document");
        self.mirror_document(&document, DocumentAction::Edit).await
    }

    /// Deletes and reinserts every category listed by the source
    async fn refresh_categories(&self) -> Result<usize, SyncError> {
        let categories = self
            .source
            .list_categories()
            .await
            .map_err(SyncError::Source)?;

        for category in &categories {
            self.throttle.acquire().await;
            self.store
                .delete_category(&category.id)
                .await
                .map_err(SyncError::Store)?;
            self.store
                .upsert_category(category)
                .await
                .map_err(SyncError::Store)?;
        }

        debug!(count = categories.len(), "Refreshed categories");
        Ok(categories.len())
    }

    /// Insert or edit pipeline for one document
    async fn mirror_document(
        &self,
        document: &Document,
        action: DocumentAction,
    ) -> Result<DocumentResult, SyncError> {
        let id = &document.id;
        if !document.published {
            info!(document_id = %id, %action, "Skipping unpublished document");
            return Ok(DocumentResult::skipped(id, action, "unpublished"));
        }

        self.throttle.acquire().await;
        let blocks: Vec<Block> = self
            .source
            .fetch_block_tree(id)
            .await
            .map_err(SyncError::Source)?;

        self.store
            .upsert_document(document)
            .await
            .map_err(SyncError::Store)?;

        if action == DocumentAction::Edit {
            let removed = self
                .store
                .delete_blocks_by_document(id)
                .await
                .map_err(SyncError::Store)?;
            debug!(document_id = %id, removed, "Purged previous block rows");
        }

        self.layout().prepare(id).await?;
        let replication = self.replicator.replicate_document(id, &blocks).await;
        let assets = self.reconciler.reconcile_document(id, &blocks).await;

        if !replication.is_clean() {
            warn!(
                document_id = %id,
                failed = replication.failures.len(),
                "Some blocks were not replicated"
            );
        }
        info!(
            document_id = %id,
            title = %document.title,
            %action,
            blocks = replication.applied,
            assets = assets.applied,
            "Mirrored document"
        );

        Ok(DocumentResult {
            document_id: id.clone(),
            action,
            outcome: StepOutcome::Applied,
            replication: Some(replication),
            assets: Some(assets),
        })
    }

    /// Delete pipeline for one document
    async fn remove_document(&self, id: &DocumentId) -> Result<DocumentResult, SyncError> {
        self.throttle.acquire().await;
        self.store
            .delete_document(id)
            .await
            .map_err(SyncError::Store)?;
        let removed = self
            .store
            .delete_blocks_by_document(id)
            .await
            .map_err(SyncError::Store)?;
        let had_assets = self.layout().remove(id).await?;

        info!(document_id = %id, blocks = removed, had_assets, "Deleted document");
        Ok(DocumentResult {
            document_id: id.clone(),
            action: DocumentAction::Delete,
            outcome: StepOutcome::Applied,
            replication: None,
            assets: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunOutcome::Applied.exit_code(), 0);
        assert_eq!(RunOutcome::NoChanges.exit_code(), 2);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(DocumentAction::Insert.to_string(), "insert");
        assert_eq!(DocumentAction::Delete.to_string(), "delete");
    }
}
