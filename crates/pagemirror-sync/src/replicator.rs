//! Block tree replication
//!
//! Flattens a document's block tree into destination rows, depth first.
//! Children are written before their parent, each row carrying:
//!
//! - `parent_id` - the document id for top-level blocks, the parent block's
//!   id otherwise
//! - `order` - 1-based position among its siblings, assigned here
//! - `page_id` - the innermost enclosing page; children of a `child_page`
//!   block belong to that nested page instead of the outer document
//!
//! Upsert failures are logged and collected. They never stop the walk.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pagemirror_core::domain::{Block, BlockId, BlockRow, DocumentId, StepOutcome};
use pagemirror_core::ports::IDestinationStore;
use tracing::{debug, warn};

use crate::rate_limit::Throttle;

/// Result of replicating one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Rows written successfully
    pub applied: usize,
    /// Blocks whose upsert failed, with the reason
    pub failures: Vec<(BlockId, StepOutcome)>,
}

impl ReplicationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, block_id: &BlockId, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Applied => self.applied += 1,
            skipped => self.failures.push((block_id.clone(), skipped)),
        }
    }
}

/// Writes block trees into the destination store
pub struct BlockReplicator {
    store: Arc<dyn IDestinationStore>,
    throttle: Arc<dyn Throttle>,
}

impl BlockReplicator {
    pub fn new(store: Arc<dyn IDestinationStore>, throttle: Arc<dyn Throttle>) -> Self {
        Self { store, throttle }
    }

    /// Replicates a document's top-level blocks and everything beneath them
    pub async fn replicate_document(
        &self,
        document_id: &DocumentId,
        blocks: &[Block],
    ) -> ReplicationReport {
        let mut report = ReplicationReport::default();
        self.replicate(
            document_id,
            document_id.as_str(),
            blocks,
            document_id,
            &mut report,
        )
        .await;
        debug!(
            document_id = %document_id,
            applied = report.applied,
            failed = report.failures.len(),
            "Replicated block tree"
        );
        report
    }

    /// Replicates `blocks` as the ordered children of `parent_id`
    ///
    /// # Arguments
    /// * `document_id` - Owning top-level document, used for cascade deletes
    /// * `parent_id` - Id of the enclosing block, or the document id at the top
    /// * `blocks` - Siblings in source order; positions become `order` 1..n
    /// * `page_id` - Innermost enclosing page
    pub fn replicate<'a>(
        &'a self,
        document_id: &'a DocumentId,
        parent_id: &'a str,
        blocks: &'a [Block],
        page_id: &'a DocumentId,
        report: &'a mut ReplicationReport,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            for (index, block) in blocks.iter().enumerate() {
                let order = index as u32 + 1;
                self.throttle.acquire().await;

                if !block.children.is_empty() {
                    let child_scope = block.child_scope(page_id);
                    self.replicate(
                        document_id,
                        block.id.as_str(),
                        &block.children,
                        &child_scope,
                        report,
                    )
                    .await;
                }

                let row = BlockRow {
                    document_id: document_id.clone(),
                    parent_id: parent_id.to_string(),
                    content: block.content.clone(),
                    block_id: block.id.clone(),
                    kind: block.kind.clone(),
                    page_id: page_id.clone(),
                    order,
                };

                let outcome = match self.store.upsert_block(&row).await {
                    Ok(()) => StepOutcome::Applied,
                    Err(e) => {
                        warn!(
                            block_id = %block.id,
                            parent_id,
                            order,
                            error = %format!("{e:#}"),
                            "Block upsert failed"
                        );
                        StepOutcome::skipped(format!("{e:#}"))
                    }
                };
                report.record(&block.id, outcome);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use pagemirror_core::domain::{BlockKind, Category, CategoryId, Document};

    use super::*;
    use crate::rate_limit::Unthrottled;

    /// Records upserts in call order; fails for the listed block ids
    #[derive(Default)]
    struct RecordingStore {
        rows: Mutex<Vec<BlockRow>>,
        fail: HashSet<String>,
    }

    #[async_trait::async_trait]
    impl IDestinationStore for RecordingStore {
        async fn upsert_document(&self, _: &Document) -> anyhow::Result<()> {
            Ok(())
        }
        async fn get_document(&self, _: &DocumentId) -> anyhow::Result<Option<Document>> {
            Ok(None)
        }
        async fn delete_document(&self, _: &DocumentId) -> anyhow::Result<()> {
            Ok(())
        }
        async fn upsert_block(&self, row: &BlockRow) -> anyhow::Result<()> {
            if self.fail.contains(row.block_id.as_str()) {
                anyhow::bail!("constraint violation");
            }
            self.rows.lock().unwrap().push(row.clone());
            Ok(())
        }
        async fn delete_blocks_by_document(&self, _: &DocumentId) -> anyhow::Result<u64> {
            Ok(0)
        }
        async fn list_blocks(&self, _: &DocumentId) -> anyhow::Result<Vec<BlockRow>> {
            Ok(self.rows.lock().unwrap().clone())
        }
        async fn upsert_category(&self, _: &Category) -> anyhow::Result<()> {
            Ok(())
        }
        async fn delete_category(&self, _: &CategoryId) -> anyhow::Result<()> {
            Ok(())
        }
        async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
            Ok(Vec::new())
        }
    }

    fn block(id: &str, kind: BlockKind) -> Block {
        Block::new(BlockId::new(id.to_string()).unwrap(), kind, id)
    }

    fn doc() -> DocumentId {
        DocumentId::new("doc-a".to_string()).unwrap()
    }

    fn tree() -> Vec<Block> {
        vec![
            block("p1", BlockKind::Paragraph),
            block("t1", BlockKind::Toggle).with_children(vec![
                block("t1-a", BlockKind::Paragraph),
                block("t1-b", BlockKind::Paragraph),
            ]),
            block("sub", BlockKind::ChildPage).with_children(vec![
                block("sub-a", BlockKind::Heading1),
                block("sub-b", BlockKind::Toggle)
                    .with_children(vec![block("sub-b-1", BlockKind::Paragraph)]),
            ]),
        ]
    }

    fn replicator(store: Arc<RecordingStore>) -> BlockReplicator {
        BlockReplicator::new(store, Arc::new(Unthrottled))
    }

    #[tokio::test]
    async fn test_children_written_before_parent() {
        let store = Arc::new(RecordingStore::default());
        let report = replicator(store.clone())
            .replicate_document(&doc(), &tree())
            .await;

        assert_eq!(report.applied, 8);
        assert!(report.is_clean());
        let ids: Vec<String> = store
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.block_id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec!["p1", "t1-a", "t1-b", "t1", "sub-a", "sub-b-1", "sub-b", "sub"]
        );
    }

    #[tokio::test]
    async fn test_parent_order_and_scope() {
        let store = Arc::new(RecordingStore::default());
        replicator(store.clone())
            .replicate_document(&doc(), &tree())
            .await;

        let rows = store.rows.lock().unwrap().clone();
        let row = |id: &str| rows.iter().find(|r| r.block_id.as_str() == id).unwrap();

        assert_eq!(row("p1").parent_id, "doc-a");
        assert_eq!(row("p1").order, 1);
        assert_eq!(row("sub").order, 3);
        assert_eq!(row("t1-b").parent_id, "t1");
        assert_eq!(row("t1-b").order, 2);
        assert_eq!(row("t1-b").page_id.as_str(), "doc-a");

        // The nested page row itself stays in the outer scope.
        assert_eq!(row("sub").page_id.as_str(), "doc-a");
        assert_eq!(row("sub-a").page_id.as_str(), "sub");
        assert_eq!(row("sub-b-1").page_id.as_str(), "sub");
        assert_eq!(row("sub-b-1").parent_id, "sub-b");

        assert!(rows.iter().all(|r| r.document_id.as_str() == "doc-a"));
    }

    #[tokio::test]
    async fn test_failed_upsert_does_not_stop_siblings() {
        let store = Arc::new(RecordingStore {
            fail: HashSet::from(["t1-a".to_string()]),
            ..RecordingStore::default()
        });
        let report = replicator(store.clone())
            .replicate_document(&doc(), &tree())
            .await;

        assert_eq!(report.applied, 7);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0.as_str(), "t1-a");
        assert!(!report.failures[0].1.is_applied());
        assert!(store
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.block_id.as_str() == "t1-b"));
    }

    #[tokio::test]
    async fn test_empty_tree_writes_nothing() {
        let store = Arc::new(RecordingStore::default());
        let report = replicator(store.clone())
            .replicate_document(&doc(), &[])
            .await;
        assert_eq!(report, ReplicationReport::default());
    }
}
