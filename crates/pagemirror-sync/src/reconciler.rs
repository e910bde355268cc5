//! Asset reconciliation
//!
//! Walks a document's block tree and materializes what each block
//! references beneath the document's asset directory:
//!
//! | Block        | Fetch                 | Written                                   |
//! |--------------|-----------------------|-------------------------------------------|
//! | `image`      | download              | `image/<blockId>.<ext>`                   |
//! | `bookmark`   | link preview          | `ogsData/<blockId>.json`                  |
//! | `embed`      | embed snapshot        | `iframeData/<blockId>.json`               |
//! | `child_page` | page icon and cover   | `pageImageData/<blockId>.json` plus files |
//!
//! The document's own icon and cover are stored the same way under its id.
//! The caller prepares (empties) the directories beforehand. Every failure
//! is logged and recorded as skipped; reconciliation never aborts.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Context;
use pagemirror_core::domain::{
    AssetRef, Block, BlockId, BookmarkRecord, DocumentId, StepOutcome,
};
use pagemirror_core::ports::{IAssetFetcher, IContentSource};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::assets::{AssetLayout, ChromeField};
use crate::rate_limit::Throttle;

/// Result of reconciling one document's assets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Assets written
    pub applied: usize,
    /// Blocks (or the document itself, for its chrome) left without an asset
    pub skipped: Vec<(String, StepOutcome)>,
}

impl ReconcileReport {
    fn record(&mut self, key: &str, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Applied => self.applied += 1,
            skipped => self.skipped.push((key.to_string(), skipped)),
        }
    }
}

/// Fetches and stores the external assets of block trees
pub struct AssetReconciler {
    source: Arc<dyn IContentSource>,
    fetcher: Arc<dyn IAssetFetcher>,
    layout: AssetLayout,
    throttle: Arc<dyn Throttle>,
}

impl AssetReconciler {
    pub fn new(
        source: Arc<dyn IContentSource>,
        fetcher: Arc<dyn IAssetFetcher>,
        layout: AssetLayout,
        throttle: Arc<dyn Throttle>,
    ) -> Self {
        Self {
            source,
            fetcher,
            layout,
            throttle,
        }
    }

    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    /// Reconciles every block of the tree, then the document's own chrome
    pub async fn reconcile_document(
        &self,
        document_id: &DocumentId,
        blocks: &[Block],
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        self.reconcile(document_id, blocks, &mut report).await;

        self.throttle.acquire().await;
        let outcome = self
            .save_chrome(document_id, document_id)
            .await
            .unwrap_or_else(|e| skip(document_id.as_str(), e));
        report.record(document_id.as_str(), outcome);

        debug!(
            document_id = %document_id,
            applied = report.applied,
            skipped = report.skipped.len(),
            "Reconciled assets"
        );
        report
    }

    /// Reconciles `blocks` and all their descendants into `document_id`'s directory
    pub fn reconcile<'a>(
        &'a self,
        document_id: &'a DocumentId,
        blocks: &'a [Block],
        report: &'a mut ReconcileReport,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            for block in blocks {
                if let Some(outcome) = self.reconcile_block(document_id, block).await {
                    report.record(block.id.as_str(), outcome);
                }
                if !block.children.is_empty() {
                    self.reconcile(document_id, &block.children, report).await;
                }
            }
        })
    }

    /// Returns `None` for blocks that reference nothing
    async fn reconcile_block(&self, document_id: &DocumentId, block: &Block) -> Option<StepOutcome> {
        let asset = match block.asset_ref() {
            Ok(Some(asset)) => asset,
            Ok(None) => return None,
            Err(e) => {
                warn!(block_id = %block.id, error = %e, "Unusable asset payload");
                return Some(StepOutcome::skipped(e.to_string()));
            }
        };

        self.throttle.acquire().await;
        let result = match asset {
            AssetRef::Image { url, extension } => {
                self.save_image(document_id, &block.id, &url, extension).await
            }
            AssetRef::Bookmark { url } => self.save_bookmark(document_id, &block.id, &url).await,
            AssetRef::Embed { url } => self.save_embed(document_id, &block.id, &url).await,
            AssetRef::ChildPage => {
                self.save_chrome(document_id, &block.id.as_document_id())
                    .await
            }
        };
        Some(result.unwrap_or_else(|e| skip(block.id.as_str(), e)))
    }

    async fn save_image(
        &self,
        document_id: &DocumentId,
        block_id: &BlockId,
        url: &str,
        extension: &str,
    ) -> anyhow::Result<StepOutcome> {
        let path = self.layout.image_path(document_id, block_id, extension);
        let bytes = self.fetcher.download_to_path(url, &path).await?;
        debug!(block_id = %block_id, path = %path.display(), bytes, "Saved image");
        Ok(StepOutcome::Applied)
    }

    async fn save_bookmark(
        &self,
        document_id: &DocumentId,
        block_id: &BlockId,
        url: &str,
    ) -> anyhow::Result<StepOutcome> {
        let Some(preview) = self.fetcher.fetch_link_preview(url).await? else {
            return Ok(StepOutcome::skipped("no link preview"));
        };

        let favicon = match preview.favicon.clone() {
            Some(favicon) => Some(favicon),
            None => self.origin_favicon(url).await,
        };

        let path = self.layout.bookmark_path(document_id, block_id);
        let record = BookmarkRecord::from_preview(&preview, favicon);
        if record.is_empty() {
            debug!(block_id = %block_id, "Preview has no usable fields; storing it raw");
            write_json(&path, &preview).await?;
        } else {
            write_json(&path, &record).await?;
        }
        Ok(StepOutcome::Applied)
    }

    /// Favicon recovered from the preview of `url`'s origin
    ///
    /// Only used when the origin page has both a favicon and an Open Graph
    /// image; a relative favicon is resolved against the image's origin.
    async fn origin_favicon(&self, url: &str) -> Option<String> {
        let origin = Url::parse(url).ok()?.origin().ascii_serialization();
        self.throttle.acquire().await;
        let preview = match self.fetcher.fetch_link_preview(&origin).await {
            Ok(preview) => preview?,
            Err(e) => {
                debug!(origin = %origin, error = %format!("{e:#}"), "Origin preview failed");
                return None;
            }
        };

        let favicon = preview.favicon.as_deref()?;
        let image_url = preview.first_image_url()?;
        if Url::parse(favicon).is_ok() {
            return Some(favicon.to_string());
        }
        let image_origin = Url::parse(image_url).ok()?.origin().ascii_serialization();
        Some(format!(
            "{image_origin}/{}",
            favicon.strip_prefix('/').unwrap_or(favicon)
        ))
    }

    async fn save_embed(
        &self,
        document_id: &DocumentId,
        block_id: &BlockId,
        url: &str,
    ) -> anyhow::Result<StepOutcome> {
        let Some(snapshot) = self.fetcher.fetch_embed_snapshot(url).await? else {
            return Ok(StepOutcome::skipped("no embed snapshot"));
        };
        write_json(&self.layout.embed_path(document_id, block_id), &snapshot).await?;
        Ok(StepOutcome::Applied)
    }

    /// Stores `page_id`'s icon and cover, downloading uploaded files
    ///
    /// Uploaded files are rewritten to reference their local path.
    /// External links and emoji are stored as they are.
    async fn save_chrome(
        &self,
        document_id: &DocumentId,
        page_id: &DocumentId,
    ) -> anyhow::Result<StepOutcome> {
        let mut chrome = self.source.fetch_page_chrome(page_id).await?;

        for (field, slot) in [
            (ChromeField::Icon, &mut chrome.icon),
            (ChromeField::Cover, &mut chrome.cover),
        ] {
            let Some(image) = slot.as_mut() else {
                continue;
            };
            let Some(url) = image.hosted_url().map(str::to_string) else {
                continue;
            };
            let path = self.layout.chrome_file_path(
                document_id,
                field,
                page_id.as_str(),
                field.extension_for(&url),
            );
            self.fetcher
                .download_to_path(&url, &path)
                .await
                .with_context(|| format!("Failed to download page {}", field.as_str()))?;
            image.set_local_path(path.display().to_string());
        }

        write_json(&self.layout.chrome_path(document_id, page_id.as_str()), &chrome).await?;
        Ok(StepOutcome::Applied)
    }
}

fn skip(key: &str, error: anyhow::Error) -> StepOutcome {
    warn!(key, error = %format!("{error:#}"), "Asset skipped");
    StepOutcome::skipped(format!("{error:#}"))
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
