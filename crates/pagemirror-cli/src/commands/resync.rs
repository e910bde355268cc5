//! Resync command - Re-mirror one document by title
//!
//! Runs the edit pipeline for a single document regardless of its
//! `last_edited_time`. The snapshot is left as it was.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use pagemirror_core::config::Config;
use tracing::info;

use super::build_engine;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ResyncCommand {
    /// Exact title of the document
    pub title: String,
}

impl ResyncCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<ExitCode> {
        let formatter = get_formatter(format);
        let engine = build_engine(config).await?;

        info!(title = %self.title, "Resyncing document");
        let result = engine.resync_by_title(&self.title).await?;

        let block_failures = result.replication.as_ref().map_or(0, |r| r.failures.len());
        let asset_skips = result.assets.as_ref().map_or(0, |r| r.skipped.len());

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "title": self.title,
                "id": result.document_id.to_string(),
                "outcome": result.outcome.to_string(),
                "block_failures": block_failures,
                "asset_skips": asset_skips,
            }));
        } else if result.outcome.is_applied() {
            formatter.success(&format!("Resynced '{}' ({})", self.title, result.document_id));
            if block_failures > 0 {
                formatter.warn(&format!("{block_failures} block(s) could not be written"));
            }
            if asset_skips > 0 {
                formatter.warn(&format!("{asset_skips} asset(s) could not be fetched"));
            }
        } else {
            formatter.warn(&format!("'{}' {}", self.title, result.outcome));
        }

        Ok(ExitCode::SUCCESS)
    }
}
