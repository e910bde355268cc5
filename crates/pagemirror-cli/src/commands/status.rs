//! Status command - Show the snapshot manifest
//!
//! Reads the snapshot written by the last successful run. No network
//! access and no database access.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use pagemirror_core::config::Config;
use pagemirror_core::domain::SnapshotManifest;
use pagemirror_core::ports::ISnapshotStore;
use pagemirror_sync::JsonSnapshotStore;

use crate::output::{get_formatter, plural, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<ExitCode> {
        let formatter = get_formatter(format);
        let store = JsonSnapshotStore::new(&config.snapshot.path);
        let manifest = store.load().await.context("Failed to read snapshot")?;

        if format.is_json() {
            let path = config.snapshot.path.display().to_string();
            formatter.print_json(&status_json(&path, &manifest)?);
            return Ok(ExitCode::SUCCESS);
        }

        if manifest.is_empty() {
            formatter.warn("No documents mirrored yet. Run 'pagemirror sync'.");
            return Ok(ExitCode::SUCCESS);
        }

        formatter.success(&format!(
            "{} mirrored ({})",
            plural(manifest.len(), "document"),
            config.snapshot.path.display()
        ));
        if let Some(latest) = manifest.entries().iter().map(|e| e.last_edited_time).max() {
            formatter.field("Latest edit", &latest.to_rfc3339());
        }
        formatter.info("");
        for entry in manifest.entries() {
            formatter.info(&format!(
                "{}  {}",
                entry.last_edited_time.to_rfc3339(),
                entry.id
            ));
        }

        Ok(ExitCode::SUCCESS)
    }
}

fn status_json(path: &str, manifest: &SnapshotManifest) -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "snapshot_path": path,
        "documents": manifest.len(),
        "entries": serde_json::to_value(manifest).context("Failed to serialize snapshot")?,
    }))
}
