//! Sync command - Mirror the source into the store and asset tree
//!
//! Provides the `pagemirror sync` CLI command which:
//! 1. Validates configuration and wires up the adapters
//! 2. Runs the SyncEngine (or only plans with `--dry-run`)
//! 3. Reports per-document results and the run outcome

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use pagemirror_core::config::Config;
use pagemirror_core::domain::{ManifestEntry, StepOutcome};
use pagemirror_core::usecases::ChangeSet;
use pagemirror_sync::{RunOutcome, RunReport};
use tracing::info;

use super::build_engine;
use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show what would change without touching the store, assets or snapshot
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<ExitCode> {
        let formatter = get_formatter(format);
        let engine = build_engine(config).await?;

        if self.dry_run {
            let changes = engine.plan().await?;
            info!(pending = changes.pending(), "Dry run complete");
            print_plan(formatter.as_ref(), format, &changes)?;
            let outcome = if changes.is_empty() {
                RunOutcome::NoChanges
            } else {
                RunOutcome::Applied
            };
            return Ok(exit_code(outcome));
        }

        let report = engine.run().await?;
        print_report(formatter.as_ref(), format, &report)?;
        Ok(exit_code(report.outcome()))
    }
}

/// `RunOutcome::exit_code` is always 0 or 2
fn exit_status(outcome: RunOutcome) -> u8 {
    u8::try_from(outcome.exit_code()).unwrap_or(1)
}

fn exit_code(outcome: RunOutcome) -> ExitCode {
    ExitCode::from(exit_status(outcome))
}

fn ids(entries: &[ManifestEntry]) -> Vec<String> {
    entries.iter().map(|e| e.id.to_string()).collect()
}

fn print_plan(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    changes: &ChangeSet,
) -> Result<()> {
    if format.is_json() {
        let json = serde_json::json!({
            "dry_run": true,
            "new": serde_json::to_value(&changes.new).context("Failed to serialize plan")?,
            "edited": serde_json::to_value(&changes.edited).context("Failed to serialize plan")?,
            "deleted": serde_json::to_value(&changes.deleted).context("Failed to serialize plan")?,
            "unchanged": changes.unchanged.len(),
        });
        formatter.print_json(&json);
        return Ok(());
    }

    if changes.is_empty() {
        formatter.success("Nothing to do");
        formatter.info(&format!(
            "{} unchanged",
            plural(changes.unchanged.len(), "document")
        ));
        return Ok(());
    }

    formatter.success(&format!(
        "Dry run: {} pending",
        plural(changes.pending(), "document")
    ));
    for (label, entries) in [
        ("insert", &changes.new),
        ("edit", &changes.edited),
        ("delete", &changes.deleted),
    ] {
        for id in ids(entries) {
            formatter.info(&format!("{label:<6} {id}"));
        }
    }
    formatter.field("Unchanged", &changes.unchanged.len());
    Ok(())
}

fn print_report(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    report: &RunReport,
) -> Result<()> {
    if format.is_json() {
        let documents: Vec<serde_json::Value> = report
            .documents
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.document_id.to_string(),
                    "action": d.action.to_string(),
                    "outcome": d.outcome.to_string(),
                    "block_failures": d.replication.as_ref().map_or(0, |r| r.failures.len()),
                    "asset_skips": d.assets.as_ref().map_or(0, |r| r.skipped.len()),
                })
            })
            .collect();
        let json = serde_json::json!({
            "run_id": report.run_id.to_string(),
            "outcome": match report.outcome() {
                RunOutcome::Applied => "applied",
                RunOutcome::NoChanges => "no_changes",
            },
            "new": ids(&report.changes.new),
            "edited": ids(&report.changes.edited),
            "deleted": ids(&report.changes.deleted),
            "unchanged": report.changes.unchanged.len(),
            "categories": report.categories,
            "documents": documents,
            "block_failures": report.block_failures(),
            "asset_skips": report.asset_skips(),
            "duration_ms": report.duration_ms,
        });
        formatter.print_json(&json);
        return Ok(());
    }

    match report.outcome() {
        RunOutcome::NoChanges => formatter.success("Nothing to do"),
        RunOutcome::Applied => formatter.success(&format!(
            "Sync complete: {} inserted, {} edited, {} deleted",
            report.changes.new.len(),
            report.changes.edited.len(),
            report.changes.deleted.len()
        )),
    }

    for doc in &report.documents {
        match &doc.outcome {
            StepOutcome::Applied => {
                formatter.info(&format!("{:<6} {}", doc.action.to_string(), doc.document_id));
            }
            StepOutcome::Skipped { reason } => formatter.warn(&format!(
                "{} {} skipped: {reason}",
                doc.action, doc.document_id
            )),
        }
    }

    formatter.field("Categories", &report.categories);
    if report.block_failures() > 0 {
        formatter.warn(&format!(
            "{} could not be written",
            plural(report.block_failures(), "block")
        ));
    }
    if report.asset_skips() > 0 {
        formatter.warn(&format!(
            "{} could not be fetched",
            plural(report.asset_skips(), "asset")
        ));
    }
    formatter.field("Duration", &format!("{}ms", report.duration_ms));
    Ok(())
}
