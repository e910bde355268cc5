//! Config command - View and validate Pagemirror configuration
//!
//! Provides the `pagemirror config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Writes a default configuration file to start from
//! 3. Validates the configuration file and reports errors

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use pagemirror_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<ExitCode> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Init { force } => execute_init(config_path, *force, format).await,
            ConfigCommand::Validate => execute_validate(config_path, format),
        }
    }
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<ExitCode> {
    let formatter = get_formatter(format);
    let config = Config::load_or_default(config_path);

    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        formatter.info("");
        for line in config.to_yaml()?.lines() {
            formatter.info(line);
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn execute_init(config_path: &Path, force: bool, format: OutputFormat) -> Result<ExitCode> {
    let formatter = get_formatter(format);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to replace it)",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create configuration directory")?;
    }
    tokio::fs::write(config_path, Config::default().to_yaml()?)
        .await
        .context("Failed to write configuration file")?;

    info!(config_path = %config_path.display(), "Wrote default configuration");

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Wrote {}", config_path.display()));
        formatter.info("Set source.documents_database_id before running 'pagemirror sync'.");
    }

    Ok(ExitCode::SUCCESS)
}

/// Exits 1 when the file is missing, unreadable or invalid
fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<ExitCode> {
    let formatter = get_formatter(format);

    let errors: Vec<String> = if config_path.exists() {
        match Config::load(config_path) {
            Ok(config) => config.validate().iter().map(ToString::to_string).collect(),
            Err(e) => vec![format!("Failed to parse configuration: {e:#}")],
        }
    } else {
        vec!["Configuration file not found".to_string()]
    };

    info!(
        config_path = %config_path.display(),
        errors = errors.len(),
        "Validated configuration"
    );

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": errors,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        for error in &errors {
            formatter.info(&format!("  {error}"));
        }
    }

    Ok(if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        ConfigCommand::Init { force: false }
            .execute(&path, OutputFormat::Json)
            .await
            .unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(
            loaded.to_yaml().unwrap(),
            Config::default().to_yaml().unwrap()
        );
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "logging:\n  level: debug\n").unwrap();

        let err = ConfigCommand::Init { force: false }
            .execute(&path, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        ConfigCommand::Init { force: true }
            .execute(&path, OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(Config::load(&path).unwrap().logging.level, "info");
    }

    #[tokio::test]
    async fn test_validate_and_show_run_against_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "source:\n  documents_database_id: 3f2a9c\nlogging:\n  level: loud\n",
        )
        .unwrap();

        assert!(ConfigCommand::Validate
            .execute(&path, OutputFormat::Json)
            .await
            .is_ok());
        assert!(ConfigCommand::Show
            .execute(&path, OutputFormat::Human)
            .await
            .is_ok());
    }
}
