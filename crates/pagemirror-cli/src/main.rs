//! Pagemirror CLI - Command-line interface for Pagemirror
//!
//! Provides commands for:
//! - Mirroring the source into the store and asset tree
//! - Resyncing a single document by title
//! - Viewing the snapshot manifest
//! - Viewing and validating configuration
//!
//! Exit status: `0` when a run applied changes, `2` when there was nothing
//! to do, `1` on any error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pagemirror_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand, resync::ResyncCommand, status::StatusCommand, sync::SyncCommand,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "pagemirror",
    version,
    about = "Incrementally mirror a Notion database into SQLite and a static asset tree"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mirror new, edited and deleted documents
    Sync(SyncCommand),
    /// Re-mirror one document by its exact title
    Resync(ResyncCommand),
    /// Show the snapshot manifest
    Status(StatusCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Level used when `RUST_LOG` is unset
fn log_level(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose, &config.logging.level)));
    // Logs go to stderr so `--json` output on stdout stays parseable
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let format = OutputFormat::from_json_flag(cli.json);

    let result = match cli.command {
        Commands::Sync(cmd) => cmd.execute(&config, format).await,
        Commands::Resync(cmd) => cmd.execute(&config, format).await,
        Commands::Status(cmd) => cmd.execute(&config, format).await,
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            get_formatter(format).error(&format!("{e:#}"));
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_selection() {
        assert_eq!(log_level(0, "warn"), "warn");
        assert_eq!(log_level(1, "warn"), "debug");
        assert_eq!(log_level(3, "warn"), "trace");
    }

    #[test]
    fn test_parse_sync_dry_run_with_globals() {
        let cli = Cli::try_parse_from([
            "pagemirror",
            "sync",
            "--dry-run",
            "--json",
            "--config",
            "/tmp/p.yaml",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.yaml")));
        assert!(matches!(cli.command, Commands::Sync(SyncCommand { dry_run: true })));
    }

    #[test]
    fn test_parse_resync_title() {
        let cli = Cli::try_parse_from(["pagemirror", "-vv", "resync", "Ownership and Borrowing"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Resync(cmd) => assert_eq!(cmd.title, "Ownership and Borrowing"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
