//! Subcommands and the adapter wiring they share

pub mod config;
pub mod resync;
pub mod status;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pagemirror_core::config::Config;
use pagemirror_fetch::HttpAssetFetcher;
use pagemirror_source::{NotionClient, NotionContentSource};
use pagemirror_store::{DatabasePool, SqliteDestinationStore};
use pagemirror_sync::assets::AssetLayout;
use pagemirror_sync::{JsonSnapshotStore, SyncEngine, TokenBucket};
use tracing::{info, warn};

/// Reads a secret from the environment variable named in the configuration
fn secret(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Environment variable {var} is not set"))
}

/// Validates the configuration and builds an engine over real adapters
pub async fn build_engine(config: &Config) -> Result<SyncEngine> {
    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration: {}", messages.join("; "));
    }

    let token = secret(&config.source.token_env)?;
    let client = NotionClient::with_base_url(
        token,
        &config.source.api_version,
        &config.source.api_base_url,
    );
    let mut source = NotionContentSource::new(client, &config.source.documents_database_id);
    if let Some(ref id) = config.source.categories_database_id {
        source = source.with_categories_database(id);
    }

    let pool = DatabasePool::new(&config.store.database_path)
        .await
        .context("Failed to open database")?;
    let store = SqliteDestinationStore::new(pool.pool().clone());

    let oembed_key = secret(&config.assets.oembed_key_env).ok();
    if oembed_key.is_none() {
        warn!(
            var = %config.assets.oembed_key_env,
            "No oEmbed key set; embed snapshots may fail"
        );
    }
    let fetcher = HttpAssetFetcher::new(
        Duration::from_secs(config.assets.request_timeout_secs),
        &config.assets.oembed_base_url,
        oembed_key,
    )
    .context("Failed to build HTTP client")?;

    info!(
        database = %config.store.database_path.display(),
        assets = %config.assets.root.display(),
        snapshot = %config.snapshot.path.display(),
        "Adapters ready"
    );

    Ok(SyncEngine::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(JsonSnapshotStore::new(&config.snapshot.path)),
        Arc::new(fetcher),
        AssetLayout::new(&config.assets.root),
        Arc::new(TokenBucket::from_config(&config.rate_limiting)),
    ))
}
