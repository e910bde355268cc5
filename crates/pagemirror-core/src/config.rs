//! Configuration module for Pagemirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//!
//! Secrets (API tokens, oEmbed keys) are never stored in the file. The file
//! only names the environment variables they are read from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Pagemirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub assets: AssetsConfig,
    pub snapshot: SnapshotConfig,
    pub rate_limiting: RateLimitingConfig,
    pub logging: LoggingConfig,
}

/// Content source (Notion API) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the API, without trailing slash.
    pub api_base_url: String,
    /// Value sent in the `Notion-Version` header.
    pub api_version: String,
    /// Database listing the top-level documents.
    pub documents_database_id: String,
    /// Database listing the categories. Category sync is skipped when unset.
    pub categories_database_id: Option<String>,
    /// Environment variable holding the integration token.
    pub token_env: String,
}

/// Destination store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
}

/// Asset directory and external fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Root under which each document gets `<root>/<documentId>/...`.
    pub root: PathBuf,
    /// Base URL of the oEmbed provider used for embed snapshots.
    pub oembed_base_url: String,
    /// Environment variable holding the oEmbed API key.
    pub oembed_key_env: String,
    /// Per-request timeout for asset downloads and metadata fetches, in seconds.
    pub request_timeout_secs: u64,
}

/// Snapshot manifest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Path of the JSON manifest written after each successful run.
    pub path: PathBuf,
}

/// Throughput cap applied to every block written or inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    /// Sustained operations per second.
    pub operations_per_second: u32,
    /// Operations allowed back-to-back before throttling kicks in.
    pub burst: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/pagemirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pagemirror")
            .join("config.yaml")
    }

    /// Serializes the configuration back to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("pagemirror")
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.notion.com/v1".to_string(),
            api_version: "2022-06-28".to_string(),
            documents_database_id: String::new(),
            categories_database_id: None,
            token_env: "NOTION_TOKEN".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("pagemirror.db"),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./public/notion_data/eachPage"),
            oembed_base_url: "https://iframe.ly".to_string(),
            oembed_key_env: "IFRAMELY_API_KEY".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("manifest.json"),
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        // One operation every ~90 ms.
        Self {
            operations_per_second: 11,
            burst: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"rate_limiting.burst"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError {
            field: field.into(),
            message: format!("not an http(s) URL: '{value}'"),
        }),
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- source ---
        check_url(&mut errors, "source.api_base_url", &self.source.api_base_url);
        if self.source.api_version.trim().is_empty() {
            errors.push(ValidationError {
                field: "source.api_version".into(),
                message: "must not be empty".into(),
            });
        }
        if self.source.documents_database_id.trim().is_empty() {
            errors.push(ValidationError {
                field: "source.documents_database_id".into(),
                message: "must not be empty".into(),
            });
        }
        if matches!(&self.source.categories_database_id, Some(id) if id.trim().is_empty()) {
            errors.push(ValidationError {
                field: "source.categories_database_id".into(),
                message: "must not be empty when set".into(),
            });
        }
        if self.source.token_env.trim().is_empty() {
            errors.push(ValidationError {
                field: "source.token_env".into(),
                message: "must name an environment variable".into(),
            });
        }

        // --- assets ---
        if self.assets.root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "assets.root".into(),
                message: "must not be empty".into(),
            });
        }
        check_url(&mut errors, "assets.oembed_base_url", &self.assets.oembed_base_url);
        if self.assets.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "assets.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- snapshot ---
        if self.snapshot.path.file_name().is_none() {
            errors.push(ValidationError {
                field: "snapshot.path".into(),
                message: format!("not a file path: {}", self.snapshot.path.display()),
            });
        }

        // --- rate_limiting ---
        if self.rate_limiting.operations_per_second == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.operations_per_second".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.burst == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.burst".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use pagemirror_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .documents_database_id("0f3c9d")
///     .assets_root(PathBuf::from("./public/pages"))
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- source ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.source.api_base_url = url.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.source.api_version = version.into();
        self
    }

    pub fn documents_database_id(mut self, id: impl Into<String>) -> Self {
        self.config.source.documents_database_id = id.into();
        self
    }

    pub fn categories_database_id(mut self, id: impl Into<String>) -> Self {
        self.config.source.categories_database_id = Some(id.into());
        self
    }

    pub fn token_env(mut self, name: impl Into<String>) -> Self {
        self.config.source.token_env = name.into();
        self
    }

    // --- store ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.store.database_path = path;
        self
    }

    // --- assets ---

    pub fn assets_root(mut self, root: PathBuf) -> Self {
        self.config.assets.root = root;
        self
    }

    pub fn oembed_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.assets.oembed_base_url = url.into();
        self
    }

    pub fn oembed_key_env(mut self, name: impl Into<String>) -> Self {
        self.config.assets.oembed_key_env = name.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.assets.request_timeout_secs = secs;
        self
    }

    // --- snapshot ---

    pub fn snapshot_path(mut self, path: PathBuf) -> Self {
        self.config.snapshot.path = path;
        self
    }

    // --- rate_limiting ---

    pub fn operations_per_second(mut self, n: u32) -> Self {
        self.config.rate_limiting.operations_per_second = n;
        self
    }

    pub fn burst(mut self, n: u32) -> Self {
        self.config.rate_limiting.burst = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
