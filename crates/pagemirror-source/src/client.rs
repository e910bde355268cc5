//! Notion REST API client
//!
//! Typed HTTP client for the endpoints the mirror needs: database queries
//! and schema retrieval, block children listing and page retrieval. Every list endpoint
//! is cursor-paginated; the client follows `next_cursor` until `has_more`
//! is false.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagemirror_source::client::NotionClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = NotionClient::new("secret-token", "2022-06-28");
//! let pages = client.query_database("0f3c9d", None).await?;
//! println!("{} pages", pages.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use pagemirror_core::domain::ChromeImage;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::SourceError;

/// Base URL for the public Notion API
const NOTION_BASE_URL: &str = "https://api.notion.com/v1";

/// Largest page size the API accepts
const PAGE_SIZE: u32 = 100;

/// Retry-After used when a 429 carries no usable header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Maximum number of retries for 429 responses
const MAX_RETRIES: u32 = 3;

// ============================================================================
// API response types
// ============================================================================

/// One page of a paginated list response
#[derive(Debug, Deserialize)]
struct PaginatedList<T> {
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

/// A page object as returned by database queries and page retrieval
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    pub id: String,
    pub last_edited_time: DateTime<Utc>,
    /// Property name -> typed property value
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub icon: Option<ChromeImage>,
    #[serde(default)]
    pub cover: Option<ChromeImage>,
}

/// A database object; only the property schema is read
#[derive(Debug, Clone, Deserialize)]
pub struct RawDatabase {
    pub id: String,
    /// Property name -> property schema
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl RawDatabase {
    /// Name of the database's title property, whatever it was renamed to
    pub fn title_property(&self) -> Option<&str> {
        self.properties
            .iter()
            .find(|(_, schema)| schema.get("type").and_then(Value::as_str) == Some("title"))
            .map(|(name, _)| name.as_str())
    }
}

/// A block object; the type-specific payload lives under the key named by `type`
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl RawBlock {
    /// Returns the type-specific payload object
    pub fn payload(&self) -> Option<&Value> {
        self.body.get(&self.block_type)
    }
}

// ============================================================================
// NotionClient
// ============================================================================

/// HTTP client for Notion API calls
///
/// Wraps `reqwest::Client` with the bearer token, the `Notion-Version`
/// header and base URL construction.
pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    api_version: String,
}

impl NotionClient {
    /// Creates a client for the public API
    pub fn new(token: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self::with_base_url(token, api_version, NOTION_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(
        token: impl Into<String>,
        api_version: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            api_version: api_version.into(),
        }
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
    }

    /// Sends a request, sleeping and retrying on 429 responses
    ///
    /// `build` is called once per attempt since request builders are consumed.
    async fn send_with_retry<F>(&self, what: &str, build: F) -> Result<Response, SourceError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let response = build().send().await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                if attempt > 0 {
                    info!(what, attempt, "Request succeeded after retry");
                }
                return check_status(response, what).await;
            }

            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                .unwrap_or(DEFAULT_RETRY_AFTER);

            if attempt >= MAX_RETRIES {
                warn!(what, attempts = attempt + 1, "429 retry limit exhausted");
                return Err(SourceError::TooManyRequests { retry_after });
            }

            info!(
                what,
                attempt,
                retry_after_ms = retry_after.as_millis() as u64,
                "Received 429, backing off"
            );
            tokio::time::sleep(retry_after).await;
            attempt += 1;
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, SourceError> {
        self.send_with_retry(what, build)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(format!("{what}: {e}")))
    }

    /// Queries a database, following pagination to the end
    ///
    /// # Arguments
    /// * `database_id` - Database to query
    /// * `filter` - Optional filter object, passed through verbatim
    pub async fn query_database(
        &self,
        database_id: &str,
        filter: Option<Value>,
    ) -> Result<Vec<RawPage>, SourceError> {
        let path = format!("/databases/{database_id}/query");
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = serde_json::json!({ "page_size": PAGE_SIZE });
            if let Some(ref filter) = filter {
                body["filter"] = filter.clone();
            }
            if let Some(ref c) = cursor {
                body["start_cursor"] = Value::String(c.clone());
            }

            let list: PaginatedList<RawPage> = self
                .get_json("database query", || {
                    self.request(Method::POST, &path).json(&body)
                })
                .await?;

            debug!(database_id, count = list.results.len(), "Fetched database page");
            pages.extend(list.results);

            match next_cursor(list.has_more, list.next_cursor) {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        Ok(pages)
    }

    /// Lists the direct children of a block (or page), following pagination
    pub async fn list_block_children(&self, block_id: &str) -> Result<Vec<RawBlock>, SourceError> {
        let path = format!("/blocks/{block_id}/children");
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![("page_size", PAGE_SIZE.to_string())];
            if let Some(ref c) = cursor {
                query.push(("start_cursor", c.clone()));
            }

            let list: PaginatedList<RawBlock> = self
                .get_json("block children", || {
                    self.request(Method::GET, &path).query(&query)
                })
                .await?;

            blocks.extend(list.results);

            match next_cursor(list.has_more, list.next_cursor) {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        debug!(block_id, count = blocks.len(), "Fetched block children");
        Ok(blocks)
    }

    /// Retrieves a single page object
    pub async fn retrieve_page(&self, page_id: &str) -> Result<RawPage, SourceError> {
        let path = format!("/pages/{page_id}");
        self.get_json("page retrieval", || self.request(Method::GET, &path))
            .await
    }

    /// Retrieves a database object, including its property schema
    pub async fn retrieve_database(&self, database_id: &str) -> Result<RawDatabase, SourceError> {
        let path = format!("/databases/{database_id}");
        self.get_json("database retrieval", || self.request(Method::GET, &path))
            .await
    }
}

fn next_cursor(has_more: bool, cursor: Option<String>) -> Option<String> {
    if has_more {
        cursor.filter(|c| !c.is_empty())
    } else {
        None
    }
}

/// Maps non-success statuses onto [`SourceError`] variants
async fn check_status(response: Response, what: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = format!("{what} returned {status}: {body}");
    Err(match status {
        StatusCode::UNAUTHORIZED => SourceError::Unauthorized(detail),
        StatusCode::NOT_FOUND => SourceError::NotFound(detail),
        s if s.is_server_error() => SourceError::ServerError(detail),
        _ => SourceError::InvalidResponse(detail),
    })
}

/// Parses a `Retry-After` header given in seconds or as an HTTP date
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(value.trim()) {
        let diff = date.with_timezone(&Utc) - Utc::now();
        if let Ok(secs) = u64::try_from(diff.num_seconds()) {
            if secs <= 3600 {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
