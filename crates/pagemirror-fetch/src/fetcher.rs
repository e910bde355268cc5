//! HTTP implementation of IAssetFetcher
//!
//! - Downloads stream the body chunk by chunk into a `.part` file that is
//!   renamed into place once complete, so a failed download never leaves a
//!   truncated asset behind.
//! - Link previews read at most [`MAX_HTML_BYTES`] of the page.
//! - Embed snapshots come from an oEmbed provider
//!   (`GET {base}/api/oembed?url=...&api_key=...`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use futures_util::StreamExt;
use pagemirror_core::domain::{EmbedSnapshot, LinkPreview, OgImage};
use pagemirror_core::ports::IAssetFetcher;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::html;
use crate::FetchError;

/// Upper bound on the HTML read for a link preview
pub const MAX_HTML_BYTES: usize = 1024 * 1024;

const USER_AGENT: &str = concat!("pagemirror/", env!("CARGO_PKG_VERSION"));

/// oEmbed response fields the mirror keeps
#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    html: Option<String>,
}

/// Fetches blobs, link previews and embed snapshots over HTTP
pub struct HttpAssetFetcher {
    client: Client,
    oembed_base_url: String,
    oembed_key: Option<String>,
}

impl HttpAssetFetcher {
    /// Creates a fetcher with a per-request timeout
    ///
    /// # Arguments
    /// * `timeout` - Applied to every request, downloads included
    /// * `oembed_base_url` - oEmbed provider base, e.g. `https://iframe.ly`
    /// * `oembed_key` - Provider API key; omitted from requests when `None`
    pub fn new(
        timeout: Duration,
        oembed_base_url: impl Into<String>,
        oembed_key: Option<String>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            oembed_base_url: oembed_base_url.into().trim_end_matches('/').to_string(),
            oembed_key,
        })
    }

    async fn get_ok(&self, url: &str) -> Result<Response, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// Streams `url` into `path`; see [`IAssetFetcher::download_to_path`]
    pub async fn download(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| FetchError::Io { path, source }
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }

        let response = self.get_ok(url).await?;
        let part = part_path(path);
        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(io_err(&part))?;

        let written = match write_body(response, &mut file, &part).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&part, path)
            .await
            .map_err(io_err(path))?;
        debug!(url, path = %path.display(), bytes = written, "Downloaded asset");
        Ok(written)
    }

    /// Scrapes a link preview; see [`IAssetFetcher::fetch_link_preview`]
    pub async fn link_preview(&self, url: &str) -> Result<Option<LinkPreview>, FetchError> {
        let page_url = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        let response = self.get_ok(url).await?;

        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(true);
        if !is_html {
            debug!(url, "Not an HTML page; no preview");
            return Ok(None);
        }

        let body = read_text_limited(response, MAX_HTML_BYTES).await?;
        let meta = html::scan(&body);

        let og_image = meta
            .og_images
            .into_iter()
            .map(|(src, media_type)| OgImage {
                url: page_url
                    .join(&src)
                    .map(String::from)
                    .unwrap_or(src),
                media_type,
            })
            .collect();

        Ok(Some(LinkPreview {
            og_title: meta.og_title.or(meta.title),
            og_description: meta.og_description.or(meta.description),
            og_site_name: meta.og_site_name,
            og_url: meta.og_url,
            og_image,
            favicon: meta.favicon,
            charset: meta.charset,
            request_url: Some(url.to_string()),
            success: true,
        }))
    }

    /// Fetches an oEmbed snapshot; see [`IAssetFetcher::fetch_embed_snapshot`]
    pub async fn embed_snapshot(&self, url: &str) -> Result<Option<EmbedSnapshot>, FetchError> {
        let endpoint = format!("{}/api/oembed", self.oembed_base_url);
        let mut query = vec![("url", url)];
        if let Some(ref key) = self.oembed_key {
            query.push(("api_key", key.as_str()));
        } else {
            warn!(url, "No oEmbed API key configured");
        }

        let response = self.client.get(&endpoint).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(format!("oEmbed body for {url}: {e}")))?;

        if body.title.is_none() && body.html.is_none() {
            return Ok(None);
        }
        Ok(Some(EmbedSnapshot {
            title: body.title,
            html: body.html,
        }))
    }
}

async fn write_body(
    response: Response,
    file: &mut tokio::fs::File,
    part: &Path,
) -> Result<u64, FetchError> {
    let io_err = |source| FetchError::Io {
        path: part.to_path_buf(),
        source,
    };

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_err)?;
    Ok(written)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

async fn read_text_limited(mut response: Response, limit: usize) -> Result<String, FetchError> {
    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if out.len() + chunk.len() > limit {
            let remaining = limit.saturating_sub(out.len());
            out.extend_from_slice(&chunk[..remaining]);
            break;
        }
        out.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[async_trait::async_trait]
impl IAssetFetcher for HttpAssetFetcher {
    async fn download_to_path(&self, url: &str, path: &Path) -> anyhow::Result<u64> {
        self.download(url, path)
            .await
            .with_context(|| format!("Failed to download {url}"))
    }

    async fn fetch_link_preview(&self, url: &str) -> anyhow::Result<Option<LinkPreview>> {
        self.link_preview(url)
            .await
            .with_context(|| format!("Failed to fetch link preview for {url}"))
    }

    async fn fetch_embed_snapshot(&self, url: &str) -> anyhow::Result<Option<EmbedSnapshot>> {
        self.embed_snapshot(url)
            .await
            .with_context(|| format!("Failed to fetch embed snapshot for {url}"))
    }
}
