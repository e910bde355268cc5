//! Asset metadata
//!
//! Shapes of the JSON artifacts the reconciler writes next to downloaded
//! files. Field names follow what the presentation layer reads, which is
//! why several structs use camelCase keys.

use serde::{Deserialize, Serialize};

// ============================================================================
// Page chrome (icon / cover)
// ============================================================================

/// A page's icon or cover as reported by the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChromeImage {
    /// An emoji icon; nothing to download
    Emoji { emoji: String },
    /// A link to an externally hosted image; kept as a link
    External { external: ExternalFile },
    /// A file uploaded to the source; downloaded and rewritten to a local path
    File { file: HostedFile },
    /// Any other representation, such as `custom_emoji`; kept verbatim
    #[serde(untagged)]
    Other(serde_json::Value),
}

/// URL of an externally hosted image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFile {
    pub url: String,
}

/// A file hosted by the source behind an expiring URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
}

impl ChromeImage {
    /// Returns the download URL when the image is an uploaded file
    pub fn hosted_url(&self) -> Option<&str> {
        match self {
            Self::File { file } => Some(&file.url),
            _ => None,
        }
    }

    /// Points an uploaded file at its local copy; other variants are untouched
    pub fn set_local_path(&mut self, path: impl Into<String>) {
        if let Self::File { file } = self {
            file.url = path.into();
            file.expiry_time = None;
        }
    }
}

/// Icon and cover of a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageChrome {
    pub icon: Option<ChromeImage>,
    pub cover: Option<ChromeImage>,
}

// ============================================================================
// Link previews (bookmarks)
// ============================================================================

/// An Open Graph image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OgImage {
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Raw link-preview result as scraped from a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPreview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub og_image: Vec<OgImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    pub success: bool,
}

impl LinkPreview {
    /// URL of the first Open Graph image, if any
    pub fn first_image_url(&self) -> Option<&str> {
        self.og_image.first().map(|img| img.url.as_str())
    }
}

/// Bookmark metadata as persisted under `ogsData/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    #[serde(rename = "ogTitle", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "ogDescription", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "ogSiteName", skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(rename = "ogUrl", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "ImageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl BookmarkRecord {
    /// Builds the record from a preview and an already resolved favicon
    pub fn from_preview(preview: &LinkPreview, favicon: Option<String>) -> Self {
        Self {
            title: preview.og_title.clone(),
            description: preview.og_description.clone(),
            site_name: preview.og_site_name.clone(),
            url: preview.og_url.clone(),
            image_url: preview.first_image_url().map(str::to_string),
            favicon,
        }
    }

    /// True when every field is absent
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.site_name.is_none()
            && self.url.is_none()
            && self.image_url.is_none()
            && self.favicon.is_none()
    }
}

// ============================================================================
// Embed snapshots
// ============================================================================

/// Title and render-ready markup for an embedded URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}
