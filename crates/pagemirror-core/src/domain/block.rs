//! Block trees
//!
//! A document's content is an ordered tree of [`Block`]s. The block type is
//! a closed enum ([`BlockKind`]); two decisions hang off it and both are
//! made here so every traversal dispatches the same way:
//!
//! - [`Block::child_scope`]: which page the block's children belong to.
//!   A `child_page` block opens a nested document scope.
//! - [`Block::asset_ref`]: which external asset, if any, the block points at.
//!
//! Payloads are markdown-style strings rendered by the source adapter,
//! e.g. `![diagram.png](https://...)` for images and `[caption](https://...)`
//! for bookmarks and embeds.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{BlockId, DocumentId};

/// Image extensions kept as-is; anything else is stored as png
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "gif"];

/// Extension used when none can be inferred
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

// ============================================================================
// BlockKind
// ============================================================================

/// Type of a block, named after the source's type tags
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedListItem,
    NumberedListItem,
    ToDo,
    Toggle,
    Quote,
    Callout,
    Code,
    Divider,
    Image,
    Bookmark,
    Embed,
    TableOfContents,
    ChildPage,
    /// Any type this system has no special handling for
    Other(String),
}

impl BlockKind {
    /// Parses a source type tag such as `"heading_2"`
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "paragraph" => Self::Paragraph,
            "heading_1" => Self::Heading1,
            "heading_2" => Self::Heading2,
            "heading_3" => Self::Heading3,
            "bulleted_list_item" => Self::BulletedListItem,
            "numbered_list_item" => Self::NumberedListItem,
            "to_do" => Self::ToDo,
            "toggle" => Self::Toggle,
            "quote" => Self::Quote,
            "callout" => Self::Callout,
            "code" => Self::Code,
            "divider" => Self::Divider,
            "image" => Self::Image,
            "bookmark" => Self::Bookmark,
            "embed" => Self::Embed,
            "table_of_contents" => Self::TableOfContents,
            "child_page" => Self::ChildPage,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the source type tag
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading1 => "heading_1",
            Self::Heading2 => "heading_2",
            Self::Heading3 => "heading_3",
            Self::BulletedListItem => "bulleted_list_item",
            Self::NumberedListItem => "numbered_list_item",
            Self::ToDo => "to_do",
            Self::Toggle => "toggle",
            Self::Quote => "quote",
            Self::Callout => "callout",
            Self::Code => "code",
            Self::Divider => "divider",
            Self::Image => "image",
            Self::Bookmark => "bookmark",
            Self::Embed => "embed",
            Self::TableOfContents => "table_of_contents",
            Self::ChildPage => "child_page",
            Self::Other(name) => name,
        }
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BlockKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_type_name(&name))
    }
}

// ============================================================================
// AssetRef
// ============================================================================

/// External content referenced by a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// An image to download, with the extension it will be stored under
    Image { url: String, extension: &'static str },
    /// A link whose preview metadata is cached
    Bookmark { url: String },
    /// An embed whose render-ready snapshot is cached
    Embed { url: String },
    /// A nested document whose icon/cover is cached
    ChildPage,
}

// ============================================================================
// Block
// ============================================================================

/// A node of a document's content tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Markdown-style payload, opaque to the store
    pub content: String,
    /// Children in source order
    #[serde(default)]
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(id: BlockId, kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    /// Returns the page id the children of this block belong to.
    ///
    /// Children of a `child_page` block live in the nested page whose id is
    /// the block's own id; all other blocks keep the current page.
    pub fn child_scope(&self, current_page: &DocumentId) -> DocumentId {
        match self.kind {
            BlockKind::ChildPage => self.id.as_document_id(),
            _ => current_page.clone(),
        }
    }

    /// Returns the external asset this block references, if any.
    ///
    /// # Errors
    /// Returns [`DomainError::MalformedPayload`] when an asset-bearing block
    /// has no usable link in its payload.
    pub fn asset_ref(&self) -> Result<Option<AssetRef>, DomainError> {
        let malformed = |detail: &str| DomainError::MalformedPayload {
            kind: self.kind.to_string(),
            detail: detail.to_string(),
        };

        match self.kind {
            BlockKind::Image => {
                let (alt, url) =
                    parse_image_link(&self.content).ok_or_else(|| malformed("no ![alt](url) link"))?;
                Ok(Some(AssetRef::Image {
                    extension: image_extension(alt, url),
                    url: url.to_string(),
                }))
            }
            BlockKind::Bookmark => {
                let url = first_parenthesized(&self.content)
                    .ok_or_else(|| malformed("no (url) token"))?;
                Ok(Some(AssetRef::Bookmark {
                    url: url.to_string(),
                }))
            }
            BlockKind::Embed => {
                let url = first_parenthesized(&self.content)
                    .ok_or_else(|| malformed("no (url) token"))?;
                Ok(Some(AssetRef::Embed {
                    url: url.to_string(),
                }))
            }
            BlockKind::ChildPage => Ok(Some(AssetRef::ChildPage)),
            _ => Ok(None),
        }
    }

    /// Total number of blocks in this subtree, including `self`
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Block::subtree_len).sum::<usize>()
    }
}

// ============================================================================
// BlockRow
// ============================================================================

/// A block as persisted by the destination store
///
/// Rows are keyed by `block_id`. `document_id` is the top-level document
/// owning the row (used for cascade deletes) while `page_id` is the page
/// scope the block was found in, which differs below `child_page` blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRow {
    pub document_id: DocumentId,
    /// Owning document id for root blocks, enclosing block id otherwise
    pub parent_id: String,
    pub content: String,
    pub block_id: BlockId,
    pub kind: BlockKind,
    pub page_id: DocumentId,
    /// 1-based position among siblings
    pub order: u32,
}

// ============================================================================
// Payload parsing
// ============================================================================

/// Finds the first `![alt](url)` link with a non-empty alt text
pub fn parse_image_link(payload: &str) -> Option<(&str, &str)> {
    let mut pos = 0usize;
    while let Some(rel) = payload[pos..].find("![") {
        let alt_start = pos + rel + 2;
        let Some(alt_len) = payload[alt_start..].find(']') else {
            return None;
        };
        let alt_end = alt_start + alt_len;
        let alt = &payload[alt_start..alt_end];

        if !alt.is_empty() && payload[alt_end + 1..].starts_with('(') {
            let url_start = alt_end + 2;
            if let Some(url_len) = payload[url_start..].find(')') {
                let url = &payload[url_start..url_start + url_len];
                if !url.is_empty() {
                    return Some((alt, url));
                }
            }
        }
        pos = alt_end;
    }
    None
}

/// Returns the contents of the first `(...)` group, if non-empty
pub fn first_parenthesized(payload: &str) -> Option<&str> {
    let start = payload.find('(')? + 1;
    let len = payload[start..].find(')')?;
    let inner = payload[start..start + len].trim();
    (!inner.is_empty()).then_some(inner)
}

/// Picks the stored extension for an image.
///
/// The alt text usually carries the uploaded file name, so its trailing
/// segment wins; without one the URL path is used. Anything outside
/// png/jpg/gif becomes png.
pub fn image_extension(alt: &str, url: &str) -> &'static str {
    let from_alt = alt.rsplit_once('.').map(|(_, ext)| ext);
    let from_url = || {
        url::Url::parse(url).ok().and_then(|u| {
            u.path()
                .rsplit('/')
                .next()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase())
        })
    };

    let candidate = match from_alt {
        Some(ext) => Some(ext.to_ascii_lowercase()),
        None => from_url(),
    };

    candidate
        .and_then(|ext| IMAGE_EXTENSIONS.iter().find(|e| **e == ext).copied())
        .unwrap_or(DEFAULT_IMAGE_EXTENSION)
}
