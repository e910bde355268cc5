//! Documents, categories and the snapshot manifest
//!
//! A [`Document`] is a top-level page listed by the content source. This
//! system never creates or destroys documents; it only mirrors them.
//!
//! The [`SnapshotManifest`] is the persisted `(id, last_edited_time)`
//! listing from the previous successful run and is the sole record of
//! what the destination already holds.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{CategoryId, DocumentId};

// ============================================================================
// Document
// ============================================================================

/// A top-level document as listed by the content source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable source identifier
    pub id: DocumentId,
    /// Title (falls back to "untitled" at the source adapter)
    pub title: String,
    /// Free-form tags
    pub tags: BTreeSet<String>,
    /// Category name (empty when unset)
    pub category: String,
    /// Whether the document belongs to the basic curriculum
    pub is_basic_curriculum: bool,
    /// Audiences the document is visible to
    pub visibility: BTreeSet<String>,
    /// Last time the document was edited at the source
    pub last_edited_time: DateTime<Utc>,
    /// Whether the document is published; unpublished documents are
    /// tracked in the manifest but not mirrored
    pub published: bool,
}

impl Document {
    /// Returns the manifest entry describing this document
    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            id: self.id.clone(),
            last_edited_time: self.last_edited_time,
        }
    }
}

// ============================================================================
// Category
// ============================================================================

/// A category entry, independently enumerable from the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
}

// ============================================================================
// Snapshot manifest
// ============================================================================

/// One `(id, last_edited_time)` pair of the snapshot manifest
///
/// The field name `Last_edited_time` is kept on disk so manifests written
/// by earlier tooling stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: DocumentId,
    #[serde(rename = "Last_edited_time", alias = "last_edited_time")]
    pub last_edited_time: DateTime<Utc>,
}

/// Ordered listing of every document present in the destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotManifest {
    entries: Vec<ManifestEntry>,
}

impl SnapshotManifest {
    /// Creates a manifest from entries, keeping their order
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Builds the manifest for a full source listing
    pub fn from_documents(documents: &[Document]) -> Self {
        Self::new(documents.iter().map(Document::manifest_entry).collect())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the entry for a document id
    pub fn get(&self, id: &DocumentId) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Returns true if the manifest lists the document
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.get(id).is_some()
    }
}
