//! Change detection use case
//!
//! Compares the freshly listed manifest against the saved snapshot.
//! Classification is by id equality, then timestamp equality; no content
//! hashing is involved. The comparison is pure: persisting the new
//! snapshot is the orchestrator's job.

use std::collections::HashMap;

use crate::domain::{DocumentId, ManifestEntry, SnapshotManifest};

/// Disjoint classification of every id in `current ∪ prior`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// In current, absent from prior (current listing order)
    pub new: Vec<ManifestEntry>,
    /// In both with a different edit time (current listing order, current timestamps)
    pub edited: Vec<ManifestEntry>,
    /// In prior, absent from current (prior order, prior timestamps)
    pub deleted: Vec<ManifestEntry>,
    /// In both with the same edit time
    pub unchanged: Vec<ManifestEntry>,
}

impl ChangeSet {
    /// True when nothing needs to be inserted, edited or deleted
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.edited.is_empty() && self.deleted.is_empty()
    }

    /// Number of documents that need work
    pub fn pending(&self) -> usize {
        self.new.len() + self.edited.len() + self.deleted.len()
    }
}

/// Stateless classifier for manifest differences
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classifies documents into new, edited, deleted and unchanged sets
    ///
    /// # Arguments
    /// * `current` - Manifest built from the full source listing
    /// * `prior` - Manifest saved by the last successful run
    pub fn detect(&self, current: &SnapshotManifest, prior: &SnapshotManifest) -> ChangeSet {
        let prior_by_id: HashMap<&DocumentId, &ManifestEntry> =
            prior.entries().iter().map(|e| (&e.id, e)).collect();
        let current_by_id: HashMap<&DocumentId, &ManifestEntry> =
            current.entries().iter().map(|e| (&e.id, e)).collect();

        let mut changes = ChangeSet::default();

        for entry in current.entries() {
            match prior_by_id.get(&entry.id) {
                None => changes.new.push(entry.clone()),
                Some(previous) if previous.last_edited_time != entry.last_edited_time => {
                    changes.edited.push(entry.clone())
                }
                Some(_) => changes.unchanged.push(entry.clone()),
            }
        }

        changes.deleted = prior
            .entries()
            .iter()
            .filter(|e| !current_by_id.contains_key(&e.id))
            .cloned()
            .collect();

        changes
    }
}
