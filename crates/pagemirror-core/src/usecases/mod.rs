//! Use cases (interactors) for Pagemirror
//!
//! ## Use Cases
//!
//! - [`ChangeDetector`] - Classifies documents as new, edited, deleted or unchanged

pub mod detect_changes;

pub use detect_changes::{ChangeDetector, ChangeSet};
