//! Domain entities and business logic
//!
//! This module contains the core domain types for Pagemirror:
//! - Newtypes for source identifiers
//! - Documents, categories and the snapshot manifest
//! - Block trees and the assets they reference
//! - Page chrome, link previews and embed snapshots
//! - Outcome types for best-effort operations
//! - Domain-specific error types

pub mod asset;
pub mod block;
pub mod document;
pub mod errors;
pub mod newtypes;
pub mod outcome;

// Re-export commonly used types
pub use asset::{
    BookmarkRecord, ChromeImage, EmbedSnapshot, ExternalFile, HostedFile, LinkPreview, OgImage,
    PageChrome,
};
pub use block::{AssetRef, Block, BlockKind, BlockRow};
pub use document::{Category, Document, ManifestEntry, SnapshotManifest};
pub use errors::DomainError;
pub use newtypes::*;
pub use outcome::StepOutcome;
