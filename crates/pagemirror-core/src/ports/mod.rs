//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IContentSource`] - The remote document database being mirrored
//! - [`IDestinationStore`] - Persistent store receiving documents, blocks and categories
//! - [`ISnapshotStore`] - Load/save of the last-synchronized manifest
//! - [`IAssetFetcher`] - Blob downloads, link previews and embed snapshots

pub mod asset_fetcher;
pub mod content_source;
pub mod destination_store;
pub mod snapshot_store;

pub use asset_fetcher::IAssetFetcher;
pub use content_source::IContentSource;
pub use destination_store::IDestinationStore;
pub use snapshot_store::ISnapshotStore;
