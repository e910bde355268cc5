//! Pagemirror Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Document`, `Category`, `SnapshotManifest`, `Block`, `PageChrome`
//! - **Use cases** - `ChangeDetector`
//! - **Port definitions** - Traits for adapters: `IContentSource`, `IDestinationStore`,
//!   `ISnapshotStore`, `IAssetFetcher`
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases operate on domain entities only; the sync crate wires them to ports.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
