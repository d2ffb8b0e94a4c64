//! # Stylesnap - Design-system change tracking
//!
//! Snapshot diffing and chunked persistence for the design-system elements of
//! a document: components, component sets, styles, variables and variable
//! collections.
//!
//! ## Overview
//!
//! Stylesnap answers one question for a host application: *what changed in
//! the design system since the last time someone looked?* It lets you:
//! - Reduce arbitrary property bags to stable, order-independent fingerprints
//! - Compare two observations and classify every element as added, removed or
//!   modified, with a per-property breakdown
//! - Collapse redundant component-set entries and qualify variant names
//! - Persist a snapshot larger than the host store's per-entry limit, with
//!   read-back verification and corruption recovery
//!
//! ## Architecture
//!
//! - **Canonical Hasher** ([`hasher`]): sorts object keys recursively, then runs
//!   a 32-bit rolling hash rendered in base 36
//! - **Element Model & Validators** ([`types`], [`channel`], [`validation`]):
//!   typed records with one optional fingerprint per property channel, plus
//!   structural checks for untrusted JSON
//! - **Snapshot Differ** ([`diff`], [`display`]): id-keyed comparison with
//!   human-readable before/after values
//! - **Normalizer** ([`normalize`]): post-processing of change reports
//! - **Chunked Store** ([`storage`], [`backend`]): two-phase temp→final commit
//!   over any [`KeyValueBackend`]
//!
//! ## Quick Start
//!
//! ```rust
//! use stylesnap::{MemoryBackend, Tracker};
//! use stylesnap::channel::Channel;
//! use stylesnap::types::{ElementKind, ElementRecord, Snapshot};
//! use serde_json::json;
//!
//! # fn main() -> stylesnap::Result<()> {
//! let tracker = Tracker::new(MemoryBackend::new())?;
//!
//! let red = json!([{"type": "SOLID", "color": {"r": 1, "g": 0, "b": 0}}]);
//! let button = ElementRecord::new("1:2", "Button", ElementKind::Component)
//!     .with_value(Channel::Fills, red);
//! tracker.commit_snapshot(Snapshot::new(1, vec![button.clone()]))?;
//!
//! let blue = json!([{"type": "SOLID", "color": {"r": 0, "g": 0, "b": 1}}]);
//! let recolored = button.with_value(Channel::Fills, blue);
//! let report = tracker.request_diff(&Snapshot::new(2, vec![recolored]))?;
//!
//! let change = &report.modified[0].changes[0];
//! assert_eq!(change.label, "Fill");
//! assert_eq!(change.old_value.as_deref(), Some("#FF0000"));
//! assert_eq!(change.new_value.as_deref(), Some("#0000FF"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Configuring the tracker
//!
//! ```rust
//! use stylesnap::{FileBackend, TrackerBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let dir = tempfile::TempDir::new()?;
//! let tracker = TrackerBuilder::new()
//!     .namespace("design_tracker")
//!     .max_chunk_bytes(90_000)
//!     .ignore_patterns(vec!["Draft/**".to_string()])
//!     .skip_private(true)
//!     .build(FileBackend::open(dir.path())?)?;
//! assert!(tracker.stored_snapshot()?.is_none());
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### Snapshots
//!
//! A snapshot is a timestamped, complete observation. Element ids are unique
//! within it and are the only thing used to match elements across snapshots;
//! a rename or a kind change under the same id is a modification.
//!
//! ### Channels
//!
//! Each element carries an optional fingerprint per property channel (fills,
//! layout, typography, ...). A channel is `None` when the feature is absent.
//! Absent on both sides is unchanged; absent on one side is a change.
//!
//! ### Chunks
//!
//! A serialized snapshot is split into pieces no larger than the configured
//! cap and stored under `<key>_chunk_<i>`, described by `<key>_meta`. Writes
//! are staged under temporary keys and only promoted once every piece has been
//! read back intact.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, SnapError>`. Nothing is fatal: corrupt
//! stored data degrades to "no stored snapshot", and a failed save leaves the
//! previous snapshot readable.
//!
//! ## Module Organization
//!
//! - [`tracker`]: host-facing [`Tracker`] and [`TrackerBuilder`]
//! - [`diff`]: snapshot comparison and timestamp reconciliation
//! - [`normalize`]: redundancy filter and display-name qualifier
//! - [`storage`]: chunked persistence
//! - [`backend`]: key/value backends
//! - [`filter`]: element filtering
//! - [`hasher`]: canonical fingerprints
//! - [`validation`]: structural validation of untyped payloads
//! - [`display`]: per-channel value formatting and changelog text
//! - [`types`] and [`channel`]: data model
//! - [`error`]: error types

// Public API modules
pub mod backend;
pub mod channel;
pub mod diff;
pub mod display;
pub mod error;
pub mod filter;
pub mod hasher;
pub mod normalize;
pub mod storage;
pub mod tracker;
pub mod types;
pub mod validation;

// Internal modules
mod collections;

// Re-export main types for convenience
pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use channel::{Channel, ChannelHashes, ChannelValues};
pub use error::{Result, SnapError};
pub use filter::ElementFilter;
pub use storage::ChunkedStore;
pub use tracker::{SnapshotSource, Tracker, TrackerBuilder};
pub use types::*;
