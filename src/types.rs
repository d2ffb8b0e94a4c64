//! Core data types used throughout the stylesnap library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **Observed state**: [`ElementRecord`], [`Snapshot`] - design-system elements and
//!   a timestamped observation of all of them
//! - **Diff results**: [`ChangeReport`], [`ModifiedElement`], [`PropertyChange`],
//!   [`ChangeStats`]
//! - **Persistence**: [`ChunkMetadata`], [`StoreConfig`] - the chunked storage layout
//!   and its injected configuration
//!
//! All types serialize with camelCase field names so that element descriptors
//! produced by a host (`parentName`, `fillsHash`, ...) deserialize directly.
//!
//! ## Examples
//!
//! ```rust
//! use stylesnap::types::{ElementKind, ElementRecord, Snapshot};
//! use stylesnap::channel::Channel;
//!
//! let button = ElementRecord::new("1:2", "Button", ElementKind::Component)
//!     .with_hash(Channel::Fills, "a1b2");
//! let snapshot = Snapshot::new(1_700_000_000_000, vec![button]);
//!
//! assert!(snapshot.validate().is_ok());
//! assert_eq!(snapshot.find("1:2").map(|e| e.name.as_str()), Some("Button"));
//! ```

use crate::channel::{Channel, ChannelHashes, ChannelValues};
use crate::collections::{HashSet, HashSetExt};
use crate::error::{Result, SnapError};
use crate::hasher;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of tracked design-system element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
    /// A main component, possibly a variant inside a set
    Component,
    /// A set of component variants
    ComponentSet,
    /// Shared text style
    TextStyle,
    /// Shared paint style
    ColorStyle,
    /// Shared effect style
    EffectStyle,
    /// Shared layout grid style
    GridStyle,
    /// A single variable
    Variable,
    /// A collection of variables
    VariableCollection,
}

impl ElementKind {
    /// Every kind, in reporting order
    pub const ALL: [ElementKind; 8] = [
        ElementKind::Component,
        ElementKind::ComponentSet,
        ElementKind::TextStyle,
        ElementKind::ColorStyle,
        ElementKind::EffectStyle,
        ElementKind::GridStyle,
        ElementKind::Variable,
        ElementKind::VariableCollection,
    ];

    /// Serialized tag of this kind
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Component => "COMPONENT",
            ElementKind::ComponentSet => "COMPONENT_SET",
            ElementKind::TextStyle => "TEXT_STYLE",
            ElementKind::ColorStyle => "COLOR_STYLE",
            ElementKind::EffectStyle => "EFFECT_STYLE",
            ElementKind::GridStyle => "GRID_STYLE",
            ElementKind::Variable => "VARIABLE",
            ElementKind::VariableCollection => "VARIABLE_COLLECTION",
        }
    }

    /// Human label
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Component => "Component",
            ElementKind::ComponentSet => "Component set",
            ElementKind::TextStyle => "Text style",
            ElementKind::ColorStyle => "Color style",
            ElementKind::EffectStyle => "Effect style",
            ElementKind::GridStyle => "Grid style",
            ElementKind::Variable => "Variable",
            ElementKind::VariableCollection => "Variable collection",
        }
    }

    /// Parse a serialized tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One tracked design-system element
///
/// `id` is the only identity used for matching across snapshots. Everything
/// else is compared: `name`, `description` and `kind` as identity fields,
/// the variant property hash, and every channel fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    /// Stable identifier, unique within a snapshot
    pub id: String,
    /// Display name
    pub name: String,
    /// Element kind
    pub kind: ElementKind,
    /// Publishing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning component set name, for variants; display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    /// Variant property values, for variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_properties: Option<BTreeMap<String, String>>,
    /// Fingerprint of `variant_properties`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_properties_hash: Option<String>,
    /// Per-channel fingerprints
    #[serde(flatten)]
    pub hashes: ChannelHashes,
    /// Direct child ids, for container-like elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_ids: Option<Vec<String>>,
    /// Raw channel payloads for display
    #[serde(default, skip_serializing_if = "ChannelValues::is_empty")]
    pub values: ChannelValues,
    /// Last time any tracked field changed (ms since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<i64>,
    /// Last time the element was observed (ms since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl ElementRecord {
    /// Create a record with only identity fields set
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            key: None,
            description: None,
            parent_name: None,
            variant_properties: None,
            variant_properties_hash: None,
            hashes: ChannelHashes::default(),
            children_ids: None,
            values: ChannelValues::default(),
            modified_at: None,
            updated_at: None,
        }
    }

    /// Set the fingerprint for `channel`
    pub fn with_hash(mut self, channel: Channel, hash: impl Into<String>) -> Self {
        self.hashes.set(channel, Some(hash.into()));
        self
    }

    /// Record the raw payload for `channel` and derive its fingerprint
    pub fn with_value(mut self, channel: Channel, value: Value) -> Self {
        self.hashes.set(channel, Some(hasher::hash_value(&value)));
        self.values.set(channel, Some(value));
        self
    }

    /// Set the owning component set name
    pub fn with_parent(mut self, parent_name: impl Into<String>) -> Self {
        self.parent_name = Some(parent_name.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set variant properties and derive their fingerprint
    pub fn with_variant_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.variant_properties_hash = Some(hasher::hash_variant_properties(&properties));
        self.variant_properties = Some(properties);
        self
    }

    /// Set the direct child ids
    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children_ids = Some(children);
        self
    }

    /// Check if this is a variant of a component set
    pub fn is_variant(&self) -> bool {
        self.kind == ElementKind::Component
            && self.parent_name.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// A timestamped, complete observation of all tracked elements
///
/// A new snapshot always replaces the stored one in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Observation time (ms since epoch)
    pub timestamp: i64,
    /// Observed elements, ids unique
    pub elements: Vec<ElementRecord>,
}

impl Snapshot {
    /// Create a snapshot
    pub fn new(timestamp: i64, elements: Vec<ElementRecord>) -> Self {
        Self { timestamp, elements }
    }

    /// Create a snapshot stamped with the current time
    pub fn now(elements: Vec<ElementRecord>) -> Self {
        Self::new(Utc::now().timestamp_millis(), elements)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the snapshot has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Find an element by id
    pub fn find(&self, id: &str) -> Option<&ElementRecord> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Check the typed invariants of a snapshot
    ///
    /// Ids and names must be non-empty and ids unique.
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidFormat`] naming the first offending element
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.elements.len());
        for element in &self.elements {
            if element.id.is_empty() {
                return Err(SnapError::invalid_format("element with empty id"));
            }
            if element.name.is_empty() {
                return Err(SnapError::invalid_format(format!(
                    "element {} has an empty name",
                    element.id
                )));
            }
            if !seen.insert(element.id.as_str()) {
                return Err(SnapError::invalid_format(format!(
                    "duplicate element id {}",
                    element.id
                )));
            }
        }
        Ok(())
    }
}

/// One differing property of a modified element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    /// Machine key (`name`, `kind`, `fills`, ...)
    pub property: String,
    /// Human label
    pub label: String,
    /// Display value before, `None` when absent
    pub old_value: Option<String>,
    /// Display value after, `None` when absent
    pub new_value: Option<String>,
}

/// An element present in both snapshots with at least one differing property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedElement {
    /// The element as currently observed
    #[serde(flatten)]
    pub element: ElementRecord,
    /// What changed
    pub changes: Vec<PropertyChange>,
    /// One-line summary derived from `changes`
    pub summary: String,
}

impl ModifiedElement {
    /// Pair an element with its changes, deriving the summary
    pub fn new(element: ElementRecord, changes: Vec<PropertyChange>) -> Self {
        let summary = summarize(&changes);
        Self {
            element,
            changes,
            summary,
        }
    }

    /// Check if `property` is among the changes
    pub fn changed(&self, property: &str) -> bool {
        self.changes.iter().any(|c| c.property == property)
    }
}

fn summarize(changes: &[PropertyChange]) -> String {
    match changes {
        [] => "No changes".to_string(),
        [single] if single.property == "name" => format!(
            "Renamed from \"{}\"",
            single.old_value.as_deref().unwrap_or_default()
        ),
        _ => {
            let labels = changes.iter().map(|c| c.label.as_str()).collect::<Vec<_>>();
            format!("Changed: {}", labels.join(", "))
        }
    }
}

/// Result of comparing two snapshots
///
/// The three lists are disjoint by id, and every id in `modified` exists in
/// both snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    /// Elements only in the current snapshot
    pub added: Vec<ElementRecord>,
    /// Elements in both with differences
    pub modified: Vec<ModifiedElement>,
    /// Elements only in the previous snapshot
    pub removed: Vec<ElementRecord>,
    /// Set once the report has been normalized; variant names are qualified
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub normalized: bool,
}

impl ChangeReport {
    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.removed.is_empty()
    }

    /// Total number of reported elements
    pub fn total(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Counts per list and per kind
    pub fn stats(&self) -> ChangeStats {
        let mut stats = ChangeStats {
            added: self.added.len(),
            modified: self.modified.len(),
            removed: self.removed.len(),
            by_kind: BTreeMap::new(),
        };
        let kinds = self
            .added
            .iter()
            .chain(self.modified.iter().map(|m| &m.element))
            .chain(self.removed.iter())
            .map(|e| e.kind);
        for kind in kinds {
            *stats.by_kind.entry(kind).or_default() += 1;
        }
        stats
    }
}

/// Statistics about a change report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStats {
    /// Number of added elements
    pub added: usize,
    /// Number of modified elements
    pub modified: usize,
    /// Number of removed elements
    pub removed: usize,
    /// Reported elements per kind
    pub by_kind: BTreeMap<ElementKind, usize>,
}

/// Current layout version of persisted metadata
pub const CHUNK_FORMAT_VERSION: u32 = 1;

/// Metadata record describing a chunked snapshot
///
/// Reading `chunk_count` chunks in index order and concatenating them yields
/// exactly `total_length` bytes that deserialize to one [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Number of chunks, at least 1
    pub chunk_count: usize,
    /// Timestamp of the stored snapshot
    pub timestamp: i64,
    /// Byte length of the concatenated payload
    pub total_length: usize,
    /// SHA-256 of the concatenated payload, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Layout version
    #[serde(default = "default_format_version")]
    pub format_version: u32,
}

fn default_format_version() -> u32 {
    CHUNK_FORMAT_VERSION
}

/// Configuration of the chunked store
///
/// # Examples
///
/// ```rust
/// use stylesnap::types::StoreConfig;
///
/// let config = StoreConfig {
///     max_chunk_bytes: 64,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.meta_key(), "snapshot_meta");
/// assert_eq!(config.chunk_key(3), "snapshot_chunk_3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Backend namespace all keys live in
    pub namespace: String,
    /// Logical name prefixed to every key
    pub logical_key: String,
    /// Largest payload written to a single entry
    pub max_chunk_bytes: usize,
    /// Read back every write and byte-compare it
    pub verify_writes: bool,
}

/// Single-entry payload cap of the reference backend
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 90_000;

/// Smallest usable cap: one UTF-8 scalar must fit in a chunk
pub const MIN_CHUNK_BYTES: usize = 4;

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: "design_tracker".to_string(),
            logical_key: "snapshot".to_string(),
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            verify_writes: true,
        }
    }
}

impl StoreConfig {
    /// Check the configuration for unusable values
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(SnapError::InvalidConfiguration("namespace is empty".into()));
        }
        if self.logical_key.is_empty() {
            return Err(SnapError::InvalidConfiguration("logical key is empty".into()));
        }
        if self.max_chunk_bytes < MIN_CHUNK_BYTES {
            return Err(SnapError::InvalidConfiguration(format!(
                "max_chunk_bytes must be at least {}, got {}",
                MIN_CHUNK_BYTES, self.max_chunk_bytes
            )));
        }
        Ok(())
    }

    /// Key of the committed metadata record
    pub fn meta_key(&self) -> String {
        format!("{}_meta", self.logical_key)
    }

    /// Key of committed chunk `index`
    pub fn chunk_key(&self, index: usize) -> String {
        format!("{}_chunk_{}", self.logical_key, index)
    }

    /// Key of the staging metadata record
    pub fn temp_meta_key(&self) -> String {
        format!("{}_tmp_meta", self.logical_key)
    }

    /// Key of staging chunk `index`
    pub fn temp_chunk_key(&self, index: usize) -> String {
        format!("{}_tmp_chunk_{}", self.logical_key, index)
    }
}
