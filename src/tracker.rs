//! Tracker: the engine's host-facing surface
//!
//! A [`Tracker`] ties the pieces together for one document:
//!
//! ```text
//! observe ──► filter ──► diff(stored, current) ──► normalize ──► ChangeReport
//!                │
//!                └──► reconcile timestamps ──► ChunkedStore::save
//! ```
//!
//! The host calls [`Tracker::request_diff`] to show what changed since the
//! last commit, then either [`Tracker::commit_snapshot`] to make the current
//! observation the new baseline, or [`Tracker::discard_without_committing`]
//! to skip a version without reporting it.

use crate::backend::KeyValueBackend;
use crate::diff::{diff, reconcile_timestamps};
use crate::error::{Result, SnapError};
use crate::filter::ElementFilter;
use crate::normalize::normalize;
use crate::storage::ChunkedStore;
use crate::types::{ChangeReport, ElementKind, Snapshot, StoreConfig};
use crate::validation::parse_snapshot;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Producer of freshly observed snapshots
///
/// Walking the live document is the host's job; the tracker only needs
/// something that yields the current element collection.
pub trait SnapshotSource {
    /// Observe the current state
    fn observe(&mut self) -> Result<Snapshot>;
}

impl<F> SnapshotSource for F
where
    F: FnMut() -> Result<Snapshot>,
{
    fn observe(&mut self) -> Result<Snapshot> {
        self()
    }
}

/// Change tracker for one document
///
/// # Examples
///
/// ```rust
/// use stylesnap::{MemoryBackend, SnapError, Tracker};
/// use stylesnap::types::{ElementKind, ElementRecord, Snapshot};
///
/// # fn main() -> stylesnap::Result<()> {
/// let tracker = Tracker::new(MemoryBackend::new())?;
/// let first = Snapshot::new(1, vec![ElementRecord::new("1", "Button", ElementKind::Component)]);
///
/// // nothing committed yet
/// assert!(matches!(tracker.request_diff(&first), Err(SnapError::NoStoredSnapshot)));
/// tracker.commit_snapshot(first.clone())?;
///
/// let mut second = first.clone();
/// second.elements.push(ElementRecord::new("2", "Input", ElementKind::Component));
/// let report = tracker.request_diff(&second)?;
/// assert_eq!(report.added.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Tracker<B> {
    store: ChunkedStore<B>,
    filter: ElementFilter,
}

impl<B: KeyValueBackend> Tracker<B> {
    /// Create a tracker with default configuration
    pub fn new(backend: B) -> Result<Self> {
        TrackerBuilder::new().build(backend)
    }

    /// Underlying store
    pub fn store(&self) -> &ChunkedStore<B> {
        &self.store
    }

    /// Element filter in effect
    pub fn filter(&self) -> &ElementFilter {
        &self.filter
    }

    /// Compare `current` against the committed snapshot
    ///
    /// # Errors
    ///
    /// - [`SnapError::NoStoredSnapshot`] if nothing has been committed (or the
    ///   stored data was corrupt and has been purged)
    /// - [`SnapError::InvalidFormat`] if `current` is malformed
    #[instrument(skip(self, current), fields(elements = current.len()))]
    pub fn request_diff(&self, current: &Snapshot) -> Result<ChangeReport> {
        current.validate()?;
        let previous = self.stored_snapshot()?.ok_or(SnapError::NoStoredSnapshot)?;
        let current = self.filter.apply(current.clone());

        let report = normalize(diff(&previous, &current));
        info!(
            added = report.added.len(),
            modified = report.modified.len(),
            removed = report.removed.len(),
            "diff requested"
        );
        Ok(report)
    }

    /// Observe through `source`, then [`request_diff`](Self::request_diff)
    pub fn request_diff_from<S: SnapshotSource>(&self, source: &mut S) -> Result<ChangeReport> {
        let current = source.observe()?;
        self.request_diff(&current)
    }

    /// Validate an untyped snapshot payload from the host
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidFormat`] if the payload fails structural validation
    pub fn accept_payload(&self, payload: &Value) -> Result<Snapshot> {
        let snapshot = parse_snapshot(payload).inspect_err(|e| {
            warn!("rejected snapshot payload: {}", e);
        })?;
        debug!(elements = snapshot.len(), "accepted snapshot payload");
        Ok(snapshot)
    }

    /// Make `current` the new baseline
    ///
    /// Timestamps are reconciled against the committed snapshot first, and the
    /// snapshot as persisted is returned.
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidFormat`] if `current` is malformed; nothing is written
    /// - [`SnapError::StorageWriteFailure`] if persisting fails; the previous
    ///   baseline stays intact
    /// - [`SnapError::CommitPending`] if `current` was stored but not yet
    ///   promoted; it becomes the baseline on the next load
    #[instrument(skip(self, current), fields(elements = current.len()))]
    pub fn commit_snapshot(&self, current: Snapshot) -> Result<Snapshot> {
        current.validate()?;
        let current = self.filter.apply(current);
        let previous = self.stored_snapshot()?;
        let committed = reconcile_timestamps(previous.as_ref(), current);

        self.store.save(&committed)?;
        info!(timestamp = committed.timestamp, "snapshot committed");
        Ok(committed)
    }

    /// Advance the baseline to `current` without producing a report
    ///
    /// Storage failures are logged and swallowed. A skipped version that
    /// failed to persist shows up again in the next diff, and one left pending
    /// becomes the baseline on the next load.
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidFormat`] if `current` is malformed
    #[instrument(skip(self, current), fields(elements = current.len()))]
    pub fn discard_without_committing(&self, current: Snapshot) -> Result<()> {
        current.validate()?;
        match self.commit_snapshot(current) {
            Ok(_) => {}
            Err(e @ SnapError::CommitPending(_)) => {
                warn!("baseline advance deferred to next load: {}", e);
            }
            Err(e) => warn!("could not advance baseline: {}", e),
        }
        Ok(())
    }

    /// Committed snapshot, filtered by the current filter
    pub fn stored_snapshot(&self) -> Result<Option<Snapshot>> {
        Ok(self.store.load()?.map(|s| self.filter.apply(s)))
    }

    /// Forget the committed snapshot
    pub fn reset(&self) -> Result<()> {
        self.store.clear()
    }
}

/// Builder for [`Tracker`]
///
/// # Examples
///
/// ```rust
/// use stylesnap::{MemoryBackend, TrackerBuilder};
/// use stylesnap::types::ElementKind;
///
/// let tracker = TrackerBuilder::new()
///     .namespace("my_plugin")
///     .max_chunk_bytes(50_000)
///     .ignore_patterns(vec!["Draft/**".to_string()])
///     .skip_private(true)
///     .tracked_kinds(vec![ElementKind::Component, ElementKind::ComponentSet])
///     .build(MemoryBackend::new())
///     .unwrap();
/// assert_eq!(tracker.store().config().namespace, "my_plugin");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TrackerBuilder {
    config: StoreConfig,
    ignore_patterns: Vec<String>,
    skip_private: bool,
    tracked_kinds: Option<Vec<ElementKind>>,
}

impl TrackerBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set the logical key prefixed to every stored key
    pub fn logical_key(mut self, key: impl Into<String>) -> Self {
        self.config.logical_key = key.into();
        self
    }

    /// Set the per-entry payload cap
    ///
    /// Must be at least [`MIN_CHUNK_BYTES`](crate::types::MIN_CHUNK_BYTES).
    pub fn max_chunk_bytes(mut self, bytes: usize) -> Self {
        self.config.max_chunk_bytes = bytes;
        self
    }

    /// Enable or disable read-back verification of writes
    pub fn verify_writes(mut self, verify: bool) -> Self {
        self.config.verify_writes = verify;
        self
    }

    /// Set glob patterns of element names to ignore
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Skip elements whose name starts with `_` or `.`
    pub fn skip_private(mut self, skip: bool) -> Self {
        self.skip_private = skip;
        self
    }

    /// Only track these kinds
    pub fn tracked_kinds(mut self, kinds: Vec<ElementKind>) -> Self {
        self.tracked_kinds = Some(kinds);
        self
    }

    /// Build the tracker over `backend`
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidConfiguration`] for unusable store settings
    /// - [`SnapError::InvalidPattern`] for an ignore pattern that does not compile
    pub fn build<B: KeyValueBackend>(self, backend: B) -> Result<Tracker<B>> {
        let mut filter = ElementFilter::new()
            .with_ignore_patterns(self.ignore_patterns)?
            .with_skip_private(self.skip_private);
        if let Some(kinds) = self.tracked_kinds {
            filter = filter.with_kinds(kinds);
        }

        let store = ChunkedStore::new(backend, self.config)?;
        Ok(Tracker { store, filter })
    }
}
