//! Chunked snapshot persistence
//!
//! Host key/value stores cap the size of a single entry, so a serialized
//! snapshot is split into ordered chunks and described by a metadata record.
//!
//! ## Key layout
//!
//! All keys live in [`StoreConfig::namespace`] and are prefixed with the
//! logical key (`snapshot` by default):
//!
//! ```text
//! snapshot_meta            committed metadata
//! snapshot_chunk_<i>       committed chunk i
//! snapshot_tmp_meta        staged metadata (written last)
//! snapshot_tmp_chunk_<i>   staged chunk i
//! ```
//!
//! ## Write protocol
//!
//! The backend has no transactions, so `save` runs in two phases:
//!
//! 1. **Stage**: every chunk goes to a temporary key and is read back and
//!    byte-compared; the staged metadata is written last, so its presence
//!    proves a complete, verified staged set. Any failure erases the staged
//!    keys and the committed snapshot is untouched.
//! 2. **Promote**: the committed metadata and chunks are erased, the chunks
//!    are rewritten under their final keys, the committed metadata is written,
//!    and the staged keys are erased.
//!
//! Committed chunks are never written before every staged chunk verified. A
//! failed promotion is retried once from the staged set. If that also fails
//! after the committed set was touched, the staged set survives, `save`
//! reports [`SnapError::CommitPending`], and the next `load` finishes the
//! promotion.
//!
//! ## Read protocol
//!
//! `load` treats absent metadata as "nothing stored". Any data-level problem
//! (unparsable metadata, a missing chunk, a length or checksum mismatch,
//! invalid JSON, a snapshot failing validation) purges the committed keys and
//! falls back to a complete staged set if one exists, otherwise it reports
//! nothing stored. Serving no history beats serving corrupted history.

use crate::backend::KeyValueBackend;
use crate::error::{Result, SnapError};
use crate::types::{ChunkMetadata, Snapshot, StoreConfig, CHUNK_FORMAT_VERSION};
use crate::validation::{parse_snapshot, validate_snapshot};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, trace, warn};

/// Which key set an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Committed,
    Staged,
}

/// A snapshot read back from one key set, with the raw chunks it came from
struct StoredSet {
    metadata: ChunkMetadata,
    chunks: Vec<String>,
    snapshot: Snapshot,
}

/// Snapshot store over a size-capped key/value backend
///
/// # Examples
///
/// ```rust
/// use stylesnap::backend::MemoryBackend;
/// use stylesnap::storage::ChunkedStore;
/// use stylesnap::types::{ElementKind, ElementRecord, Snapshot, StoreConfig};
///
/// # fn main() -> stylesnap::Result<()> {
/// let config = StoreConfig { max_chunk_bytes: 32, ..Default::default() };
/// let store = ChunkedStore::new(MemoryBackend::new(), config)?;
///
/// let snapshot = Snapshot::new(1, vec![ElementRecord::new("1", "Button", ElementKind::Component)]);
/// let metadata = store.save(&snapshot)?;
/// assert!(metadata.chunk_count > 1);
/// assert_eq!(store.load()?, Some(snapshot));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChunkedStore<B> {
    backend: B,
    config: StoreConfig,
}

impl<B: KeyValueBackend> ChunkedStore<B> {
    /// Create a store over `backend`
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidConfiguration`] if `config` is unusable
    pub fn new(backend: B, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Persist `snapshot`, replacing the committed one
    ///
    /// Returns the metadata of the newly committed set.
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidFormat`] if the snapshot is malformed; nothing is written
    /// - [`SnapError::StorageWriteFailure`] if a write fails or does not read back
    ///   identically; the previously committed snapshot stays readable
    /// - [`SnapError::CommitPending`] if the new snapshot was staged but could
    ///   not be promoted, even on a retry; the next [`load`](Self::load)
    ///   finishes the promotion and serves the new snapshot
    #[instrument(skip(self, snapshot), fields(elements = snapshot.len()))]
    pub fn save(&self, snapshot: &Snapshot) -> Result<ChunkMetadata> {
        snapshot.validate()?;

        let payload = serde_json::to_string(snapshot)?;
        let chunks = split_chunks(&payload, self.config.max_chunk_bytes);
        let metadata = ChunkMetadata {
            chunk_count: chunks.len(),
            timestamp: snapshot.timestamp,
            total_length: payload.len(),
            checksum: Some(payload_checksum(&payload)),
            format_version: CHUNK_FORMAT_VERSION,
        };
        let raw_metadata = serde_json::to_string(&metadata)?;

        if let Err(e) = self.stage(&chunks, &raw_metadata) {
            warn!("staging failed, rolling back: {}", e);
            if let Err(cleanup) = self.erase_set(Slot::Staged) {
                warn!("rollback left staged keys behind: {}", cleanup);
            }
            return Err(e);
        }

        self.finish_promotion(&chunks, &raw_metadata)?;

        info!(
            chunk_count = metadata.chunk_count,
            total_length = metadata.total_length,
            "committed snapshot"
        );
        Ok(metadata)
    }

    /// Load the committed snapshot
    ///
    /// Returns `None` when nothing is stored or when stored data was corrupt
    /// (in which case the corrupt keys have been purged). A complete staged
    /// set left by an unfinished promotion is promoted and served instead.
    ///
    /// # Errors
    ///
    /// Only backend failures are returned; data problems are recovered from.
    #[instrument(skip(self))]
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let Some(raw_metadata) = self.read(&self.meta_key(Slot::Committed))? else {
            return self.recover_staged();
        };

        match self.read_set(Slot::Committed, &raw_metadata) {
            Ok(stored) => {
                debug!(
                    chunk_count = stored.metadata.chunk_count,
                    total_length = stored.metadata.total_length,
                    elements = stored.snapshot.len(),
                    "loaded snapshot"
                );
                Ok(Some(stored.snapshot))
            }
            Err(e) if e.is_corruption() => {
                warn!("purging corrupted snapshot: {}", e);
                self.erase_set(Slot::Committed)?;
                // a verified staged set outranks a broken committed one
                self.recover_staged()
            }
            Err(e) => Err(e),
        }
    }

    /// Committed metadata, if any parses
    pub fn metadata(&self) -> Result<Option<ChunkMetadata>> {
        Ok(self
            .read(&self.meta_key(Slot::Committed))?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    /// Erase every committed and staged key
    ///
    /// Erasing keys that do not exist is not an error.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<()> {
        self.erase_set(Slot::Committed)?;
        self.erase_set(Slot::Staged)?;
        debug!("cleared stored snapshot");
        Ok(())
    }

    fn stage(&self, chunks: &[&str], raw_metadata: &str) -> Result<()> {
        // A staged metadata record from an earlier attempt must not vouch for
        // the chunks about to be overwritten.
        self.delete(&self.meta_key(Slot::Staged))?;
        for (index, chunk) in chunks.iter().enumerate() {
            self.write_verified(&self.chunk_key(Slot::Staged, index), chunk)?;
        }
        self.write_verified(&self.meta_key(Slot::Staged), raw_metadata)?;
        trace!(chunks = chunks.len(), "staged snapshot");
        Ok(())
    }

    fn promote<S: AsRef<str>>(&self, chunks: &[S], raw_metadata: &str) -> Result<()> {
        self.erase_set(Slot::Committed)?;
        for (index, chunk) in chunks.iter().enumerate() {
            self.write_verified(&self.chunk_key(Slot::Committed, index), chunk.as_ref())?;
        }
        self.write_verified(&self.meta_key(Slot::Committed), raw_metadata)?;

        if let Err(e) = self.erase_set(Slot::Staged) {
            // The committed set is complete; leftovers are purged by the next save.
            warn!("could not erase staged keys after promotion: {}", e);
        }
        Ok(())
    }

    /// Promote a verified staged set, retrying once
    ///
    /// If both attempts fail and the previous committed metadata is still
    /// present, nothing was erased yet: the staged set is dropped and the
    /// write failure is returned as is. Otherwise the committed set is gone or
    /// partial, so the staged set is kept and the caller is told the commit is
    /// pending.
    fn finish_promotion<S: AsRef<str>>(&self, chunks: &[S], raw_metadata: &str) -> Result<()> {
        let Err(first) = self.promote(chunks, raw_metadata) else {
            return Ok(());
        };
        warn!("promotion failed, retrying from staged copy: {}", first);
        let Err(e) = self.promote(chunks, raw_metadata) else {
            return Ok(());
        };

        let previous_intact = matches!(
            self.read(&self.meta_key(Slot::Committed)),
            Ok(Some(raw)) if raw != raw_metadata
                && serde_json::from_str::<ChunkMetadata>(&raw).is_ok()
        );
        if previous_intact {
            warn!("promotion failed before touching the committed snapshot: {}", e);
            if let Err(cleanup) = self.erase_set(Slot::Staged) {
                warn!("rollback left staged keys behind: {}", cleanup);
            }
            return Err(e);
        }

        warn!("promotion failed, staged copy kept for recovery: {}", e);
        Err(SnapError::commit_pending(e.to_string()))
    }

    fn recover_staged(&self) -> Result<Option<Snapshot>> {
        let Some(raw_metadata) = self.read(&self.meta_key(Slot::Staged))? else {
            return Ok(None);
        };

        match self.read_set(Slot::Staged, &raw_metadata) {
            Ok(stored) => {
                info!(
                    chunk_count = stored.metadata.chunk_count,
                    "finishing interrupted promotion"
                );
                if let Err(e) = self.promote(&stored.chunks, &raw_metadata) {
                    warn!("promotion retry failed, serving staged copy: {}", e);
                }
                Ok(Some(stored.snapshot))
            }
            Err(e) if e.is_corruption() => {
                warn!("discarding corrupted staged snapshot: {}", e);
                self.erase_set(Slot::Staged)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn read_set(&self, slot: Slot, raw_metadata: &str) -> Result<StoredSet> {
        let metadata: ChunkMetadata = serde_json::from_str(raw_metadata)
            .map_err(|e| SnapError::corrupted(format!("unreadable metadata: {}", e)))?;
        if metadata.chunk_count == 0 {
            return Err(SnapError::corrupted("metadata declares zero chunks"));
        }
        if metadata.format_version > CHUNK_FORMAT_VERSION {
            return Err(SnapError::corrupted(format!(
                "unsupported format version {}",
                metadata.format_version
            )));
        }

        let mut chunks = Vec::with_capacity(metadata.chunk_count);
        for index in 0..metadata.chunk_count {
            let chunk = self
                .read(&self.chunk_key(slot, index))?
                .ok_or(SnapError::MissingChunk {
                    index,
                    expected: metadata.chunk_count,
                })?;
            chunks.push(chunk);
        }

        let payload = chunks.concat();
        if payload.len() != metadata.total_length {
            return Err(SnapError::corrupted(format!(
                "payload is {} bytes, metadata says {}",
                payload.len(),
                metadata.total_length
            )));
        }
        if let Some(expected) = &metadata.checksum {
            if payload_checksum(&payload) != *expected {
                return Err(SnapError::corrupted("payload checksum mismatch"));
            }
        }

        let value: Value = serde_json::from_str(&payload)
            .map_err(|e| SnapError::corrupted(format!("unreadable payload: {}", e)))?;
        if !validate_snapshot(&value) {
            return Err(SnapError::corrupted("stored snapshot failed validation"));
        }
        let snapshot =
            parse_snapshot(&value).map_err(|e| SnapError::corrupted(e.to_string()))?;

        Ok(StoredSet {
            metadata,
            chunks,
            snapshot,
        })
    }

    /// Erase the metadata and every chunk of a key set
    ///
    /// Metadata goes first so an interrupted erase never leaves metadata
    /// pointing at missing chunks. Chunks are erased up to the declared count
    /// and then probed until the first gap, which also removes stale chunks of
    /// a larger earlier snapshot.
    fn erase_set(&self, slot: Slot) -> Result<()> {
        let meta_key = self.meta_key(slot);
        let declared = self
            .read(&meta_key)?
            .and_then(|raw| serde_json::from_str::<ChunkMetadata>(&raw).ok())
            .map_or(0, |m| m.chunk_count);
        self.delete(&meta_key)?;

        let mut index = 0;
        loop {
            let key = self.chunk_key(slot, index);
            if index >= declared && self.read(&key)?.is_none() {
                break;
            }
            self.delete(&key)?;
            index += 1;
        }
        trace!(?slot, erased = index, "erased key set");
        Ok(())
    }

    fn write_verified(&self, key: &str, value: &str) -> Result<()> {
        let namespace = &self.config.namespace;
        self.backend
            .set(namespace, key, value)
            .map_err(|e| SnapError::write_failure(key, e.to_string()))?;

        if !self.config.verify_writes {
            return Ok(());
        }
        match self.backend.get(namespace, key) {
            Ok(Some(stored)) if stored == value => Ok(()),
            Ok(Some(stored)) => Err(SnapError::write_failure(
                key,
                format!("read back {} bytes, wrote {}", stored.len(), value.len()),
            )),
            Ok(None) => Err(SnapError::write_failure(key, "entry missing after write")),
            Err(e) => Err(SnapError::write_failure(key, e.to_string())),
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .backend
            .get(&self.config.namespace, key)?
            .filter(|value| !value.is_empty()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(&self.config.namespace, key)
    }

    fn meta_key(&self, slot: Slot) -> String {
        match slot {
            Slot::Committed => self.config.meta_key(),
            Slot::Staged => self.config.temp_meta_key(),
        }
    }

    fn chunk_key(&self, slot: Slot, index: usize) -> String {
        match slot {
            Slot::Committed => self.config.chunk_key(index),
            Slot::Staged => self.config.temp_chunk_key(index),
        }
    }
}

/// Split `payload` into pieces of at most `max_bytes` bytes
///
/// Pieces end on UTF-8 character boundaries, so `max_bytes` must be at least 4.
pub fn split_chunks(payload: &str, max_bytes: usize) -> Vec<&str> {
    let mut chunks = Vec::with_capacity(payload.len() / max_bytes.max(1) + 1);
    let mut rest = payload;
    while !rest.is_empty() {
        let mut end = max_bytes.min(rest.len());
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // cap smaller than the next character
            end = rest
                .char_indices()
                .nth(1)
                .map_or(rest.len(), |(i, _)| i);
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

/// SHA-256 of a payload, hex encoded
pub fn payload_checksum(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}
