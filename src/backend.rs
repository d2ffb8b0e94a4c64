//! Key/value backends for the chunked store
//!
//! The store only needs three operations from its backend, all scoped by a
//! namespace: read a string, write a string, erase a key. Hosts typically
//! offer exactly this through a per-document plugin data API with a hard
//! per-entry size limit, and no transactions.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryBackend`]: an in-process map with an optional per-entry cap,
//!   used by tests and by embedders that mirror host data in memory
//! - [`FileBackend`]: one file per namespaced key under a root directory,
//!   written atomically, used by the `stylesnap` binary
//!
//! Both treat writing an empty string as erasing the key, mirroring host APIs
//! where an empty value means "unset".

use crate::error::{Result, SnapError};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::trace;

/// Size-capped, non-transactional string store
pub trait KeyValueBackend {
    /// Read the value stored under `key`; `None` when unset
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()>;

    /// Erase `key`; erasing a missing key is a no-op
    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        self.set(namespace, key, "")
    }
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for &B {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        (**self).get(namespace, key)
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        (**self).set(namespace, key, value)
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        (**self).delete(namespace, key)
    }
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for Arc<B> {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        (**self).get(namespace, key)
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        (**self).set(namespace, key, value)
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        (**self).delete(namespace, key)
    }
}

fn check_entry_size(max_entry_bytes: Option<usize>, key: &str, value: &str) -> Result<()> {
    match max_entry_bytes {
        Some(limit) if value.len() > limit => Err(SnapError::backend(format!(
            "entry '{}' is {} bytes, limit is {}",
            key,
            value.len(),
            limit
        ))),
        _ => Ok(()),
    }
}

/// In-memory backend
///
/// # Examples
///
/// ```rust
/// use stylesnap::backend::{KeyValueBackend, MemoryBackend};
///
/// let backend = MemoryBackend::with_entry_limit(8);
/// backend.set("ns", "k", "value").unwrap();
/// assert_eq!(backend.get("ns", "k").unwrap().as_deref(), Some("value"));
/// assert!(backend.set("ns", "k", "way too long").is_err());
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<(String, String), String>>,
    max_entry_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Create an unbounded backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects entries larger than `limit` bytes
    pub fn with_entry_limit(limit: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            max_entry_bytes: Some(limit),
        }
    }

    /// Keys currently set in `namespace`, sorted
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        self.entries
            .read()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Number of entries across all namespaces
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if no entries are set
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read();
        Ok(entries
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        check_entry_size(self.max_entry_bytes, key, value)?;
        let mut entries = self.entries.write();
        let slot = (namespace.to_string(), key.to_string());
        if value.is_empty() {
            entries.remove(&slot);
        } else {
            entries.insert(slot, value.to_string());
        }
        Ok(())
    }
}

/// Directory-backed backend
///
/// Layout: `<root>/<namespace>/<key>`. Writes go to a temporary file in the
/// same directory and are renamed into place, so a reader never observes a
/// half-written entry.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    max_entry_bytes: Option<usize>,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Open (creating if needed) a backend rooted at `root`
    ///
    /// # Errors
    ///
    /// - [`SnapError::Io`] if the root directory cannot be created
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            max_entry_bytes: None,
            write_lock: Mutex::new(()),
        })
    }

    /// Reject entries larger than `limit` bytes
    pub fn with_entry_limit(mut self, limit: usize) -> Self {
        self.max_entry_bytes = Some(limit);
        self
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, namespace: &str, key: &str) -> Result<PathBuf> {
        for part in [namespace, key] {
            if part.is_empty() || part.contains(['/', '\\']) || part == "." || part == ".." {
                return Err(SnapError::backend(format!("invalid key component '{}'", part)));
            }
        }
        Ok(self.root.join(namespace).join(key))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(namespace, key)?;
        match fs::read_to_string(&path) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return self.delete(namespace, key);
        }
        check_entry_size(self.max_entry_bytes, key, value)?;
        let path = self.entry_path(namespace, key)?;
        let _guard = self.write_lock.lock();

        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| SnapError::Io(e.error))?;
        trace!(?path, bytes = value.len(), "wrote entry");
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let path = self.entry_path(namespace, key)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
