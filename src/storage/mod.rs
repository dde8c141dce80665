//! Durable client-side storage
//!
//! Everything the client persists (the token record, the pending post-login
//! redirect and visit-once markers) goes through [`KeyValueStore`]. Entries
//! carry their own expiry, mirroring cookie `max-age` semantics: an expired
//! entry reads as absent.

mod flags;
mod tokens;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::error::{Error, Result};

pub use flags::Flags;
pub use tokens::{StoredTokens, TokenKind, TokenStore};

/// Persisted key/value storage with per-entry expiry
pub trait KeyValueStore: Send + Sync {
    /// Read a live entry
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write an entry that expires after `max_age`
    fn set(&self, key: &str, value: &str, max_age: Duration) -> Result<()>;

    /// Delete an entry. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// A stored value together with its expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn new(value: &str, max_age: Duration) -> Self {
        let max_age = chrono::Duration::from_std(max_age)
            .unwrap_or_else(|_| chrono::Duration::days(100 * 365));
        let expires_at = Utc::now()
            .checked_add_signed(max_age)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            value: value.to_string(),
            expires_at,
        }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Utc::now()))
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str, max_age: Duration) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), Entry::new(value, max_age));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON file
///
/// Each write replaces the whole file through a temporary sibling and a
/// rename, so readers see either the previous contents or the new ones.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, Entry>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(Error::storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    fn persist(&self, entries: &HashMap<String, Entry>) -> Result<()> {
        let now = Utc::now();
        let live: HashMap<&String, &Entry> =
            entries.iter().filter(|(_, e)| e.is_live(now)).collect();
        let bytes = serde_json::to_vec_pretty(&live)?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|err| {
                Error::storage(format!("failed to write {}: {}", self.path.display(), err))
            })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let entries = self.load()?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Utc::now()))
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str, max_age: Duration) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        entries.insert(key.to_string(), Entry::new(value, max_age));
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}
