//! Minimal key-value store abstraction and its implementations.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;

/// A byte-keyed store. Reading an unknown key returns `None`, not an error.
pub trait KeyValueStore {
    /// Read a value.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError>;

    /// Write a value, replacing any existing one.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvError>;
}

/// On-disk store backed by sled.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.db.get(key)?.map(|value| value.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.db.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.map.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

/// Errors from the key-value layer.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The backing database failed.
    #[error("key-value store failure: {0}")]
    Backend(#[from] sled::Error),
}
