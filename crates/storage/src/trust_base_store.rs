//! Epoch-keyed persistence of root trust bases.

use crate::kv::{KeyValueStore, KvError};
use keystone_types::{codec, CodecError, RootTrustBase};
use tracing::debug;

/// Stores one canonically encoded root trust base per epoch.
///
/// Keys are big-endian epoch numbers so the backing store orders records by
/// epoch. Reading an unknown epoch returns `None`.
pub struct TrustBaseStore<S> {
    store: S,
}

impl<S: KeyValueStore> TrustBaseStore<S> {
    /// Wrap a key-value store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist the trust base under its epoch.
    pub fn put(&self, trust_base: &RootTrustBase) -> Result<(), StorageError> {
        let bytes = codec::encode(trust_base)?;
        self.store.put(&trust_base.epoch.to_be_bytes(), &bytes)?;
        debug!(epoch = trust_base.epoch, "persisted root trust base");
        Ok(())
    }

    /// Load the trust base for an epoch.
    pub fn get(&self, epoch: u64) -> Result<Option<RootTrustBase>, StorageError> {
        match self.store.get(&epoch.to_be_bytes())? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// Errors from trust base persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing store failed.
    #[error(transparent)]
    Kv(#[from] KvError),

    /// A stored record did not decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
