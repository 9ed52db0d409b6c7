//! Trust base persistence for the Keystone root chain.
//!
//! Root trust bases are versioned by epoch; the store keeps one canonical
//! record per epoch over a minimal key-value abstraction.

pub mod kv;
pub mod trust_base_store;

pub use kv::{KeyValueStore, MemoryStore, SledStore};
pub use trust_base_store::{StorageError, TrustBaseStore};
