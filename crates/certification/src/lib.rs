//! Certification request buffer for the Keystone root chain.
//!
//! Partition validators submit block certification requests during each root
//! round. The buffer routes every request to the store for its
//! `(partition, shard)` key, enforces one request per node per round, and
//! classifies each store as quorum-in-progress, quorum-achieved or
//! quorum-not-possible against the partition's trust base.

pub mod buffer;
pub mod metrics;
pub mod store;

pub use buffer::{BufferError, CertificationRequestBuffer};
pub use metrics::CertificationMetrics;
pub use store::{CertificationOutcome, RequestStore, StoreError};
