//! Concurrent buffer of request stores, keyed by `(partition, shard)`.

use crate::{CertificationMetrics, CertificationOutcome, RequestStore, StoreError};
use keystone_types::{
    BlockCertificationRequest, HashAlgorithm, PartitionId, PartitionTrustBase, RequestError,
    ShardId, TrustBaseError,
};
use parking_lot::Mutex;
use prometheus::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Concurrent front door for block certification requests.
///
/// Stores are created lazily on first touch of a `(partition, shard)` key
/// and live for the process lifetime. The outer lock is held only long
/// enough to create-or-fetch a store and is released before the per-store
/// lock is taken, so independent keys never contend; no thread ever holds
/// two per-store locks.
pub struct CertificationRequestBuffer {
    algorithm: HashAlgorithm,
    stores: Mutex<HashMap<(PartitionId, ShardId), Arc<Mutex<RequestStore>>>>,
    metrics: CertificationMetrics,
}

impl CertificationRequestBuffer {
    /// Create an empty buffer, registering its counters with `registry`.
    pub fn new(algorithm: HashAlgorithm, registry: &Registry) -> Self {
        Self {
            algorithm,
            stores: Mutex::new(HashMap::new()),
            metrics: CertificationMetrics::new(registry),
        }
    }

    /// Validate a request and record it in the store for its key.
    ///
    /// Returns the store's fresh quorum classification together with any
    /// proofs. Cancellation is honoured only at entry: once the per-store
    /// lock is taken the mutation completes, so callers must treat `add` as
    /// at-least-once effectful.
    pub fn add(
        &self,
        token: &CancellationToken,
        request: BlockCertificationRequest,
        trust_base: &PartitionTrustBase,
    ) -> Result<
        (
            CertificationOutcome,
            Option<Vec<BlockCertificationRequest>>,
        ),
        BufferError,
    > {
        if token.is_cancelled() {
            return Err(BufferError::Cancelled);
        }

        let verifier = trust_base.verifier(&request.node_id).ok_or_else(|| {
            TrustBaseError::UnknownNode {
                node_id: request.node_id.clone(),
            }
        })?;
        request.validate(verifier)?;

        let partition_id = request.partition_id;
        self.metrics.record_received(partition_id);

        let store = self.store(partition_id, request.shard_id.clone());
        let mut store = store.lock();
        match store.add(request, trust_base) {
            Ok((outcome, proofs)) => {
                debug!(
                    partition = %partition_id,
                    outcome = %outcome,
                    requests = store.len(),
                    "stored certification request"
                );
                self.metrics.record_outcome(partition_id, outcome);
                Ok((outcome, proofs))
            }
            Err(StoreError::DuplicateRequest) => {
                warn!(partition = %partition_id, "duplicate certification request");
                self.metrics.record_duplicate(partition_id);
                Err(StoreError::DuplicateRequest.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Classify one key's store without mutating it.
    ///
    /// A never-populated key reports quorum-in-progress with no proofs.
    pub fn consensus_state(
        &self,
        partition_id: PartitionId,
        shard_id: &ShardId,
        trust_base: &PartitionTrustBase,
    ) -> (
        CertificationOutcome,
        Option<Vec<BlockCertificationRequest>>,
    ) {
        let store = self.store(partition_id, shard_id.clone());
        let store = store.lock();
        store.consensus_state(trust_base)
    }

    /// Reset one key's store for the next round, leaving other keys alone.
    ///
    /// Clearing a never-populated key is a no-op.
    pub fn clear(
        &self,
        token: &CancellationToken,
        partition_id: PartitionId,
        shard_id: &ShardId,
    ) -> Result<(), BufferError> {
        if token.is_cancelled() {
            return Err(BufferError::Cancelled);
        }
        let store = self.store(partition_id, shard_id.clone());
        let mut store = store.lock();
        store.reset();
        debug!(partition = %partition_id, "cleared certification requests");
        Ok(())
    }

    /// Create-or-fetch the store for a key.
    ///
    /// The returned Arc is locked by the caller after the outer lock is
    /// released.
    fn store(&self, partition_id: PartitionId, shard_id: ShardId) -> Arc<Mutex<RequestStore>> {
        let mut stores = self.stores.lock();
        stores
            .entry((partition_id, shard_id))
            .or_insert_with(|| Arc::new(Mutex::new(RequestStore::new(self.algorithm))))
            .clone()
    }
}

/// Errors from buffer operations.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The cancellation token was already cancelled at entry.
    #[error("operation cancelled")]
    Cancelled,

    /// The submitting node is not in the partition trust base.
    #[error(transparent)]
    TrustBase(#[from] TrustBaseError),

    /// The request failed validation.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The store rejected the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}
