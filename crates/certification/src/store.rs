//! Per-(partition, shard) request store and quorum classification.

use keystone_types::{
    BlockCertificationRequest, Hash, HashAlgorithm, PartitionTrustBase, RequestError,
};
use std::collections::BTreeMap;
use std::fmt;

/// Classification of one store's contents against the partition trust base.
///
/// The question is not "majority yet?" but "quorum locked in or provably
/// unreachable?": once the nodes that have not voted can no longer lift the
/// best cluster to quorum, the round is settled either way and the root
/// chain can move on without waiting for laggards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificationOutcome {
    /// A quorum of nodes proposed equivalent input records.
    QuorumAchieved,

    /// Quorum is still reachable with the votes outstanding.
    QuorumInProgress,

    /// No input record can reach quorum this round.
    QuorumNotPossible,
}

impl CertificationOutcome {
    /// Stable label for metrics and logging.
    pub fn label(&self) -> &'static str {
        match self {
            CertificationOutcome::QuorumAchieved => "achieved",
            CertificationOutcome::QuorumInProgress => "in_progress",
            CertificationOutcome::QuorumNotPossible => "not_possible",
        }
    }
}

impl fmt::Display for CertificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Requests collected for one `(partition, shard)` key within one root
/// round.
///
/// Each node may store at most one request per round. Requests are clustered
/// by the fingerprint of their proposed input record; the clusters decide
/// the outcome.
#[derive(Debug)]
pub struct RequestStore {
    algorithm: HashAlgorithm,
    /// One request per node per round.
    node_requests: BTreeMap<String, BlockCertificationRequest>,
    /// Requests clustered by input record fingerprint.
    by_fingerprint: BTreeMap<Hash, Vec<BlockCertificationRequest>>,
}

impl RequestStore {
    /// Create an empty store.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            node_requests: BTreeMap::new(),
            by_fingerprint: BTreeMap::new(),
        }
    }

    /// Record a request and reclassify the store.
    ///
    /// The caller has already validated the request against the trust base.
    /// A second request from the same node in one round is rejected without
    /// mutating the store, whether or not it proposes the same record.
    pub fn add(
        &mut self,
        request: BlockCertificationRequest,
        trust_base: &PartitionTrustBase,
    ) -> Result<
        (
            CertificationOutcome,
            Option<Vec<BlockCertificationRequest>>,
        ),
        StoreError,
    > {
        if self.node_requests.contains_key(&request.node_id) {
            return Err(StoreError::DuplicateRequest);
        }
        let fingerprint = request.fingerprint(self.algorithm)?;

        self.node_requests
            .insert(request.node_id.clone(), request.clone());
        self.by_fingerprint
            .entry(fingerprint)
            .or_default()
            .push(request);

        Ok(self.consensus_state(trust_base))
    }

    /// Classify the store without mutating it.
    ///
    /// Returns the outcome and, where the outcome warrants proofs, the
    /// requests justifying it: the winning cluster on quorum-achieved, every
    /// stored request on quorum-not-possible.
    pub fn consensus_state(
        &self,
        trust_base: &PartitionTrustBase,
    ) -> (
        CertificationOutcome,
        Option<Vec<BlockCertificationRequest>>,
    ) {
        let n = trust_base.size();
        let quorum = trust_base.quorum();
        let total = self.node_requests.len();

        // Largest cluster. Strictly-greater keeps the first candidate on
        // ties, and BTreeMap iterates fingerprints ascending, so the
        // smallest fingerprint wins and proofs stay stable across runs.
        let mut best: Option<&Vec<BlockCertificationRequest>> = None;
        for cluster in self.by_fingerprint.values() {
            if best.is_none_or(|b| cluster.len() > b.len()) {
                best = Some(cluster);
            }
        }
        let best_size = best.map_or(0, |cluster| cluster.len());

        if best_size >= quorum {
            return (CertificationOutcome::QuorumAchieved, best.cloned());
        }

        // Quorum is still reachable while the missing votes could lift the
        // best cluster over the threshold.
        if total <= n && quorum - best_size <= n - total {
            return (CertificationOutcome::QuorumInProgress, None);
        }

        let all = self.node_requests.values().cloned().collect();
        (CertificationOutcome::QuorumNotPossible, Some(all))
    }

    /// Drop every stored request.
    pub fn reset(&mut self) {
        self.node_requests.clear();
        self.by_fingerprint.clear();
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.node_requests.len()
    }

    /// True when no requests are stored.
    pub fn is_empty(&self) -> bool {
        self.node_requests.is_empty()
    }
}

/// Errors from recording a certification request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The node already submitted a request this round.
    #[error("request of the node in this round already stored")]
    DuplicateRequest,

    /// The request is malformed.
    #[error(transparent)]
    Request(#[from] RequestError),
}
