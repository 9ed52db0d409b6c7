//! Trust bases: who may sign for a partition, and who may seal for the root
//! chain.

use crate::{NodeInfo, PartitionError, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current root trust base version.
pub const ROOT_TRUST_BASE_VERSION: u32 = 1;

/// The verification keys of one partition's validators.
///
/// Partition quorum is a strict majority: `floor(n/2) + 1`.
#[derive(Debug, Clone)]
pub struct PartitionTrustBase {
    verifiers: BTreeMap<String, PublicKey>,
}

impl PartitionTrustBase {
    /// Build a trust base from `(node id, key)` pairs.
    pub fn new(verifiers: impl IntoIterator<Item = (String, PublicKey)>) -> Self {
        Self {
            verifiers: verifiers.into_iter().collect(),
        }
    }

    /// Number of validators in the partition.
    pub fn size(&self) -> usize {
        self.verifiers.len()
    }

    /// Strict-majority quorum threshold.
    pub fn quorum(&self) -> usize {
        self.size() / 2 + 1
    }

    /// Maximum number of divergent votes a quorum can tolerate.
    pub fn max_objections(&self) -> usize {
        self.size() - self.quorum()
    }

    /// Look up a node's verification key.
    pub fn verifier(&self, node_id: &str) -> Option<&PublicKey> {
        self.verifiers.get(node_id)
    }

    /// Node identifiers in sorted order.
    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.verifiers.keys()
    }
}

/// The root validator committee: node infos with stake, and the staked
/// quorum threshold for unicity seals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootTrustBase {
    /// Version of this record layout.
    pub version: u32,

    /// Epoch this trust base is valid for.
    pub epoch: u64,

    /// Root validators keyed by node id.
    pub root_nodes: BTreeMap<String, NodeInfo>,

    /// Staked weight required for a valid unicity seal.
    pub quorum_threshold: u64,
}

impl RootTrustBase {
    /// Build a trust base for `epoch` from validator infos.
    ///
    /// `quorum_threshold` overrides the default `floor(2n/3) + 1` (by
    /// stake); it must stay within `[floor(2n/3) + 1, total stake]`.
    pub fn new(
        epoch: u64,
        validators: impl IntoIterator<Item = NodeInfo>,
        quorum_threshold: Option<u64>,
    ) -> Result<Self, TrustBaseError> {
        let root_nodes: BTreeMap<String, NodeInfo> = validators
            .into_iter()
            .map(|info| (info.node_id.clone(), info))
            .collect();
        for info in root_nodes.values() {
            info.validate()?;
        }

        let total_stake: u64 = root_nodes.values().map(|info| info.stake).sum();
        let min_threshold = total_stake * 2 / 3 + 1;
        let threshold = quorum_threshold.unwrap_or(min_threshold);
        if threshold < min_threshold {
            return Err(TrustBaseError::QuorumTooLow {
                min: min_threshold,
                got: threshold,
            });
        }
        if threshold > total_stake {
            return Err(TrustBaseError::QuorumTooHigh {
                max: total_stake,
                got: threshold,
            });
        }

        Ok(Self {
            version: ROOT_TRUST_BASE_VERSION,
            epoch,
            root_nodes,
            quorum_threshold: threshold,
        })
    }

    /// Number of root validators.
    pub fn size(&self) -> usize {
        self.root_nodes.len()
    }

    /// Total staked weight.
    pub fn total_stake(&self) -> u64 {
        self.root_nodes.values().map(|info| info.stake).sum()
    }

    /// Staked weight required for a valid seal.
    pub fn quorum_threshold(&self) -> u64 {
        self.quorum_threshold
    }

    /// Look up a validator.
    pub fn node_info(&self, node_id: &str) -> Option<&NodeInfo> {
        self.root_nodes.get(node_id)
    }

    /// Verify one validator's signature, returning its stake on success.
    pub fn verify_signature(
        &self,
        node_id: &str,
        message: &[u8],
        signature: &Signature,
    ) -> Result<u64, TrustBaseError> {
        let info = self
            .node_info(node_id)
            .ok_or_else(|| TrustBaseError::UnknownNode {
                node_id: node_id.to_string(),
            })?;
        let verifier = info.verifier().map_err(PartitionError::from)?;
        if !verifier.verify(message, signature) {
            return Err(TrustBaseError::SignatureVerification {
                node_id: node_id.to_string(),
            });
        }
        Ok(info.stake)
    }
}

/// Errors from trust base construction and signature checks.
#[derive(Debug, thiserror::Error)]
pub enum TrustBaseError {
    /// Requested quorum threshold is below the two-thirds minimum.
    #[error("quorum threshold must be at least '2/3+1' (min threshold {min} got {got})")]
    QuorumTooLow {
        /// Minimum admissible threshold.
        min: u64,
        /// The rejected threshold.
        got: u64,
    },

    /// Requested quorum threshold exceeds the total stake.
    #[error("quorum threshold cannot exceed the total staked amount (max threshold {max} got {got})")]
    QuorumTooHigh {
        /// Maximum admissible threshold.
        max: u64,
        /// The rejected threshold.
        got: u64,
    },

    /// Node is not part of the trust base.
    #[error("node {node_id} is not part of the trust base")]
    UnknownNode {
        /// The unknown node.
        node_id: String,
    },

    /// Signature does not verify under the node's key.
    #[error("signature verification failed for node {node_id}")]
    SignatureVerification {
        /// The node whose signature failed.
        node_id: String,
    },

    /// A validator record is invalid.
    #[error(transparent)]
    Node(#[from] PartitionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    fn partition_base(n: usize) -> PartitionTrustBase {
        PartitionTrustBase::new((0..n).map(|i| {
            let keypair = KeyPair::generate();
            (format!("{}", i + 1), keypair.public_key())
        }))
    }

    fn root_infos(n: usize) -> Vec<NodeInfo> {
        (0..n)
            .map(|i| NodeInfo {
                node_id: format!("test{}", i + 1),
                sig_key: KeyPair::generate().public_key().encode_compressed().to_vec(),
                stake: 1,
            })
            .collect()
    }

    #[test]
    fn test_partition_quorum_arithmetic() {
        for (n, quorum) in [(1, 1), (2, 2), (3, 2), (4, 3), (5, 3)] {
            let base = partition_base(n);
            assert_eq!(base.size(), n);
            assert_eq!(base.quorum(), quorum, "n = {}", n);
            assert_eq!(base.max_objections(), n - quorum, "n = {}", n);
        }
    }

    #[test]
    fn test_root_default_threshold() {
        let base = RootTrustBase::new(0, root_infos(3), None).unwrap();
        assert_eq!(base.quorum_threshold(), 3);
        assert_eq!(base.total_stake(), 3);

        let base = RootTrustBase::new(0, root_infos(4), None).unwrap();
        assert_eq!(base.quorum_threshold(), 3);
    }

    #[test]
    fn test_root_threshold_too_low() {
        let err = RootTrustBase::new(0, root_infos(3), Some(2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "quorum threshold must be at least '2/3+1' (min threshold 3 got 2)"
        );
    }

    #[test]
    fn test_root_threshold_too_high() {
        let err = RootTrustBase::new(0, root_infos(3), Some(4)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "quorum threshold cannot exceed the total staked amount (max threshold 3 got 4)"
        );
    }

    #[test]
    fn test_verify_signature_accumulates_stake() {
        let keypair = KeyPair::generate();
        let info = NodeInfo {
            node_id: "test1".to_string(),
            sig_key: keypair.public_key().encode_compressed().to_vec(),
            stake: 1,
        };
        let base = RootTrustBase::new(0, [info], None).unwrap();

        let signature = keypair.sign(b"payload");
        assert_eq!(
            base.verify_signature("test1", b"payload", &signature).unwrap(),
            1
        );
        assert!(matches!(
            base.verify_signature("test2", b"payload", &signature),
            Err(TrustBaseError::UnknownNode { .. })
        ));
        assert!(matches!(
            base.verify_signature("test1", b"other", &signature),
            Err(TrustBaseError::SignatureVerification { .. })
        ));
    }
}
