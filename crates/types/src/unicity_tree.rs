//! Unicity tree: binds every partition's shard tree root into one global
//! root hash.

use crate::{build_merkle_tree_with_proofs, codec, MerkleProof};
use crate::{Hash, HashAlgorithm, PartitionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current unicity tree certificate version.
pub const UNICITY_TREE_CERTIFICATE_VERSION: u32 = 1;

/// One partition's leaf in the unicity tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicityTreeData {
    /// The partition being bound.
    pub partition_id: PartitionId,

    /// Root of the partition's shard tree.
    pub shard_tree_root: Hash,

    /// Hash of the partition's description record.
    pub pdr_hash: Hash,
}

impl UnicityTreeData {
    /// Canonical leaf hash for this partition.
    pub fn leaf_hash(&self, algorithm: HashAlgorithm) -> Hash {
        codec::hash_value(algorithm, self)
            .expect("unicity tree data serialization should never fail")
    }
}

/// Per-partition certificate: the inclusion proof of the partition's leaf in
/// the unicity tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicityTreeCertificate {
    /// Version of this certificate layout.
    pub version: u32,

    /// The certified partition.
    pub partition_id: PartitionId,

    /// Inclusion proof for the partition's leaf.
    pub proof: MerkleProof,
}

impl UnicityTreeCertificate {
    /// Verify that `data` is the leaf this certificate binds to `root`.
    pub fn verify(
        &self,
        data: &UnicityTreeData,
        root: &Hash,
        algorithm: HashAlgorithm,
    ) -> Result<(), UnicityTreeError> {
        if self.partition_id != data.partition_id {
            return Err(UnicityTreeError::PartitionMismatch {
                expected: data.partition_id,
                got: self.partition_id,
            });
        }
        if !self.proof.verify(&data.leaf_hash(algorithm), root, algorithm) {
            return Err(UnicityTreeError::ProofVerification {
                partition_id: self.partition_id,
            });
        }
        Ok(())
    }
}

/// A fully built unicity tree over all partitions of one root round.
#[derive(Debug, Clone)]
pub struct UnicityTree {
    root: Hash,
    certificates: BTreeMap<PartitionId, UnicityTreeCertificate>,
}

impl UnicityTree {
    /// Build the tree over per-partition leaves.
    ///
    /// The leaves must be sorted strictly ascending by partition id so the
    /// tree layout is deterministic across validators.
    pub fn build(
        leaves: &[UnicityTreeData],
        algorithm: HashAlgorithm,
    ) -> Result<Self, UnicityTreeError> {
        if leaves.is_empty() {
            return Err(UnicityTreeError::NoPartitions);
        }
        for pair in leaves.windows(2) {
            if pair[0].partition_id >= pair[1].partition_id {
                return Err(UnicityTreeError::UnsortedPartitions {
                    first: pair[0].partition_id,
                    second: pair[1].partition_id,
                });
            }
        }

        let leaf_hashes: Vec<Hash> = leaves.iter().map(|l| l.leaf_hash(algorithm)).collect();
        let (root, proofs) = build_merkle_tree_with_proofs(&leaf_hashes, algorithm);

        let certificates = leaves
            .iter()
            .zip(proofs)
            .map(|(leaf, proof)| {
                (
                    leaf.partition_id,
                    UnicityTreeCertificate {
                        version: UNICITY_TREE_CERTIFICATE_VERSION,
                        partition_id: leaf.partition_id,
                        proof,
                    },
                )
            })
            .collect();

        Ok(Self { root, certificates })
    }

    /// The global unicity tree root.
    pub fn root(&self) -> Hash {
        self.root
    }

    /// The certificate for one partition, if it is in the tree.
    pub fn certificate(&self, partition_id: PartitionId) -> Option<&UnicityTreeCertificate> {
        self.certificates.get(&partition_id)
    }
}

/// Errors from unicity tree construction and verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnicityTreeError {
    /// No partition leaves were provided.
    #[error("unicity tree has no partitions")]
    NoPartitions,

    /// Leaves were not sorted strictly ascending by partition id.
    #[error("partitions are not sorted: {first} precedes {second}")]
    UnsortedPartitions {
        /// Partition id appearing first.
        first: PartitionId,
        /// Partition id appearing second.
        second: PartitionId,
    },

    /// Certificate names a different partition than the leaf data.
    #[error("certificate is for partition {got}, expected {expected}")]
    PartitionMismatch {
        /// Partition the caller asked about.
        expected: PartitionId,
        /// Partition inside the certificate.
        got: PartitionId,
    },

    /// Inclusion proof does not reach the root.
    #[error("unicity tree proof verification failed for partition {partition_id}")]
    ProofVerification {
        /// The partition whose proof failed.
        partition_id: PartitionId,
    },
}
