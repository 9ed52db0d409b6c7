//! Root genesis document types and end-to-end validation.

use crate::config::{validate_timing, ConfigError};
use keystone_types::{
    codec, CertificateError, HashAlgorithm, InputRecord, KeyPair, NodeInfo,
    PartitionDescriptionRecord, PartitionError, PartitionId, PartitionNode, PartitionTrustBase,
    PublicKey, RootTrustBase, ShardTreeError, Signature, TechnicalRecordError, TrustBaseError,
    UnicityCertificate, UnicityTreeError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current root genesis document version.
pub const ROOT_GENESIS_VERSION: u32 = 1;

/// Current consensus parameters version.
pub const CONSENSUS_PARAMS_VERSION: u32 = 1;

/// Current genesis partition record version.
pub const GENESIS_PARTITION_VERSION: u32 = 1;

/// Root-chain consensus parameters, co-signed by every root validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Version of this record layout.
    pub version: u32,

    /// Number of root validators expected to sign the genesis.
    pub total_root_validators: u32,

    /// Target block rate, milliseconds.
    pub block_rate_ms: u32,

    /// Consensus timeout, milliseconds.
    pub consensus_timeout_ms: u32,

    /// Hash algorithm for every tree and seal.
    pub hash_algorithm: HashAlgorithm,

    /// Accumulated signatures keyed by root validator node id.
    pub signatures: BTreeMap<String, Signature>,
}

/// Signed payload: every field of the params except the signature map.
#[derive(Serialize)]
struct SigningPayload {
    version: u32,
    total_root_validators: u32,
    block_rate_ms: u32,
    consensus_timeout_ms: u32,
    hash_algorithm: HashAlgorithm,
}

impl ConsensusParams {
    /// Canonical bytes covered by every signature in the map.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let payload = SigningPayload {
            version: self.version,
            total_root_validators: self.total_root_validators,
            block_rate_ms: self.block_rate_ms,
            consensus_timeout_ms: self.consensus_timeout_ms,
            hash_algorithm: self.hash_algorithm,
        };
        codec::encode(&payload).expect("consensus params serialization should never fail")
    }

    /// Add `node_id`'s signature.
    pub fn sign(&mut self, node_id: &str, keypair: &KeyPair) {
        let signature = keypair.sign(&self.signing_bytes());
        self.signatures.insert(node_id.to_string(), signature);
    }

    /// Check the parameter values themselves.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_root_validators < 1 {
            return Err(ConfigError::InvalidNumberOfRootValidators);
        }
        validate_timing(self.block_rate_ms, self.consensus_timeout_ms)
    }
}

/// The root record of a genesis document: validator list plus signed
/// consensus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisRootRecord {
    /// Version of this record layout.
    pub version: u32,

    /// Root validators that have co-signed so far.
    pub root_validators: Vec<NodeInfo>,

    /// The co-signed consensus parameters.
    pub consensus: ConsensusParams,
}

/// One partition's slice of the genesis document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisPartitionRecord {
    /// Version of this record layout.
    pub version: u32,

    /// The partition's validator nodes, sorted by node id.
    pub nodes: Vec<PartitionNode>,

    /// The partition's unicity certificate, attached once the unicity tree
    /// is sealed.
    pub certificate: Option<UnicityCertificate>,

    /// The partition's description record.
    pub partition_description: PartitionDescriptionRecord,
}

impl GenesisPartitionRecord {
    /// Partition id shorthand.
    pub fn partition_id(&self) -> PartitionId {
        self.partition_description.partition_id
    }

    /// Validate the nodes of this partition against each other.
    ///
    /// Every node must be individually valid, describe the same partition,
    /// and propose an equivalent input record.
    pub fn validate(&self) -> Result<(), GenesisError> {
        let partition_id = self.partition_id();
        self.partition_description.validate()?;
        let first = self.nodes.first().ok_or(GenesisError::EmptyPartition {
            partition_id,
        })?;

        let reference = first.input_record()?;
        for node in &self.nodes {
            node.validate()?;
            if node.partition_description != self.partition_description {
                return Err(GenesisError::DescriptionMismatch {
                    partition_id,
                    node_id: node.node_id.clone(),
                });
            }
            if node.input_record()? != reference {
                return Err(GenesisError::InputRecordMismatch {
                    partition_id,
                    node_id: node.node_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// The partition's certificate, or an error if not yet attached.
    pub fn certificate(&self) -> Result<&UnicityCertificate, GenesisError> {
        self.certificate
            .as_ref()
            .ok_or(GenesisError::MissingCertificate {
                partition_id: self.partition_id(),
            })
    }

    /// The representative input record proposed by this partition.
    pub fn input_record(&self) -> Result<&InputRecord, GenesisError> {
        let first = self.nodes.first().ok_or(GenesisError::EmptyPartition {
            partition_id: self.partition_id(),
        })?;
        Ok(first.input_record()?)
    }

    /// Node ids in their stored (sorted) order.
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.node_id.clone()).collect()
    }

    /// Trust base over this partition's validators.
    pub fn trust_base(&self) -> Result<PartitionTrustBase, GenesisError> {
        let mut verifiers = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            verifiers.push((node.node_id.clone(), node.verifier().map_err(PartitionError::from)?));
        }
        Ok(PartitionTrustBase::new(verifiers))
    }
}

/// The assembled root genesis document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootGenesis {
    /// Version of this document layout.
    pub version: u32,

    /// Root record: validators and consensus parameters.
    pub root: GenesisRootRecord,

    /// Partition records sorted ascending by partition id.
    pub partitions: Vec<GenesisPartitionRecord>,
}

impl RootGenesis {
    /// Number of signatures accumulated on the consensus parameters.
    pub fn signature_count(&self) -> usize {
        self.root.consensus.signatures.len()
    }

    /// Self-consistency check.
    ///
    /// Accepts partially signed documents: every signature present must
    /// verify and every certificate must verify against the trust base of
    /// the validators listed so far, but the signature count is not required
    /// to reach the final committee size (see [`RootGenesis::verify`]).
    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.version != ROOT_GENESIS_VERSION {
            return Err(GenesisError::UnsupportedVersion { got: self.version });
        }

        // Root validators: non-empty, unique, individually valid.
        if self.root.root_validators.is_empty() {
            return Err(GenesisError::NoRootValidators);
        }
        let mut seen = BTreeSet::new();
        for info in &self.root.root_validators {
            info.validate()?;
            if !seen.insert(info.node_id.as_str()) {
                return Err(GenesisError::DuplicateRootValidator {
                    node_id: info.node_id.clone(),
                });
            }
        }

        // Consensus parameters and their signatures.
        self.root.consensus.validate()?;
        if self.root.consensus.signatures.is_empty() {
            return Err(GenesisError::NoConsensusSignatures);
        }
        let message = self.root.consensus.signing_bytes();
        for (node_id, signature) in &self.root.consensus.signatures {
            let verifier = self.validator_key(node_id)?;
            if !verifier.verify(&message, signature) {
                return Err(GenesisError::ConsensusSignatureVerification {
                    node_id: node_id.clone(),
                });
            }
        }

        // Partitions: present, strictly ascending, each internally valid and
        // certified.
        if self.partitions.is_empty() {
            return Err(GenesisError::NoPartitions);
        }
        for pair in self.partitions.windows(2) {
            let (first, second) = (pair[0].partition_id(), pair[1].partition_id());
            if first == second {
                return Err(GenesisError::DuplicatePartition { partition_id: first });
            }
            if first > second {
                return Err(GenesisError::PartitionsNotSorted { first, second });
            }
        }

        let trust_base = self.trust_base_for_validation()?;
        let algorithm = self.root.consensus.hash_algorithm;
        for partition in &self.partitions {
            partition.validate()?;
            let certificate = partition.certificate()?;
            let pdr_hash = partition.partition_description.hash(algorithm);
            certificate.validate(&trust_base, algorithm, partition.partition_id(), &pdr_hash)?;
            if &certificate.input_record != partition.input_record()? {
                return Err(GenesisError::CertificateRecordMismatch {
                    partition_id: partition.partition_id(),
                });
            }
        }
        Ok(())
    }

    /// Full verification: [`RootGenesis::validate`] plus the requirement
    /// that a two-thirds quorum of the final committee has signed.
    pub fn verify(&self) -> Result<(), GenesisError> {
        self.validate()?;
        let total = self.root.consensus.total_root_validators as usize;
        let needed = total * 2 / 3 + 1;
        let got = self.signature_count();
        if got < needed {
            return Err(GenesisError::NotSignedByQuorum { got, needed });
        }
        Ok(())
    }

    /// Build the root trust base for a given epoch from this document.
    ///
    /// Every validator carries stake 1. `quorum_threshold` overrides the
    /// default two-thirds threshold within its admissible range.
    pub fn generate_trust_base(
        &self,
        epoch: u64,
        quorum_threshold: Option<u64>,
    ) -> Result<RootTrustBase, TrustBaseError> {
        RootTrustBase::new(
            epoch,
            self.root.root_validators.iter().cloned(),
            quorum_threshold,
        )
    }

    /// Derive the per-partition bootstrap records.
    pub fn partition_genesis(&self) -> Result<Vec<PartitionGenesis>, GenesisError> {
        self.partitions
            .iter()
            .map(|partition| {
                Ok(PartitionGenesis {
                    partition_description: partition.partition_description.clone(),
                    certificate: partition.certificate()?.clone(),
                    validators: partition
                        .nodes
                        .iter()
                        .map(|node| NodeInfo {
                            node_id: node.node_id.clone(),
                            sig_key: node.sig_key.clone(),
                            stake: 1,
                        })
                        .collect(),
                    root_validators: self.root.root_validators.clone(),
                })
            })
            .collect()
    }

    /// Trust base over the validators listed so far, with the default
    /// two-thirds quorum.
    fn trust_base_for_validation(&self) -> Result<RootTrustBase, GenesisError> {
        Ok(RootTrustBase::new(
            0,
            self.root.root_validators.iter().cloned(),
            None,
        )?)
    }

    /// Look up a listed validator's key.
    fn validator_key(&self, node_id: &str) -> Result<PublicKey, GenesisError> {
        let info = self
            .root
            .root_validators
            .iter()
            .find(|info| info.node_id == node_id)
            .ok_or_else(|| GenesisError::UnknownSigner {
                node_id: node_id.to_string(),
            })?;
        Ok(info.verifier().map_err(PartitionError::from)?)
    }
}

/// Per-partition bootstrap record handed to partition nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionGenesis {
    /// The partition's description record.
    pub partition_description: PartitionDescriptionRecord,

    /// The partition's genesis unicity certificate.
    pub certificate: UnicityCertificate,

    /// The partition's validators.
    pub validators: Vec<NodeInfo>,

    /// The root committee the partition must trust.
    pub root_validators: Vec<NodeInfo>,
}

/// Errors from genesis assembly, validation, signing and merging.
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    /// Document carries an unknown version tag.
    #[error("unsupported root genesis version {got}")]
    UnsupportedVersion {
        /// The rejected version.
        got: u32,
    },

    /// No root validators are listed.
    #[error("root genesis has no root validators")]
    NoRootValidators,

    /// The same root validator is listed twice.
    #[error("duplicate root validator node id {node_id}")]
    DuplicateRootValidator {
        /// The repeated node id.
        node_id: String,
    },

    /// Consensus parameters carry no signatures.
    #[error("consensus parameters are not signed")]
    NoConsensusSignatures,

    /// A consensus signature belongs to an unlisted validator.
    #[error("consensus parameters signed by unknown validator {node_id}")]
    UnknownSigner {
        /// The unknown signer.
        node_id: String,
    },

    /// A consensus signature does not verify.
    #[error("consensus parameter signature verification failed for node {node_id}")]
    ConsensusSignatureVerification {
        /// The node whose signature failed.
        node_id: String,
    },

    /// No partitions are listed.
    #[error("root genesis has no partitions")]
    NoPartitions,

    /// Two partitions share an id.
    #[error("duplicate partition identifier {partition_id}")]
    DuplicatePartition {
        /// The repeated partition id.
        partition_id: PartitionId,
    },

    /// Partition records are out of order.
    #[error("partitions are not sorted: {first} precedes {second}")]
    PartitionsNotSorted {
        /// Partition id appearing first.
        first: PartitionId,
        /// Partition id appearing second.
        second: PartitionId,
    },

    /// A partition lists no nodes.
    #[error("partition {partition_id} has no nodes")]
    EmptyPartition {
        /// The empty partition.
        partition_id: PartitionId,
    },

    /// A node describes its partition differently than the record.
    #[error("invalid partition nodes: partition {partition_id} node {node_id} partition description is different")]
    DescriptionMismatch {
        /// The partition being validated.
        partition_id: PartitionId,
        /// The disagreeing node.
        node_id: String,
    },

    /// A node proposes a different input record than its peers.
    #[error("invalid partition nodes: partition {partition_id} node {node_id} input record is different")]
    InputRecordMismatch {
        /// The partition being validated.
        partition_id: PartitionId,
        /// The disagreeing node.
        node_id: String,
    },

    /// A partition has no certificate attached.
    #[error("certificate is missing for partition {partition_id}")]
    MissingCertificate {
        /// The uncertified partition.
        partition_id: PartitionId,
    },

    /// A certificate binds a different input record than the nodes proposed.
    #[error("partition {partition_id} certificate input record differs from the node proposals")]
    CertificateRecordMismatch {
        /// The affected partition.
        partition_id: PartitionId,
    },

    /// A validator tried to sign twice.
    #[error("genesis is already signed by node id {node_id}")]
    AlreadySignedBy {
        /// The repeat signer.
        node_id: String,
    },

    /// The document already carries the full committee's signatures.
    #[error("genesis is already signed by maximum number of root nodes")]
    MaxSigned,

    /// Too few signatures for the final committee.
    #[error("root genesis is signed by {got} of {needed} required root validators")]
    NotSignedByQuorum {
        /// Signatures present.
        got: usize,
        /// Signatures required.
        needed: usize,
    },

    /// Documents being merged disagree on consensus parameters.
    #[error("consensus parameters do not match")]
    ConsensusMismatch,

    /// Documents being merged list different partition counts.
    #[error("partition count mismatch: expected {expected}, got {got}")]
    PartitionCountMismatch {
        /// Count in the first document.
        expected: usize,
        /// Count in the mismatching document.
        got: usize,
    },

    /// Documents being merged disagree on a partition slot.
    #[error("partition {partition_id} differs between root genesis documents")]
    MergePartitionMismatch {
        /// The disagreeing slot.
        partition_id: PartitionId,
    },

    /// Nothing to merge.
    #[error("no root genesis documents to merge")]
    NoDocuments,

    /// Configuration or parameter values are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A partition node record is invalid.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// Trust base construction failed.
    #[error(transparent)]
    TrustBase(#[from] TrustBaseError),

    /// A certificate failed verification.
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// Unicity tree construction failed.
    #[error(transparent)]
    UnicityTree(#[from] UnicityTreeError),

    /// Shard tree construction failed.
    #[error(transparent)]
    ShardTree(#[from] ShardTreeError),

    /// Technical record derivation failed.
    #[error(transparent)]
    TechnicalRecord(#[from] TechnicalRecordError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::new_root_genesis;
    use crate::testutil::{partition_node, test_record};

    fn generated() -> RootGenesis {
        let root_key = KeyPair::generate();
        let node_key = KeyPair::generate();
        let nodes = vec![
            partition_node(1, "node-1", &node_key, test_record(&[1])),
            partition_node(
                2,
                "node-1",
                &KeyPair::generate(),
                test_record(&[2]),
            ),
        ];
        let (root_genesis, _) = new_root_genesis("test1", &root_key, nodes, &[]).unwrap();
        root_genesis
    }

    #[test]
    fn test_unsorted_partitions_rejected() {
        let mut root_genesis = generated();
        root_genesis.partitions.swap(0, 1);
        assert!(matches!(
            root_genesis.validate().unwrap_err(),
            GenesisError::PartitionsNotSorted { .. }
        ));
    }

    #[test]
    fn test_missing_certificate_rejected() {
        let mut root_genesis = generated();
        root_genesis.partitions[0].certificate = None;
        assert_eq!(
            root_genesis.validate().unwrap_err().to_string(),
            "certificate is missing for partition 1"
        );
    }

    #[test]
    fn test_foreign_consensus_signature_rejected() {
        let mut root_genesis = generated();
        let stranger = KeyPair::generate();
        root_genesis.root.consensus.sign("stranger", &stranger);
        assert!(matches!(
            root_genesis.validate().unwrap_err(),
            GenesisError::UnknownSigner { .. }
        ));
    }

    #[test]
    fn test_tampered_consensus_params_rejected() {
        let mut root_genesis = generated();
        root_genesis.root.consensus.block_rate_ms += 100;
        assert!(matches!(
            root_genesis.validate().unwrap_err(),
            GenesisError::ConsensusSignatureVerification { .. }
        ));
    }

    #[test]
    fn test_certificate_record_must_match_nodes() {
        let mut root_genesis = generated();
        let certificate = root_genesis.partitions[0].certificate.as_mut().unwrap();
        certificate.input_record = test_record(&[9]);
        // The swapped record breaks the commitment chain before the
        // cross-check is even reached.
        assert!(root_genesis.validate().is_err());
    }

    #[test]
    fn test_partition_genesis_carries_committee() {
        let root_genesis = generated();
        let partition_genesis = root_genesis.partition_genesis().unwrap();

        assert_eq!(partition_genesis.len(), 2);
        for record in &partition_genesis {
            assert_eq!(record.root_validators, root_genesis.root.root_validators);
            assert_eq!(record.validators.len(), 1);
        }
    }
}
