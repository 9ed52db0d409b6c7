//! Partition description records and partition node identities.

use crate::{
    codec, BlockCertificationRequest, CryptoError, Hash, HashAlgorithm, InputRecord, NetworkId,
    PartitionId, PublicKey, RequestError, ShardId,
};
use serde::{Deserialize, Serialize};

/// Current partition node record version.
pub const PARTITION_NODE_VERSION: u32 = 1;

/// Current partition description record version.
pub const PARTITION_DESCRIPTION_VERSION: u32 = 1;

/// Static shape of a partition: identifiers, unit layout, timeouts and the
/// shard covering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDescriptionRecord {
    /// Version of this record layout.
    pub version: u32,

    /// Network this partition belongs to.
    pub network_id: NetworkId,

    /// Partition identifier, non-zero.
    pub partition_id: PartitionId,

    /// Byte length of unit type identifiers in this partition.
    pub type_id_len: u32,

    /// Byte length of unit identifiers in this partition.
    pub unit_id_len: u32,

    /// T2 timeout: how long the root chain waits for certification requests
    /// before certifying an empty round, in milliseconds.
    pub t2_timeout_ms: u32,

    /// The partition's shard covering. A single-shard partition lists the
    /// empty shard id.
    pub shard_ids: Vec<ShardId>,
}

impl PartitionDescriptionRecord {
    /// Check structural validity.
    pub fn validate(&self) -> Result<(), PartitionError> {
        if !self.partition_id.is_valid() {
            return Err(PartitionError::InvalidPartitionId);
        }
        if self.shard_ids.is_empty() {
            return Err(PartitionError::EmptyShardLayout {
                partition_id: self.partition_id,
            });
        }
        Ok(())
    }

    /// Canonical hash of the record.
    pub fn hash(&self, algorithm: HashAlgorithm) -> Hash {
        codec::hash_value(algorithm, self)
            .expect("partition description serialization should never fail")
    }
}

/// Static identity of one validator node inside a partition, as submitted to
/// the root chain at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionNode {
    /// Version of this record layout.
    pub version: u32,

    /// Node identifier, non-empty.
    pub node_id: String,

    /// Compressed secp256k1 signing key, exactly 33 bytes.
    #[serde(with = "serde_bytes")]
    pub sig_key: Vec<u8>,

    /// The node's initial block certification request, used during genesis.
    pub block_certification_request: Option<BlockCertificationRequest>,

    /// Description of the partition the node validates.
    pub partition_description: PartitionDescriptionRecord,
}

impl PartitionNode {
    /// Validate the node record: identity, key material, and the embedded
    /// certification request.
    pub fn validate(&self) -> Result<(), PartitionError> {
        if self.node_id.is_empty() {
            return Err(PartitionError::NodeIdIsEmpty);
        }
        let verifier = PublicKey::from_compressed(&self.sig_key)?;
        self.partition_description.validate()?;

        let request = self
            .block_certification_request
            .as_ref()
            .ok_or(RequestError::RequestIsNil)?;
        if request.node_id != self.node_id {
            return Err(PartitionError::RequestNodeMismatch {
                node_id: self.node_id.clone(),
                request_node_id: request.node_id.clone(),
            });
        }
        if request.partition_id != self.partition_description.partition_id {
            return Err(PartitionError::RequestPartitionMismatch {
                node_id: self.node_id.clone(),
                partition_id: self.partition_description.partition_id,
                request_partition_id: request.partition_id,
            });
        }
        request.validate(&verifier)?;
        Ok(())
    }

    /// The input record this node proposed at genesis.
    pub fn input_record(&self) -> Result<&InputRecord, PartitionError> {
        let request = self
            .block_certification_request
            .as_ref()
            .ok_or(RequestError::RequestIsNil)?;
        Ok(request.input_record()?)
    }

    /// The node's verification key.
    pub fn verifier(&self) -> Result<PublicKey, CryptoError> {
        PublicKey::from_compressed(&self.sig_key)
    }
}

/// Identity of one root validator: node id, signing key and stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node identifier, non-empty.
    pub node_id: String,

    /// Compressed secp256k1 signing key, exactly 33 bytes.
    #[serde(with = "serde_bytes")]
    pub sig_key: Vec<u8>,

    /// Stake weight. Root validators currently carry stake 1.
    pub stake: u64,
}

impl NodeInfo {
    /// Check identity and key material.
    pub fn validate(&self) -> Result<(), PartitionError> {
        if self.node_id.is_empty() {
            return Err(PartitionError::NodeIdIsEmpty);
        }
        PublicKey::from_compressed(&self.sig_key)?;
        Ok(())
    }

    /// The validator's verification key.
    pub fn verifier(&self) -> Result<PublicKey, CryptoError> {
        PublicKey::from_compressed(&self.sig_key)
    }
}

/// Errors from partition record validation.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    /// Node record is absent. Produced by consumers that decode node
    /// records from optional wire fields.
    #[error("partition node is nil")]
    PartitionNodeIsNil,

    /// Node identifier is empty.
    #[error("node identifier is empty")]
    NodeIdIsEmpty,

    /// Partition identifier is unassigned.
    #[error("invalid partition identifier")]
    InvalidPartitionId,

    /// Partition declares no shards.
    #[error("partition {partition_id} has an empty shard layout")]
    EmptyShardLayout {
        /// The offending partition.
        partition_id: PartitionId,
    },

    /// Embedded request was signed by a different node.
    #[error("node {node_id} certification request is signed by node {request_node_id}")]
    RequestNodeMismatch {
        /// The node record's identifier.
        node_id: String,
        /// The identifier inside the request.
        request_node_id: String,
    },

    /// Embedded request names a different partition.
    #[error(
        "node {node_id} of partition {partition_id} certification request names partition {request_partition_id}"
    )]
    RequestPartitionMismatch {
        /// The node record's identifier.
        node_id: String,
        /// Partition from the description record.
        partition_id: PartitionId,
        /// Partition from the request.
        request_partition_id: PartitionId,
    },

    /// Signing key is invalid.
    #[error(transparent)]
    SigKeyIsInvalid(#[from] CryptoError),

    /// Embedded certification request is invalid.
    #[error(transparent)]
    Request(#[from] RequestError),
}
