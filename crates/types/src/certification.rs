//! Block certification requests: signed proposals by partition nodes.

use crate::{codec, InputRecord, InputRecordError, PartitionId, PublicKey, ShardId, Signature};
use crate::{Hash, HashAlgorithm, KeyPair};
use serde::{Deserialize, Serialize};

/// A partition node's signed proposal for the next input record of its
/// partition shard.
///
/// The signature covers the canonical encoding of every field preceding it.
/// The input record is optional only because it can be absent on the wire;
/// a request without one never validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCertificationRequest {
    /// Partition this request certifies.
    pub partition_id: PartitionId,

    /// Shard within the partition.
    pub shard_id: ShardId,

    /// Identifier of the proposing node.
    pub node_id: String,

    /// The proposed input record.
    pub input_record: Option<InputRecord>,

    /// Node signature over the preceding fields.
    pub signature: Signature,
}

/// Signed payload: every field of the request except the signature.
#[derive(Serialize)]
struct SigningPayload<'a> {
    partition_id: PartitionId,
    shard_id: &'a ShardId,
    node_id: &'a str,
    input_record: &'a Option<InputRecord>,
}

impl BlockCertificationRequest {
    /// Canonical bytes covered by the signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let payload = SigningPayload {
            partition_id: self.partition_id,
            shard_id: &self.shard_id,
            node_id: &self.node_id,
            input_record: &self.input_record,
        };
        codec::encode(&payload).expect("certification request serialization should never fail")
    }

    /// Sign the request with the node's key pair.
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.signature = keypair.sign(&self.signing_bytes());
    }

    /// Validate the request against the proposing node's verification key.
    pub fn validate(&self, verifier: &PublicKey) -> Result<(), RequestError> {
        if !self.partition_id.is_valid() {
            return Err(RequestError::InvalidPartitionId);
        }
        if self.node_id.is_empty() {
            return Err(RequestError::NodeIdIsEmpty);
        }
        let input_record = self.input_record()?;
        input_record.validate()?;
        if !verifier.verify(&self.signing_bytes(), &self.signature) {
            return Err(RequestError::SignatureVerification {
                node_id: self.node_id.clone(),
            });
        }
        Ok(())
    }

    /// The proposed input record, or an error if absent.
    pub fn input_record(&self) -> Result<&InputRecord, RequestError> {
        self.input_record
            .as_ref()
            .ok_or(RequestError::InputRecordIsNil)
    }

    /// Fingerprint of the proposed input record.
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Result<Hash, RequestError> {
        Ok(self.input_record()?.fingerprint(algorithm))
    }
}

/// Errors from certification request validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The request itself is absent.
    #[error("block certification request is nil")]
    RequestIsNil,

    /// The request carries no input record.
    #[error("input record is nil")]
    InputRecordIsNil,

    /// Partition identifier is unassigned.
    #[error("invalid partition identifier")]
    InvalidPartitionId,

    /// Node identifier is empty.
    #[error("node identifier is empty")]
    NodeIdIsEmpty,

    /// Signature does not verify under the node's key.
    #[error("signature verification failed for node {node_id}")]
    SignatureVerification {
        /// The node whose signature failed.
        node_id: String,
    },

    /// The embedded input record is invalid.
    #[error(transparent)]
    InputRecord(#[from] InputRecordError),
}
