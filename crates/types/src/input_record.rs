//! Input records: the unit of partition state being certified.

use crate::{codec, Hash, HashAlgorithm};
use serde::{Deserialize, Serialize};

/// Current input record version.
pub const INPUT_RECORD_VERSION: u32 = 1;

/// A compact commitment to a partition's new state.
///
/// Partition validators propose the next input record of their partition in
/// block certification requests; the root chain certifies exactly one per
/// partition per round. Two records are equivalent only if every field
/// matches byte for byte. Records are immutable once signed into a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Version of this record layout.
    pub version: u32,

    /// Hash of the previously certified input record.
    #[serde(with = "serde_bytes")]
    pub previous_hash: Vec<u8>,

    /// Hash of the proposed input record state.
    #[serde(with = "serde_bytes")]
    pub hash: Vec<u8>,

    /// Hash of the partition block; absent when the round was empty.
    #[serde(with = "serde_bytes")]
    pub block_hash: Option<Vec<u8>>,

    /// Opaque partition-defined summary value.
    #[serde(with = "serde_bytes")]
    pub summary_value: Vec<u8>,

    /// Partition round number.
    pub round_number: u64,

    /// Partition epoch.
    pub epoch: u64,

    /// Unix timestamp of the proposed block.
    pub timestamp: u64,

    /// Total fees earned in this round.
    pub sum_of_earned_fees: u64,
}

impl InputRecord {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), InputRecordError> {
        if self.version != INPUT_RECORD_VERSION {
            return Err(InputRecordError::UnsupportedVersion {
                got: self.version,
            });
        }
        Ok(())
    }

    /// Canonical hash of the record, used to cluster certification requests
    /// that propose the same state.
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Hash {
        codec::hash_value(algorithm, self)
            .expect("input record serialization should never fail")
    }
}

/// Errors from input record validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputRecordError {
    /// Record carries an unknown version tag.
    #[error("unsupported input record version {got}")]
    UnsupportedVersion {
        /// The rejected version.
        got: u32,
    },
}
