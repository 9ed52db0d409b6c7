//! Technical records: derived per-round metadata published alongside each
//! certified input record.

use crate::{codec, Hash, HashAlgorithm, Hasher, InputRecord, CBOR_EMPTY_MAP};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hash of the canonical encoding of the empty statistical record.
///
/// The statistical record is empty at genesis, so its hash is fixed and
/// cached as a constant instead of being recomputed.
pub const EMPTY_STAT_RECORD_HASH: Hash = Hash::new([
    0x24, 0xee, 0x26, 0xf4, 0xaa, 0x45, 0x48, 0x5f, 0x53, 0xaa, 0xb4, 0x77, 0x57, 0xd0, 0xb9,
    0x71, 0x99, 0xa3, 0xd9, 0x5f, 0x50, 0xcb, 0x97, 0x9c, 0x38, 0x3b, 0x7e, 0x50, 0x24, 0xf9,
    0x21, 0xff,
]);

/// Per-round metadata derived from a certified input record: the next round
/// number, the designated leader and the statistical and fee commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalRecord {
    /// Next partition round number.
    pub round: u64,

    /// Partition epoch.
    pub epoch: u64,

    /// Designated leader for the next round.
    pub leader: String,

    /// Hash of the statistical record.
    pub stat_hash: Hash,

    /// Hash of the fee record for the current node set.
    pub fee_hash: Hash,
}

impl TechnicalRecord {
    /// Derive the technical record for the round following `input_record`.
    ///
    /// `node_ids` is the partition's node list in its stable (sorted) order;
    /// the first entry becomes the leader.
    pub fn new(
        input_record: &InputRecord,
        node_ids: &[String],
        algorithm: HashAlgorithm,
    ) -> Result<Self, TechnicalRecordError> {
        let leader = node_ids.first().ok_or(TechnicalRecordError::EmptyNodeList)?;
        Ok(Self {
            round: input_record.round_number + 1,
            epoch: input_record.epoch,
            leader: leader.clone(),
            stat_hash: EMPTY_STAT_RECORD_HASH,
            fee_hash: fee_hash(node_ids, algorithm),
        })
    }

    /// Canonical hash of the record, embedded into shard tree leaves.
    pub fn hash(&self, algorithm: HashAlgorithm) -> Hash {
        codec::hash_value(algorithm, self)
            .expect("technical record serialization should never fail")
    }
}

/// Hash of the zero-fee map over the given node set.
///
/// The preceding fee record is empty, so its literal empty-map marker is
/// written first, followed by the canonical encoding of `{node_id -> 0}`.
fn fee_hash(node_ids: &[String], algorithm: HashAlgorithm) -> Hash {
    let fees: BTreeMap<&str, u64> = node_ids.iter().map(|id| (id.as_str(), 0)).collect();
    let mut hasher = Hasher::new(algorithm);
    hasher.write_raw(&CBOR_EMPTY_MAP);
    hasher
        .write(&fees)
        .expect("fee map serialization should never fail");
    hasher.finish()
}

/// Errors from technical record derivation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TechnicalRecordError {
    /// No nodes to derive a leader from.
    #[error("node list is empty")]
    EmptyNodeList,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::INPUT_RECORD_VERSION;

    fn test_record() -> InputRecord {
        InputRecord {
            version: INPUT_RECORD_VERSION,
            previous_hash: vec![0],
            hash: vec![1],
            block_hash: Some(vec![2]),
            summary_value: vec![],
            round_number: 4,
            epoch: 2,
            timestamp: 1_735_689_600,
            sum_of_earned_fees: 0,
        }
    }

    fn node_ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_round_and_leader() {
        let tr = TechnicalRecord::new(
            &test_record(),
            &node_ids(&["1", "2", "3"]),
            HashAlgorithm::Sha256,
        )
        .unwrap();

        assert_eq!(tr.round, 5);
        assert_eq!(tr.epoch, 2);
        assert_eq!(tr.leader, "1");
        assert_eq!(tr.stat_hash, EMPTY_STAT_RECORD_HASH);
    }

    #[test]
    fn test_empty_node_list() {
        let err = TechnicalRecord::new(&test_record(), &[], HashAlgorithm::Sha256).unwrap_err();
        assert_eq!(err.to_string(), "node list is empty");
    }

    #[test]
    fn test_stat_hash_constant() {
        assert_eq!(
            EMPTY_STAT_RECORD_HASH.to_hex(),
            "24ee26f4aa45485f53aab47757d0b97199a3d95f50cb979c383b7e5024f921ff"
        );
    }

    #[test]
    fn test_fee_hash_depends_on_node_set() {
        let one = fee_hash(&node_ids(&["1"]), HashAlgorithm::Sha256);
        let two = fee_hash(&node_ids(&["1", "2"]), HashAlgorithm::Sha256);
        assert_ne!(one, two);
        assert_eq!(one, fee_hash(&node_ids(&["1"]), HashAlgorithm::Sha256));
    }

    #[test]
    fn test_record_hash_covers_leader() {
        let base = TechnicalRecord::new(
            &test_record(),
            &node_ids(&["1", "2"]),
            HashAlgorithm::Sha256,
        )
        .unwrap();
        let mut other = base.clone();
        other.leader = "2".to_string();

        assert_ne!(
            base.hash(HashAlgorithm::Sha256),
            other.hash(HashAlgorithm::Sha256)
        );
    }
}
