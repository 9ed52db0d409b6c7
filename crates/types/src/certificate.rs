//! Unicity certificates: the per-partition binding of an input record to a
//! sealed unicity tree root.

use crate::{
    Hash, HashAlgorithm, InputRecord, InputRecordError, PartitionId, RootTrustBase, SealError,
    ShardTreeCertificate, UnicitySeal, UnicityTreeCertificate, UnicityTreeData, UnicityTreeError,
};
use serde::{Deserialize, Serialize};

/// Current unicity certificate version.
pub const UNICITY_CERTIFICATE_VERSION: u32 = 1;

/// Certified binding of one partition's input record into the global root.
///
/// The chain of commitments runs leaf to seal: the input record and
/// technical record hash fix the shard tree leaf, the shard tree certificate
/// lifts it to the partition root, the unicity tree certificate lifts that
/// to the global root, and the seal carries the committee signatures over
/// the global root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicityCertificate {
    /// Version of this record layout.
    pub version: u32,

    /// The certified input record.
    pub input_record: InputRecord,

    /// Hash of the technical record published with this round.
    pub tr_hash: Hash,

    /// Path from the shard leaf to the partition's shard tree root.
    pub shard_tree_certificate: ShardTreeCertificate,

    /// Path from the partition's leaf to the unicity tree root.
    pub unicity_tree_certificate: UnicityTreeCertificate,

    /// The committee's seal over the unicity tree root.
    pub unicity_seal: UnicitySeal,
}

impl UnicityCertificate {
    /// Validate the full commitment chain for `partition_id`.
    ///
    /// `pdr_hash` is the hash of the partition's description record, which
    /// is bound into the unicity tree leaf alongside the shard tree root.
    pub fn validate(
        &self,
        trust_base: &RootTrustBase,
        algorithm: HashAlgorithm,
        partition_id: PartitionId,
        pdr_hash: &Hash,
    ) -> Result<(), CertificateError> {
        if self.version != UNICITY_CERTIFICATE_VERSION {
            return Err(CertificateError::UnsupportedVersion { got: self.version });
        }
        self.input_record.validate()?;

        let shard_tree_root =
            self.shard_tree_certificate
                .compute_root(&self.input_record, &self.tr_hash, algorithm);
        let leaf = UnicityTreeData {
            partition_id,
            shard_tree_root,
            pdr_hash: *pdr_hash,
        };
        self.unicity_tree_certificate
            .verify(&leaf, &self.unicity_seal.hash, algorithm)?;
        self.unicity_seal.verify(trust_base)?;
        Ok(())
    }
}

/// Errors from unicity certificate validation.
#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    /// Certificate carries an unknown version tag.
    #[error("unsupported unicity certificate version {got}")]
    UnsupportedVersion {
        /// The rejected version.
        got: u32,
    },

    /// The embedded input record is invalid.
    #[error(transparent)]
    InputRecord(#[from] InputRecordError),

    /// The unicity tree proof does not reach the sealed root.
    #[error(transparent)]
    UnicityTree(#[from] UnicityTreeError),

    /// The seal does not verify.
    #[error(transparent)]
    Seal(#[from] SealError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        KeyPair, NodeInfo, ShardId, ShardTree, ShardTreeInput, INPUT_RECORD_VERSION,
        UNICITY_SEAL_VERSION,
    };
    use crate::{UnicityTree, UnicityTreeData};
    use std::collections::BTreeMap;

    const ALG: HashAlgorithm = HashAlgorithm::Sha256;

    fn test_record(hash: &[u8]) -> InputRecord {
        InputRecord {
            version: INPUT_RECORD_VERSION,
            previous_hash: vec![0],
            hash: hash.to_vec(),
            block_hash: Some(vec![2]),
            summary_value: vec![],
            round_number: 1,
            epoch: 0,
            timestamp: 1_735_689_600,
            sum_of_earned_fees: 0,
        }
    }

    /// Build a complete single-partition certificate, sealed by one root
    /// validator.
    fn build_certificate() -> (UnicityCertificate, RootTrustBase, Hash) {
        let partition_id = PartitionId(1);
        let input_record = test_record(&[1]);
        let tr_hash = ALG.digest(b"technical record");
        let pdr_hash = ALG.digest(b"partition description");

        let shard_tree = ShardTree::build(
            &[ShardTreeInput {
                shard: ShardId::empty(),
                input_record: input_record.clone(),
                tr_hash,
            }],
            ALG,
        )
        .unwrap();

        let unicity_tree = UnicityTree::build(
            &[UnicityTreeData {
                partition_id,
                shard_tree_root: shard_tree.root(),
                pdr_hash,
            }],
            ALG,
        )
        .unwrap();

        let keypair = KeyPair::generate();
        let trust_base = RootTrustBase::new(
            0,
            [NodeInfo {
                node_id: "root1".to_string(),
                sig_key: keypair.public_key().encode_compressed().to_vec(),
                stake: 1,
            }],
            None,
        )
        .unwrap();

        let mut seal = UnicitySeal {
            version: UNICITY_SEAL_VERSION,
            root_chain_round_number: 1,
            timestamp: 1_735_689_600,
            previous_hash: ALG.digest(b"previous round"),
            hash: unicity_tree.root(),
            signatures: BTreeMap::new(),
        };
        seal.sign("root1", &keypair);

        let certificate = UnicityCertificate {
            version: UNICITY_CERTIFICATE_VERSION,
            input_record,
            tr_hash,
            shard_tree_certificate: shard_tree.certificate(&ShardId::empty()).unwrap(),
            unicity_tree_certificate: unicity_tree.certificate(partition_id).unwrap().clone(),
            unicity_seal: seal,
        };
        (certificate, trust_base, pdr_hash)
    }

    #[test]
    fn test_full_chain_validates() {
        let (certificate, trust_base, pdr_hash) = build_certificate();
        assert!(certificate
            .validate(&trust_base, ALG, PartitionId(1), &pdr_hash)
            .is_ok());
    }

    #[test]
    fn test_tampered_input_record_fails() {
        let (mut certificate, trust_base, pdr_hash) = build_certificate();
        certificate.input_record.sum_of_earned_fees = 99;

        assert!(matches!(
            certificate.validate(&trust_base, ALG, PartitionId(1), &pdr_hash),
            Err(CertificateError::UnicityTree(
                UnicityTreeError::ProofVerification { .. }
            ))
        ));
    }

    #[test]
    fn test_wrong_pdr_hash_fails() {
        let (certificate, trust_base, _) = build_certificate();
        let wrong = ALG.digest(b"other description");

        assert!(certificate
            .validate(&trust_base, ALG, PartitionId(1), &wrong)
            .is_err());
    }

    #[test]
    fn test_unsigned_seal_fails() {
        let (mut certificate, trust_base, pdr_hash) = build_certificate();
        certificate.unicity_seal.signatures.clear();

        assert!(matches!(
            certificate.validate(&trust_base, ALG, PartitionId(1), &pdr_hash),
            Err(CertificateError::Seal(SealError::NoSignatures))
        ));
    }
}
