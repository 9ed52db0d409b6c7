//! Unicity seals: the root committee's signed attestation of a unicity tree
//! root.

use crate::{codec, Hash, HashAlgorithm, KeyPair, RootTrustBase, Signature, TrustBaseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current unicity seal version.
pub const UNICITY_SEAL_VERSION: u32 = 1;

/// Root-chain round metadata hashed into a seal's previous-round link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    /// Root-chain round number.
    pub round_number: u64,

    /// Root-chain epoch.
    pub epoch: u64,

    /// Unix timestamp of the round.
    pub timestamp: u64,

    /// Round this one extends.
    pub parent_round_number: u64,

    /// Unicity tree root certified in this round.
    pub current_root_hash: Hash,
}

impl RoundInfo {
    /// Canonical hash of the round info.
    pub fn hash(&self, algorithm: HashAlgorithm) -> Hash {
        codec::hash_value(algorithm, self).expect("round info serialization should never fail")
    }
}

/// Signed attestation over a unicity tree root for one root-chain round.
///
/// Signatures accumulate as root validators co-sign; the seal is complete
/// once the staked weight of valid signatures reaches the trust base quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicitySeal {
    /// Version of this record layout.
    pub version: u32,

    /// Root-chain round this seal certifies.
    pub root_chain_round_number: u64,

    /// Unix timestamp of the round.
    pub timestamp: u64,

    /// Hash of the previous round's info record.
    pub previous_hash: Hash,

    /// The unicity tree root being attested.
    pub hash: Hash,

    /// Accumulated signatures keyed by root validator node id.
    pub signatures: BTreeMap<String, Signature>,
}

/// Signed payload: every field of the seal except the signature map.
#[derive(Serialize)]
struct SigningPayload {
    version: u32,
    root_chain_round_number: u64,
    timestamp: u64,
    previous_hash: Hash,
    hash: Hash,
}

impl UnicitySeal {
    /// Canonical bytes covered by every signature in the map.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let payload = SigningPayload {
            version: self.version,
            root_chain_round_number: self.root_chain_round_number,
            timestamp: self.timestamp,
            previous_hash: self.previous_hash,
            hash: self.hash,
        };
        codec::encode(&payload).expect("unicity seal serialization should never fail")
    }

    /// Add `node_id`'s signature to the seal.
    pub fn sign(&mut self, node_id: &str, keypair: &KeyPair) {
        let signature = keypair.sign(&self.signing_bytes());
        self.signatures.insert(node_id.to_string(), signature);
    }

    /// Verify the seal against the root trust base.
    ///
    /// Every signature present must verify, and the signers' combined stake
    /// must reach the trust base quorum threshold.
    pub fn verify(&self, trust_base: &RootTrustBase) -> Result<(), SealError> {
        if self.signatures.is_empty() {
            return Err(SealError::NoSignatures);
        }
        let message = self.signing_bytes();
        let mut signed_stake = 0u64;
        for (node_id, signature) in &self.signatures {
            signed_stake += trust_base.verify_signature(node_id, &message, signature)?;
        }
        if signed_stake < trust_base.quorum_threshold() {
            return Err(SealError::NoQuorum {
                got: signed_stake,
                needed: trust_base.quorum_threshold(),
            });
        }
        Ok(())
    }
}

/// Errors from unicity seal verification.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// The seal carries no signatures at all.
    #[error("unicity seal has no signatures")]
    NoSignatures,

    /// Combined signer stake is below the quorum threshold.
    #[error("unicity seal is not signed by quorum, signed stake {got} of required {needed}")]
    NoQuorum {
        /// Stake of the verified signatures.
        got: u64,
        /// Required quorum threshold.
        needed: u64,
    },

    /// A signature failed trust base verification.
    #[error(transparent)]
    TrustBase(#[from] TrustBaseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeInfo;

    const ALG: HashAlgorithm = HashAlgorithm::Sha256;

    fn committee(n: usize) -> (Vec<KeyPair>, RootTrustBase) {
        let keypairs: Vec<KeyPair> = (0..n).map(|_| KeyPair::generate()).collect();
        let infos = keypairs.iter().enumerate().map(|(i, keypair)| NodeInfo {
            node_id: format!("test{}", i + 1),
            sig_key: keypair.public_key().encode_compressed().to_vec(),
            stake: 1,
        });
        let trust_base = RootTrustBase::new(0, infos, None).unwrap();
        (keypairs, trust_base)
    }

    fn test_seal() -> UnicitySeal {
        UnicitySeal {
            version: UNICITY_SEAL_VERSION,
            root_chain_round_number: 1,
            timestamp: 1_735_689_600,
            previous_hash: ALG.digest(b"previous"),
            hash: ALG.digest(b"root"),
            signatures: BTreeMap::new(),
        }
    }

    #[test]
    fn test_round_info_hash_deterministic() {
        let info = RoundInfo {
            round_number: 1,
            epoch: 0,
            timestamp: 1_735_689_600,
            parent_round_number: 0,
            current_root_hash: ALG.digest(b"root"),
        };
        assert_eq!(info.hash(ALG), info.hash(ALG));
    }

    #[test]
    fn test_sign_and_verify_quorum() {
        let (keypairs, trust_base) = committee(3);
        let mut seal = test_seal();

        seal.sign("test1", &keypairs[0]);
        seal.sign("test2", &keypairs[1]);
        // Two of three: below the staked quorum of 3.
        assert!(matches!(
            seal.verify(&trust_base),
            Err(SealError::NoQuorum { got: 2, needed: 3 })
        ));

        seal.sign("test3", &keypairs[2]);
        assert!(seal.verify(&trust_base).is_ok());
    }

    #[test]
    fn test_verify_rejects_empty() {
        let (_, trust_base) = committee(1);
        assert!(matches!(
            test_seal().verify(&trust_base),
            Err(SealError::NoSignatures)
        ));
    }

    #[test]
    fn test_verify_rejects_unknown_signer() {
        let (keypairs, trust_base) = committee(1);
        let mut seal = test_seal();
        seal.sign("stranger", &keypairs[0]);

        assert!(matches!(
            seal.verify(&trust_base),
            Err(SealError::TrustBase(TrustBaseError::UnknownNode { .. }))
        ));
    }

    #[test]
    fn test_signature_covers_root_hash() {
        let (keypairs, trust_base) = committee(1);
        let mut seal = test_seal();
        seal.sign("test1", &keypairs[0]);
        assert!(seal.verify(&trust_base).is_ok());

        seal.hash = ALG.digest(b"forged root");
        assert!(matches!(
            seal.verify(&trust_base),
            Err(SealError::TrustBase(
                TrustBaseError::SignatureVerification { .. }
            ))
        ));
    }
}
