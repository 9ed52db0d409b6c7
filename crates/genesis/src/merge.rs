//! Multi-party genesis: co-signing and merging independently signed root
//! genesis documents.

use crate::root_genesis::{GenesisError, RootGenesis};
use keystone_types::{KeyPair, NodeInfo};
use tracing::info;

/// Co-sign an existing root genesis document as `node_id`.
///
/// The signer is appended to the validator list, signs the consensus
/// parameters, and re-signs every partition's unicity seal. Fails if the
/// document is already fully signed or already carries this node's
/// signature.
pub fn add_signature(
    root_genesis: &mut RootGenesis,
    node_id: &str,
    keypair: &KeyPair,
) -> Result<(), GenesisError> {
    root_genesis.validate()?;

    let consensus = &root_genesis.root.consensus;
    if consensus.signatures.len() >= consensus.total_root_validators as usize {
        return Err(GenesisError::MaxSigned);
    }
    if consensus.signatures.contains_key(node_id) {
        return Err(GenesisError::AlreadySignedBy {
            node_id: node_id.to_string(),
        });
    }

    root_genesis.root.consensus.sign(node_id, keypair);
    if !root_genesis
        .root
        .root_validators
        .iter()
        .any(|info| info.node_id == node_id)
    {
        root_genesis.root.root_validators.push(NodeInfo {
            node_id: node_id.to_string(),
            sig_key: keypair.public_key().encode_compressed().to_vec(),
            stake: 1,
        });
    }
    for partition in &mut root_genesis.partitions {
        let partition_id = partition.partition_id();
        let certificate = partition
            .certificate
            .as_mut()
            .ok_or(GenesisError::MissingCertificate { partition_id })?;
        certificate.unicity_seal.sign(node_id, keypair);
    }

    root_genesis.validate()?;
    info!(
        node = node_id,
        signatures = root_genesis.signature_count(),
        "added signature to root genesis"
    );
    Ok(())
}

/// Merge independently signed root genesis documents into one.
///
/// Every input must be individually valid, agree byte-for-byte on the
/// consensus parameter signing encoding, and list the same partitions in
/// the same order. Signature maps and validator lists are unioned.
pub fn merge_root_genesis(documents: Vec<RootGenesis>) -> Result<RootGenesis, GenesisError> {
    let mut documents = documents.into_iter();
    let mut merged = documents.next().ok_or(GenesisError::NoDocuments)?;
    merged.validate()?;

    let reference_consensus = merged.root.consensus.signing_bytes();
    let algorithm = merged.root.consensus.hash_algorithm;
    let reference_pdr_hashes: Vec<_> = merged
        .partitions
        .iter()
        .map(|partition| partition.partition_description.hash(algorithm))
        .collect();

    for document in documents {
        document.validate()?;
        if document.root.consensus.signing_bytes() != reference_consensus {
            return Err(GenesisError::ConsensusMismatch);
        }
        if document.partitions.len() != merged.partitions.len() {
            return Err(GenesisError::PartitionCountMismatch {
                expected: merged.partitions.len(),
                got: document.partitions.len(),
            });
        }
        for (slot, (theirs, pdr_hash)) in document
            .partitions
            .iter()
            .zip(&reference_pdr_hashes)
            .enumerate()
        {
            if &theirs.partition_description.hash(algorithm) != pdr_hash {
                return Err(GenesisError::MergePartitionMismatch {
                    partition_id: merged.partitions[slot].partition_id(),
                });
            }
        }

        // Union the consensus signatures and validator list, first writer
        // wins on duplicates.
        for (node_id, signature) in document.root.consensus.signatures {
            merged
                .root
                .consensus
                .signatures
                .entry(node_id)
                .or_insert(signature);
        }
        for info in document.root.root_validators {
            if !merged
                .root
                .root_validators
                .iter()
                .any(|existing| existing.node_id == info.node_id)
            {
                merged.root.root_validators.push(info);
            }
        }
        for (mine, theirs) in merged.partitions.iter_mut().zip(document.partitions) {
            let partition_id = mine.partition_id();
            let mine_certificate = mine
                .certificate
                .as_mut()
                .ok_or(GenesisError::MissingCertificate { partition_id })?;
            let their_certificate =
                theirs
                    .certificate
                    .ok_or(GenesisError::MissingCertificate { partition_id })?;
            for (node_id, signature) in their_certificate.unicity_seal.signatures {
                mine_certificate
                    .unicity_seal
                    .signatures
                    .entry(node_id)
                    .or_insert(signature);
            }
        }
    }

    merged.validate()?;
    info!(
        validators = merged.root.root_validators.len(),
        signatures = merged.signature_count(),
        "merged root genesis documents"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::new_root_genesis;
    use crate::config::GenesisOption;
    use crate::testutil::{partition_node, test_record};
    use keystone_types::{PartitionNode, TrustBaseError};

    /// One shared partition-node set, as every co-signer would load it from
    /// disk.
    fn shared_partition_nodes() -> Vec<PartitionNode> {
        let seed_a = [1u8; 32];
        let seed_b = [2u8; 32];
        vec![
            partition_node(
                1,
                "node-1",
                &KeyPair::from_seed(&seed_a).unwrap(),
                test_record(&[1]),
            ),
            partition_node(
                1,
                "node-2",
                &KeyPair::from_seed(&seed_b).unwrap(),
                test_record(&[1]),
            ),
        ]
    }

    #[test]
    fn test_add_signature_sequence() {
        let key1 = KeyPair::generate();
        let key2 = KeyPair::generate();
        let key3 = KeyPair::generate();

        let (mut root_genesis, _) = new_root_genesis(
            "test1",
            &key1,
            shared_partition_nodes(),
            &[GenesisOption::TotalRootValidators(2)],
        )
        .unwrap();

        // One of two signatures: structurally valid but under-signed.
        assert!(root_genesis.validate().is_ok());
        assert!(root_genesis.verify().is_err());

        let err = add_signature(&mut root_genesis, "test1", &key1).unwrap_err();
        assert_eq!(err.to_string(), "genesis is already signed by node id test1");

        add_signature(&mut root_genesis, "test2", &key2).unwrap();
        assert!(root_genesis.verify().is_ok());
        assert_eq!(root_genesis.signature_count(), 2);
        for partition in &root_genesis.partitions {
            let seal = &partition.certificate.as_ref().unwrap().unicity_seal;
            assert_eq!(seal.signatures.len(), 2);
        }

        let err = add_signature(&mut root_genesis, "test3", &key3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "genesis is already signed by maximum number of root nodes"
        );
    }

    #[test]
    fn test_merge_three_documents() {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let options = [GenesisOption::TotalRootValidators(3)];

        let documents: Vec<RootGenesis> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let (document, _) = new_root_genesis(
                    format!("test{}", i + 1),
                    key,
                    shared_partition_nodes(),
                    &options,
                )
                .unwrap();
                document
            })
            .collect();

        let merged = merge_root_genesis(documents).unwrap();
        assert!(merged.verify().is_ok());
        assert_eq!(merged.signature_count(), 3);
        assert_eq!(merged.root.root_validators.len(), 3);
        for partition in &merged.partitions {
            let seal = &partition.certificate.as_ref().unwrap().unicity_seal;
            assert_eq!(seal.signatures.len(), 3);
        }

        // Trust base generation honours the admissible quorum range.
        assert!(merged.generate_trust_base(0, Some(3)).is_ok());
        let err = merged.generate_trust_base(0, Some(2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "quorum threshold must be at least '2/3+1' (min threshold 3 got 2)"
        );
        assert!(matches!(err, TrustBaseError::QuorumTooLow { .. }));
        let err = merged.generate_trust_base(0, Some(4)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "quorum threshold cannot exceed the total staked amount (max threshold 3 got 4)"
        );
    }

    #[test]
    fn test_merge_is_associative() {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let options = [GenesisOption::TotalRootValidators(3)];

        let make = |i: usize| {
            let (document, _) = new_root_genesis(
                format!("test{}", i + 1),
                &keys[i],
                shared_partition_nodes(),
                &options,
            )
            .unwrap();
            document
        };
        let (a, b, c) = (make(0), make(1), make(2));

        let left = merge_root_genesis(vec![
            merge_root_genesis(vec![a.clone(), b.clone()]).unwrap(),
            c.clone(),
        ])
        .unwrap();
        let right =
            merge_root_genesis(vec![a, merge_root_genesis(vec![b, c]).unwrap()]).unwrap();

        // Signature maps are sorted, so association order cannot show
        // through.
        assert_eq!(left.root.consensus.signatures, right.root.consensus.signatures);
        assert_eq!(
            left.partitions[0]
                .certificate
                .as_ref()
                .unwrap()
                .unicity_seal
                .signatures,
            right.partitions[0]
                .certificate
                .as_ref()
                .unwrap()
                .unicity_seal
                .signatures
        );
    }

    #[test]
    fn test_merge_rejects_differing_consensus() {
        let key1 = KeyPair::generate();
        let key2 = KeyPair::generate();

        let (a, _) = new_root_genesis(
            "test1",
            &key1,
            shared_partition_nodes(),
            &[GenesisOption::TotalRootValidators(2)],
        )
        .unwrap();
        let (b, _) = new_root_genesis(
            "test2",
            &key2,
            shared_partition_nodes(),
            &[
                GenesisOption::TotalRootValidators(2),
                GenesisOption::ConsensusTimeoutMs(12_000),
            ],
        )
        .unwrap();

        assert!(matches!(
            merge_root_genesis(vec![a, b]).unwrap_err(),
            GenesisError::ConsensusMismatch
        ));
    }

    #[test]
    fn test_merge_rejects_differing_partitions() {
        let key1 = KeyPair::generate();
        let key2 = KeyPair::generate();
        let options = [GenesisOption::TotalRootValidators(2)];

        let (a, _) =
            new_root_genesis("test1", &key1, shared_partition_nodes(), &options).unwrap();
        let other_partition = vec![partition_node(
            2,
            "node-1",
            &KeyPair::from_seed(&[1u8; 32]).unwrap(),
            test_record(&[1]),
        )];
        let (b, _) = new_root_genesis("test2", &key2, other_partition, &options).unwrap();

        assert!(matches!(
            merge_root_genesis(vec![a, b]).unwrap_err(),
            GenesisError::MergePartitionMismatch { .. }
        ));
    }

    #[test]
    fn test_merge_nothing() {
        assert!(matches!(
            merge_root_genesis(vec![]).unwrap_err(),
            GenesisError::NoDocuments
        ));
    }
}
