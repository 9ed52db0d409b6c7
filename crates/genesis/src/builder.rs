//! Genesis assembly: from partition node records to a signed root genesis
//! document.

use crate::config::{GenesisConfig, GenesisOption, GENESIS_TIME, ROOT_ROUND};
use crate::root_genesis::{
    ConsensusParams, GenesisError, GenesisPartitionRecord, GenesisRootRecord, PartitionGenesis,
    RootGenesis, CONSENSUS_PARAMS_VERSION, GENESIS_PARTITION_VERSION, ROOT_GENESIS_VERSION,
};
use keystone_types::{
    Hash, KeyPair, NodeInfo, PartitionId, PartitionNode, RootTrustBase, RoundInfo, ShardId,
    ShardTree, ShardTreeCertificate, ShardTreeInput, TechnicalRecord, UnicityCertificate,
    UnicitySeal, UnicityTree, UnicityTreeData, UNICITY_CERTIFICATE_VERSION, UNICITY_SEAL_VERSION,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-partition intermediate state carried between the shard tree and
/// unicity tree passes.
struct PartitionCertificateParts {
    partition_id: PartitionId,
    tr_hash: Hash,
    shard_tree_certificate: ShardTreeCertificate,
}

/// Assemble and sign a root genesis document.
///
/// `nodes` holds one record per partition validator; they are grouped by
/// partition id and every partition's nodes must propose equivalent input
/// records over identical partition descriptions. The returned document
/// carries the caller's signature only; co-signing happens through
/// [`crate::add_signature`] and [`crate::merge_root_genesis`].
pub fn new_root_genesis(
    node_id: impl Into<String>,
    keypair: &KeyPair,
    nodes: Vec<PartitionNode>,
    options: &[GenesisOption],
) -> Result<(RootGenesis, Vec<PartitionGenesis>), GenesisError> {
    let mut config = GenesisConfig::new(node_id);
    for option in options {
        config.apply(*option);
    }
    config.validate()?;
    let algorithm = config.hash_algorithm;

    let mut partitions = group_partitions(nodes)?;
    for partition in &partitions {
        partition.validate()?;
    }

    // Per partition, in sorted order: technical record, shard tree, and the
    // partition's leaf of the unicity tree.
    let mut parts = Vec::with_capacity(partitions.len());
    let mut leaves = Vec::with_capacity(partitions.len());
    for partition in &partitions {
        let partition_id = partition.partition_id();
        let pdr_hash = partition.partition_description.hash(algorithm);
        let input_record = partition.input_record()?.clone();

        let technical_record =
            TechnicalRecord::new(&input_record, &partition.node_ids(), algorithm)?;
        let tr_hash = technical_record.hash(algorithm);

        let shard_tree = ShardTree::build(
            &[ShardTreeInput {
                shard: ShardId::empty(),
                input_record,
                tr_hash,
            }],
            algorithm,
        )?;

        debug!(
            partition = %partition_id,
            nodes = partition.nodes.len(),
            leader = %technical_record.leader,
            "prepared partition for genesis"
        );

        parts.push(PartitionCertificateParts {
            partition_id,
            tr_hash,
            shard_tree_certificate: shard_tree.certificate(&ShardId::empty())?,
        });
        leaves.push(UnicityTreeData {
            partition_id,
            shard_tree_root: shard_tree.root(),
            pdr_hash,
        });
    }

    let unicity_tree = UnicityTree::build(&leaves, algorithm)?;
    let root_hash = unicity_tree.root();

    // Seal the root: the previous-round link of the genesis round hashes the
    // round info of the genesis round itself.
    let previous_hash = RoundInfo {
        round_number: ROOT_ROUND,
        epoch: 0,
        timestamp: GENESIS_TIME,
        parent_round_number: 0,
        current_root_hash: root_hash,
    }
    .hash(algorithm);
    let mut seal = UnicitySeal {
        version: UNICITY_SEAL_VERSION,
        root_chain_round_number: ROOT_ROUND,
        timestamp: GENESIS_TIME,
        previous_hash,
        hash: root_hash,
        signatures: BTreeMap::new(),
    };
    seal.sign(&config.node_id, keypair);

    let self_info = NodeInfo {
        node_id: config.node_id.clone(),
        sig_key: keypair.public_key().encode_compressed().to_vec(),
        stake: 1,
    };
    let self_trust_base = RootTrustBase::new(0, [self_info.clone()], None)?;

    // Attach the finalized certificates, self-checking each one against the
    // single-validator trust base. A failure here is a bug in the tree or
    // seal machinery, not a user error.
    for (partition, part) in partitions.iter_mut().zip(parts) {
        let unicity_tree_certificate = unicity_tree
            .certificate(part.partition_id)
            .expect("every partition has a unicity tree certificate")
            .clone();
        let certificate = UnicityCertificate {
            version: UNICITY_CERTIFICATE_VERSION,
            input_record: partition.input_record()?.clone(),
            tr_hash: part.tr_hash,
            shard_tree_certificate: part.shard_tree_certificate,
            unicity_tree_certificate,
            unicity_seal: seal.clone(),
        };
        let pdr_hash = partition.partition_description.hash(algorithm);
        certificate
            .validate(&self_trust_base, algorithm, part.partition_id, &pdr_hash)
            .expect("generated certificate failed self-verification");
        partition.certificate = Some(certificate);
    }

    let mut consensus = ConsensusParams {
        version: CONSENSUS_PARAMS_VERSION,
        total_root_validators: config.total_root_validators,
        block_rate_ms: config.block_rate_ms,
        consensus_timeout_ms: config.consensus_timeout_ms,
        hash_algorithm: algorithm,
        signatures: BTreeMap::new(),
    };
    consensus.sign(&config.node_id, keypair);

    let root_genesis = RootGenesis {
        version: ROOT_GENESIS_VERSION,
        root: GenesisRootRecord {
            version: ROOT_GENESIS_VERSION,
            root_validators: vec![self_info],
            consensus,
        },
        partitions,
    };
    root_genesis.validate()?;

    let partition_genesis = root_genesis.partition_genesis()?;
    info!(
        node = %root_genesis.root.root_validators[0].node_id,
        partitions = root_genesis.partitions.len(),
        root_hash = %root_hash,
        "generated root genesis"
    );
    Ok((root_genesis, partition_genesis))
}

/// Group node records into one partition record per partition id, sorted
/// ascending, with each partition's nodes sorted by node id.
fn group_partitions(
    nodes: Vec<PartitionNode>,
) -> Result<Vec<GenesisPartitionRecord>, GenesisError> {
    if nodes.is_empty() {
        return Err(GenesisError::NoPartitions);
    }

    let mut grouped: BTreeMap<PartitionId, Vec<PartitionNode>> = BTreeMap::new();
    for node in nodes {
        grouped
            .entry(node.partition_description.partition_id)
            .or_default()
            .push(node);
    }

    Ok(grouped
        .into_values()
        .map(|mut nodes| {
            nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
            let partition_description = nodes[0].partition_description.clone();
            GenesisPartitionRecord {
                version: GENESIS_PARTITION_VERSION,
                nodes,
                certificate: None,
                partition_description,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BLOCK_RATE_MS;
    use crate::testutil::{partition_node, test_record};
    use keystone_types::{codec, HashAlgorithm};

    #[test]
    fn test_single_partition_genesis() {
        let root_key = KeyPair::generate();
        let node_key = KeyPair::generate();
        let nodes = vec![partition_node(1, "node-1", &node_key, test_record(&[1]))];

        let (root_genesis, partition_genesis) =
            new_root_genesis("test1", &root_key, nodes, &[]).unwrap();

        assert!(root_genesis.validate().is_ok());
        assert!(root_genesis.verify().is_ok());
        assert_eq!(root_genesis.signature_count(), 1);
        assert_eq!(partition_genesis.len(), 1);
        assert_eq!(
            partition_genesis[0].partition_description.partition_id,
            PartitionId(1)
        );
        assert_eq!(partition_genesis[0].validators.len(), 1);
    }

    #[test]
    fn test_partitions_sorted_and_certified() {
        let root_key = KeyPair::generate();
        // Submit partitions out of order.
        let mut nodes = Vec::new();
        for partition_id in [7u32, 2, 5] {
            let key = KeyPair::generate();
            nodes.push(partition_node(
                partition_id,
                "node-1",
                &key,
                test_record(&[partition_id as u8]),
            ));
        }

        let (root_genesis, _) = new_root_genesis("test1", &root_key, nodes, &[]).unwrap();

        let ids: Vec<u32> = root_genesis
            .partitions
            .iter()
            .map(|p| p.partition_id().0)
            .collect();
        assert_eq!(ids, vec![2, 5, 7]);
        for partition in &root_genesis.partitions {
            assert!(partition.certificate.is_some());
        }
    }

    #[test]
    fn test_leader_is_first_sorted_node() {
        let root_key = KeyPair::generate();
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        // Insert in reverse name order; grouping must sort them.
        let nodes = vec![
            partition_node(1, "charlie", &keys[0], test_record(&[1])),
            partition_node(1, "bravo", &keys[1], test_record(&[1])),
            partition_node(1, "alpha", &keys[2], test_record(&[1])),
        ];

        let (root_genesis, _) = new_root_genesis("test1", &root_key, nodes, &[]).unwrap();
        let node_ids = root_genesis.partitions[0].node_ids();
        assert_eq!(node_ids, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_divergent_input_record_rejected() {
        let root_key = KeyPair::generate();
        let key_a = KeyPair::generate();
        let key_b = KeyPair::generate();
        let nodes = vec![
            partition_node(1, "node-1", &key_a, test_record(&[1])),
            partition_node(1, "node-2", &key_b, test_record(&[2])),
        ];

        let err = new_root_genesis("test1", &root_key, nodes, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid partition nodes: partition 1 node node-2 input record is different"
        );
    }

    #[test]
    fn test_empty_node_list_rejected() {
        let root_key = KeyPair::generate();
        let err = new_root_genesis("test1", &root_key, vec![], &[]).unwrap_err();
        assert!(matches!(err, GenesisError::NoPartitions));
    }

    #[test]
    fn test_config_options_propagate() {
        let root_key = KeyPair::generate();
        let node_key = KeyPair::generate();
        let nodes = vec![partition_node(1, "node-1", &node_key, test_record(&[1]))];

        let (root_genesis, _) = new_root_genesis(
            "test1",
            &root_key,
            nodes,
            &[
                GenesisOption::TotalRootValidators(2),
                GenesisOption::ConsensusTimeoutMs(12_000),
            ],
        )
        .unwrap();

        let consensus = &root_genesis.root.consensus;
        assert_eq!(consensus.total_root_validators, 2);
        assert_eq!(consensus.consensus_timeout_ms, 12_000);
        assert_eq!(consensus.block_rate_ms, DEFAULT_BLOCK_RATE_MS);

        // Under-signed for a two-validator committee.
        assert!(root_genesis.validate().is_ok());
        assert!(matches!(
            root_genesis.verify().unwrap_err(),
            GenesisError::NotSignedByQuorum { got: 1, needed: 2 }
        ));
    }

    #[test]
    fn test_seal_links_to_genesis_round_info() {
        let root_key = KeyPair::generate();
        let node_key = KeyPair::generate();
        let nodes = vec![partition_node(1, "node-1", &node_key, test_record(&[1]))];

        let (root_genesis, _) = new_root_genesis("test1", &root_key, nodes, &[]).unwrap();
        let seal = &root_genesis.partitions[0]
            .certificate
            .as_ref()
            .unwrap()
            .unicity_seal;

        assert_eq!(seal.root_chain_round_number, ROOT_ROUND);
        assert_eq!(seal.timestamp, GENESIS_TIME);
        let expected = RoundInfo {
            round_number: ROOT_ROUND,
            epoch: 0,
            timestamp: GENESIS_TIME,
            parent_round_number: 0,
            current_root_hash: seal.hash,
        }
        .hash(HashAlgorithm::Sha256);
        assert_eq!(seal.previous_hash, expected);
    }

    #[test]
    fn test_document_roundtrip_is_bit_equal() {
        let root_key = KeyPair::generate();
        let node_key = KeyPair::generate();
        let nodes = vec![partition_node(1, "node-1", &node_key, test_record(&[1]))];

        let (root_genesis, _) = new_root_genesis("test1", &root_key, nodes, &[]).unwrap();

        let bytes = codec::encode(&root_genesis).unwrap();
        let decoded: RootGenesis = codec::decode(&bytes).unwrap();
        assert!(decoded.validate().is_ok());
        assert_eq!(codec::encode(&decoded).unwrap(), bytes);
        assert_eq!(decoded, root_genesis);
    }
}
