//! Shared fixtures for genesis tests.

use crate::config::GENESIS_TIME;
use keystone_types::{
    BlockCertificationRequest, InputRecord, KeyPair, NetworkId, PartitionDescriptionRecord,
    PartitionId, PartitionNode, ShardId, Signature, INPUT_RECORD_VERSION, PARTITION_NODE_VERSION,
};

pub(crate) fn test_record(hash: &[u8]) -> InputRecord {
    InputRecord {
        version: INPUT_RECORD_VERSION,
        previous_hash: vec![0],
        hash: hash.to_vec(),
        block_hash: Some(vec![2]),
        summary_value: vec![],
        round_number: 1,
        epoch: 0,
        timestamp: GENESIS_TIME,
        sum_of_earned_fees: 0,
    }
}

pub(crate) fn test_description(partition_id: u32) -> PartitionDescriptionRecord {
    PartitionDescriptionRecord {
        version: 1,
        network_id: NetworkId(5),
        partition_id: PartitionId(partition_id),
        type_id_len: 8,
        unit_id_len: 256,
        t2_timeout_ms: 2500,
        shard_ids: vec![ShardId::empty()],
    }
}

pub(crate) fn partition_node(
    partition_id: u32,
    node_id: &str,
    keypair: &KeyPair,
    record: InputRecord,
) -> PartitionNode {
    let description = test_description(partition_id);
    let mut request = BlockCertificationRequest {
        partition_id: description.partition_id,
        shard_id: ShardId::empty(),
        node_id: node_id.to_string(),
        input_record: Some(record),
        signature: Signature::from_bytes(vec![]),
    };
    request.sign(keypair);
    PartitionNode {
        version: PARTITION_NODE_VERSION,
        node_id: node_id.to_string(),
        sig_key: keypair.public_key().encode_compressed().to_vec(),
        block_certification_request: Some(request),
        partition_description: description,
    }
}
