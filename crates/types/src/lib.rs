//! Core types for the Keystone root chain.
//!
//! The root chain certifies the state of many independent partitions
//! (application shards). Partition validators submit signed block
//! certification requests; the root chain aggregates them into shard trees
//! and a global unicity tree, and seals the tree root with the signatures of
//! the root validator committee.

pub mod certificate;
pub mod certification;
pub mod codec;
pub mod crypto;
pub mod hash;
pub mod identifiers;
pub mod input_record;
pub mod merkle;
pub mod partition;
pub mod seal;
pub mod shard_tree;
pub mod technical;
pub mod trust_base;
pub mod unicity_tree;

// Re-export commonly used types
pub use certificate::{CertificateError, UnicityCertificate, UNICITY_CERTIFICATE_VERSION};
pub use certification::{BlockCertificationRequest, RequestError};
pub use codec::{CodecError, Hasher, CBOR_EMPTY_MAP};
pub use crypto::{CryptoError, KeyPair, PublicKey, Signature, COMPRESSED_KEY_BYTES};
pub use hash::{Hash, HashAlgorithm};
pub use identifiers::{NetworkId, PartitionId, ShardId};
pub use input_record::{InputRecord, InputRecordError, INPUT_RECORD_VERSION};
pub use merkle::{build_merkle_tree_with_proofs, MerkleProof};
pub use partition::{
    NodeInfo, PartitionDescriptionRecord, PartitionError, PartitionNode, PARTITION_NODE_VERSION,
};
pub use seal::{RoundInfo, SealError, UnicitySeal, UNICITY_SEAL_VERSION};
pub use shard_tree::{ShardTree, ShardTreeCertificate, ShardTreeError, ShardTreeInput};
pub use technical::{TechnicalRecord, TechnicalRecordError, EMPTY_STAT_RECORD_HASH};
pub use trust_base::{PartitionTrustBase, RootTrustBase, TrustBaseError, ROOT_TRUST_BASE_VERSION};
pub use unicity_tree::{
    UnicityTree, UnicityTreeCertificate, UnicityTreeData, UnicityTreeError,
    UNICITY_TREE_CERTIFICATE_VERSION,
};
