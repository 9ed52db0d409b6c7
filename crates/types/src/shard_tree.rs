//! Shard tree: binds each shard's input record to a single per-partition
//! root.
//!
//! The shards of a partition form a complete prefix-free binary covering of
//! the bit-string space. The tree mirrors that covering: the node for prefix
//! `p` is either the leaf of shard `p` or the hash of the nodes for `p0` and
//! `p1`. A single-shard partition collapses to its leaf.

use crate::merkle::hash_pair;
use crate::{Hash, HashAlgorithm, Hasher, InputRecord, ShardId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One shard's contribution to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardTreeInput {
    /// The shard being bound.
    pub shard: ShardId,

    /// The shard's certified input record.
    pub input_record: InputRecord,

    /// Hash of the shard's technical record.
    pub tr_hash: Hash,
}

/// Certificate extracted for one shard: the sibling hashes from its leaf to
/// the partition root.
///
/// `sibling_hashes[0]` is the deepest sibling; the last entry sits directly
/// below the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTreeCertificate {
    /// The certified shard.
    pub shard: ShardId,

    /// Sibling hashes from leaf to root.
    pub sibling_hashes: Vec<Hash>,
}

impl ShardTreeCertificate {
    /// Recompute the partition root from a shard's leaf content.
    pub fn compute_root(
        &self,
        input_record: &InputRecord,
        tr_hash: &Hash,
        algorithm: HashAlgorithm,
    ) -> Hash {
        let mut current = leaf_hash(input_record, tr_hash, algorithm);
        for (i, sibling) in self.sibling_hashes.iter().enumerate() {
            // Sibling i sits at depth len - i; the bit above it picks sides.
            let bit = self.shard.bit(self.shard.len() - 1 - i);
            current = if bit {
                hash_pair(sibling, &current, algorithm)
            } else {
                hash_pair(&current, sibling, algorithm)
            };
        }
        current
    }
}

/// A fully built shard tree for one partition.
#[derive(Debug, Clone)]
pub struct ShardTree {
    algorithm: HashAlgorithm,
    root: Hash,
    // Every node of the tree, keyed by its bit-string prefix.
    nodes: BTreeMap<ShardId, Hash>,
}

impl ShardTree {
    /// Build the tree over the given shard entries.
    ///
    /// The shard ids must form a complete prefix-free binary covering; a
    /// single entry with the empty shard id is the degenerate (and common)
    /// case.
    pub fn build(
        inputs: &[ShardTreeInput],
        algorithm: HashAlgorithm,
    ) -> Result<Self, ShardTreeError> {
        if inputs.is_empty() {
            return Err(ShardTreeError::NoShards);
        }

        let mut leaves = BTreeMap::new();
        let mut max_depth = 0;
        for input in inputs {
            max_depth = max_depth.max(input.shard.len());
            let leaf = leaf_hash(&input.input_record, &input.tr_hash, algorithm);
            if leaves.insert(input.shard.clone(), leaf).is_some() {
                return Err(ShardTreeError::DuplicateShard {
                    shard: input.shard.clone(),
                });
            }
        }

        let mut nodes = BTreeMap::new();
        let root = compute_node(&ShardId::empty(), &leaves, &mut nodes, max_depth, algorithm)?;
        Ok(Self {
            algorithm,
            root,
            nodes,
        })
    }

    /// The partition's shard tree root.
    pub fn root(&self) -> Hash {
        self.root
    }

    /// Extract the certificate for one shard.
    pub fn certificate(&self, shard: &ShardId) -> Result<ShardTreeCertificate, ShardTreeError> {
        if !self.nodes.contains_key(shard) {
            return Err(ShardTreeError::UnknownShard {
                shard: shard.clone(),
            });
        }
        // Deepest sibling first, so certificates walk leaf -> root.
        let mut sibling_hashes = Vec::with_capacity(shard.len());
        for depth in (1..=shard.len()).rev() {
            let sibling = shard.prefix(depth).sibling();
            let hash = self
                .nodes
                .get(&sibling)
                .copied()
                .ok_or(ShardTreeError::UnknownShard { shard: sibling })?;
            sibling_hashes.push(hash);
        }
        Ok(ShardTreeCertificate {
            shard: shard.clone(),
            sibling_hashes,
        })
    }

    /// Hash algorithm the tree was built with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Leaf hash binding a shard's input record and technical record hash.
fn leaf_hash(input_record: &InputRecord, tr_hash: &Hash, algorithm: HashAlgorithm) -> Hash {
    let mut hasher = Hasher::new(algorithm);
    hasher
        .write(input_record)
        .expect("input record serialization should never fail");
    hasher.write_raw(tr_hash.as_bytes());
    hasher.finish()
}

/// Recursively compute the node hash for `prefix`, recording every visited
/// node so sibling paths can be extracted afterwards.
fn compute_node(
    prefix: &ShardId,
    leaves: &BTreeMap<ShardId, Hash>,
    nodes: &mut BTreeMap<ShardId, Hash>,
    max_depth: usize,
    algorithm: HashAlgorithm,
) -> Result<Hash, ShardTreeError> {
    let hash = if let Some(leaf) = leaves.get(prefix) {
        *leaf
    } else {
        if prefix.len() >= max_depth {
            return Err(ShardTreeError::IncompleteCovering {
                prefix: prefix.clone(),
            });
        }
        let left = compute_node(&prefix.child(false), leaves, nodes, max_depth, algorithm)?;
        let right = compute_node(&prefix.child(true), leaves, nodes, max_depth, algorithm)?;
        hash_pair(&left, &right, algorithm)
    };
    nodes.insert(prefix.clone(), hash);
    Ok(hash)
}

/// Errors from shard tree construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShardTreeError {
    /// No shard entries were provided.
    #[error("shard tree has no entries")]
    NoShards,

    /// The same shard id appeared twice.
    #[error("duplicate shard id {shard}")]
    DuplicateShard {
        /// The repeated shard.
        shard: ShardId,
    },

    /// The shard ids do not cover the bit-string space.
    #[error("shard ids do not form a complete covering at prefix {prefix}")]
    IncompleteCovering {
        /// The uncovered prefix.
        prefix: ShardId,
    },

    /// A shard id outside the tree was requested.
    #[error("unknown shard id {shard}")]
    UnknownShard {
        /// The unknown shard.
        shard: ShardId,
    },
}
