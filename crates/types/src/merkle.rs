//! Binary Merkle tree with per-leaf inclusion proofs.
//!
//! The unicity tree uses this to bind every partition's shard tree root into
//! a single root hash. Each partition's certificate carries the sibling path
//! from its leaf to the root.

use crate::{Hash, HashAlgorithm, Hasher};
use serde::{Deserialize, Serialize};

/// Merkle inclusion proof for a leaf in a binary Merkle tree.
///
/// The proof consists of sibling hashes from the leaf to the root.
/// Verification recomputes the path and checks against the expected root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Index of the leaf in the tree (0-based).
    pub leaf_index: u32,

    /// Sibling hashes from leaf to root.
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    /// Verify that `leaf_hash` is included in `root` at `leaf_index`.
    pub fn verify(&self, leaf_hash: &Hash, root: &Hash, algorithm: HashAlgorithm) -> bool {
        let mut current = *leaf_hash;
        let mut index = self.leaf_index;

        for sibling in &self.siblings {
            current = if index % 2 == 0 {
                // Current is left child, sibling is right
                hash_pair(&current, sibling, algorithm)
            } else {
                // Current is right child, sibling is left
                hash_pair(sibling, &current, algorithm)
            };
            index /= 2;
        }

        current == *root
    }

    /// Get the depth of the tree this proof is for.
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

/// Hash two child nodes to produce the parent hash.
#[inline]
pub(crate) fn hash_pair(left: &Hash, right: &Hash, algorithm: HashAlgorithm) -> Hash {
    let mut hasher = Hasher::new(algorithm);
    hasher.write_raw(left.as_bytes());
    hasher.write_raw(right.as_bytes());
    hasher.finish()
}

/// Build a Merkle tree from leaf hashes and generate proofs for all leaves.
///
/// Returns the Merkle root and a proof for each leaf (in the same order as
/// input). Leaves are padded to the next power of two with zero hashes.
///
/// # Panics
///
/// Panics if `leaves` is empty.
pub fn build_merkle_tree_with_proofs(
    leaves: &[Hash],
    algorithm: HashAlgorithm,
) -> (Hash, Vec<MerkleProof>) {
    assert!(!leaves.is_empty(), "cannot build Merkle tree with no leaves");

    // Handle single leaf case
    if leaves.len() == 1 {
        return (
            leaves[0],
            vec![MerkleProof {
                leaf_index: 0,
                siblings: vec![],
            }],
        );
    }

    // Pad to the next power of two; padding leaves are zero hashes.
    let width = leaves.len().next_power_of_two();
    let depth = width.trailing_zeros() as usize;

    // Levels bottom-up: levels[0] holds the padded leaves, levels[depth]
    // the root alone.
    let mut levels: Vec<Vec<Hash>> = Vec::with_capacity(depth + 1);
    let mut padded = vec![Hash::ZERO; width];
    padded[..leaves.len()].copy_from_slice(leaves);
    levels.push(padded);

    for level in 0..depth {
        let parents: Vec<Hash> = levels[level]
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1], algorithm))
            .collect();
        levels.push(parents);
    }

    let root = levels[depth][0];

    // Sibling paths for the original leaves only.
    let proofs: Vec<MerkleProof> = (0..leaves.len())
        .map(|leaf_index| {
            let mut siblings = Vec::with_capacity(depth);
            let mut index = leaf_index;
            for level in levels.iter().take(depth) {
                siblings.push(level[index ^ 1]);
                index /= 2;
            }
            MerkleProof {
                leaf_index: leaf_index as u32,
                siblings,
            }
        })
        .collect();

    (root, proofs)
}
