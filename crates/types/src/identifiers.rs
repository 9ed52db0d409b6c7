//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition identifier.
///
/// Zero is reserved and never identifies a valid partition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PartitionId(pub u32);

impl PartitionId {
    /// Check that the identifier is assigned (non-zero).
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network identifier separating deployments (mainnet, testnets).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NetworkId(pub u16);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shard identifier: a variable-length bit string.
///
/// The shards of a partition form a complete prefix-free binary covering:
/// splitting a shard `p` produces `p0` and `p1`. A single-shard partition
/// uses the empty bit string. Bits are stored most-significant first.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId {
    #[serde(with = "serde_bytes")]
    bits: Vec<u8>,
    length: u16,
}

impl ShardId {
    /// The empty shard id: the sole shard of an unsharded partition.
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            length: 0,
        }
    }

    /// Build a shard id from explicit bits.
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut shard = Self::empty();
        for &bit in bits {
            shard = shard.child(bit);
        }
        shard
    }

    /// Length in bits.
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// True for the empty shard id.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Get bit `i` (0 = most significant).
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn bit(&self, i: usize) -> bool {
        assert!(i < self.len(), "bit index {} out of range", i);
        (self.bits[i / 8] >> (7 - (i % 8))) & 1 == 1
    }

    /// Extend by one bit.
    pub fn child(&self, bit: bool) -> Self {
        let mut bits = self.bits.clone();
        let i = self.length as usize;
        if i % 8 == 0 {
            bits.push(0);
        }
        if bit {
            bits[i / 8] |= 1 << (7 - (i % 8));
        }
        Self {
            bits,
            length: self.length + 1,
        }
    }

    /// The first `len` bits of this shard id.
    ///
    /// # Panics
    ///
    /// Panics if `len > self.len()`.
    pub fn prefix(&self, len: usize) -> Self {
        assert!(len <= self.len(), "prefix length {} out of range", len);
        let mut shard = Self::empty();
        for i in 0..len {
            shard = shard.child(self.bit(i));
        }
        shard
    }

    /// The shard id that differs only in the last bit.
    ///
    /// # Panics
    ///
    /// Panics on the empty shard id.
    pub fn sibling(&self) -> Self {
        assert!(!self.is_empty(), "empty shard id has no sibling");
        let last = self.len() - 1;
        self.prefix(last).child(!self.bit(last))
    }
}

impl fmt::Debug for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardId(")?;
        for i in 0..self.len() {
            write!(f, "{}", if self.bit(i) { '1' } else { '0' })?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "0x/0")
        } else {
            write!(f, "0x{}/{}", hex::encode(&self.bits), self.length)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_shard() {
        let shard = ShardId::empty();
        assert!(shard.is_empty());
        assert_eq!(shard.len(), 0);
    }

    #[test]
    fn test_child_bits() {
        let shard = ShardId::empty().child(true).child(false).child(true);
        assert_eq!(shard.len(), 3);
        assert!(shard.bit(0));
        assert!(!shard.bit(1));
        assert!(shard.bit(2));
    }

    #[test]
    fn test_from_bits() {
        let shard = ShardId::from_bits(&[false, true]);
        assert_eq!(shard, ShardId::empty().child(false).child(true));
    }

    #[test]
    fn test_prefix_and_sibling() {
        let shard = ShardId::from_bits(&[true, false]);
        assert_eq!(shard.prefix(1), ShardId::from_bits(&[true]));
        assert_eq!(shard.sibling(), ShardId::from_bits(&[true, true]));
    }

    #[test]
    fn test_crosses_byte_boundary() {
        let bits: Vec<bool> = (0..10).map(|i| i % 3 == 0).collect();
        let shard = ShardId::from_bits(&bits);
        assert_eq!(shard.len(), 10);
        for (i, &bit) in bits.iter().enumerate() {
            assert_eq!(shard.bit(i), bit, "bit {}", i);
        }
    }

    #[test]
    fn test_siblings_differ() {
        let left = ShardId::from_bits(&[false]);
        let right = ShardId::from_bits(&[true]);
        assert_ne!(left, right);
        assert_eq!(left.sibling(), right);
        assert_eq!(right.sibling(), left);
    }

    #[test]
    fn test_partition_id_validity() {
        assert!(!PartitionId(0).is_valid());
        assert!(PartitionId(1).is_valid());
    }
}
