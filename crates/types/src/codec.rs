//! Canonical byte encoding and the hashing adapter built on it.
//!
//! All signed payloads and all hashed structures go through this module. The
//! encoding is CBOR with two determinism rules: struct fields are emitted in
//! declaration order and dynamic maps are `BTreeMap`s, so map keys are
//! emitted sorted. Encoding the same logical value twice produces identical
//! bytes.

use crate::{Hash, HashAlgorithm};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// CBOR marker for an empty map (major type 5, length 0).
pub const CBOR_EMPTY_MAP: [u8; 1] = [0xa0];

/// Encode a value into its canonical byte representation.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_cbor::to_vec(value).map_err(CodecError::Encode)
}

/// Decode a value from its canonical byte representation.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_cbor::from_slice(bytes).map_err(CodecError::Decode)
}

/// Hash a value by its canonical byte encoding.
pub fn hash_value<T: Serialize>(algorithm: HashAlgorithm, value: &T) -> Result<Hash, CodecError> {
    let mut hasher = Hasher::new(algorithm);
    hasher.write(value)?;
    Ok(hasher.finish())
}

/// Incremental hasher over canonically encoded values and raw bytes.
///
/// `write` feeds the canonical encoding of a value into the digest;
/// `write_raw` feeds bytes verbatim.
pub struct Hasher {
    algorithm: HashAlgorithm,
    digest: Sha256,
}

impl Hasher {
    /// Create a hasher for the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            digest: Sha256::new(),
        }
    }

    /// Feed the canonical encoding of a value into the digest.
    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        let bytes = encode(value)?;
        self.write_raw(&bytes);
        Ok(())
    }

    /// Feed raw bytes into the digest verbatim.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        match self.algorithm {
            HashAlgorithm::Sha256 => self.digest.update(bytes),
        }
    }

    /// Finalize the digest.
    pub fn finish(self) -> Hash {
        match self.algorithm {
            HashAlgorithm::Sha256 => Hash::new(self.digest.finalize().into()),
        }
    }
}

/// Errors from canonical encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Value could not be encoded.
    #[error("encoding failed: {0}")]
    Encode(#[source] serde_cbor::Error),

    /// Bytes could not be decoded.
    #[error("decoding failed: {0}")]
    Decode(#[source] serde_cbor::Error),
}
