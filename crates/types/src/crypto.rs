//! Cryptographic key pairs and signatures.
//!
//! The root chain and all partition nodes sign with secp256k1 ECDSA.
//! Public keys travel in compressed 33-byte SEC1 form; signatures are
//! 64-byte compact encodings. Signing is deterministic (RFC 6979), so the
//! same key and message always produce the same signature. Any other scheme
//! is rejected when the key material is decoded.

use secp256k1::ecdsa::Signature as EcdsaSignature;
use secp256k1::global::SECP256K1;
use secp256k1::{Message, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a compressed secp256k1 public key.
pub const COMPRESSED_KEY_BYTES: usize = 33;

/// Length of a compact ECDSA signature.
pub const SIGNATURE_BYTES: usize = 64;

/// A signing key pair.
#[derive(Clone)]
pub enum KeyPair {
    /// secp256k1 ECDSA key pair.
    Secp256k1(SecretKey),
}

impl KeyPair {
    /// Generate a new random secp256k1 key pair.
    pub fn generate() -> Self {
        KeyPair::Secp256k1(SecretKey::new(&mut rand::thread_rng()))
    }

    /// Create a key pair from a 32-byte seed (for testing/simulation).
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, CryptoError> {
        let key = SecretKey::from_slice(seed).map_err(CryptoError::InvalidSecretKey)?;
        Ok(KeyPair::Secp256k1(key))
    }

    /// Sign a message.
    ///
    /// The message is hashed with SHA-256 and the digest is signed.
    pub fn sign(&self, message: &[u8]) -> Signature {
        match self {
            KeyPair::Secp256k1(key) => {
                let digest: [u8; 32] = Sha256::digest(message).into();
                let sig = SECP256K1.sign_ecdsa(&Message::from_digest(digest), key);
                Signature(sig.serialize_compact().to_vec())
            }
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Secp256k1(key) => {
                PublicKey::Secp256k1(secp256k1::PublicKey::from_secret_key(SECP256K1, key))
            }
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPair::Secp256k1(_) => write!(f, "KeyPair::Secp256k1(..)"),
        }
    }
}

/// A public key for signature verification.
#[derive(Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// secp256k1 public key.
    Secp256k1(secp256k1::PublicKey),
}

impl PublicKey {
    /// Decode a compressed 33-byte secp256k1 public key.
    ///
    /// Rejects inputs of any other length up front.
    pub fn from_compressed(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != COMPRESSED_KEY_BYTES {
            return Err(CryptoError::InvalidKeyLength { actual: bytes.len() });
        }
        let key = secp256k1::PublicKey::from_slice(bytes).map_err(CryptoError::InvalidPublicKey)?;
        Ok(PublicKey::Secp256k1(key))
    }

    /// Encode as a compressed 33-byte key.
    pub fn encode_compressed(&self) -> [u8; COMPRESSED_KEY_BYTES] {
        match self {
            PublicKey::Secp256k1(key) => key.serialize(),
        }
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        match self {
            PublicKey::Secp256k1(key) => {
                let digest: [u8; 32] = Sha256::digest(message).into();
                let sig = match EcdsaSignature::from_compact(signature.as_bytes()) {
                    Ok(sig) => sig,
                    Err(_) => return false,
                };
                SECP256K1
                    .verify_ecdsa(&Message::from_digest(digest), &sig, key)
                    .is_ok()
            }
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicKey::Secp256k1(key) => {
                write!(f, "PublicKey::Secp256k1({})", hex::encode(key.serialize()))
            }
        }
    }
}

/// A compact ECDSA signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "serde_bytes")] Vec<u8>);

impl Signature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }

    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "Signature({}..)", &hex[..hex.len().min(16)])
    }
}

/// Errors that can occur when handling key material.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Public key has the wrong length.
    #[error("invalid signing public key, pubkey must be {COMPRESSED_KEY_BYTES} bytes long, but is {actual}")]
    InvalidKeyLength {
        /// Actual byte length of the rejected key.
        actual: usize,
    },

    /// Public key bytes do not decode to a curve point.
    #[error("invalid signing public key: {0}")]
    InvalidPublicKey(#[source] secp256k1::Error),

    /// Secret key bytes are out of range.
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(#[source] secp256k1::Error),
}
