//! Protocol constants and genesis configuration.

use keystone_types::HashAlgorithm;

/// Root-chain round number of the genesis round.
pub const ROOT_ROUND: u64 = 1;

/// Fixed UTC timestamp shared by all nodes at bootstrap.
pub const GENESIS_TIME: u64 = 1_735_689_600;

/// Minimum admissible block rate, milliseconds.
pub const MIN_BLOCK_RATE_MS: u32 = 100;

/// Default block rate, milliseconds.
pub const DEFAULT_BLOCK_RATE_MS: u32 = 900;

/// Minimum admissible consensus timeout, milliseconds.
pub const MIN_CONSENSUS_TIMEOUT_MS: u32 = 2000;

/// Default consensus timeout, milliseconds.
pub const DEFAULT_CONSENSUS_TIMEOUT_MS: u32 = 10_000;

/// Configuration for generating a root genesis document.
///
/// Seeded with defaults and adjusted through [`GenesisOption`]s.
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    /// The generating root validator's node id.
    pub node_id: String,

    /// Number of root validators expected to co-sign the finished document.
    pub total_root_validators: u32,

    /// Target block rate, milliseconds.
    pub block_rate_ms: u32,

    /// Consensus timeout, milliseconds.
    pub consensus_timeout_ms: u32,

    /// Hash algorithm for every tree and seal.
    pub hash_algorithm: HashAlgorithm,
}

/// One configuration adjustment applied over the defaults.
#[derive(Debug, Clone, Copy)]
pub enum GenesisOption {
    /// Expect this many root validators to co-sign.
    TotalRootValidators(u32),

    /// Override the block rate.
    BlockRateMs(u32),

    /// Override the consensus timeout.
    ConsensusTimeoutMs(u32),

    /// Override the hash algorithm.
    HashAlgorithm(HashAlgorithm),
}

impl GenesisConfig {
    /// Default configuration for a single-validator bootstrap.
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            total_root_validators: 1,
            block_rate_ms: DEFAULT_BLOCK_RATE_MS,
            consensus_timeout_ms: DEFAULT_CONSENSUS_TIMEOUT_MS,
            hash_algorithm: HashAlgorithm::Sha256,
        }
    }

    /// Apply an option.
    pub fn apply(&mut self, option: GenesisOption) {
        match option {
            GenesisOption::TotalRootValidators(n) => self.total_root_validators = n,
            GenesisOption::BlockRateMs(rate) => self.block_rate_ms = rate,
            GenesisOption::ConsensusTimeoutMs(timeout) => self.consensus_timeout_ms = timeout,
            GenesisOption::HashAlgorithm(algorithm) => self.hash_algorithm = algorithm,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::NodeIdIsEmpty);
        }
        if self.total_root_validators < 1 {
            return Err(ConfigError::InvalidNumberOfRootValidators);
        }
        validate_timing(self.block_rate_ms, self.consensus_timeout_ms)
    }
}

/// Validate the block rate and consensus timeout pair.
///
/// The consensus timeout must exceed the block rate by the minimum
/// timeout slack, otherwise a round could time out before a single block
/// fits.
pub fn validate_timing(block_rate_ms: u32, consensus_timeout_ms: u32) -> Result<(), ConfigError> {
    if consensus_timeout_ms < MIN_CONSENSUS_TIMEOUT_MS {
        return Err(ConfigError::InvalidConsensusTimeout {
            min: MIN_CONSENSUS_TIMEOUT_MS,
        });
    }
    if block_rate_ms < MIN_BLOCK_RATE_MS {
        return Err(ConfigError::InvalidBlockRate {
            min: MIN_BLOCK_RATE_MS,
        });
    }
    if block_rate_ms + MIN_CONSENSUS_TIMEOUT_MS > consensus_timeout_ms {
        return Err(ConfigError::ConsensusTimeoutTooTight {
            min: MIN_CONSENSUS_TIMEOUT_MS,
        });
    }
    Ok(())
}

/// Errors from genesis configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The generating validator's node id is empty.
    #[error("node identifier is empty")]
    NodeIdIsEmpty,

    /// No signer was provided.
    #[error("signer is nil")]
    SignerIsNil,

    /// Fewer than one root validator requested.
    #[error("invalid number of root validators")]
    InvalidNumberOfRootValidators,

    /// Consensus timeout below the protocol minimum.
    #[error("invalid consensus timeout, must be at least {min}")]
    InvalidConsensusTimeout {
        /// The protocol minimum.
        min: u32,
    },

    /// Block rate below the protocol minimum.
    #[error("invalid block rate, must be at least {min}")]
    InvalidBlockRate {
        /// The protocol minimum.
        min: u32,
    },

    /// The timeout leaves no room for a block inside the round.
    #[error("invalid consensus timeout, must be at least block rate + {min}")]
    ConsensusTimeoutTooTight {
        /// Required slack beyond the block rate.
        min: u32,
    },
}
