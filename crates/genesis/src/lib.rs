//! Genesis assembly for the Keystone root chain.
//!
//! Bootstrapping runs in three phases: every root validator independently
//! assembles and signs a root genesis document over the same partition node
//! records ([`new_root_genesis`]), the documents are merged into one
//! ([`merge_root_genesis`]) or co-signed in place ([`add_signature`]), and
//! the finished document yields the per-partition bootstrap records and the
//! root trust base.

pub mod builder;
pub mod config;
pub mod merge;
pub mod root_genesis;

#[cfg(test)]
mod testutil;

pub use builder::new_root_genesis;
pub use config::{
    ConfigError, GenesisConfig, GenesisOption, DEFAULT_BLOCK_RATE_MS,
    DEFAULT_CONSENSUS_TIMEOUT_MS, GENESIS_TIME, MIN_BLOCK_RATE_MS, MIN_CONSENSUS_TIMEOUT_MS,
    ROOT_ROUND,
};
pub use merge::{add_signature, merge_root_genesis};
pub use root_genesis::{
    ConsensusParams, GenesisError, GenesisPartitionRecord, GenesisRootRecord, PartitionGenesis,
    RootGenesis, CONSENSUS_PARAMS_VERSION, GENESIS_PARTITION_VERSION, ROOT_GENESIS_VERSION,
};
