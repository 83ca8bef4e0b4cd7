//! Encode quorum routing tables so that any `minimum_shards` of their shards recover them.
//!
//! A quorum's routing table is serialized, split into `minimum_shards` original shards and
//! extended with `extra_shards` recovery shards using Reed-Solomon coding. Shards can then be
//! spread across the quorum's peers, and the table survives the loss of up to `extra_shards`
//! of them.
//!
//! # Status
//!
//! `quorum-coding` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU16;
use thiserror::Error;

pub mod reed_solomon;
pub mod routing;

/// Errors that can occur when encoding or decoding.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reed-solomon error: {0}")]
    ReedSolomon(#[from] reed_solomon_simd::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("shard count mismatch: expected {0}, got {1}")]
    ShardCountMismatch(u32, usize),
    #[error("not enough shards: need {0}, have {1}")]
    NotEnoughShards(u16, usize),
    #[error("invalid shard size")]
    InvalidShardSize,
    #[error("shards are inconsistent")]
    Inconsistent,
    #[error("invalid data length")]
    InvalidDataLength,
    #[error("invalid ring: {0}")]
    InvalidRing(&'static str),
}

/// Configuration of a Reed-Solomon encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Config {
    /// The minimum number of shards needed to recover the data.
    pub minimum_shards: NonZeroU16,
    /// Recovery shards produced beyond the minimum.
    ///
    /// Specifying `extra_shards` rather than the total avoids checking that
    /// `minimum_shards <= total`.
    pub extra_shards: NonZeroU16,
}

impl Config {
    pub fn new(minimum_shards: NonZeroU16, extra_shards: NonZeroU16) -> Self {
        Self {
            minimum_shards,
            extra_shards,
        }
    }

    /// Returns the total number of shards produced by this configuration.
    pub fn total_shards(&self) -> u32 {
        u32::from(self.minimum_shards.get()) + u32::from(self.extra_shards.get())
    }
}
