//! Chord routing between quorums and erasure-coded routing tables.
//!
//! Quorums sit on a ring of `2^bits` identifiers. The `i`-th finger of quorum `id` is the first
//! quorum at or after `(id + 2^i) mod 2^bits`, wrapping around to the smallest identifier.

use crate::{reed_solomon, Config, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Largest supported ring, in bits.
pub const MAX_RING_BITS: u32 = 63;

/// Maps the start of each finger interval to the quorum that serves it.
pub type RoutingTable = BTreeMap<String, String>;

/// Identifiers of the quorums on a ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    bits: u32,
    ids: Vec<u64>,
}

impl Ring {
    /// Creates a ring of `2^bits` identifiers holding `ids`.
    ///
    /// Identifiers must be unique and smaller than `2^bits`. They are kept sorted.
    pub fn new(bits: u32, mut ids: Vec<u64>) -> Result<Self, Error> {
        if bits == 0 || bits > MAX_RING_BITS {
            return Err(Error::InvalidRing("ring bits out of range"));
        }
        if ids.is_empty() {
            return Err(Error::InvalidRing("no quorums"));
        }
        let size = 1u64 << bits;
        if ids.iter().any(|&id| id >= size) {
            return Err(Error::InvalidRing("identifier outside of ring"));
        }
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::InvalidRing("duplicate identifier"));
        }
        Ok(Self { bits, ids })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of identifiers on the ring.
    pub fn size(&self) -> u64 {
        1 << self.bits
    }

    /// Sorted identifiers of the quorums on the ring.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Returns the first quorum at or after `start`, wrapping around the ring.
    pub fn successor(&self, start: u64) -> u64 {
        let i = self.ids.partition_point(|&id| id < start);
        self.ids.get(i).copied().unwrap_or(self.ids[0])
    }

    /// Returns the finger table of quorum `id`, one successor per bit.
    pub fn fingers(&self, id: u64) -> Vec<u64> {
        (0..self.bits)
            .map(|i| self.successor(self.finger_start(id, i)))
            .collect()
    }

    /// Returns the routing table of quorum `id`.
    pub fn routing_table(&self, id: u64) -> RoutingTable {
        (0..self.bits)
            .map(|i| {
                let start = self.finger_start(id, i);
                (start.to_string(), format!("Q{}", self.successor(start)))
            })
            .collect()
    }

    fn finger_start(&self, id: u64, i: u32) -> u64 {
        id.wrapping_add(1 << i) & (self.size() - 1)
    }
}

/// A routing table split into shards, where a lost shard is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedRoutingTable {
    pub config: Config,
    pub shards: Vec<Option<Vec<u8>>>,
}

impl EncodedRoutingTable {
    /// Marks the shard at `index` as lost.
    pub fn lose(&mut self, index: usize) {
        if let Some(shard) = self.shards.get_mut(index) {
            *shard = None;
        }
    }

    /// Number of shards still available.
    pub fn available(&self) -> usize {
        self.shards.iter().flatten().count()
    }
}

/// Serializes `table` and encodes it into `config.total_shards()` shards.
pub fn encode_routing_table(
    table: &RoutingTable,
    config: Config,
) -> Result<EncodedRoutingTable, Error> {
    let data = serde_json::to_vec(table)?;
    let shards = reed_solomon::encode(&config, &data)?;
    debug!(
        entries = table.len(),
        bytes = data.len(),
        shards = shards.len(),
        "encoded routing table"
    );
    Ok(EncodedRoutingTable {
        config,
        shards: shards.into_iter().map(Some).collect(),
    })
}

/// Recovers a routing table from the shards that remain.
pub fn decode_routing_table(encoded: &EncodedRoutingTable) -> Result<RoutingTable, Error> {
    let data = reed_solomon::decode(&encoded.config, &encoded.shards)?;
    Ok(serde_json::from_slice(&data)?)
}
