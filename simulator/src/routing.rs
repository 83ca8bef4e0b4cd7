//! Erasure-coded routing tables for a ring of simulated quorums.

use quorum_coding::{
    routing::{decode_routing_table, encode_routing_table, Ring, RoutingTable},
    Config, Error,
};
use rand::{seq::index::sample, Rng};
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of encoding a quorum's routing table and recovering it after losing shards.
#[derive(Debug)]
pub struct Recovery {
    pub ring: Ring,
    pub quorum: u64,
    pub table: RoutingTable,
    pub lost: Vec<usize>,
    pub recovered: Result<RoutingTable, Error>,
    pub encode: Duration,
    pub decode: Duration,
}

impl Recovery {
    /// Returns true if the recovered table matches the original.
    pub fn valid(&self) -> bool {
        matches!(&self.recovered, Ok(table) if table == &self.table)
    }
}

/// Places `quorums` quorums at random on a ring of `2^bits` identifiers.
pub fn random_ring<R: Rng>(rng: &mut R, bits: u32, quorums: usize) -> Result<Ring, Error> {
    let size = usize::try_from(1u64 << bits.min(63))
        .map_err(|_| Error::InvalidRing("ring too large"))?;
    if quorums == 0 || quorums > size {
        return Err(Error::InvalidRing("quorum count does not fit the ring"));
    }
    let ids = sample(rng, size, quorums)
        .into_iter()
        .map(|id| id as u64)
        .collect();
    Ring::new(bits, ids)
}

/// Encodes the routing table of the first quorum on `ring`, loses `lost` random shards and
/// decodes what remains.
pub fn recover<R: Rng>(
    rng: &mut R,
    ring: Ring,
    config: Config,
    lost: usize,
) -> Result<Recovery, Error> {
    let quorum = ring.ids()[0];
    let table = ring.routing_table(quorum);
    debug!(quorum, fingers = ?ring.fingers(quorum), "built finger table");

    let start = Instant::now();
    let mut encoded = encode_routing_table(&table, config)?;
    let encode = start.elapsed();

    let total = encoded.shards.len();
    let mut lost = sample(rng, total, lost.min(total)).into_vec();
    lost.sort_unstable();
    for &index in &lost {
        encoded.lose(index);
    }

    let start = Instant::now();
    let recovered = decode_routing_table(&encoded);
    let decode = start.elapsed();
    Ok(Recovery {
        ring,
        quorum,
        table,
        lost,
        recovered,
        encode,
        decode,
    })
}
