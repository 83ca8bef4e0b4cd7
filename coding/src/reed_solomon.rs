//! Reed-Solomon coding of arbitrary byte strings.
//!
//! The data is prefixed with its length (a big-endian `u64`), padded to `minimum_shards` shards
//! of equal, even size and extended with `extra_shards` recovery shards. Shard `i` for
//! `i < minimum_shards` is an original shard; the rest are recovery shards.

use crate::{Config, Error};
use reed_solomon_simd::{ReedSolomonDecoder, ReedSolomonEncoder};
use tracing::debug;

/// Size of the length prefix stored ahead of the data.
const LENGTH_PREFIX: usize = 8;

/// Encodes `data` into `config.total_shards()` shards.
pub fn encode(config: &Config, data: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    let k = config.minimum_shards.get() as usize;
    let m = config.extra_shards.get() as usize;

    // Prepend length for recovery
    let mut extended = Vec::with_capacity(LENGTH_PREFIX + data.len());
    extended.extend_from_slice(&(data.len() as u64).to_be_bytes());
    extended.extend_from_slice(data);

    // Compute shard size (even) and pad
    let mut shard_size = extended.len().div_ceil(k);
    if shard_size % 2 != 0 {
        shard_size += 1;
    }
    extended.resize(shard_size * k, 0);

    // Create original shards
    let mut shards = extended
        .chunks(shard_size)
        .map(<[u8]>::to_vec)
        .collect::<Vec<_>>();

    // Append recovery shards
    let mut encoder = ReedSolomonEncoder::new(k, m, shard_size)?;
    for shard in &shards {
        encoder.add_original_shard(shard)?;
    }
    let result = encoder.encode()?;
    shards.extend(result.recovery_iter().map(<[u8]>::to_vec));
    Ok(shards)
}

/// Decodes the data from `shards`, where a missing shard is `None`.
///
/// At least `minimum_shards` shards must be present. Every provided recovery shard is checked
/// against a re-encoding of the recovered data, so a corrupted shard is reported as
/// [Error::Inconsistent] whenever more than `minimum_shards` shards are available.
pub fn decode(config: &Config, shards: &[Option<Vec<u8>>]) -> Result<Vec<u8>, Error> {
    let k = config.minimum_shards.get() as usize;
    let m = config.extra_shards.get() as usize;
    if shards.len() != k + m {
        return Err(Error::ShardCountMismatch(config.total_shards(), shards.len()));
    }
    let present = shards.iter().flatten().count();
    if present < k {
        return Err(Error::NotEnoughShards(config.minimum_shards.get(), present));
    }

    // All present shards must share one even, non-zero size
    let shard_size = shards
        .iter()
        .flatten()
        .next()
        .map(Vec::len)
        .ok_or(Error::InvalidShardSize)?;
    if shard_size == 0 || shard_size % 2 != 0 {
        return Err(Error::InvalidShardSize);
    }
    if shards.iter().flatten().any(|shard| shard.len() != shard_size) {
        return Err(Error::InvalidShardSize);
    }
    let (provided_originals, provided_recoveries) = shards.split_at(k);

    // Restore missing originals
    let mut originals = provided_originals.to_vec();
    let missing = originals.iter().filter(|shard| shard.is_none()).count();
    if missing > 0 {
        let mut decoder = ReedSolomonDecoder::new(k, m, shard_size)?;
        for (i, shard) in provided_originals.iter().enumerate() {
            if let Some(shard) = shard {
                decoder.add_original_shard(i, shard)?;
            }
        }
        for (i, shard) in provided_recoveries.iter().enumerate() {
            if let Some(shard) = shard {
                decoder.add_recovery_shard(i, shard)?;
            }
        }
        let result = decoder.decode()?;
        for (i, shard) in result.restored_original_iter() {
            originals[i] = Some(shard.to_vec());
        }
        debug!(missing, "restored original shards");
    }
    let originals = originals
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(Error::Inconsistent)?;

    // Re-encode to check provided recovery shards
    let mut encoder = ReedSolomonEncoder::new(k, m, shard_size)?;
    for shard in &originals {
        encoder.add_original_shard(shard)?;
    }
    let result = encoder.encode()?;
    for (computed, provided) in result.recovery_iter().zip(provided_recoveries) {
        if let Some(provided) = provided {
            if computed != provided.as_slice() {
                return Err(Error::Inconsistent);
            }
        }
    }

    // Extract original data
    let data = originals.concat();
    let prefix = data.get(..LENGTH_PREFIX).ok_or(Error::InvalidDataLength)?;
    let mut length = [0u8; LENGTH_PREFIX];
    length.copy_from_slice(prefix);
    let length =
        usize::try_from(u64::from_be_bytes(length)).map_err(|_| Error::InvalidDataLength)?;
    let end = LENGTH_PREFIX
        .checked_add(length)
        .filter(|&end| end <= data.len())
        .ok_or(Error::InvalidDataLength)?;
    if data[end..].iter().any(|&b| b != 0) {
        return Err(Error::InvalidDataLength);
    }
    Ok(data[LENGTH_PREFIX..end].to_vec())
}
