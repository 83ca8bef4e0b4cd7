//! Threshold Schnorr signatures over secp256r1 (NIST P-256).
//!
//! A trusted dealer splits a signing key into `size` shares with [Shamir's Secret
//! Sharing](https://en.wikipedia.org/wiki/Shamir%27s_secret_sharing) such that any
//! `threshold + 1` of them can jointly produce a signature that verifies against the
//! single group public key, while `threshold` or fewer learn nothing about the key.
//!
//! Signing rounds use a nonce dealt the same way, so every subset of the quorum that
//! signs in a round commits to the same `r`.

pub mod dealer;
pub mod primitives;

pub use primitives::Error;
use quorum_utils::default_threshold;
use std::ops::RangeInclusive;

/// The size and fault tolerance of a group of signers.
///
/// A quorum of `size` members with threshold `t` issues shares on a polynomial of degree `t`
/// and requires `t + 1` partial signatures to produce a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Quorum {
    size: u32,
    threshold: u32,
}

impl Quorum {
    /// Creates a new quorum, requiring `1 <= threshold < size`.
    pub fn new(size: u32, threshold: u32) -> Result<Self, Error> {
        if threshold == 0 || threshold >= size {
            return Err(Error::InvalidThreshold(threshold, size));
        }
        Ok(Self { size, threshold })
    }

    /// Creates a quorum with the default threshold (`size / 3`).
    pub fn with_default_threshold(size: u32) -> Result<Self, Error> {
        let threshold = default_threshold(size).ok_or(Error::InvalidThreshold(0, size))?;
        Self::new(size, threshold)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Number of partial signatures required to produce a signature.
    pub fn required(&self) -> u32 {
        self.threshold + 1
    }

    /// Returns true if `index` belongs to a member of the quorum.
    pub fn contains(&self, index: u32) -> bool {
        (1..=self.size).contains(&index)
    }

    /// Indices of all members.
    pub fn indices(&self) -> RangeInclusive<u32> {
        1..=self.size
    }
}
