//! Trusted-dealer generation of key shares and round nonces.
//!
//! # Warning
//!
//! The dealer learns the full signing key and every round nonce. Shares must be delivered
//! to members over private channels.

use crate::schnorr::{
    primitives::{
        group::{self, NonceShare, Scalar, Share},
        poly, Error,
    },
    Quorum,
};
use rand_core::CryptoRngCore;
use tracing::debug;
use zeroize::Zeroizing;

/// Public information about a signing round's nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    /// The x-coordinate of `k * G` reduced modulo `n`.
    pub r: Scalar,
    /// Commitment to the nonce polynomial (its constant is `k * G`).
    pub commitment: poly::Public,
}

impl Nonce {
    /// Returns the nonce point `k * G`.
    pub fn public(&self) -> &group::Public {
        poly::public(&self.commitment)
    }
}

/// Generate shares and a commitment.
///
/// The secret polynomial has degree `threshold`, so any `threshold + 1` shares recover it.
pub fn generate_shares<R: CryptoRngCore>(
    rng: &mut R,
    quorum: &Quorum,
) -> (poly::Public, Vec<Share>) {
    // Generate a secret polynomial and commit to it
    let secret = Zeroizing::new(poly::new_from(quorum.threshold(), rng));
    let commitment = poly::Public::commit(&secret);

    // Evaluate the polynomial at each member's index
    let shares = quorum
        .indices()
        .map(|i| {
            let eval = secret.evaluate(i);
            Share {
                index: eval.index,
                private: eval.value,
            }
        })
        .collect::<Vec<_>>();
    (commitment, shares)
}

/// Generates a group public key, one share for each of `size` members, and the public
/// key share of each member.
///
/// Fails with [Error::InvalidThreshold] unless `1 <= threshold < size`.
pub fn keygen<R: CryptoRngCore>(
    rng: &mut R,
    size: u32,
    threshold: u32,
) -> Result<(group::Public, Vec<Share>, Vec<group::Public>), Error> {
    let quorum = Quorum::new(size, threshold)?;
    let (commitment, shares) = generate_shares(rng, &quorum);
    let public = *poly::public(&commitment);
    let public_shares = shares.iter().map(Share::public).collect();
    debug!(size, threshold, "generated key shares");
    Ok((public, shares, public_shares))
}

/// Verify that a share was issued on the committed polynomial.
pub fn verify_share(commitment: &poly::Public, share: &Share) -> Result<(), Error> {
    if share.index == 0 {
        return Err(Error::InvalidIndex(share.index));
    }
    let expected = commitment.evaluate(share.index).value;
    if expected != share.public() {
        return Err(Error::ShareWrongCommitment);
    }
    Ok(())
}

/// Deals shares of a fresh nonce `k` to every member of the quorum.
///
/// Every member receives the same `r`, so any `threshold + 1` of them produce partial
/// signatures that combine. A nonce whose `r` reduces to zero is redrawn.
pub fn deal_nonces<R: CryptoRngCore>(rng: &mut R, quorum: &Quorum) -> (Nonce, Vec<NonceShare>) {
    loop {
        let nonce = Zeroizing::new(poly::new_from(quorum.threshold(), rng));
        let commitment = poly::Public::commit(&nonce);
        let r = match poly::public(&commitment).x_scalar() {
            Some(r) if !r.is_zero() => r,
            _ => {
                debug!("nonce commitment reduced to zero, redrawing");
                continue;
            }
        };

        let shares = quorum
            .indices()
            .map(|i| NonceShare {
                index: i,
                private: nonce.evaluate(i).value,
                r,
            })
            .collect::<Vec<_>>();
        return (Nonce { r, commitment }, shares);
    }
}
