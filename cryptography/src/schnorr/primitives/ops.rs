//! Schnorr signatures over P-256 with an x-only nonce commitment, produced by
//! a single signer or by any `threshold + 1` members of a [Quorum].
//!
//! # Challenge
//!
//! The challenge binds the nonce, the public key, and the (optionally namespaced) message:
//!
//! `e = SHA-256(DST || r || P || payload) mod n`
//!
//! where `r` is the big-endian x-coordinate of the nonce point reduced modulo `n`, `P` is the
//! SEC1-compressed public key, and `payload` is [quorum_utils::union_unique] of the namespace and
//! message (or just the message when no namespace is provided).
//!
//! # Threshold Signing
//!
//! Each peer `i` holds a share `x_i` of the secret and a share `k_i` of a round nonce (see
//! [crate::schnorr::dealer::deal_nonces]). It emits `s_i = k_i + e * x_i`. Because both `x_i` and
//! `k_i` lie on polynomials of degree `threshold`, so does `s_i`, and interpolating any
//! `threshold + 1` of them at zero yields `s = k + e * x`.

use super::{
    group::{self, Element, NonceShare, Point, Scalar, Share, SCALAR_LENGTH},
    poly::{self, compute_weights, interpolate_with_weights, prepare_evaluations, Eval},
    Error,
};
use crate::schnorr::Quorum;
use quorum_utils::union_unique;
use rand_core::CryptoRngCore;
use rayon::{prelude::*, ThreadPoolBuilder};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use tracing::debug;
use zeroize::Zeroizing;

/// Domain separation tag prepended to every challenge.
pub const CHALLENGE_DST: &[u8] = b"QUORUM_SCHNORR_P256_SHA256_CHALLENGE_";

/// Length of a serialized [Signature] (`r || s`).
pub const SIGNATURE_LENGTH: usize = 2 * SCALAR_LENGTH;

/// A signature over a message that can be verified with a single public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: Scalar,
    pub s: Scalar,
}

impl Signature {
    /// Canonically serializes the signature as `r || s`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SIGNATURE_LENGTH);
        bytes.extend_from_slice(&self.r.serialize());
        bytes.extend_from_slice(&self.s.serialize());
        bytes
    }

    /// Deserializes a canonically encoded signature.
    ///
    /// Either half being zero or not less than the group order is rejected.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(Error::MalformedSignature);
        }
        let r = Scalar::deserialize(&bytes[..SCALAR_LENGTH]).ok_or(Error::MalformedSignature)?;
        let s = Scalar::deserialize(&bytes[SCALAR_LENGTH..]).ok_or(Error::MalformedSignature)?;
        if r.is_zero() || s.is_zero() {
            return Err(Error::MalformedSignature);
        }
        Ok(Self { r, s })
    }
}

/// A signature produced by a single member of a quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialSignature {
    /// Index of the signing peer.
    pub index: u32,
    /// Shared nonce commitment of the round.
    pub r: Scalar,
    /// The peer's response `k_i + e * x_i`.
    pub s: Scalar,
}

impl PartialSignature {
    /// Returns the response as an evaluation of the signing polynomial.
    pub fn eval(&self) -> Eval<Scalar> {
        Eval {
            index: self.index,
            value: self.s,
        }
    }
}

/// Computes the public key from the private key.
pub fn compute_public(private: &Scalar) -> group::Public {
    let mut public = group::Public::one();
    public.mul(private);
    public
}

/// Returns a new keypair derived from the provided randomness.
pub fn keypair<R: CryptoRngCore>(rng: &mut R) -> (group::Private, group::Public) {
    let private = group::Private::from_rand(rng);
    let public = compute_public(&private);
    (private, public)
}

/// Computes the challenge `e` for the provided nonce commitment, public key, and message.
pub fn challenge(
    r: &Scalar,
    public: &group::Public,
    namespace: Option<&[u8]>,
    message: &[u8],
) -> Scalar {
    let payload = match namespace {
        Some(namespace) => Cow::Owned(union_unique(namespace, message)),
        None => Cow::Borrowed(message),
    };
    let mut hasher = Sha256::new();
    hasher.update(CHALLENGE_DST);
    hasher.update(r.serialize());
    hasher.update(public.serialize());
    hasher.update(&payload);
    let digest: [u8; SCALAR_LENGTH] = hasher.finalize().into();
    Scalar::from_digest(&digest)
}

/// Computes `k + e * x`.
fn response(nonce: &Scalar, challenge: &Scalar, private: &Scalar) -> Scalar {
    let mut s = *challenge;
    s.mul(private);
    s.add(nonce);
    s
}

/// Signs the provided message with the private key using the provided nonce.
///
/// # Warning
///
/// Reusing a nonce for two different messages reveals the private key. Prefer [sign], which
/// samples a fresh nonce for every call.
pub fn sign_with_nonce(
    private: &group::Private,
    nonce: &Scalar,
    namespace: Option<&[u8]>,
    message: &[u8],
) -> Result<Signature, Error> {
    if private.is_zero() || nonce.is_zero() {
        return Err(Error::InvalidScalar);
    }
    let r = compute_public(nonce)
        .x_scalar()
        .ok_or(Error::InvalidPoint)?;
    if r.is_zero() {
        return Err(Error::SigningError("nonce commitment is zero"));
    }
    let e = challenge(&r, &compute_public(private), namespace, message);
    let s = response(nonce, &e, private);
    if s.is_zero() {
        return Err(Error::SigningError("response is zero"));
    }
    Ok(Signature { r, s })
}

/// Signs the provided message with the private key.
pub fn sign<R: CryptoRngCore>(
    rng: &mut R,
    private: &group::Private,
    namespace: Option<&[u8]>,
    message: &[u8],
) -> Result<Signature, Error> {
    if private.is_zero() {
        return Err(Error::InvalidScalar);
    }
    loop {
        let nonce = Zeroizing::new(Scalar::from_rand(rng));
        match sign_with_nonce(private, &nonce, namespace, message) {
            Ok(signature) => return Ok(signature),
            Err(Error::SigningError(reason)) => debug!(reason, "redrawing nonce"),
            Err(err) => return Err(err),
        }
    }
}

/// Verifies the signature with the provided public key.
///
/// Returns `Ok(false)` if the signature does not match (including when `s * G - e * P` is the point
/// at infinity) and [Error::MalformedSignature] if either half of the signature is zero.
pub fn verify(
    public: &group::Public,
    namespace: Option<&[u8]>,
    message: &[u8],
    signature: &Signature,
) -> Result<bool, Error> {
    if signature.r.is_zero() || signature.s.is_zero() {
        return Err(Error::MalformedSignature);
    }
    if public.is_identity() {
        return Ok(false);
    }

    // R' = s * G - e * P
    let e = challenge(&signature.r, public, namespace, message);
    let mut commitment = compute_public(&signature.s);
    let mut scaled = *public;
    scaled.mul(&e);
    commitment.sub(&scaled);

    Ok(commitment.x_scalar() == Some(signature.r))
}

/// Signs the provided message with a member's key share and its share of the round nonce.
///
/// The nonce share is consumed so that it cannot be used to sign a second message.
pub fn partial_sign(
    quorum: &Quorum,
    public: &group::Public,
    share: &Share,
    nonce: NonceShare,
    namespace: Option<&[u8]>,
    message: &[u8],
) -> Result<PartialSignature, Error> {
    if !quorum.contains(share.index) {
        return Err(Error::SigningError("share index outside of quorum"));
    }
    if share.private.is_zero() {
        return Err(Error::SigningError("share is zero"));
    }
    if nonce.index != share.index {
        return Err(Error::SigningError("nonce share belongs to another peer"));
    }
    if nonce.r.is_zero() {
        return Err(Error::SigningError("nonce commitment is zero"));
    }

    let e = challenge(&nonce.r, public, namespace, message);
    let s = response(&nonce.private, &e, &share.private);
    Ok(PartialSignature {
        index: share.index,
        r: nonce.r,
        s,
    })
}

/// Produces a partial signature for each `(share, nonce)` pair, in order.
///
/// Signing is spread over a thread pool of `concurrency` threads (if greater than 1).
pub fn partial_sign_batch(
    quorum: &Quorum,
    public: &group::Public,
    signers: Vec<(&Share, NonceShare)>,
    namespace: Option<&[u8]>,
    message: &[u8],
    concurrency: usize,
) -> Result<Vec<PartialSignature>, Error> {
    // If concurrency is not required, sign sequentially
    let concurrency = std::cmp::min(concurrency, signers.len());
    if concurrency <= 1 {
        return signers
            .into_iter()
            .map(|(share, nonce)| partial_sign(quorum, public, share, nonce, namespace, message))
            .collect();
    }

    // Build a thread pool with the specified concurrency
    let pool = ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .build()
        .expect("Unable to build thread pool");

    // Sign in parallel
    pool.install(move || {
        signers
            .into_par_iter()
            .map(|(share, nonce)| partial_sign(quorum, public, share, nonce, namespace, message))
            .collect()
    })
}

/// Verifies a partial signature against the public polynomial and the round's nonce commitment.
///
/// Checks `s_i * G == R_i + e * X_i`, where `X_i` and `R_i` are the evaluations of the key and
/// nonce commitments at the signer's index.
pub fn partial_verify(
    public: &poly::Public,
    nonce: &poly::Public,
    namespace: Option<&[u8]>,
    message: &[u8],
    partial: &PartialSignature,
) -> bool {
    if partial.index == 0 {
        return false;
    }
    if poly::public(nonce).x_scalar() != Some(partial.r) {
        return false;
    }

    let e = challenge(&partial.r, poly::public(public), namespace, message);
    let mut expected = public.evaluate(partial.index).value;
    expected.mul(&e);
    expected.add(&nonce.evaluate(partial.index).value);
    compute_public(&partial.s) == expected
}

/// Combines at least `threshold + 1` partial signatures into a [Signature].
///
/// Partial signatures are sorted by index and the lowest `threshold + 1` are interpolated,
/// so two invocations over the same partial signatures produce the same signature. The
/// nonce commitment is taken from the lowest-index signer and every partial signature
/// must agree with it.
pub fn combine<'a, I>(quorum: &Quorum, partials: I) -> Result<Signature, Error>
where
    I: IntoIterator<Item = &'a PartialSignature>,
{
    let partials = partials.into_iter().collect::<Vec<_>>();
    let required = quorum.required();
    if partials.len() < required as usize {
        return Err(Error::QuorumNotMet(required, partials.len()));
    }
    if let Some(partial) = partials.iter().find(|p| !quorum.contains(p.index)) {
        return Err(Error::InvalidIndex(partial.index));
    }

    // Select evaluations
    let evals = partials.iter().map(|p| p.eval()).collect::<Vec<_>>();
    let selected = prepare_evaluations(required, &evals)?;

    // Every signer must have used the designated signer's nonce
    let r = partials
        .iter()
        .min_by_key(|p| p.index)
        .map(|p| p.r)
        .ok_or(Error::QuorumNotMet(required, 0))?;
    if let Some(partial) = partials.iter().find(|p| p.r != r) {
        debug!(index = partial.index, "partial signature used a different nonce");
        return Err(Error::NonceMismatch);
    }

    // Interpolate at zero
    let indices = selected.iter().map(|e| e.index).collect::<Vec<_>>();
    let weights = compute_weights(&indices, &Scalar::zero())?;
    let s = interpolate_with_weights(&weights, selected)?;
    if s.is_zero() {
        return Err(Error::InvalidScalar);
    }
    Ok(Signature { r, s })
}

/// Computes the public key share of the member at `index` from the public polynomial.
pub fn public_share(public: &poly::Public, index: u32) -> Point {
    public.evaluate(index).value
}
