//! Operations over the secp256r1 (NIST P-256) scalar field and curve.
//!
//! # Acknowledgements
//!
//! _The following crates were used as a reference when implementing this crate. If code is very similar
//! to the reference, it is accompanied by a comment and link._
//!
//! * <https://github.com/celo-org/celo-threshold-bls-rs>: Polynomial evaluation and recovery over a scalar field.
//! * <https://github.com/RustCrypto/elliptic-curves>: Scalar and point arithmetic over P-256.
//!
//! # Example
//!
//! ```rust
//! use quorum_cryptography::schnorr::{
//!     dealer::{deal_nonces, generate_shares},
//!     primitives::{ops::{combine, partial_sign, partial_verify, verify}, poly},
//!     Quorum,
//! };
//! use rand::rngs::OsRng;
//!
//! // Configure a quorum of 5 peers where any 2 can sign
//! let quorum = Quorum::new(5, 1).unwrap();
//!
//! // Generate commitment and shares
//! let (commitment, shares) = generate_shares(&mut OsRng, &quorum);
//! let public = poly::public(&commitment);
//!
//! // Agree on a nonce for this round
//! let (nonce, nonce_shares) = deal_nonces(&mut OsRng, &quorum);
//!
//! // Generate partial signatures from peers 1 and 3
//! let namespace = Some(&b"demo"[..]);
//! let message = b"REQUEST|abc|123";
//! let partials: Vec<_> = shares
//!     .iter()
//!     .zip(nonce_shares)
//!     .filter(|(share, _)| share.index == 1 || share.index == 3)
//!     .map(|(share, nonce)| partial_sign(&quorum, public, share, nonce, namespace, message).unwrap())
//!     .collect();
//!
//! // Verify partial signatures
//! for p in &partials {
//!     assert!(partial_verify(&commitment, &nonce.commitment, namespace, message, p));
//! }
//!
//! // Combine partial signatures
//! let signature = combine(&quorum, &partials).unwrap();
//!
//! // Verify threshold signature
//! assert!(verify(public, namespace, message, &signature).unwrap());
//! ```

pub mod group;
pub mod ops;
pub mod poly;

use thiserror::Error;

/// Errors that can occur when working with threshold Schnorr primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid scalar")]
    InvalidScalar,
    #[error("invalid point")]
    InvalidPoint,
    #[error("insufficient shares: need {0}, got {1}")]
    InsufficientShares(u32, usize),
    #[error("duplicate index: {0}")]
    DuplicateIndex(u32),
    #[error("quorum not met: need {0}, got {1}")]
    QuorumNotMet(u32, usize),
    #[error("signing error: {0}")]
    SigningError(&'static str),
    #[error("malformed signature")]
    MalformedSignature,
    #[error("invalid threshold: {0} (quorum size {1})")]
    InvalidThreshold(u32, u32),
    #[error("invalid index: {0}")]
    InvalidIndex(u32),
    #[error("partial signatures disagree on nonce")]
    NonceMismatch,
    #[error("share does not match commitment")]
    ShareWrongCommitment,
}
