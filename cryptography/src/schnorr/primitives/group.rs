//! Group operations over the secp256r1 (NIST P-256) scalar field.
//!
//! This module implements basic group operations over P-256 elements,
//! including scalar arithmetic modulo the group order `n`, point addition,
//! and scalar multiplication.
//!
//! # Warning
//!
//! Points received from untrusted sources must be decoded with [Element::deserialize],
//! which rejects encodings that are not on the curve as well as the point at infinity.

use p256::{
    elliptic_curve::{
        bigint::U256,
        group::Group,
        ops::Reduce,
        point::AffineCoordinates,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Field, PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint,
};
use rand_core::CryptoRngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An element of a group.
pub trait Element: Copy + Clone + Eq + PartialEq + Send + Sync + fmt::Debug {
    /// Returns the additive identity.
    fn zero() -> Self;

    /// Returns the multiplicative identity (the generator for points).
    fn one() -> Self;

    /// Adds to self in-place.
    fn add(&mut self, rhs: &Self);

    /// Multiplies self in-place.
    fn mul(&mut self, rhs: &Scalar);

    /// Canonically serializes the element.
    fn serialize(&self) -> Vec<u8>;

    /// Serialized size of the element.
    fn size() -> usize;

    /// Deserializes a canonically encoded element.
    fn deserialize(bytes: &[u8]) -> Option<Self>;
}

/// An element of `Z_n`, where `n` is the order of the P-256 group.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(transparent)]
pub struct Scalar(p256::Scalar);

pub const SCALAR_LENGTH: usize = 32;

/// A point on P-256 (kept in projective coordinates).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(transparent)]
pub struct Point(ProjectivePoint);

/// SEC1 compressed encoding (Y-Parity || X).
pub const POINT_LENGTH: usize = 33;

pub type Private = Scalar;
pub const PRIVATE_KEY_LENGTH: usize = SCALAR_LENGTH;
pub type Public = Point;
pub const PUBLIC_KEY_LENGTH: usize = POINT_LENGTH;

/// Reduces a big-endian 32-byte string modulo `n`.
fn reduce(bytes: &FieldBytes) -> p256::Scalar {
    <p256::Scalar as Reduce<U256>>::reduce_bytes(bytes)
}

impl Scalar {
    /// Generates a uniformly random, non-zero scalar using the provided RNG.
    pub fn from_rand<R: CryptoRngCore>(rng: &mut R) -> Self {
        loop {
            let candidate = p256::Scalar::random(&mut *rng);
            if !bool::from(candidate.is_zero()) {
                return Self(candidate);
            }
        }
    }

    /// Embeds a peer index (the x-coordinate of an evaluation) into the field.
    pub fn from_index(index: u32) -> Self {
        Self(p256::Scalar::from(index as u64))
    }

    /// Interprets a 32-byte digest as a big-endian integer and reduces it modulo `n`.
    pub fn from_digest(digest: &[u8; SCALAR_LENGTH]) -> Self {
        Self(reduce(&FieldBytes::from(*digest)))
    }

    /// Returns true if the scalar is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero().into()
    }

    /// Computes the inverse of the scalar.
    ///
    /// Returns `None` if the scalar is zero (no inverse exists).
    pub fn inverse(&self) -> Option<Self> {
        Option::<p256::Scalar>::from(self.0.invert()).map(Self)
    }

    /// Subtracts the provided scalar from self in-place.
    pub fn sub(&mut self, rhs: &Self) {
        self.0 -= rhs.0;
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Element for Scalar {
    fn zero() -> Self {
        Self(p256::Scalar::ZERO)
    }

    fn one() -> Self {
        Self(p256::Scalar::ONE)
    }

    fn add(&mut self, rhs: &Self) {
        self.0 += rhs.0;
    }

    fn mul(&mut self, rhs: &Self) {
        self.0 *= rhs.0;
    }

    fn serialize(&self) -> Vec<u8> {
        self.0.to_repr().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SCALAR_LENGTH {
            return None;
        }

        // Rejects any value >= n
        let repr = FieldBytes::clone_from_slice(bytes);
        Option::<p256::Scalar>::from(p256::Scalar::from_repr(repr)).map(Self)
    }

    fn size() -> usize {
        SCALAR_LENGTH
    }
}

impl Point {
    /// Returns true if the point is the point at infinity.
    pub fn is_identity(&self) -> bool {
        self.0.is_identity().into()
    }

    /// Returns the affine x-coordinate of the point reduced modulo `n`.
    ///
    /// The point at infinity has no affine coordinates, so `None` is returned.
    pub fn x_scalar(&self) -> Option<Scalar> {
        if self.is_identity() {
            return None;
        }
        let affine = AffinePoint::from(self.0);
        Some(Scalar(reduce(&affine.x())))
    }

    /// Subtracts the provided point from self in-place.
    pub fn sub(&mut self, rhs: &Self) {
        self.0 -= rhs.0;
    }
}

impl Element for Point {
    fn zero() -> Self {
        Self(ProjectivePoint::IDENTITY)
    }

    fn one() -> Self {
        Self(ProjectivePoint::GENERATOR)
    }

    fn add(&mut self, rhs: &Self) {
        self.0 += rhs.0;
    }

    fn mul(&mut self, rhs: &Scalar) {
        self.0 *= rhs.0;
    }

    fn serialize(&self) -> Vec<u8> {
        AffinePoint::from(self.0)
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != POINT_LENGTH {
            return None;
        }

        // Only the compressed tags are canonical (SEC1 also admits a compact 0x05 form)
        if bytes[0] != 0x02 && bytes[0] != 0x03 {
            return None;
        }
        let encoded = EncodedPoint::from_bytes(bytes).ok()?;

        // Verify that the encoding is on the curve
        let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))?;
        let point = Self(ProjectivePoint::from(affine));

        // Verify that the deserialized element isn't infinite
        if point.is_identity() {
            return None;
        }
        Some(point)
    }

    fn size() -> usize {
        POINT_LENGTH
    }
}

/// A share of a threshold signing key.
///
/// The share is zeroized when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    /// The share's index in the polynomial (1-based, index 0 is the secret itself).
    pub index: u32,
    /// The scalar corresponding to the share's secret.
    pub private: Private,
}

impl Share {
    /// Returns the public key corresponding to the share.
    ///
    /// This can be verified against the public polynomial.
    pub fn public(&self) -> Public {
        let mut public = <Public as Element>::one();
        public.mul(&self.private);
        public
    }

    /// Canonically serializes the share.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + SCALAR_LENGTH);
        bytes.extend_from_slice(&self.index.to_be_bytes());
        bytes.extend_from_slice(&self.private.serialize());
        bytes
    }

    /// Deserializes a canonically encoded share.
    pub fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SCALAR_LENGTH + 4 {
            return None;
        }
        let index = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let private = Private::deserialize(&bytes[4..])?;
        Some(Self { index, private })
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// One peer's share of a signing round's nonce.
///
/// Every peer in a round holds a share of the same nonce `k` and therefore
/// the same `r`. A nonce share cannot be cloned: signing consumes it, so it is
/// used at most once. It is zeroized when dropped.
#[derive(PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct NonceShare {
    /// The index of the peer holding this share (matches [Share::index]).
    pub index: u32,
    /// The peer's evaluation of the nonce polynomial.
    pub private: Scalar,
    /// The x-coordinate of `k * G` reduced modulo `n` (identical for all peers in the round).
    pub r: Scalar,
}

impl NonceShare {
    /// Returns the public nonce point of this peer (`k_i * G`).
    pub fn public(&self) -> Point {
        let mut public = Point::one();
        public.mul(&self.private);
        public
    }
}

impl fmt::Debug for NonceShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceShare")
            .field("index", &self.index)
            .field("r", &self.r)
            .finish_non_exhaustive()
    }
}
