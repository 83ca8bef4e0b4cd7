//! Polynomial operations over the P-256 scalar field.
//!
//! # Warning
//!
//! The security of the polynomial operations is critical for the overall
//! security of the threshold scheme. A private polynomial's constant term is
//! the shared secret: it must never leave the dealer and should be wrapped in
//! [zeroize::Zeroizing] while it is alive.

use crate::schnorr::primitives::{
    group::{self, Element, Scalar},
    Error,
};
use rand_core::CryptoRngCore;
use std::{collections::BTreeMap, fmt};
use zeroize::Zeroize;

/// Private polynomials are used to generate secret shares.
pub type Private = Poly<group::Private>;

/// Public polynomials represent commitments to secrets on a private polynomial.
pub type Public = Poly<group::Public>;

/// A polynomial evaluation at a specific index.
///
/// The index is the x-coordinate of the evaluation (peer indices start at 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eval<C: Element> {
    pub index: u32,
    pub value: C,
}

/// A polynomial that is using a scalar for the variable x and a generic
/// element for the coefficients.
///
/// The coefficients must be able to multiply the type of the variable,
/// which is always a scalar.
#[derive(Clone, PartialEq, Eq)]
pub struct Poly<C>(Vec<C>);

/// Returns a new scalar polynomial of the given degree where each coefficient is
/// sampled at random from the provided RNG.
///
/// In the context of secret sharing, the threshold is the degree (a signing round
/// requires degree + 1 evaluations).
pub fn new_from<R: CryptoRngCore>(degree: u32, rng: &mut R) -> Poly<Scalar> {
    let coeffs = (0..=degree).map(|_| Scalar::from_rand(rng)).collect::<Vec<_>>();
    Poly::<Scalar>(coeffs)
}

/// Returns a new scalar polynomial of the given degree with the constant term set to
/// `constant` and every other coefficient sampled at random from the provided RNG.
pub fn new_with_constant<R: CryptoRngCore>(
    degree: u32,
    constant: Scalar,
    rng: &mut R,
) -> Poly<Scalar> {
    let mut poly = new_from(degree, rng);
    poly.set(0, constant);
    poly
}

impl<C> Poly<C> {
    /// Creates a new polynomial from the given coefficients.
    pub fn from(c: Vec<C>) -> Self {
        Self(c)
    }

    /// Returns the constant term of the polynomial.
    pub fn constant(&self) -> &C {
        &self.0[0]
    }

    /// Returns the degree of the polynomial
    pub fn degree(&self) -> u32 {
        (self.0.len() - 1) as u32
    }

    /// Returns the number of required evaluations to reconstruct the polynomial.
    pub fn required(&self) -> u32 {
        self.0.len() as u32
    }
}

impl<C: Element> Poly<C> {
    /// Commits the scalar polynomial to the group and returns a polynomial over
    /// the group.
    ///
    /// This is done by multiplying each coefficient of the polynomial with the
    /// group's generator.
    pub fn commit(private: &Poly<Scalar>) -> Self {
        let commits = private
            .0
            .iter()
            .map(|c| {
                let mut commitment = C::one();
                commitment.mul(c);
                commitment
            })
            .collect::<Vec<C>>();

        Poly::<C>::from(commits)
    }

    /// Set the given element at the specified index.
    ///
    /// It panics if the index is out of range.
    pub fn set(&mut self, index: u32, value: C) {
        self.0[index as usize] = value;
    }

    /// Evaluates the polynomial at `x = index`.
    ///
    /// Index 0 returns the constant term, so shares must only ever be
    /// handed out for indices starting at 1.
    pub fn evaluate(&self, index: u32) -> Eval<C> {
        let xi = Scalar::from_index(index);

        // Use Horner's method to evaluate the polynomial
        let res = self.0.iter().rev().fold(C::zero(), |mut sum, coeff| {
            sum.mul(&xi);
            sum.add(coeff);
            sum
        });
        Eval { index, value: res }
    }

    /// Computes the value at `x` of the polynomial of degree less than `required` passing
    /// through the provided evaluations.
    ///
    /// Evaluations are sorted by index and the first `required` are used, so two
    /// invocations with the same evaluations select the same points.
    ///
    /// Fails with [Error::InsufficientShares] if fewer than `required` evaluations are
    /// provided and with [Error::DuplicateIndex] if two evaluations share an index.
    pub fn interpolate<'a, I>(required: u32, evals: I, x: &Scalar) -> Result<C, Error>
    where
        C: 'a,
        I: IntoIterator<Item = &'a Eval<C>>,
    {
        let evals = prepare_evaluations(required, evals)?;
        let indices = evals.iter().map(|e| e.index).collect::<Vec<_>>();
        let weights = compute_weights(&indices, x)?;
        interpolate_with_weights(&weights, evals)
    }

    /// Recovers the constant term of a polynomial of degree less than `required` using
    /// at least `required` evaluations of the polynomial.
    pub fn recover<'a, I>(required: u32, evals: I) -> Result<C, Error>
    where
        C: 'a,
        I: IntoIterator<Item = &'a Eval<C>>,
    {
        Self::interpolate(required, evals, &Scalar::zero())
    }
}

impl<C: Element + Zeroize> Zeroize for Poly<C> {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl<C> fmt::Debug for Poly<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poly")
            .field("required", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// Returns the public key of the polynomial (constant term).
pub fn public(public: &Public) -> &group::Public {
    public.constant()
}

/// A Lagrange basis weight for interpolation at a fixed `x`.
pub struct Weight(Scalar);

impl Weight {
    /// Returns the weight as a scalar.
    pub fn as_scalar(&self) -> &Scalar {
        &self.0
    }
}

/// Sorts evaluations by index, rejects duplicates, and selects the first `required`.
pub fn prepare_evaluations<'a, C, I>(required: u32, evals: I) -> Result<Vec<&'a Eval<C>>, Error>
where
    C: Element + 'a,
    I: IntoIterator<Item = &'a Eval<C>>,
{
    let mut evals = evals.into_iter().collect::<Vec<_>>();
    if evals.len() < required as usize {
        return Err(Error::InsufficientShares(required, evals.len()));
    }

    // Sort so that two invocations select the same evaluations
    evals.sort_by_key(|e| e.index);
    if let Some(pair) = evals.windows(2).find(|pair| pair[0].index == pair[1].index) {
        return Err(Error::DuplicateIndex(pair[0].index));
    }
    evals.truncate(required as usize);
    Ok(evals)
}

/// Computes the Lagrange basis weights at `x` for a given set of indices.
///
/// The weight of index `i` is `product_{j != i} (x - x_j) / (x_i - x_j)`. Weights can be
/// reused for multiple interpolations over the same set of indices.
pub fn compute_weights(indices: &[u32], x: &Scalar) -> Result<BTreeMap<u32, Weight>, Error> {
    let mut weights = BTreeMap::new();
    for &i in indices {
        let xi = Scalar::from_index(i);
        let (mut num, mut den) = (Scalar::one(), Scalar::one());
        for &j in indices {
            if i == j {
                continue;
            }
            let xj = Scalar::from_index(j);

            // Numerator: x - xj
            let mut term = *x;
            term.sub(&xj);
            num.mul(&term);

            // Denominator: xi - xj
            let mut diff = xi;
            diff.sub(&xj);
            den.mul(&diff);
        }

        // Fails if den is zero (only possible with duplicate indices)
        let inv = den.inverse().ok_or(Error::InvalidScalar)?;
        num.mul(&inv);
        if weights.insert(i, Weight(num)).is_some() {
            return Err(Error::DuplicateIndex(i));
        }
    }
    Ok(weights)
}

/// Interpolates the provided evaluations with precomputed weights.
///
/// Every evaluation must have a corresponding weight.
pub fn interpolate_with_weights<'a, C, I>(
    weights: &BTreeMap<u32, Weight>,
    evals: I,
) -> Result<C, Error>
where
    C: Element + 'a,
    I: IntoIterator<Item = &'a Eval<C>>,
{
    let mut result = C::zero();
    for eval in evals {
        let weight = weights
            .get(&eval.index)
            .ok_or(Error::InvalidIndex(eval.index))?;
        let mut scaled = eval.value;
        scaled.mul(weight.as_scalar());
        result.add(&scaled);
    }
    Ok(result)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::schnorr::primitives::group::{Point, SCALAR_LENGTH};
    use rand::{rngs::StdRng, SeedableRng};

    fn pow(base: Scalar, pow: usize) -> Scalar {
        let mut res = Scalar::one();
        for _ in 0..pow {
            res.mul(&base)
        }
        res
    }

    #[test]
    fn poly_degree() {
        let mut rng = StdRng::seed_from_u64(0);
        let s = 5;
        let p = new_from(s, &mut rng);
        assert_eq!(p.degree(), s);
        assert_eq!(p.required(), s + 1);
    }

    #[test]
    fn new_with_constant_sets_secret() {
        let mut rng = StdRng::seed_from_u64(0);
        let secret = Scalar::from_rand(&mut rng);
        let p = new_with_constant(3, secret, &mut rng);
        assert_eq!(*p.constant(), secret);
        assert_eq!(p.evaluate(0).value, secret);
    }

    #[test]
    fn commit() {
        let mut rng = StdRng::seed_from_u64(0);
        let secret = new_from(5, &mut rng);
        let commitment = secret
            .0
            .iter()
            .map(|coeff| {
                let mut p = Point::one();
                p.mul(coeff);
                p
            })
            .collect::<Vec<_>>();
        let commitment = Poly::from(commitment);
        assert_eq!(commitment, Poly::<Point>::commit(&secret));
    }

    #[test]
    fn commitment_evaluation_matches_share() {
        let mut rng = StdRng::seed_from_u64(1);
        let secret = new_from(4, &mut rng);
        let commitment = Public::commit(&secret);
        for i in 1..10 {
            let mut expected = Point::one();
            expected.mul(&secret.evaluate(i).value);
            assert_eq!(commitment.evaluate(i).value, expected);
        }
    }

    #[test]
    fn evaluate() {
        let mut rng = StdRng::seed_from_u64(2);
        for d in 0..20u32 {
            for idx in 0..20u32 {
                let x = Scalar::from_index(idx);
                let p1 = new_from(d, &mut rng);
                let evaluation = p1.evaluate(idx).value;

                let coeffs = p1.0.clone();
                let mut sum = coeffs[0];
                for (i, coeff) in coeffs.into_iter().enumerate().skip(1) {
                    let xi = pow(x, i);
                    let mut var = coeff;
                    var.mul(&xi);
                    sum.add(&var);
                }

                assert_eq!(sum, evaluation, "degree={}, idx={}", d, idx);
            }
        }
    }

    #[test]
    fn interpolation() {
        let mut rng = StdRng::seed_from_u64(3);
        for degree in 0..20u32 {
            for num_evals in 1..20u32 {
                let poly = new_from(degree, &mut rng);
                let expected = poly.0[0];

                let shares = (1..=num_evals).map(|i| poly.evaluate(i)).collect::<Vec<_>>();
                let recovered_constant = Poly::recover(num_evals, &shares).unwrap();

                if num_evals > degree {
                    assert_eq!(
                        expected, recovered_constant,
                        "degree={}, num_evals={}",
                        degree, num_evals
                    );
                } else {
                    assert_ne!(
                        expected, recovered_constant,
                        "degree={}, num_evals={}",
                        degree, num_evals
                    );
                }
            }
        }
    }

    #[test]
    fn interpolation_every_subset() {
        // Every subset of exactly `t + 1` shares recovers the secret
        let mut rng = StdRng::seed_from_u64(4);
        let (n, t) = (6u32, 2u32);
        let poly = new_from(t, &mut rng);
        let shares = (1..=n).map(|i| poly.evaluate(i)).collect::<Vec<_>>();
        for a in 0..n as usize {
            for b in a + 1..n as usize {
                for c in b + 1..n as usize {
                    let subset = [shares[a], shares[b], shares[c]];
                    let recovered = Poly::recover(t + 1, &subset).unwrap();
                    assert_eq!(recovered, *poly.constant());
                }
            }
        }
    }

    #[test]
    fn interpolation_at_arbitrary_point() {
        let mut rng = StdRng::seed_from_u64(5);
        let poly = new_from(3, &mut rng);
        let shares = [2, 5, 7, 11]
            .iter()
            .map(|&i| poly.evaluate(i))
            .collect::<Vec<_>>();
        for target in [0u32, 1, 3, 5, 100] {
            let x = Scalar::from_index(target);
            let value = Poly::interpolate(4, &shares, &x).unwrap();
            assert_eq!(value, poly.evaluate(target).value, "target={}", target);
        }
    }

    #[test]
    fn interpolation_uses_lowest_indices() {
        let mut rng = StdRng::seed_from_u64(6);
        let poly = new_from(1, &mut rng);

        // The evaluation at index 9 is corrupted but never selected
        let mut shares = (1..=3).rev().map(|i| poly.evaluate(i)).collect::<Vec<_>>();
        let mut bad = poly.evaluate(9);
        bad.value.add(&Scalar::one());
        shares.push(bad);
        assert_eq!(Poly::recover(2, &shares).unwrap(), *poly.constant());
    }

    #[test]
    fn interpolation_points() {
        // Interpolating commitments recovers the committed constant
        let mut rng = StdRng::seed_from_u64(7);
        let secret = new_from(2, &mut rng);
        let commitment = Public::commit(&secret);
        let evals = [1, 4, 6]
            .iter()
            .map(|&i| commitment.evaluate(i))
            .collect::<Vec<_>>();
        let recovered = Public::recover(3, &evals).unwrap();
        assert_eq!(recovered, *public(&commitment));
    }

    #[test]
    fn interpolation_insufficient_shares() {
        let mut rng = StdRng::seed_from_u64(8);
        let degree = 4;
        let required = degree + 1;
        let poly = new_from(degree, &mut rng);
        let shares = (1..required).map(|i| poly.evaluate(i)).collect::<Vec<_>>();
        assert_eq!(
            Poly::recover(required, &shares).unwrap_err(),
            Error::InsufficientShares(required, (required - 1) as usize)
        );
    }

    #[test]
    fn interpolation_duplicate_index() {
        let mut rng = StdRng::seed_from_u64(9);
        let poly = new_from(2, &mut rng);
        let shares = [poly.evaluate(1), poly.evaluate(3), poly.evaluate(3)];
        assert_eq!(
            Poly::recover(3, &shares).unwrap_err(),
            Error::DuplicateIndex(3)
        );

        // Duplicates are rejected even outside of the selected evaluations
        let shares = [
            poly.evaluate(1),
            poly.evaluate(2),
            poly.evaluate(3),
            poly.evaluate(5),
            poly.evaluate(5),
        ];
        assert_eq!(
            Poly::recover(3, &shares).unwrap_err(),
            Error::DuplicateIndex(5)
        );
    }

    #[test]
    fn compute_weights_sum_to_one() {
        // The constant polynomial 1 interpolates to 1 everywhere
        let indices = [1, 2, 4, 8];
        for target in [0u32, 3, 9] {
            let weights = compute_weights(&indices, &Scalar::from_index(target)).unwrap();
            let mut sum = Scalar::zero();
            for weight in weights.values() {
                sum.add(weight.as_scalar());
            }
            assert_eq!(sum, Scalar::one());
        }
    }

    #[test]
    fn compute_weights_duplicate() {
        assert!(matches!(
            compute_weights(&[1, 2, 2], &Scalar::zero()),
            Err(Error::InvalidScalar) | Err(Error::DuplicateIndex(2))
        ));
    }

    #[test]
    fn interpolate_with_weights_missing_weight() {
        let mut rng = StdRng::seed_from_u64(10);
        let poly = new_from(1, &mut rng);
        let weights = compute_weights(&[1, 2], &Scalar::zero()).unwrap();
        let evals = [poly.evaluate(1), poly.evaluate(3)];
        assert_eq!(
            interpolate_with_weights(&weights, &evals).unwrap_err(),
            Error::InvalidIndex(3)
        );
    }

    /// Buckets the low bits of the revealed shares of `samples` sharings of `secret`.
    fn revealed_histogram(
        seed: u64,
        secret: Scalar,
        degree: u32,
        bits: u32,
        samples: usize,
    ) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mask = (1u8 << bits) - 1;
        let mut histogram = vec![0usize; 1 << (bits * degree)];
        for _ in 0..samples {
            let poly = new_with_constant(degree, secret, &mut rng);

            // Reveal `degree` shares (one fewer than required)
            let mut bucket = 0usize;
            for index in 1..=degree {
                let share = poly.evaluate(index).value.serialize();
                bucket = (bucket << bits) | (share[SCALAR_LENGTH - 1] & mask) as usize;
            }
            histogram[bucket] += 1;
        }
        histogram
    }

    #[test]
    fn threshold_secrecy_distribution() {
        // Up to `degree` shares are distributed identically (uniformly) whatever the secret
        for (degree, bits, samples) in [(1u32, 3u32, 2_000usize), (2, 2, 4_000)] {
            let seed = degree as u64;
            let zero = revealed_histogram(100 + seed, Scalar::zero(), degree, bits, samples);
            let one = revealed_histogram(200 + seed, Scalar::one(), degree, bits, samples);
            let expected = samples / zero.len();
            let tolerance = expected * 3 / 10;
            for (bucket, (a, b)) in zero.iter().zip(&one).enumerate() {
                assert!(
                    a.abs_diff(expected) <= tolerance,
                    "degree={degree} bucket={bucket} zero={a} expected={expected}"
                );
                assert!(
                    b.abs_diff(expected) <= tolerance,
                    "degree={degree} bucket={bucket} one={b} expected={expected}"
                );
            }
            assert_eq!(zero.iter().sum::<usize>(), samples);
            assert_eq!(one.iter().sum::<usize>(), samples);
        }

        // With `degree + 1` shares the secret is determined
        let mut rng = StdRng::seed_from_u64(300);
        let poly = new_with_constant(1, Scalar::one(), &mut rng);
        let shares = [poly.evaluate(1), poly.evaluate(2)];
        assert_eq!(Poly::recover(2, &shares).unwrap(), Scalar::one());
    }

    #[test]
    fn zeroize_clears_coefficients() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut poly = new_from(3, &mut rng);
        poly.zeroize();
        assert!(poly.0.is_empty());
    }
}
