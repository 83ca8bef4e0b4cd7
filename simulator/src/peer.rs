//! Members of a simulated quorum and the signing rounds they take part in.

use quorum_cryptography::schnorr::{
    dealer::{deal_nonces, generate_shares, verify_share},
    primitives::{
        group::{Point, Share},
        ops::{combine, partial_sign_batch, partial_verify, verify, Signature},
        poly,
    },
    Error, Quorum,
};
use quorum_utils::default_threshold;
use rand::{seq::index::sample, CryptoRng, RngCore};
use std::time::{Duration, Instant};
use tracing::debug;

/// Builds the quorum for `size` peers, falling back to the default threshold (at least 1).
pub fn configure(size: u32, threshold: Option<u32>) -> Result<Quorum, Error> {
    let threshold = threshold
        .or_else(|| default_threshold(size))
        .unwrap_or(1);
    Quorum::new(size, threshold)
}

/// A member of the quorum holding one share of the signing key.
pub struct Peer {
    share: Share,
    public: Point,
}

impl Peer {
    /// Creates a peer from a share after checking it against the dealer's commitment.
    pub fn new(commitment: &poly::Public, share: Share) -> Result<Self, Error> {
        verify_share(commitment, &share)?;
        let public = share.public();
        Ok(Self { share, public })
    }

    pub fn index(&self) -> u32 {
        self.share.index
    }

    pub fn share(&self) -> &Share {
        &self.share
    }

    /// Public key share of the peer.
    pub fn public(&self) -> &Point {
        &self.public
    }
}

/// Shares dealt to a quorum and the time spent in each setup phase.
pub struct Dealing {
    pub commitment: poly::Public,
    pub peers: Vec<Peer>,
    /// Time spent generating shares.
    pub generate: Duration,
    /// Time spent checking each share against the commitment.
    pub verify: Duration,
}

/// Deals a share to every member of the quorum and registers a peer for each.
pub fn deal<R: RngCore + CryptoRng>(rng: &mut R, quorum: &Quorum) -> Result<Dealing, Error> {
    let start = Instant::now();
    let (commitment, shares) = generate_shares(rng, quorum);
    let generate = start.elapsed();

    let start = Instant::now();
    let peers = shares
        .into_iter()
        .map(|share| Peer::new(&commitment, share))
        .collect::<Result<Vec<_>, _>>()?;
    let verify = start.elapsed();
    Ok(Dealing {
        commitment,
        peers,
        generate,
        verify,
    })
}

/// Formats the lookup request issued by `initiator` in `round`.
pub fn request(initiator: u32, round: u32) -> Vec<u8> {
    format!("REQUEST|{initiator}|{round}").into_bytes()
}

/// Time spent in each phase of a signing round.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    pub nonce: Duration,
    pub sign: Duration,
    pub combine: Duration,
    pub verify: Duration,
}

/// Outcome of a signing round.
#[derive(Debug)]
pub struct Trial {
    pub signers: Vec<u32>,
    pub signature: Signature,
    pub valid: bool,
    pub timings: Timings,
}

/// Runs a signing round over `message` with `threshold + 1` randomly selected peers.
pub fn trial<R: RngCore + CryptoRng>(
    rng: &mut R,
    quorum: &Quorum,
    commitment: &poly::Public,
    peers: &[Peer],
    namespace: Option<&[u8]>,
    message: &[u8],
    concurrency: usize,
) -> Result<Trial, Error> {
    let mut timings = Timings::default();

    // Select signers
    let required = quorum.required() as usize;
    if peers.len() < required {
        return Err(Error::QuorumNotMet(quorum.required(), peers.len()));
    }
    let mut selected = sample(rng, peers.len(), required).into_vec();
    selected.sort_unstable();
    let signers = selected
        .iter()
        .map(|&i| peers[i].index())
        .collect::<Vec<_>>();

    // Agree on a nonce
    let start = Instant::now();
    let (nonce, nonce_shares) = deal_nonces(rng, quorum);
    timings.nonce = start.elapsed();

    // Produce partial signatures
    let start = Instant::now();
    let mut assignments = Vec::with_capacity(required);
    for nonce_share in nonce_shares {
        if let Some(peer) = selected
            .iter()
            .map(|&i| &peers[i])
            .find(|p| p.index() == nonce_share.index)
        {
            assignments.push((peer.share(), nonce_share));
        }
    }
    let public = poly::public(commitment);
    let partials =
        partial_sign_batch(quorum, public, assignments, namespace, message, concurrency)?;
    for partial in &partials {
        if !partial_verify(commitment, &nonce.commitment, namespace, message, partial) {
            debug!(index = partial.index, "invalid partial signature");
            return Err(Error::SigningError("invalid partial signature"));
        }
    }
    timings.sign = start.elapsed();

    // Combine partial signatures
    let start = Instant::now();
    let signature = combine(quorum, &partials)?;
    timings.combine = start.elapsed();

    // Verify the signature
    let start = Instant::now();
    let valid = verify(public, namespace, message, &signature)?;
    timings.verify = start.elapsed();

    Ok(Trial {
        signers,
        signature,
        valid,
        timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn setup(rng: &mut StdRng, quorum: &Quorum) -> (poly::Public, Vec<Peer>) {
        let dealing = deal(rng, quorum).unwrap();
        (dealing.commitment, dealing.peers)
    }

    #[test]
    fn test_configure() {
        // Test case 0: default threshold
        assert_eq!(configure(10, None).unwrap().threshold(), 3);
        assert_eq!(configure(2, None).unwrap().threshold(), 1);

        // Test case 1: explicit threshold
        assert_eq!(configure(10, Some(6)).unwrap().required(), 7);

        // Test case 2: unusable configurations are reported, not panicked on
        assert_eq!(configure(1, None), Err(Error::InvalidThreshold(1, 1)));
        assert_eq!(configure(0, None), Err(Error::InvalidThreshold(1, 0)));
        assert_eq!(configure(5, Some(5)), Err(Error::InvalidThreshold(5, 5)));
        assert_eq!(configure(5, Some(0)), Err(Error::InvalidThreshold(0, 5)));
    }

    #[test]
    fn test_deal_times_phases_separately() {
        let mut rng = StdRng::seed_from_u64(3);
        let quorum = Quorum::new(40, 13).unwrap();
        let start = Instant::now();
        let dealing = deal(&mut rng, &quorum).unwrap();
        let total = start.elapsed();

        assert_eq!(dealing.peers.len(), 40);
        for (i, peer) in dealing.peers.iter().enumerate() {
            assert_eq!(peer.index(), i as u32 + 1);
        }

        // Share generation excludes share verification, and neither exceeds the whole call
        assert!(dealing.verify > Duration::ZERO);
        assert!(dealing.generate + dealing.verify <= total);
    }

    #[test]
    fn test_request() {
        assert_eq!(request(3, 17), b"REQUEST|3|17".to_vec());
    }

    #[test]
    fn test_peer_rejects_foreign_share() {
        let mut rng = StdRng::seed_from_u64(0);
        let quorum = Quorum::new(4, 1).unwrap();
        let (commitment, _) = generate_shares(&mut rng, &quorum);
        let (_, shares) = generate_shares(&mut rng, &quorum);
        let share = shares.into_iter().next().unwrap();
        assert!(matches!(
            Peer::new(&commitment, share),
            Err(Error::ShareWrongCommitment)
        ));
    }

    #[test]
    fn test_trial() {
        let mut rng = StdRng::seed_from_u64(1);
        let quorum = Quorum::new(10, 3).unwrap();
        let (commitment, peers) = setup(&mut rng, &quorum);
        for peer in &peers {
            assert_eq!(peer.public(), &peer.share().public());
        }
        for round in 0..3 {
            let message = request(1, round);
            let outcome = trial(
                &mut rng,
                &quorum,
                &commitment,
                &peers,
                Some(&b"test"[..]),
                &message,
                2,
            )
            .unwrap();
            assert!(outcome.valid);
            assert_eq!(outcome.signers.len(), 4);
            assert!(outcome.signers.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_trial_too_few_peers() {
        let mut rng = StdRng::seed_from_u64(2);
        let quorum = Quorum::new(5, 2).unwrap();
        let (commitment, mut peers) = setup(&mut rng, &quorum);
        peers.truncate(2);
        assert!(matches!(
            trial(&mut rng, &quorum, &commitment, &peers, None, b"msg", 1),
            Err(Error::QuorumNotMet(3, 2))
        ));
    }
}
