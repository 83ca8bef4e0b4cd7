//! Simulate a quorum of peers answering lookup requests with threshold signatures.
//!
//! A dealer splits a signing key across `--peers` members. Each round, a random initiator issues
//! a request, `threshold + 1` random members sign it, and the combined signature is verified
//! against the quorum's public key. The time spent in each phase is logged.
//!
//! Afterwards, quorums are placed on a Chord ring and the routing table of one of them is
//! split into Reed-Solomon shards. Some shards are lost and the table is recovered from the rest.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin quorum-simulator -- --peers 20 --rounds 10 --seed 42
//! ```

mod peer;
mod routing;

use clap::{value_parser, Arg, Command};
use peer::{configure, deal, request, trial};
use quorum_coding::Config;
use quorum_cryptography::schnorr::primitives::{group::Element, poly};
use quorum_utils::hex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use routing::{random_ring, recover};
use std::num::NonZeroU16;
use tracing::{debug, error, info, warn};

/// Namespace used when none is provided.
const DEFAULT_NAMESPACE: &str = "_QUORUM_LOOKUP";

fn main() {
    // Parse arguments
    let matches = Command::new("quorum-simulator")
        .about("simulate a quorum answering lookup requests with threshold signatures")
        .arg(
            Arg::new("peers")
                .long("peers")
                .required(true)
                .value_parser(value_parser!(u32).range(2..))
                .help("Number of peers in the quorum"),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .required(false)
                .value_parser(value_parser!(u32))
                .help("Maximum number of peers that learn nothing (defaults to peers / 3)"),
        )
        .arg(
            Arg::new("rounds")
                .long("rounds")
                .default_value("10")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .required(false)
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .default_value("1")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .default_value(DEFAULT_NAMESPACE),
        )
        .arg(
            Arg::new("ring-bits")
                .long("ring-bits")
                .default_value("4")
                .value_parser(value_parser!(u32).range(1..=32))
                .help("Size of the identifier ring, in bits"),
        )
        .arg(
            Arg::new("quorums")
                .long("quorums")
                .default_value("8")
                .value_parser(value_parser!(usize))
                .help("Number of quorums on the ring"),
        )
        .arg(
            Arg::new("data-shards")
                .long("data-shards")
                .default_value("2")
                .value_parser(value_parser!(u16).range(1..))
                .help("Shards needed to recover a routing table"),
        )
        .arg(
            Arg::new("parity-shards")
                .long("parity-shards")
                .default_value("3")
                .value_parser(value_parser!(u16).range(1..))
                .help("Recovery shards added to a routing table"),
        )
        .arg(
            Arg::new("lost-shards")
                .long("lost-shards")
                .default_value("2")
                .value_parser(value_parser!(usize))
                .help("Routing table shards lost before recovery"),
        )
        .get_matches();

    // Create logger
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Configure quorum
    let size = *matches
        .get_one::<u32>("peers")
        .expect("Please provide number of peers");
    let threshold = matches.get_one::<u32>("threshold").copied();
    let quorum = match configure(size, threshold) {
        Ok(quorum) => quorum,
        Err(err) => {
            error!(size, ?threshold, ?err, "invalid quorum configuration");
            std::process::exit(1);
        }
    };
    let threshold = quorum.threshold();
    let rounds = *matches.get_one::<u32>("rounds").expect("rounds has default");
    let concurrency = *matches
        .get_one::<usize>("concurrency")
        .expect("concurrency has default");
    let namespace = matches
        .get_one::<String>("namespace")
        .expect("namespace has default")
        .as_bytes();
    let seed = matches
        .get_one::<u64>("seed")
        .copied()
        .unwrap_or_else(rand::random);
    info!(
        size,
        threshold,
        required = quorum.required(),
        seed,
        "configured quorum"
    );

    // Deal shares
    let mut rng = StdRng::seed_from_u64(seed);
    let dealing = match deal(&mut rng, &quorum) {
        Ok(dealing) => dealing,
        Err(err) => {
            error!(?err, "dealer issued an invalid share");
            std::process::exit(1);
        }
    };
    info!(
        elapsed = ?dealing.generate,
        public = hex(&poly::public(&dealing.commitment).serialize()),
        "generated shares"
    );
    info!(elapsed = ?dealing.verify, "verified shares");
    let (commitment, peers) = (dealing.commitment, dealing.peers);
    for peer in &peers {
        debug!(
            index = peer.index(),
            public = hex(&peer.public().serialize()),
            "registered peer"
        );
    }

    // Answer requests
    let mut failures = 0;
    for round in 0..rounds {
        let initiator = rng.gen_range(1..=size);
        let message = request(initiator, round);
        match trial(
            &mut rng,
            &quorum,
            &commitment,
            &peers,
            Some(namespace),
            &message,
            concurrency,
        ) {
            Ok(outcome) if outcome.valid => {
                info!(
                    round,
                    initiator,
                    signers = ?outcome.signers,
                    signature = hex(&outcome.signature.serialize()),
                    nonce = ?outcome.timings.nonce,
                    sign = ?outcome.timings.sign,
                    combine = ?outcome.timings.combine,
                    verify = ?outcome.timings.verify,
                    "answered request"
                );
            }
            Ok(outcome) => {
                failures += 1;
                warn!(
                    round,
                    initiator,
                    signers = ?outcome.signers,
                    "signature failed verification"
                );
            }
            Err(err) => {
                failures += 1;
                warn!(round, initiator, ?err, "unable to answer request");
            }
        }
    }
    info!(rounds, failures, "signing complete");

    // Recover a routing table
    let bits = *matches.get_one::<u32>("ring-bits").expect("ring-bits has default");
    let quorums = *matches.get_one::<usize>("quorums").expect("quorums has default");
    let lost = *matches
        .get_one::<usize>("lost-shards")
        .expect("lost-shards has default");
    let shards = |name: &str| {
        matches
            .get_one::<u16>(name)
            .copied()
            .and_then(NonZeroU16::new)
    };
    let data_shards = shards("data-shards");
    let parity_shards = shards("parity-shards");
    let (Some(data_shards), Some(parity_shards)) = (data_shards, parity_shards) else {
        error!("shard counts must be non-zero");
        std::process::exit(1);
    };
    let config = Config::new(data_shards, parity_shards);
    let recovery = match random_ring(&mut rng, bits, quorums)
        .and_then(|ring| recover(&mut rng, ring, config, lost))
    {
        Ok(recovery) => recovery,
        Err(err) => {
            error!(bits, quorums, ?err, "unable to encode routing table");
            std::process::exit(1);
        }
    };
    info!(
        ids = ?recovery.ring.ids(),
        quorum = recovery.quorum,
        table = ?recovery.table,
        shards = config.total_shards(),
        encode = ?recovery.encode,
        "encoded routing table"
    );
    match &recovery.recovered {
        Ok(_) if recovery.valid() => {
            info!(lost = ?recovery.lost, decode = ?recovery.decode, "recovered routing table");
        }
        Ok(table) => {
            warn!(lost = ?recovery.lost, ?table, "recovered routing table does not match");
        }
        Err(err) => {
            warn!(lost = ?recovery.lost, ?err, "unable to recover routing table");
        }
    }
    info!("simulation complete");
}
