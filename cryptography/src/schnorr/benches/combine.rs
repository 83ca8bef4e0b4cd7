use criterion::{criterion_group, Criterion};
use quorum_cryptography::schnorr::{
    dealer::{deal_nonces, generate_shares},
    primitives::{
        ops::{combine, partial_sign},
        poly,
    },
    Quorum,
};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

// Configure contributors based on context
#[cfg(not(full_bench))]
const CONTRIBUTORS: &[u32] = &[5, 10, 20, 50];
#[cfg(full_bench)]
const CONTRIBUTORS: &[u32] = &[5, 10, 20, 50, 100, 250, 500];

fn benchmark_combine(c: &mut Criterion) {
    let namespace: &[u8] = b"benchmark";
    let msg = b"REQUEST|bench|0";
    let mut rng = StdRng::seed_from_u64(0);
    for &n in CONTRIBUTORS {
        let quorum = Quorum::with_default_threshold(n).unwrap();
        let (commitment, shares) = generate_shares(&mut rng, &quorum);
        let public = poly::public(&commitment);
        let (_, nonces) = deal_nonces(&mut rng, &quorum);
        let partials = shares
            .iter()
            .zip(nonces)
            .take(quorum.required() as usize)
            .map(|(share, nonce)| {
                partial_sign(&quorum, public, share, nonce, Some(namespace), msg).unwrap()
            })
            .collect::<Vec<_>>();
        c.bench_function(
            &format!("{}/n={} t={}", module_path!(), n, quorum.threshold()),
            |b| {
                b.iter(|| black_box(combine(&quorum, &partials).unwrap()));
            },
        );
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = benchmark_combine
}
