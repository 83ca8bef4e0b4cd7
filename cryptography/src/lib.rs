//! Split signing keys across a quorum of peers and produce threshold signatures that
//! verify against a single public key.
//!
//! # Status
//!
//! `quorum-cryptography` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

pub mod schnorr;
