//! Consensus core of the CannabisCoin network: per-network parameters,
//! difficulty retargeting, proof-of-work validation, hardened checkpoints
//! and deterministic genesis construction.
//!
//! Everything in this crate is pure computation over immutable inputs; the
//! single piece of shared state is the process-wide network selection in
//! [`params`]. Chain storage, networking and script execution live in other
//! crates and reach this one through the [`block::HeaderView`] capability
//! and plain value arguments.
#![deny(missing_docs, unsafe_code)]
pub mod block;
pub mod network;
pub mod params;

pub use bitcoin;
pub use bitcoin_hashes;
