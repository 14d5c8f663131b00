//! Core of a minimal proof-of-work ledger: hashing, merkle commitments,
//! the proof-of-work puzzle, chain validation and peer consensus.
//!
//! Nothing in here performs network or disk I/O. A node wraps [`Chain`] in a
//! single lock: `append_transaction`, `mint_block` and adoption during
//! [`consensus::resolve`] mutate it, while validation and merkle queries only
//! read.

pub mod block;
pub mod chain;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod hasher;
pub mod merkle;
pub mod pow;
pub mod registry;

pub use block::{Block, Transaction};
pub use chain::{Chain, IssuancePolicy};
pub use consensus::{resolve, PeerSnapshot, ResolvedOutcome};
pub use error::{ChainFault, LedgerError, Result};
pub use hasher::{digest, Hash};
pub use merkle::{merkle_root, MerkleProof, MerkleTree, ProofStep};
pub use registry::{parse_address, Peer, PeerRegistry};
