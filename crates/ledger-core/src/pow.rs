//! Proof-of-work puzzle.
//!
//! A proof `p` is valid against the previous proof `l` when the hex SHA-256
//! of the decimal string `"{l}{p}"` starts with [`POW_DIFFICULTY`] zeros.
//! Every search returns the lowest such `p`.

use crate::constants::{POW_CHUNK_SIZE, POW_DIFFICULTY};
use crate::error::{LedgerError, Result};
use crate::hasher::sha256;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

pub fn valid(last_proof: u64, proof: u64) -> bool {
    valid_with_difficulty(last_proof, proof, POW_DIFFICULTY)
}

pub fn valid_with_difficulty(last_proof: u64, proof: u64, difficulty: u32) -> bool {
    let guess = format!("{last_proof}{proof}");
    sha256(guess.as_bytes()).leading_zero_nibbles() >= difficulty
}

/// Exhaustive ascending search. Runs until a proof is found.
pub fn search(last_proof: u64) -> u64 {
    let mut proof = 0u64;
    while !valid(last_proof, proof) {
        proof += 1;
    }
    proof
}

/// Like [`search`] but gives up after `attempts` candidates.
pub fn search_bounded(last_proof: u64, attempts: u64) -> Result<u64> {
    (0..attempts)
        .find(|p| valid(last_proof, *p))
        .ok_or(LedgerError::ProofNotFound {
            last_proof,
            attempts,
        })
}

/// Parallel search over consecutive chunks of candidates.
///
/// Each chunk is scanned with rayon's `find_first`, so the lowest valid
/// proof inside the first chunk holding one wins and the result matches
/// [`search`]. The abort flag is checked between chunks.
pub fn search_parallel(last_proof: u64, abort: &AtomicBool) -> Option<u64> {
    search_parallel_with_difficulty(last_proof, POW_DIFFICULTY, abort)
}

pub fn search_parallel_with_difficulty(
    last_proof: u64,
    difficulty: u32,
    abort: &AtomicBool,
) -> Option<u64> {
    let mut start = 0u64;
    loop {
        if abort.load(Ordering::Relaxed) {
            debug!(last_proof, start, "parallel proof search aborted");
            return None;
        }
        let end = start.saturating_add(POW_CHUNK_SIZE);
        let found = (start..end)
            .into_par_iter()
            .find_first(|p| valid_with_difficulty(last_proof, *p, difficulty));
        if let Some(proof) = found {
            info!(last_proof, proof, "found proof of work");
            return Some(proof);
        }
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_is_valid_and_lowest() {
        for last_proof in [0u64, 100, 35293] {
            let proof = search(last_proof);
            assert!(valid(last_proof, proof));
            assert!((0..proof).all(|p| !valid(last_proof, p)));
        }
    }

    #[test]
    fn valid_matches_hex_prefix() {
        let proof = search(100);
        let hex = sha256(format!("100{proof}").as_bytes()).to_hex();
        assert!(hex.starts_with("0000"));
    }

    #[test]
    fn difficulty_zero_accepts_anything() {
        assert!(valid_with_difficulty(1, 1, 0));
        assert!(valid_with_difficulty(u64::MAX, 0, 0));
    }

    #[test]
    fn bounded_search_reports_exhaustion() {
        let proof = search(100);
        assert!(matches!(
            search_bounded(100, proof),
            Err(LedgerError::ProofNotFound {
                last_proof: 100,
                ..
            })
        ));
        assert_eq!(search_bounded(100, proof + 1).unwrap(), proof);
    }

    #[test]
    fn parallel_search_agrees_with_sequential() {
        let abort = AtomicBool::new(false);
        for last_proof in [100u64, 7, 123_456] {
            assert_eq!(search_parallel(last_proof, &abort), Some(search(last_proof)));
        }
    }

    #[test]
    fn raised_abort_flag_stops_search() {
        let abort = AtomicBool::new(true);
        assert_eq!(search_parallel(100, &abort), None);
    }

    #[test]
    fn abort_raised_mid_search_stops_an_unsatisfiable_search() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let abort = Arc::new(AtomicBool::new(false));
        let worker = {
            let abort = Arc::clone(&abort);
            thread::spawn(move || search_parallel_with_difficulty(1, 64, &abort))
        };
        thread::sleep(Duration::from_millis(50));
        abort.store(true, Ordering::Relaxed);
        assert_eq!(worker.join().unwrap(), None);
    }
}
