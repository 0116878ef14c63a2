//! Proof-of-work search
//!
//! A candidate proof `p` is valid against the previous block's proof `l` when
//! the SHA-256 hex digest of the decimal text of `p^2 - l^2` starts with
//! [`DIFFICULTY`] zero digits. The difference is negative whenever `p < l` and
//! its text then carries a leading `-`, which changes the digest.

use crate::crypto::sha256_hex;
use crate::error::{ChainError, Result};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Number of leading `'0'` hex digits a proof digest must carry.
pub const DIFFICULTY: usize = 5;

/// Upper bound for configurable difficulties: a SHA-256 hex digest is 64 digits.
pub const MAX_DIFFICULTY: usize = 64;

/// How often the bounded search consults the clock.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Check `candidate` against `last_proof` at the default difficulty.
pub fn valid_proof(last_proof: i64, candidate: i64) -> bool {
    valid_proof_with(DIFFICULTY, last_proof, candidate)
}

/// Check `candidate` against `last_proof` requiring `difficulty` zero digits.
pub fn valid_proof_with(difficulty: usize, last_proof: i64, candidate: i64) -> bool {
    let last = i128::from(last_proof);
    let next = i128::from(candidate);
    let digest = sha256_hex((next * next - last * last).to_string().as_bytes());
    digest.bytes().take(difficulty).all(|b| b == b'0')
}

/// Smallest positive proof valid against `previous_proof`.
///
/// Blocks the calling thread until a solution is found; there is no iteration
/// cap and no way to interrupt the search.
pub fn find_proof(previous_proof: i64) -> i64 {
    find_proof_with(DIFFICULTY, previous_proof)
}

pub fn find_proof_with(difficulty: usize, previous_proof: i64) -> i64 {
    let mut candidate = 1;
    while !valid_proof_with(difficulty, previous_proof, candidate) {
        candidate += 1;
    }
    candidate
}

/// Limits for [`find_proof_bounded`]. The default budget is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProofBudget {
    pub max_attempts: Option<u64>,
    pub deadline: Option<Duration>,
}

impl ProofBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn attempts(max_attempts: u64) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            deadline: None,
        }
    }

    pub fn within(deadline: Duration) -> Self {
        Self {
            max_attempts: None,
            deadline: Some(deadline),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_attempts.is_none() && self.deadline.is_none()
    }
}

/// Same search as [`find_proof_with`], abandoned once `budget` runs out.
///
/// Returns the same proof as the unbounded search whenever it succeeds; an
/// exhausted search leaves nothing behind to resume.
pub fn find_proof_bounded(
    difficulty: usize,
    previous_proof: i64,
    budget: ProofBudget,
) -> Result<i64> {
    let started = Instant::now();
    let mut attempts: u64 = 0;
    let mut candidate: i64 = 1;

    loop {
        if budget.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(ChainError::ProofSearchExhausted { attempts });
        }
        if let Some(deadline) = budget.deadline {
            if attempts % DEADLINE_CHECK_INTERVAL == 0 && started.elapsed() >= deadline {
                return Err(ChainError::ProofSearchExhausted { attempts });
            }
        }

        attempts += 1;
        if valid_proof_with(difficulty, previous_proof, candidate) {
            return Ok(candidate);
        }
        candidate += 1;
    }
}

/// Run the search on a dedicated blocking worker.
///
/// The async caller awaits the handle instead of stalling its executor thread.
/// Dropping the handle does not stop the worker.
pub fn spawn_find_proof(
    difficulty: usize,
    previous_proof: i64,
    budget: ProofBudget,
) -> JoinHandle<Result<i64>> {
    tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        let proof = find_proof_bounded(difficulty, previous_proof, budget)?;
        tracing::debug!(
            previous_proof,
            proof,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "proof found"
        );
        Ok(proof)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_proof_for_genesis() {
        let proof = find_proof(1);
        assert_eq!(proof, 632238);
        assert!(valid_proof(1, proof));
    }

    #[test]
    fn test_low_difficulty_known_answers() {
        assert_eq!(find_proof_with(1, 1), 20);
        assert_eq!(find_proof_with(2, 1), 308);
        assert_eq!(find_proof_with(3, 1), 533);
        assert_eq!(find_proof_with(2, 2), 382);
        assert_eq!(find_proof_with(1, 3), 8);
    }

    #[test]
    fn test_found_proof_is_minimal() {
        for last in 1..=3 {
            let proof = find_proof_with(2, last);
            assert!(valid_proof_with(2, last, proof));
            assert!((1..proof).all(|p| !valid_proof_with(2, last, p)));
        }
    }

    #[test]
    fn test_negative_difference_keeps_sign() {
        // 11^2 - 50^2 = -2379, whose digest starts with a zero digit.
        assert!(valid_proof_with(1, 50, 11));
        // 2^2 - 5^2 = -21; sha256("-21") starts with 'e'.
        assert!(!valid_proof_with(1, 5, 2));
    }

    #[test]
    fn test_large_proofs_do_not_overflow() {
        let _ = valid_proof(i64::MAX, i64::MIN);
        let _ = valid_proof(i64::MIN, 1);
    }

    #[test]
    fn test_bounded_search_matches_unbounded() {
        let proof = find_proof_bounded(2, 1, ProofBudget::unlimited()).unwrap();
        assert_eq!(proof, 308);
        let proof = find_proof_bounded(2, 1, ProofBudget::attempts(308)).unwrap();
        assert_eq!(proof, 308);
    }

    #[test]
    fn test_bounded_search_exhausts() {
        let err = find_proof_bounded(2, 1, ProofBudget::attempts(307)).unwrap_err();
        assert_eq!(err, ChainError::ProofSearchExhausted { attempts: 307 });

        let err = find_proof_bounded(MAX_DIFFICULTY, 1, ProofBudget::within(Duration::ZERO))
            .unwrap_err();
        assert_eq!(err, ChainError::ProofSearchExhausted { attempts: 0 });
    }

    #[tokio::test]
    async fn test_spawned_search() {
        let proof = spawn_find_proof(1, 1, ProofBudget::unlimited())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(proof, 20);
    }
}
