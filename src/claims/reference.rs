//! Claim reference numbers: a fixed prefix followed by 5 random digits.
//!
//! Five digits leave only 100 000 codes per prefix, so collisions are
//! expected; every candidate is checked against the store and regenerated,
//! up to a bounded number of attempts.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::ClaimError;
use crate::store::ClaimStore;

pub const REFERENCE_DIGITS: usize = 5;

/// Source of candidate reference numbers. Injected so tests can seed it.
pub trait ReferenceGenerator: Send + Sync {
    fn next_candidate(&self) -> String;
}

pub struct RandomReferenceGenerator {
    prefix: String,
    rng: Mutex<StdRng>,
}

impl RandomReferenceGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence for tests and demo data.
    pub fn seeded(prefix: impl Into<String>, seed: u64) -> Self {
        Self {
            prefix: prefix.into(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ReferenceGenerator for RandomReferenceGenerator {
    fn next_candidate(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let n: u32 = rng.gen_range(0..100_000);
        format!("{}{:0width$}", self.prefix, n, width = REFERENCE_DIGITS)
    }
}

/// Whether `reference` is `prefix` followed by exactly 5 ASCII digits.
pub fn is_well_formed(reference: &str, prefix: &str) -> bool {
    reference
        .strip_prefix(prefix)
        .is_some_and(|digits| digits.len() == REFERENCE_DIGITS && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Draw candidates until one is not already used by a stored claim.
pub fn assign_unique_reference(
    store: &dyn ClaimStore,
    generator: &dyn ReferenceGenerator,
    max_attempts: u32,
) -> Result<String, ClaimError> {
    for attempt in 1..=max_attempts {
        let candidate = generator.next_candidate();
        if !store.reference_exists(&candidate)? {
            if attempt > 1 {
                tracing::debug!(attempt, reference = %candidate, "Reference assigned after collision");
            }
            return Ok(candidate);
        }
        tracing::warn!(attempt, reference = %candidate, "Reference number collision, regenerating");
    }
    Err(ClaimError::ReferenceExhausted(max_attempts))
}
