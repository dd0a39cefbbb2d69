//! Claim Store: local cache of finished and in-progress claims.
//!
//! The workflow only talks to the `ClaimStore` trait. Two backends:
//! - `MemoryClaimStore`: process-wide shared list, used by tests and demos
//! - `SqliteClaimStore`: on-device cache, one JSON payload per claim
//!
//! Single writer, no transactions: the counselor's device is the only client.

pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::{Claim, ClaimLookup};

pub use memory::MemoryClaimStore;
pub use sqlite::SqliteClaimStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Claim serialization error: {0}")]
    Serialization(String),

    #[error("Internal lock error")]
    LockPoisoned,

    #[error("Claim store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Persistence boundary consumed by the claim workflow and list views.
pub trait ClaimStore: Send + Sync {
    /// Claim by id, `None` if unknown.
    fn get(&self, claim_id: &str) -> Result<Option<Claim>, StoreError>;

    /// The claim attached to an appointment, or `NotStarted`.
    ///
    /// If several records exist for one appointment (data written before
    /// one-claim-per-appointment was enforced) a submitted one wins, then
    /// the most recently written.
    fn get_by_appointment(&self, appointment_id: i64) -> Result<ClaimLookup, StoreError>;

    /// Insert or replace by claim id. Replacing keeps the list position.
    fn upsert(&self, claim: &Claim) -> Result<(), StoreError>;

    /// All claims in insertion order.
    fn list(&self) -> Result<Vec<Claim>, StoreError>;

    /// Whether any stored claim already carries this reference number.
    fn reference_exists(&self, reference_no: &str) -> Result<bool, StoreError>;
}

/// Pick the record that represents an appointment among `candidates`
/// (given in insertion order).
pub(crate) fn resolve_appointment_claim(candidates: Vec<Claim>) -> ClaimLookup {
    let chosen = candidates
        .iter()
        .rev()
        .find(|c| c.is_submitted())
        .or_else(|| candidates.iter().max_by_key(|c| c.updated_at))
        .cloned();
    ClaimLookup::from_record(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify the trait is object-safe (can be used as `dyn ClaimStore`)
    #[test]
    fn trait_is_object_safe() {
        fn _assert_store(_: &dyn ClaimStore) {}
    }

    #[test]
    fn resolve_empty_is_not_started() {
        assert_eq!(resolve_appointment_claim(vec![]), ClaimLookup::NotStarted);
    }
}
