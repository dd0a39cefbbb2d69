use std::sync::RwLock;

use super::{resolve_appointment_claim, ClaimStore, StoreError};
use crate::models::{Claim, ClaimLookup};

/// Process-wide in-memory claim store.
///
/// Share it behind an `Arc`; the lock only guards against torn reads, there
/// is still exactly one writer.
#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    claims: RwLock<Vec<Claim>>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.claims.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClaimStore for MemoryClaimStore {
    fn get(&self, claim_id: &str) -> Result<Option<Claim>, StoreError> {
        let claims = self.claims.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(claims.iter().find(|c| c.id == claim_id).cloned())
    }

    fn get_by_appointment(&self, appointment_id: i64) -> Result<ClaimLookup, StoreError> {
        let claims = self.claims.read().map_err(|_| StoreError::LockPoisoned)?;
        let candidates = claims
            .iter()
            .filter(|c| c.appointment_id == appointment_id)
            .cloned()
            .collect();
        Ok(resolve_appointment_claim(candidates))
    }

    fn upsert(&self, claim: &Claim) -> Result<(), StoreError> {
        let mut claims = self.claims.write().map_err(|_| StoreError::LockPoisoned)?;
        match claims.iter_mut().find(|c| c.id == claim.id) {
            Some(existing) => *existing = claim.clone(),
            None => claims.push(claim.clone()),
        }
        tracing::debug!(claim_id = %claim.id, status = %claim.status, "Claim cached in memory");
        Ok(())
    }

    fn list(&self) -> Result<Vec<Claim>, StoreError> {
        let claims = self.claims.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(claims.clone())
    }

    fn reference_exists(&self, reference_no: &str) -> Result<bool, StoreError> {
        let claims = self.claims.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(claims
            .iter()
            .any(|c| c.reference_no.as_deref() == Some(reference_no)))
    }
}
