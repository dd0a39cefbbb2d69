//! Eligibility Checker: may this appointment be billed to insurance?
//!
//! The real decision lives in an external insurance system. The workflow
//! only sees the `EligibilityChecker` strategy and always awaits it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::error::ClaimError;
use crate::models::Appointment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityOutcome {
    pub eligible: bool,
    pub reason: Option<String>,
    pub checked_at: NaiveDateTime,
}

impl EligibilityOutcome {
    pub fn approved(checked_at: NaiveDateTime) -> Self {
        Self {
            eligible: true,
            reason: None,
            checked_at,
        }
    }

    pub fn denied(reason: impl Into<String>, checked_at: NaiveDateTime) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
            checked_at,
        }
    }
}

#[async_trait]
pub trait EligibilityChecker: Send + Sync {
    /// One round trip, no retry. `Err` means the check itself could not run.
    /// `checked_at` is the checker's own stamp; the workflow replaces it
    /// with its injected clock.
    async fn check(&self, appointment: &Appointment) -> Result<EligibilityOutcome, ClaimError>;
}

/// Stand-in for the insurance lookup: waits, then approves everything.
pub struct SimulatedEligibilityChecker {
    delay: Duration,
}

impl SimulatedEligibilityChecker {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl EligibilityChecker for SimulatedEligibilityChecker {
    async fn check(&self, appointment: &Appointment) -> Result<EligibilityOutcome, ClaimError> {
        tracing::debug!(appointment_id = appointment.id, delay_ms = self.delay.as_millis() as u64, "Simulated eligibility check");
        tokio::time::sleep(self.delay).await;
        Ok(EligibilityOutcome::approved(Local::now().naive_local()))
    }
}

/// Returns the same answer for every appointment, stamped at the
/// appointment's start.
pub struct FixedEligibilityChecker {
    denial: Option<String>,
}

impl FixedEligibilityChecker {
    pub fn approving() -> Self {
        Self { denial: None }
    }

    pub fn denying(reason: impl Into<String>) -> Self {
        Self { denial: Some(reason.into()) }
    }
}

#[async_trait]
impl EligibilityChecker for FixedEligibilityChecker {
    async fn check(&self, appointment: &Appointment) -> Result<EligibilityOutcome, ClaimError> {
        let at = appointment.time.starts_at();
        Ok(match &self.denial {
            None => EligibilityOutcome::approved(at),
            Some(reason) => EligibilityOutcome::denied(reason.clone(), at),
        })
    }
}
