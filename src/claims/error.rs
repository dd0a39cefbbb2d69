use thiserror::Error;

use super::validation::ValidationReport;
use super::workflow::WorkflowStep;
use crate::store::StoreError;

/// Errors scoped to one claim workflow session. None is fatal to the app.
#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    #[error("Cannot {action} from step {step}")]
    InvalidTransition { step: WorkflowStep, action: &'static str },

    #[error("Appointment {0} not found")]
    AppointmentNotFound(i64),

    #[error("Appointment {0} is neither completed nor in the past")]
    AppointmentNotClaimable(i64),

    #[error("Appointment {appointment_id} already has submitted claim {claim_id}")]
    ClaimAlreadySubmitted { appointment_id: i64, claim_id: String },

    #[error("Not eligible for reimbursement: {0}")]
    EligibilityDenied(String),

    #[error("Eligibility check unavailable: {0}")]
    EligibilityUnavailable(String),

    #[error("Unknown {kind}: {value}")]
    UnknownOption { kind: &'static str, value: String },

    #[error("Could not save claim: {0}")]
    Persistence(#[from] StoreError),

    #[error("No unique reference number after {0} attempts")]
    ReferenceExhausted(u32),

    #[error("Invalid workflow entry: {0}")]
    InvalidEntry(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Workflow session already finished")]
    SessionFinished,
}

impl ClaimError {
    /// Persistence failures leave the draft intact; the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::EligibilityUnavailable(_))
    }
}
