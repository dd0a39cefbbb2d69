//! Claim lifecycle: one workflow from appointment to submitted claim.

pub mod clock;
pub mod eligibility;
pub mod error;
pub mod reference;
pub mod validation;
pub mod workflow;

pub use clock::{Clock, FixedClock, SystemClock};
pub use eligibility::{
    EligibilityChecker, EligibilityOutcome, FixedEligibilityChecker, SimulatedEligibilityChecker,
};
pub use error::ClaimError;
pub use reference::{assign_unique_reference, RandomReferenceGenerator, ReferenceGenerator};
pub use validation::{validate_for_submission, ValidationIssue, ValidationReport};
pub use workflow::{ClaimWorkflow, EntryContext, WorkflowServices, WorkflowStep};
