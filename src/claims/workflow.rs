//! Claim Workflow: the single state machine behind every "create claim"
//! entry point (appointment detail, student profile, claims list).
//!
//! ```text
//! SelectAppointment → Modality → ClaimDetails → Eligibility → Submitted
//!          \____________\______________\_____________\________→ Cancelled
//! ```
//!
//! The workflow owns the in-memory draft. The store sees it only on
//! `save_progress()` (In Progress) and `submit()` (Submitted). Refused
//! transitions return an error and leave the session untouched.

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::eligibility::{EligibilityChecker, EligibilityOutcome};
use super::error::ClaimError;
use super::reference::{assign_unique_reference, ReferenceGenerator};
use super::validation::{
    validate_details_step, validate_for_submission, validate_modality_step, ValidationIssue,
    ValidationReport,
};
use crate::catalog::{selectable_appointments, AppointmentCatalog};
use crate::config::WorkflowConfig;
use crate::models::options::{self, SERVICE_OPTIONS, THEME_OPTIONS};
use crate::models::{Appointment, Claim, ClaimLookup, ClaimStatus, Modality};
use crate::store::ClaimStore;

// ═══════════════════════════════════════════
// Steps and entry
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    SelectAppointment,
    Modality,
    ClaimDetails,
    Eligibility,
    Submitted,
    Cancelled,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectAppointment => "select_appointment",
            Self::Modality => "modality",
            Self::ClaimDetails => "claim_details",
            Self::Eligibility => "eligibility",
            Self::Submitted => "submitted",
            Self::Cancelled => "cancelled",
        }
    }

    /// Where `back()` leads. `None` means back closes the workflow.
    pub fn predecessor(&self) -> Option<WorkflowStep> {
        match self {
            Self::Modality => Some(Self::SelectAppointment),
            Self::ClaimDetails => Some(Self::Modality),
            Self::Eligibility => Some(Self::ClaimDetails),
            Self::Submitted => Some(Self::Eligibility),
            Self::SelectAppointment | Self::Cancelled => None,
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Navigation parameter value that resumes a saved draft.
pub const RESUME_STATUS_PARAM: &str = "In Progress";

/// How the workflow was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "appointment_id", rename_all = "snake_case")]
pub enum EntryContext {
    /// From the claims list: pick an appointment first.
    Empty,
    /// From an appointment: go straight to modality selection.
    Appointment(i64),
    /// From an appointment whose details are already captured: run a
    /// fresh eligibility check.
    Recheck(i64),
    /// Reopen an "In Progress" claim at the details step.
    Resume(i64),
}

impl EntryContext {
    /// Map screen navigation parameters onto an entry context.
    pub fn from_params(appointment_id: Option<i64>, status: Option<&str>) -> Result<Self, ClaimError> {
        let status = status.map(str::trim).filter(|s| !s.is_empty());
        match (appointment_id, status) {
            (None, None) => Ok(Self::Empty),
            (None, Some(s)) => Err(ClaimError::InvalidEntry(format!(
                "status '{s}' given without an appointment"
            ))),
            (Some(id), None) => Ok(Self::Appointment(id)),
            (Some(id), Some(s)) if s.eq_ignore_ascii_case(RESUME_STATUS_PARAM) => Ok(Self::Resume(id)),
            (Some(_), Some(s)) => Err(ClaimError::InvalidEntry(format!("unsupported status '{s}'"))),
        }
    }

    pub fn appointment_id(&self) -> Option<i64> {
        match self {
            Self::Empty => None,
            Self::Appointment(id) | Self::Recheck(id) | Self::Resume(id) => Some(*id),
        }
    }

    fn initial_step(&self) -> WorkflowStep {
        match self {
            Self::Empty => WorkflowStep::SelectAppointment,
            Self::Appointment(_) => WorkflowStep::Modality,
            Self::Recheck(_) => WorkflowStep::Eligibility,
            Self::Resume(_) => WorkflowStep::ClaimDetails,
        }
    }
}

/// Collaborators a workflow session needs.
#[derive(Clone)]
pub struct WorkflowServices {
    pub catalog: Arc<dyn AppointmentCatalog>,
    pub store: Arc<dyn ClaimStore>,
    pub checker: Arc<dyn EligibilityChecker>,
    pub references: Arc<dyn ReferenceGenerator>,
    pub clock: Arc<dyn Clock>,
}

// ═══════════════════════════════════════════
// Workflow
// ═══════════════════════════════════════════

pub struct ClaimWorkflow {
    services: WorkflowServices,
    config: WorkflowConfig,
    step: WorkflowStep,
    appointment: Option<Appointment>,
    draft: Option<Claim>,
    eligibility: Option<EligibilityOutcome>,
    /// Set once a check comes back ineligible; only closing remains.
    denial: Option<String>,
    finished: bool,
}

impl ClaimWorkflow {
    /// Open a session at the step implied by `entry`.
    pub fn start(
        services: WorkflowServices,
        config: WorkflowConfig,
        entry: EntryContext,
    ) -> Result<Self, ClaimError> {
        let mut workflow = Self {
            services,
            config,
            step: entry.initial_step(),
            appointment: None,
            draft: None,
            eligibility: None,
            denial: None,
            finished: false,
        };

        if let Some(appointment_id) = entry.appointment_id() {
            let (appointment, stored) = workflow.resolve_target(appointment_id)?;
            let draft = match stored {
                Some(claim) => claim,
                None => {
                    if matches!(entry, EntryContext::Resume(_)) {
                        tracing::warn!(appointment_id, "No saved draft to resume, starting a new one");
                    }
                    Claim::draft_for(&appointment, workflow.services.clock.now())
                }
            };
            workflow.appointment = Some(appointment);
            workflow.draft = Some(draft);
        }

        tracing::info!(
            entry = ?entry,
            step = %workflow.step,
            claim_id = workflow.draft.as_ref().map(|d| d.id.as_str()).unwrap_or(""),
            "Claim workflow started"
        );
        Ok(workflow)
    }

    // ── Read side ──────────────────────────────

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn draft(&self) -> Option<&Claim> {
        self.draft.as_ref()
    }

    pub fn appointment(&self) -> Option<&Appointment> {
        self.appointment.as_ref()
    }

    pub fn eligibility(&self) -> Option<&EligibilityOutcome> {
        self.eligibility.as_ref()
    }

    pub fn policy(&self) -> &crate::config::WorkflowPolicy {
        &self.config.policy
    }

    /// True after a successful `submit()`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reason of an ineligible result, if this session hit one.
    pub fn denial_reason(&self) -> Option<&str> {
        self.denial.as_deref()
    }

    /// Appointments offered on the select step: claimable and without a
    /// submitted claim.
    pub fn selectable_appointments(&self) -> Result<Vec<Appointment>, ClaimError> {
        let claimable = selectable_appointments(self.services.catalog.as_ref(), self.services.clock.now());
        let mut selectable = Vec::with_capacity(claimable.len());
        for appointment in claimable {
            if let ClaimLookup::Submitted(_) = self.services.store.get_by_appointment(appointment.id)? {
                continue;
            }
            selectable.push(appointment);
        }
        Ok(selectable)
    }

    /// Every modality in picker order with its selection state.
    pub fn modality_options(&self) -> Vec<(Modality, bool)> {
        Modality::all()
            .iter()
            .map(|m| (*m, self.draft.as_ref().is_some_and(|d| d.modalities.contains(m))))
            .collect()
    }

    pub fn theme_options(&self) -> Vec<(&'static str, bool)> {
        let selected = self.draft.as_ref().map(|d| d.themes.as_slice()).unwrap_or_default();
        THEME_OPTIONS
            .iter()
            .map(|t| (*t, selected.iter().any(|s| s == t)))
            .collect()
    }

    pub fn service_options(&self) -> Vec<(&'static str, bool)> {
        let selected = self.draft.as_ref().map(|d| d.services.as_slice()).unwrap_or_default();
        SERVICE_OPTIONS
            .iter()
            .map(|s| (*s, selected.iter().any(|x| x == s)))
            .collect()
    }

    /// What is still missing before the current step may move forward.
    pub fn validate_current_step(&self) -> ValidationReport {
        let Some(draft) = self.draft.as_ref() else {
            return ValidationReport::default();
        };
        let policy = &self.config.policy;
        match self.step {
            WorkflowStep::Modality => validate_modality_step(draft, policy),
            WorkflowStep::ClaimDetails => validate_details_step(draft, policy),
            WorkflowStep::Eligibility => {
                let mut report = validate_for_submission(draft, policy);
                if !self.eligibility.as_ref().is_some_and(|e| e.eligible) {
                    report.issues.push(ValidationIssue {
                        field: "eligibility".to_string(),
                        message: "Eligibility has not been confirmed".to_string(),
                    });
                }
                report
            }
            WorkflowStep::Submitted => validate_for_submission(draft, policy),
            WorkflowStep::SelectAppointment | WorkflowStep::Cancelled => ValidationReport::default(),
        }
    }

    // ── Select appointment ─────────────────────

    pub fn select_appointment(&mut self, appointment_id: i64) -> Result<WorkflowStep, ClaimError> {
        self.expect_step(WorkflowStep::SelectAppointment, "select an appointment")?;
        let (appointment, stored) = self.resolve_target(appointment_id)?;
        let now = self.services.clock.now();

        let draft = match (stored, self.draft.take()) {
            (_, Some(current)) if current.appointment_id == appointment_id => current,
            (Some(saved), _) => saved,
            (None, Some(mut carried)) => {
                // Selections survive going back to pick another appointment,
                // but the record is new: the old id may already be stored.
                let fresh = Claim::draft_for(&appointment, now);
                carried.id = fresh.id;
                carried.appointment_id = fresh.appointment_id;
                carried.student = fresh.student;
                carried.reference_no = None;
                carried.created_at = now;
                carried.updated_at = now;
                carried
            }
            (None, None) => Claim::draft_for(&appointment, now),
        };

        self.appointment = Some(appointment);
        self.draft = Some(draft);
        self.eligibility = None;
        self.move_to(WorkflowStep::Modality);
        Ok(self.step)
    }

    // ── Modality ───────────────────────────────

    /// Flip one modality. Returns whether it is now selected.
    pub fn toggle_modality(&mut self, modality: Modality) -> Result<bool, ClaimError> {
        self.expect_step(WorkflowStep::Modality, "toggle a modality")?;
        let draft = self.draft_mut()?;
        let selected = if draft.modalities.remove(&modality) {
            false
        } else {
            draft.modalities.insert(modality);
            true
        };
        tracing::debug!(modality = modality.as_str(), selected, "Modality toggled");
        Ok(selected)
    }

    /// Toggle by storage key, label or short code (e.g. "individual", "I").
    pub fn toggle_modality_code(&mut self, code: &str) -> Result<bool, ClaimError> {
        let modality = Modality::parse(code).ok_or_else(|| ClaimError::UnknownOption {
            kind: "modality",
            value: code.to_string(),
        })?;
        self.toggle_modality(modality)
    }

    pub fn confirm_modalities(&mut self) -> Result<WorkflowStep, ClaimError> {
        self.expect_step(WorkflowStep::Modality, "confirm modalities")?;
        let report = validate_modality_step(self.draft_ref()?, &self.config.policy);
        if !report.is_valid() {
            return Err(ClaimError::Validation(report));
        }
        self.move_to(WorkflowStep::ClaimDetails);
        Ok(self.step)
    }

    // ── Claim details ──────────────────────────

    pub fn toggle_theme(&mut self, theme: &str) -> Result<bool, ClaimError> {
        self.expect_step(WorkflowStep::ClaimDetails, "toggle a theme")?;
        let draft = self.draft_mut()?;
        if !options::toggle_in_catalog_order(THEME_OPTIONS, &mut draft.themes, theme) {
            return Err(ClaimError::UnknownOption { kind: "theme", value: theme.to_string() });
        }
        Ok(draft.themes.iter().any(|t| t == theme))
    }

    pub fn toggle_service(&mut self, service: &str) -> Result<bool, ClaimError> {
        self.expect_step(WorkflowStep::ClaimDetails, "toggle a service")?;
        let draft = self.draft_mut()?;
        if !options::toggle_in_catalog_order(SERVICE_OPTIONS, &mut draft.services, service) {
            return Err(ClaimError::UnknownOption { kind: "service", value: service.to_string() });
        }
        Ok(draft.services.iter().any(|s| s == service))
    }

    /// Free-text notes. Editable on the details and submission steps.
    pub fn set_additional_info(&mut self, text: impl Into<String>) -> Result<(), ClaimError> {
        self.expect_editable("edit additional information")?;
        self.draft_mut()?.additional_info = text.into();
        Ok(())
    }

    /// Manual amount; `None` falls back to the standard fee at submission.
    pub fn set_amount(&mut self, amount: Option<Decimal>) -> Result<(), ClaimError> {
        self.expect_editable("set the amount")?;
        if amount.is_some_and(|a| a < Decimal::ZERO) {
            return Err(ClaimError::Validation(single_issue("amount", "Amount cannot be negative")));
        }
        self.draft_mut()?.amount = amount;
        Ok(())
    }

    /// Record a document URI returned by the file picker.
    pub fn attach_document(&mut self, uri: &str) -> Result<(), ClaimError> {
        self.expect_step(WorkflowStep::ClaimDetails, "attach a document")?;
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ClaimError::Validation(single_issue("attachments", "Document URI is empty")));
        }
        let draft = self.draft_mut()?;
        if !draft.attachments.iter().any(|a| a == uri) {
            draft.attachments.push(uri.to_string());
        }
        Ok(())
    }

    pub fn continue_to_eligibility(&mut self) -> Result<WorkflowStep, ClaimError> {
        self.expect_step(WorkflowStep::ClaimDetails, "continue")?;
        let report = validate_details_step(self.draft_ref()?, &self.config.policy);
        if !report.is_valid() {
            return Err(ClaimError::Validation(report));
        }
        self.eligibility = None;
        self.move_to(WorkflowStep::Eligibility);
        Ok(self.step)
    }

    // ── Eligibility ────────────────────────────

    pub async fn check_eligibility(&mut self) -> Result<EligibilityOutcome, ClaimError> {
        match self.check_eligibility_with_cancel(std::future::pending::<()>()).await? {
            Some(outcome) => Ok(outcome),
            None => Err(ClaimError::SessionFinished),
        }
    }

    /// Run the check, racing it against `cancel`. If `cancel` resolves
    /// first the pending result is discarded, the session returns to
    /// ClaimDetails and `Ok(None)` is returned.
    pub async fn check_eligibility_with_cancel<C>(
        &mut self,
        cancel: C,
    ) -> Result<Option<EligibilityOutcome>, ClaimError>
    where
        C: Future<Output = ()>,
    {
        self.expect_step(WorkflowStep::Eligibility, "check eligibility")?;
        let appointment = self
            .appointment
            .clone()
            .ok_or_else(|| ClaimError::InvalidEntry("no appointment selected".to_string()))?;
        let checker = Arc::clone(&self.services.checker);

        let result = tokio::select! {
            result = checker.check(&appointment) => Some(result),
            () = cancel => None,
        };

        let outcome = match result {
            None => {
                tracing::info!(appointment_id = appointment.id, "Eligibility check cancelled");
                self.eligibility = None;
                self.move_to(WorkflowStep::ClaimDetails);
                return Ok(None);
            }
            Some(Err(e)) => {
                tracing::warn!(appointment_id = appointment.id, error = %e, "Eligibility check failed");
                return Err(match e {
                    ClaimError::EligibilityUnavailable(_) => e,
                    other => ClaimError::EligibilityUnavailable(other.to_string()),
                });
            }
            Some(Ok(outcome)) => EligibilityOutcome {
                checked_at: self.services.clock.now(),
                ..outcome
            },
        };

        if outcome.eligible {
            tracing::info!(appointment_id = appointment.id, "Appointment eligible for reimbursement");
        } else {
            let reason = outcome
                .reason
                .clone()
                .unwrap_or_else(|| "Not eligible".to_string());
            tracing::warn!(appointment_id = appointment.id, reason = %reason, "Appointment not eligible");
            self.denial = Some(reason);
        }
        self.eligibility = Some(outcome.clone());
        Ok(Some(outcome))
    }

    pub fn proceed(&mut self) -> Result<WorkflowStep, ClaimError> {
        self.expect_step(WorkflowStep::Eligibility, "proceed")?;
        self.ensure_eligible()?;
        let report = validate_for_submission(self.draft_ref()?, &self.config.policy);
        if !report.is_valid() {
            return Err(ClaimError::Validation(report));
        }
        self.move_to(WorkflowStep::Submitted);
        Ok(self.step)
    }

    // ── Submission ─────────────────────────────

    /// Stamp and persist the claim. Returns only after the store write
    /// succeeded; on a store error the draft is kept for a retry.
    pub fn submit(&mut self) -> Result<Claim, ClaimError> {
        self.expect_step(WorkflowStep::Submitted, "submit")?;
        self.ensure_eligible()?;
        let report = validate_for_submission(self.draft_ref()?, &self.config.policy);
        if !report.is_valid() {
            return Err(ClaimError::Validation(report));
        }

        let store = Arc::clone(&self.services.store);
        let now = self.services.clock.now();
        self.ensure_sole_claim(self.draft_ref()?)?;

        if self.draft_ref()?.reference_no.is_none() {
            let reference = assign_unique_reference(
                store.as_ref(),
                self.services.references.as_ref(),
                self.config.max_reference_attempts,
            )?;
            // Kept on the draft so a retried submit reuses it.
            self.draft_mut()?.reference_no = Some(reference);
        }

        let mut claim = self.draft_ref()?.clone();
        claim.status = ClaimStatus::Submitted;
        claim.submission_date = Some(self.services.clock.today());
        claim.amount = Some(claim.amount.unwrap_or(self.config.standard_session_fee));
        claim.updated_at = now;

        if let Err(e) = store.upsert(&claim) {
            tracing::error!(claim_id = %claim.id, error = %e, "Claim submission not persisted");
            return Err(ClaimError::Persistence(e));
        }

        tracing::info!(
            claim_id = %claim.id,
            reference = claim.reference_no.as_deref().unwrap_or(""),
            appointment_id = claim.appointment_id,
            "Claim submitted"
        );
        self.draft = Some(claim.clone());
        self.finished = true;
        Ok(claim)
    }

    // ── Partial completion, navigation ─────────

    /// Persist the draft as In Progress without leaving the current step.
    pub fn save_progress(&mut self) -> Result<Claim, ClaimError> {
        self.ensure_active()?;
        if matches!(self.step, WorkflowStep::SelectAppointment) {
            return Err(ClaimError::InvalidTransition { step: self.step, action: "save progress" });
        }
        let mut snapshot = self.draft_ref()?.clone();
        snapshot.status = ClaimStatus::InProgress;
        snapshot.updated_at = self.services.clock.now();
        self.ensure_sole_claim(&snapshot)?;
        self.services.store.upsert(&snapshot)?;
        tracing::info!(claim_id = %snapshot.id, step = %self.step, "Claim progress saved");
        self.draft = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// One step back; from SelectAppointment this closes the workflow.
    pub fn back(&mut self) -> Result<WorkflowStep, ClaimError> {
        self.ensure_active()?;
        match self.step.predecessor() {
            Some(previous) => {
                if self.step == WorkflowStep::Eligibility {
                    self.eligibility = None;
                }
                self.move_to(previous);
            }
            None => self.move_to(WorkflowStep::Cancelled),
        }
        Ok(self.step)
    }

    /// Abandon the session. Anything not saved is dropped with it.
    pub fn cancel(&mut self) -> Result<(), ClaimError> {
        if self.finished {
            return Err(ClaimError::SessionFinished);
        }
        if self.step != WorkflowStep::Cancelled {
            self.move_to(WorkflowStep::Cancelled);
        }
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ClaimError> {
        self.cancel()
    }

    // ── Internals ──────────────────────────────

    /// Look up the appointment and the claim already attached to it.
    fn resolve_target(&self, appointment_id: i64) -> Result<(Appointment, Option<Claim>), ClaimError> {
        let appointment = self
            .services
            .catalog
            .get(appointment_id)
            .ok_or(ClaimError::AppointmentNotFound(appointment_id))?;
        if !appointment.is_claimable(self.services.clock.now()) {
            return Err(ClaimError::AppointmentNotClaimable(appointment_id));
        }
        match self.services.store.get_by_appointment(appointment_id)? {
            ClaimLookup::Submitted(claim) => Err(ClaimError::ClaimAlreadySubmitted {
                appointment_id,
                claim_id: claim.id,
            }),
            ClaimLookup::InProgress(claim) => Ok((appointment, Some(claim))),
            ClaimLookup::NotStarted => Ok((appointment, None)),
        }
    }

    /// Another session may have submitted for this appointment since this
    /// one started. The store is re-read right before every write.
    fn ensure_sole_claim(&self, claim: &Claim) -> Result<(), ClaimError> {
        match self.services.store.get_by_appointment(claim.appointment_id)? {
            ClaimLookup::Submitted(existing) if existing.id != claim.id => {
                tracing::warn!(
                    appointment_id = claim.appointment_id,
                    existing = %existing.id,
                    claim_id = %claim.id,
                    "Appointment already claimed by another session"
                );
                Err(ClaimError::ClaimAlreadySubmitted {
                    appointment_id: claim.appointment_id,
                    claim_id: existing.id,
                })
            }
            _ => Ok(()),
        }
    }

    fn ensure_active(&self) -> Result<(), ClaimError> {
        if self.finished || self.step == WorkflowStep::Cancelled {
            return Err(ClaimError::SessionFinished);
        }
        if let Some(reason) = &self.denial {
            return Err(ClaimError::EligibilityDenied(reason.clone()));
        }
        Ok(())
    }

    fn expect_step(&self, expected: WorkflowStep, action: &'static str) -> Result<(), ClaimError> {
        self.ensure_active()?;
        if self.step != expected {
            tracing::debug!(step = %self.step, action, "Transition refused");
            return Err(ClaimError::InvalidTransition { step: self.step, action });
        }
        Ok(())
    }

    fn expect_editable(&self, action: &'static str) -> Result<(), ClaimError> {
        self.ensure_active()?;
        match self.step {
            WorkflowStep::ClaimDetails | WorkflowStep::Submitted => Ok(()),
            step => Err(ClaimError::InvalidTransition { step, action }),
        }
    }

    fn ensure_eligible(&self) -> Result<(), ClaimError> {
        match &self.eligibility {
            Some(outcome) if outcome.eligible => Ok(()),
            Some(outcome) => Err(ClaimError::EligibilityDenied(
                outcome.reason.clone().unwrap_or_else(|| "Not eligible".to_string()),
            )),
            None => Err(ClaimError::Validation(single_issue(
                "eligibility",
                "Run the eligibility check first",
            ))),
        }
    }

    fn draft_ref(&self) -> Result<&Claim, ClaimError> {
        self.draft
            .as_ref()
            .ok_or(ClaimError::InvalidTransition { step: self.step, action: "edit the claim" })
    }

    fn draft_mut(&mut self) -> Result<&mut Claim, ClaimError> {
        let step = self.step;
        self.draft
            .as_mut()
            .ok_or(ClaimError::InvalidTransition { step, action: "edit the claim" })
    }

    fn move_to(&mut self, next: WorkflowStep) {
        tracing::info!(from = %self.step, to = %next, "Claim workflow step");
        self.step = next;
    }
}

fn single_issue(field: &str, message: &str) -> ValidationReport {
    ValidationReport {
        issues: vec![ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        }],
    }
}
