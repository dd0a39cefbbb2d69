use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::appointment::{Appointment, StudentRef};
use super::enums::ClaimStatus;
use super::modality::Modality;

/// Reimbursement claim for one counseling appointment.
///
/// Every field is always serialized: empty selections are `[]` and unset
/// optionals are `null`, so a stored record never confuses "empty" with
/// "missing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub reference_no: Option<String>,
    pub appointment_id: i64,
    pub student: StudentRef,
    pub status: ClaimStatus,
    pub modalities: BTreeSet<Modality>,
    pub themes: Vec<String>,
    pub services: Vec<String>,
    pub additional_info: String,
    pub amount: Option<Decimal>,
    pub attachments: Vec<String>,
    pub submission_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Claim {
    /// Fresh in-progress draft for an appointment, with a new id.
    pub fn draft_for(appointment: &Appointment, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reference_no: None,
            appointment_id: appointment.id,
            student: appointment.student.clone(),
            status: ClaimStatus::InProgress,
            modalities: BTreeSet::new(),
            themes: Vec::new(),
            services: Vec::new(),
            additional_info: String::new(),
            amount: None,
            attachments: Vec::new(),
            submission_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.status == ClaimStatus::Submitted
    }

    /// Amount as the claims list shows it.
    pub fn amount_display(&self) -> String {
        match self.amount {
            Some(amount) => format!("${:.2}", amount),
            None => "Not Set".to_string(),
        }
    }
}

/// What the store knows about an appointment's claim.
///
/// `NotStarted` is a first-class answer rather than an absent record.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimLookup {
    NotStarted,
    InProgress(Claim),
    Submitted(Claim),
}

impl ClaimLookup {
    pub fn from_record(record: Option<Claim>) -> Self {
        match record {
            None => Self::NotStarted,
            Some(claim) if claim.is_submitted() => Self::Submitted(claim),
            Some(claim) => Self::InProgress(claim),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress(_) => ClaimStatus::InProgress.label(),
            Self::Submitted(_) => ClaimStatus::Submitted.label(),
        }
    }

    pub fn claim(&self) -> Option<&Claim> {
        match self {
            Self::NotStarted => None,
            Self::InProgress(c) | Self::Submitted(c) => Some(c),
        }
    }
}

/// One row of the claims list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub claim_id: String,
    pub appointment_id: i64,
    pub reference_no: String,
    pub student_name: String,
    pub status: String,
    pub amount: String,
    pub submission_date: String,
    pub modality_codes: Vec<String>,
}

impl ClaimSummary {
    pub fn from_claim(claim: &Claim) -> Self {
        Self {
            claim_id: claim.id.clone(),
            appointment_id: claim.appointment_id,
            reference_no: claim
                .reference_no
                .clone()
                .unwrap_or_else(|| "Pending".to_string()),
            student_name: claim.student.name.clone(),
            status: claim.status.label().to_string(),
            amount: claim.amount_display(),
            submission_date: claim
                .submission_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            modality_codes: claim
                .modalities
                .iter()
                .map(|m| m.code().unwrap_or(m.label()).to_string())
                .collect(),
        }
    }
}
