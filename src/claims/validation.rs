//! Local checks run before forward transitions.
//!
//! Problems are collected, not thrown one by one, so a step can show every
//! missing field inline and disable its continue button.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::WorkflowPolicy;
use crate::models::Claim;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_issue(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }

    fn push(&mut self, field: &str, message: &str) {
        self.issues.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Modality step: leaving it needs a modality under a strict policy.
pub fn validate_modality_step(claim: &Claim, policy: &WorkflowPolicy) -> ValidationReport {
    let mut report = ValidationReport::default();
    if policy.require_modality && claim.modalities.is_empty() {
        report.push("modalities", "Select at least one modality");
    }
    report
}

/// Claim details step: leaving it needs a theme or a service under a
/// strict policy. A manually entered amount must not be negative.
pub fn validate_details_step(claim: &Claim, policy: &WorkflowPolicy) -> ValidationReport {
    let mut report = ValidationReport::default();
    if policy.require_theme_or_service && claim.themes.is_empty() && claim.services.is_empty() {
        report.push("themes_or_services", "Select at least one theme or service");
    }
    if claim.amount.is_some_and(|a| a < Decimal::ZERO) {
        report.push("amount", "Amount cannot be negative");
    }
    report
}

/// Everything a claim needs before it may become Submitted.
pub fn validate_for_submission(claim: &Claim, policy: &WorkflowPolicy) -> ValidationReport {
    let mut report = validate_modality_step(claim, policy);
    report.merge(validate_details_step(claim, policy));
    if policy.require_additional_info && claim.additional_info.trim().is_empty() {
        report.push("additional_info", "Additional information is required");
    }
    report
}
