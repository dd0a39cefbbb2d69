use serde::{Deserialize, Serialize};

/// Coded session-type classification carried on a claim.
///
/// Variant order is the order the modality picker shows them in; `Ord`
/// follows it so a `BTreeSet<Modality>` iterates in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    NonTherapeutic,
    Individual,
    Collateral,
    ReEntry,
    Sarf,
    CheckIn,
    FamilyInterview,
    Group,
    Observation,
    ThreatAssessment,
    RapidReferral,
    Family,
}

impl Modality {
    pub fn all() -> &'static [Modality] {
        &[
            Self::NonTherapeutic,
            Self::Individual,
            Self::Collateral,
            Self::ReEntry,
            Self::Sarf,
            Self::CheckIn,
            Self::FamilyInterview,
            Self::Group,
            Self::Observation,
            Self::ThreatAssessment,
            Self::RapidReferral,
            Self::Family,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonTherapeutic => "non_therapeutic",
            Self::Individual => "individual",
            Self::Collateral => "collateral",
            Self::ReEntry => "re_entry",
            Self::Sarf => "sarf",
            Self::CheckIn => "check_in",
            Self::FamilyInterview => "family_interview",
            Self::Group => "group",
            Self::Observation => "observation",
            Self::ThreatAssessment => "threat_assessment",
            Self::RapidReferral => "rapid_referral",
            Self::Family => "family",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NonTherapeutic => "Non-Therapeutic",
            Self::Individual => "Individual",
            Self::Collateral => "Collateral",
            Self::ReEntry => "Re-Entry Meeting",
            Self::Sarf => "SARF",
            Self::CheckIn => "Check-In",
            Self::FamilyInterview => "Family Interview",
            Self::Group => "Group",
            Self::Observation => "Observation",
            Self::ThreatAssessment => "Threat Assessment",
            Self::RapidReferral => "Rapid Referral",
            Self::Family => "Family",
        }
    }

    /// Billing short code; non-therapeutic contacts and SARF have none.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::NonTherapeutic | Self::Sarf => None,
            Self::Individual => Some("I"),
            Self::Collateral => Some("C"),
            Self::ReEntry => Some("RM"),
            Self::CheckIn => Some("CI"),
            Self::FamilyInterview => Some("FI"),
            Self::Group => Some("G"),
            Self::Observation => Some("O"),
            Self::ThreatAssessment => Some("TA"),
            Self::RapidReferral => Some("RR"),
            Self::Family => Some("F"),
        }
    }

    /// Accepts the storage key, the display label (any case, `-`/space
    /// insensitive) or the short code.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        let folded = fold(trimmed);
        Self::all().iter().copied().find(|m| {
            m.as_str() == trimmed
                || fold(m.as_str()) == folded
                || fold(m.label()) == folded
                || m.code().is_some_and(|c| c.eq_ignore_ascii_case(trimmed))
        })
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{} ({code})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
