//! Fixed option catalogs offered on the claim details step.

/// Session themes, in picker order.
pub const THEME_OPTIONS: &[&str] = &[
    "Anxiety",
    "Depression",
    "Academic Stress",
    "Family Conflict",
    "Peer Relationships",
    "Grief and Loss",
    "Self-Esteem",
    "Behavioral Concerns",
    "Substance Use",
    "Trauma",
];

/// Services rendered, in picker order.
pub const SERVICE_OPTIONS: &[&str] = &[
    "Individual Counseling",
    "Group Counseling",
    "Crisis Intervention",
    "Parent Consultation",
    "Teacher Consultation",
    "Case Management",
    "Referral Coordination",
    "Psychoeducation",
];

/// Position of `label` in `catalog`, exact match.
pub fn position(catalog: &[&str], label: &str) -> Option<usize> {
    catalog.iter().position(|option| *option == label)
}

/// Insert or remove `label` so `selected` stays duplicate-free and in
/// catalog order. Returns `false` if the label is not in the catalog.
pub fn toggle_in_catalog_order(catalog: &[&str], selected: &mut Vec<String>, label: &str) -> bool {
    if position(catalog, label).is_none() {
        return false;
    }
    if let Some(idx) = selected.iter().position(|s| s == label) {
        selected.remove(idx);
    } else {
        selected.push(label.to_string());
        selected.sort_by_key(|s| position(catalog, s).unwrap_or(usize::MAX));
    }
    true
}
