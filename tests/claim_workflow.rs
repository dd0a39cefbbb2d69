//! End-to-end claim scenarios through the public API.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::oneshot;

use claimflow::catalog::{AppointmentCatalog, StaticCatalog};
use claimflow::claims::reference::is_well_formed;
use claimflow::claims::{
    ClaimError, EligibilityChecker, FixedClock, FixedEligibilityChecker, RandomReferenceGenerator,
    ReferenceGenerator, SimulatedEligibilityChecker, WorkflowServices, WorkflowStep,
};
use claimflow::config::{WorkflowConfig, WorkflowPolicy};
use claimflow::models::{Claim, ClaimLookup, ClaimStatus, Modality};
use claimflow::store::{ClaimStore, MemoryClaimStore, SqliteClaimStore, StoreError};
use claimflow::{CoreState, EntryContext};

fn scenario_clock() -> FixedClock {
    FixedClock(NaiveDateTime::parse_from_str("2024-10-11 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap())
}

fn state_with(store: Arc<dyn ClaimStore>, checker: Arc<dyn EligibilityChecker>, config: WorkflowConfig) -> CoreState {
    let services = WorkflowServices {
        catalog: Arc::new(StaticCatalog::seeded()),
        store,
        checker,
        references: Arc::new(RandomReferenceGenerator::seeded("IS9JY", 42)),
        clock: Arc::new(scenario_clock()),
    };
    let state = CoreState::new(services, config);
    state.set_authenticated(true);
    state
}

fn approving_state(config: WorkflowConfig) -> (CoreState, Arc<MemoryClaimStore>) {
    let store = Arc::new(MemoryClaimStore::new());
    let state = state_with(store.clone(), Arc::new(FixedEligibilityChecker::approving()), config);
    (state, store)
}

/// Store whose writes fail while `failing` is set.
struct FlakyStore {
    inner: MemoryClaimStore,
    failing: AtomicBool,
}

impl ClaimStore for FlakyStore {
    fn get(&self, claim_id: &str) -> Result<Option<Claim>, StoreError> {
        self.inner.get(claim_id)
    }
    fn get_by_appointment(&self, appointment_id: i64) -> Result<ClaimLookup, StoreError> {
        self.inner.get_by_appointment(appointment_id)
    }
    fn upsert(&self, claim: &Claim) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".into()));
        }
        self.inner.upsert(claim)
    }
    fn list(&self) -> Result<Vec<Claim>, StoreError> {
        self.inner.list()
    }
    fn reference_exists(&self, reference: &str) -> Result<bool, StoreError> {
        self.inner.reference_exists(reference)
    }
}

// ═══════════════════════════════════════════
// Appointment 7: Samuel Green, completed 2024-10-10
// ═══════════════════════════════════════════

#[tokio::test]
async fn samuel_green_claim_end_to_end() {
    let (state, store) = approving_state(WorkflowConfig::default());

    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    assert_eq!(wf.step(), WorkflowStep::Modality);
    assert_eq!(wf.appointment().unwrap().student.name, "Samuel Green");

    wf.toggle_modality(Modality::Individual).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_theme("Academic Stress").unwrap();
    wf.toggle_service("Individual Counseling").unwrap();
    wf.set_additional_info("Discussed exam anxiety").unwrap();
    wf.continue_to_eligibility().unwrap();

    assert!(wf.check_eligibility().await.unwrap().eligible);
    wf.proceed().unwrap();
    let claim = wf.submit().unwrap();

    assert_eq!(claim.status, ClaimStatus::Submitted);
    assert_eq!(claim.modalities.iter().copied().collect::<Vec<_>>(), vec![Modality::Individual]);
    assert!(is_well_formed(claim.reference_no.as_deref().unwrap(), "IS9JY"));
    assert_eq!(claim.submission_date, NaiveDate::from_ymd_opt(2024, 10, 11));

    let stored = store.get(&claim.id).unwrap().unwrap();
    assert_eq!(stored, claim);

    let rows = state.list_claim_summaries().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].student_name, "Samuel Green");
    assert_eq!(rows[0].status, "Submitted");
    assert_eq!(rows[0].amount, "$150.00");
    assert_eq!(rows[0].modality_codes, vec!["I"]);
}

#[tokio::test]
async fn permissive_policy_submits_without_details() {
    let config = WorkflowConfig { policy: WorkflowPolicy::permissive(), ..WorkflowConfig::default() };
    let (state, _) = approving_state(config);

    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Individual).unwrap();
    wf.confirm_modalities().unwrap();
    wf.continue_to_eligibility().unwrap();
    wf.check_eligibility().await.unwrap();
    wf.proceed().unwrap();
    let claim = wf.submit().unwrap();

    assert!(claim.themes.is_empty());
    assert!(claim.additional_info.is_empty());
    assert!(claim.reference_no.is_some());
}

#[tokio::test]
async fn strict_policy_needs_additional_info_to_proceed() {
    let (state, _) = approving_state(WorkflowConfig::default());
    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Individual).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_theme("Anxiety").unwrap();
    wf.continue_to_eligibility().unwrap();
    wf.check_eligibility().await.unwrap();

    match wf.proceed() {
        Err(ClaimError::Validation(report)) => assert!(report.has_issue("additional_info")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(wf.step(), WorkflowStep::Eligibility);
}

// ═══════════════════════════════════════════
// Entry and navigation
// ═══════════════════════════════════════════

#[test]
fn claims_list_entry_selects_an_appointment() {
    let (state, _) = approving_state(WorkflowConfig::default());
    let mut wf = state.begin_claim_from_params(None, None).unwrap();
    assert_eq!(wf.step(), WorkflowStep::SelectAppointment);

    let ids: Vec<i64> = wf.selectable_appointments().unwrap().iter().map(|a| a.id).collect();
    assert!(ids.contains(&7));
    assert!(!ids.contains(&8), "future pending appointment is not claimable");

    assert!(matches!(wf.select_appointment(8), Err(ClaimError::AppointmentNotClaimable(8))));
    assert_eq!(wf.step(), WorkflowStep::SelectAppointment);
    wf.select_appointment(7).unwrap();
    assert_eq!(wf.step(), WorkflowStep::Modality);
}

#[test]
fn proceed_from_modality_is_invalid() {
    let (state, _) = approving_state(WorkflowConfig::default());
    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    assert!(matches!(
        wf.proceed(),
        Err(ClaimError::InvalidTransition { step: WorkflowStep::Modality, .. })
    ));
}

#[test]
fn toggling_twice_restores_selection() {
    let (state, _) = approving_state(WorkflowConfig::default());
    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Group).unwrap();
    let before = wf.draft().unwrap().modalities.clone();
    wf.toggle_modality(Modality::Observation).unwrap();
    wf.toggle_modality(Modality::Observation).unwrap();
    assert_eq!(wf.draft().unwrap().modalities, before);
}

#[test]
fn back_navigation_keeps_every_selection() {
    let (state, _) = approving_state(WorkflowConfig::default());
    let mut wf = state.begin_claim(EntryContext::Empty).unwrap();
    wf.select_appointment(7).unwrap();
    wf.toggle_modality(Modality::Collateral).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_theme("Grief and Loss").unwrap();
    wf.continue_to_eligibility().unwrap();

    assert_eq!(wf.back().unwrap(), WorkflowStep::ClaimDetails);
    assert_eq!(wf.back().unwrap(), WorkflowStep::Modality);
    assert_eq!(wf.back().unwrap(), WorkflowStep::SelectAppointment);
    wf.select_appointment(7).unwrap();

    let draft = wf.draft().unwrap();
    assert!(draft.modalities.contains(&Modality::Collateral));
    assert_eq!(draft.themes, vec!["Grief and Loss"]);
}

#[test]
fn resume_restores_saved_selections() {
    let (state, store) = approving_state(WorkflowConfig::default());
    let mut wf = state.begin_claim(EntryContext::Appointment(4)).unwrap();
    wf.toggle_modality(Modality::FamilyInterview).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_theme("Family Conflict").unwrap();
    wf.toggle_service("Parent Consultation").unwrap();
    let saved = wf.save_progress().unwrap();
    wf.cancel().unwrap();

    let resumed = state.begin_claim_from_params(Some(4), Some("In Progress")).unwrap();
    assert_eq!(resumed.step(), WorkflowStep::ClaimDetails);
    let draft = resumed.draft().unwrap();
    assert_eq!(draft.id, saved.id);
    assert!(draft.modalities.contains(&Modality::FamilyInterview));
    assert_eq!(draft.themes, vec!["Family Conflict"]);
    assert_eq!(draft.services, vec!["Parent Consultation"]);
    assert_eq!(store.len(), 1);
}

#[test]
fn cancel_discards_unsaved_work() {
    let (state, store) = approving_state(WorkflowConfig::default());
    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Individual).unwrap();
    wf.cancel().unwrap();
    assert!(store.is_empty());
    assert_eq!(state.claim_status(7).unwrap(), ClaimLookup::NotStarted);
}

// ═══════════════════════════════════════════
// Eligibility
// ═══════════════════════════════════════════

#[tokio::test]
async fn ineligible_result_blocks_submission() {
    let store = Arc::new(MemoryClaimStore::new());
    let state = state_with(
        store.clone(),
        Arc::new(FixedEligibilityChecker::denying("Student not covered")),
        WorkflowConfig::default(),
    );
    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Individual).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_theme("Anxiety").unwrap();
    wf.set_additional_info("notes").unwrap();
    wf.continue_to_eligibility().unwrap();

    let outcome = wf.check_eligibility().await.unwrap();
    assert!(!outcome.eligible);
    assert!(matches!(wf.proceed(), Err(ClaimError::EligibilityDenied(_))));
    assert!(matches!(wf.submit(), Err(ClaimError::EligibilityDenied(_))));
    wf.close().unwrap();
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_check_returns_to_details() {
    let store = Arc::new(MemoryClaimStore::new());
    let state = state_with(
        store,
        Arc::new(SimulatedEligibilityChecker::new(Duration::from_millis(800))),
        WorkflowConfig::default(),
    );
    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Individual).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_theme("Anxiety").unwrap();
    wf.continue_to_eligibility().unwrap();

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = cancel_tx.send(());
    });

    let result = wf
        .check_eligibility_with_cancel(async {
            let _ = cancel_rx.await;
        })
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(wf.step(), WorkflowStep::ClaimDetails);
    assert!(wf.eligibility().is_none());
    assert_eq!(wf.draft().unwrap().themes, vec!["Anxiety"]);
}

#[tokio::test(start_paused = true)]
async fn simulated_check_completes_before_cancel() {
    let store = Arc::new(MemoryClaimStore::new());
    let state = state_with(
        store,
        Arc::new(SimulatedEligibilityChecker::new(Duration::from_millis(800))),
        WorkflowConfig::default(),
    );
    let mut wf = state.begin_claim(EntryContext::Recheck(7)).unwrap();
    let result = wf
        .check_eligibility_with_cancel(tokio::time::sleep(Duration::from_secs(5)))
        .await
        .unwrap();
    assert!(result.unwrap().eligible);
    assert_eq!(wf.step(), WorkflowStep::Eligibility);
}

// ═══════════════════════════════════════════
// Persistence and references
// ═══════════════════════════════════════════

#[tokio::test]
async fn persistence_failure_keeps_draft_for_retry() {
    let store = Arc::new(FlakyStore {
        inner: MemoryClaimStore::new(),
        failing: AtomicBool::new(true),
    });
    let state = state_with(store.clone(), Arc::new(FixedEligibilityChecker::approving()), WorkflowConfig::default());
    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Individual).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_service("Case Management").unwrap();
    wf.set_additional_info("notes").unwrap();
    wf.continue_to_eligibility().unwrap();
    wf.check_eligibility().await.unwrap();
    wf.proceed().unwrap();

    let err = wf.submit().unwrap_err();
    assert!(matches!(err, ClaimError::Persistence(_)));
    assert!(err.is_retryable());
    assert!(!wf.is_finished());
    assert_eq!(wf.step(), WorkflowStep::Submitted);
    let draft = wf.draft().unwrap();
    assert_eq!(draft.status, ClaimStatus::InProgress);
    let reference = draft.reference_no.clone().unwrap();
    assert!(store.list().unwrap().is_empty());

    store.failing.store(false, Ordering::SeqCst);
    let claim = wf.submit().unwrap();
    assert_eq!(claim.reference_no.as_deref(), Some(reference.as_str()));
    assert_eq!(store.list().unwrap().len(), 1);
}

#[tokio::test]
async fn forced_collision_gets_a_fresh_reference() {
    let (state, store) = approving_state(WorkflowConfig::default());

    // Pre-store a claim holding the first reference the scenario generator
    // will draw.
    let first = RandomReferenceGenerator::seeded("IS9JY", 42).next_candidate();
    let mut taken = Claim::draft_for(&StaticCatalog::seeded().get(1).unwrap(), scenario_clock().0);
    taken.reference_no = Some(first.clone());
    taken.status = ClaimStatus::Submitted;
    store.upsert(&taken).unwrap();

    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Individual).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_theme("Trauma").unwrap();
    wf.set_additional_info("notes").unwrap();
    wf.continue_to_eligibility().unwrap();
    wf.check_eligibility().await.unwrap();
    wf.proceed().unwrap();
    let claim = wf.submit().unwrap();

    let reference = claim.reference_no.unwrap();
    assert_ne!(reference, first);
    assert!(is_well_formed(&reference, "IS9JY"));
}

#[test]
fn ten_thousand_references_are_unique() {
    let store = MemoryClaimStore::new();
    let generator = RandomReferenceGenerator::seeded("IS9JY", 1);
    let appointment = StaticCatalog::seeded().get(7).unwrap();
    let now = scenario_clock().0;
    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let reference = claimflow::claims::assign_unique_reference(&store, &generator, 64).unwrap();
        assert!(seen.insert(reference.clone()));
        let mut claim = Claim::draft_for(&appointment, now);
        claim.reference_no = Some(reference);
        store.upsert(&claim).unwrap();
    }
    assert_eq!(store.len(), 10_000);
}

#[tokio::test]
async fn sqlite_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claims.db");
    let store = Arc::new(SqliteClaimStore::open(&path).unwrap());
    let state = state_with(store, Arc::new(FixedEligibilityChecker::approving()), WorkflowConfig::default());

    let mut wf = state.begin_claim(EntryContext::Appointment(7)).unwrap();
    wf.toggle_modality(Modality::Individual).unwrap();
    wf.toggle_modality(Modality::Group).unwrap();
    wf.confirm_modalities().unwrap();
    wf.toggle_theme("Peer Relationships").unwrap();
    wf.set_additional_info("Group follow-up").unwrap();
    wf.continue_to_eligibility().unwrap();
    wf.check_eligibility().await.unwrap();
    wf.proceed().unwrap();
    let claim = wf.submit().unwrap();
    drop(state);

    let reopened = SqliteClaimStore::open(&path).unwrap();
    match reopened.get_by_appointment(7).unwrap() {
        ClaimLookup::Submitted(stored) => assert_eq!(stored, claim),
        other => panic!("expected submitted claim, got {other:?}"),
    }
    assert!(reopened.reference_exists(claim.reference_no.as_deref().unwrap()).unwrap());
}
