//! Application state shared by every screen that can open a claim.
//!
//! `CoreState` owns the collaborators (catalog, store, eligibility,
//! reference numbers, clock) and hands out one `ClaimWorkflow` per
//! "create claim" tap. Read-only list/status queries go straight to the
//! store.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::catalog::{AppointmentCatalog, StaticCatalog};
use crate::claims::{
    ClaimError, ClaimWorkflow, EntryContext, RandomReferenceGenerator, SimulatedEligibilityChecker,
    SystemClock, WorkflowServices,
};
use crate::config::{self, WorkflowConfig};
use crate::models::{Appointment, Claim, ClaimLookup, ClaimSummary};
use crate::store::{ClaimStore, MemoryClaimStore, SqliteClaimStore, StoreError};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    services: WorkflowServices,
    config: WorkflowConfig,
    /// Sign-in flag. Signed out, no workflow may start.
    authenticated: AtomicBool,
}

impl CoreState {
    pub fn new(services: WorkflowServices, config: WorkflowConfig) -> Self {
        Self {
            services,
            config,
            authenticated: AtomicBool::new(false),
        }
    }

    /// Seeded catalog, in-memory claims, simulated eligibility.
    pub fn in_memory_demo(config: WorkflowConfig) -> Self {
        let services = default_services(Arc::new(MemoryClaimStore::new()), &config);
        Self::new(services, config)
    }

    /// Seeded catalog with claims persisted in SQLite at `path`.
    pub fn open(path: &Path, config: WorkflowConfig) -> Result<Self, CoreError> {
        let store = SqliteClaimStore::open(path)?;
        tracing::info!(path = %path.display(), "Claims database opened");
        let services = default_services(Arc::new(store), &config);
        Ok(Self::new(services, config))
    }

    /// `open` at the platform data directory.
    pub fn open_default() -> Result<Self, CoreError> {
        Self::open(&config::claims_db_path(), WorkflowConfig::default())
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn services(&self) -> &WorkflowServices {
        &self.services
    }

    // ── Authentication ──────────────────────────────────────

    pub fn set_authenticated(&self, signed_in: bool) {
        self.authenticated.store(signed_in, Ordering::Relaxed);
        tracing::info!(signed_in, "Authentication state changed");
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }

    // ── Workflow entry ──────────────────────────────────────

    /// Open a claim workflow session. Requires a signed-in user.
    pub fn begin_claim(&self, entry: EntryContext) -> Result<ClaimWorkflow, ClaimError> {
        if !self.is_authenticated() {
            tracing::warn!(entry = ?entry, "Claim workflow requested while signed out");
            return Err(ClaimError::NotAuthenticated);
        }
        ClaimWorkflow::start(self.services.clone(), self.config.clone(), entry)
    }

    /// `begin_claim` from raw navigation parameters.
    pub fn begin_claim_from_params(
        &self,
        appointment_id: Option<i64>,
        status: Option<&str>,
    ) -> Result<ClaimWorkflow, ClaimError> {
        self.begin_claim(EntryContext::from_params(appointment_id, status)?)
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn appointments(&self) -> Vec<Appointment> {
        self.services.catalog.list()
    }

    /// Claim state for an appointment detail screen.
    pub fn claim_status(&self, appointment_id: i64) -> Result<ClaimLookup, CoreError> {
        Ok(self.services.store.get_by_appointment(appointment_id)?)
    }

    /// Rows for the claims list, in insertion order.
    pub fn list_claim_summaries(&self) -> Result<Vec<ClaimSummary>, CoreError> {
        let claims = self.services.store.list()?;
        Ok(claims.iter().map(ClaimSummary::from_claim).collect())
    }

    pub fn claim_detail(&self, claim_id: &str) -> Result<Claim, CoreError> {
        self.services
            .store
            .get(claim_id)?
            .ok_or_else(|| CoreError::ClaimNotFound(claim_id.to_string()))
    }
}

fn default_services(store: Arc<dyn ClaimStore>, config: &WorkflowConfig) -> WorkflowServices {
    let catalog: Arc<dyn AppointmentCatalog> = Arc::new(StaticCatalog::seeded());
    WorkflowServices {
        catalog,
        store,
        checker: Arc::new(SimulatedEligibilityChecker::new(config.eligibility_delay())),
        references: Arc::new(RandomReferenceGenerator::new(config.reference_prefix.clone())),
        clock: Arc::new(SystemClock),
    }
}

/// Errors from state-level queries (not workflow transitions).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Claim not found: {0}")]
    ClaimNotFound(String),
}
