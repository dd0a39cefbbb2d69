use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Claimflow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reference numbers look like `IS9JY12345`: this prefix + 5 digits.
pub const DEFAULT_REFERENCE_PREFIX: &str = "IS9JY";

/// Bounded retries when a generated reference collides with a stored one.
pub const DEFAULT_MAX_REFERENCE_ATTEMPTS: u32 = 16;

/// Simulated round-trip of the eligibility stub.
pub const DEFAULT_ELIGIBILITY_DELAY_MS: u64 = 800;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "claimflow=info,warn"
}

/// Get the application data directory
/// ~/Claimflow/ on all platforms; falls back to the working directory
/// when no home directory can be resolved (sandboxed mobile targets).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Local claim cache database.
pub fn claims_db_path() -> PathBuf {
    app_data_dir().join("claims.db")
}

/// Which preconditions are enforced before forward transitions.
///
/// The mobile screens this core replaces let a counselor walk through every
/// step with nothing selected. `strict()` (the default) closes those gaps;
/// `permissive()` reproduces the old behaviour for migration and demos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    /// `confirm_modalities()` and submission need at least one modality.
    pub require_modality: bool,
    /// `continue_to_eligibility()` needs at least one theme or service.
    pub require_theme_or_service: bool,
    /// Submission needs non-blank additional information.
    pub require_additional_info: bool,
}

impl WorkflowPolicy {
    pub fn strict() -> Self {
        Self {
            require_modality: true,
            require_theme_or_service: true,
            require_additional_info: true,
        }
    }

    pub fn permissive() -> Self {
        Self {
            require_modality: false,
            require_theme_or_service: false,
            require_additional_info: false,
        }
    }
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

/// Tunables for a claim workflow session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub reference_prefix: String,
    pub max_reference_attempts: u32,
    pub eligibility_delay_ms: u64,
    /// Applied at submission when no amount was entered manually.
    pub standard_session_fee: Decimal,
    pub policy: WorkflowPolicy,
}

impl WorkflowConfig {
    pub fn eligibility_delay(&self) -> Duration {
        Duration::from_millis(self.eligibility_delay_ms)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
            max_reference_attempts: DEFAULT_MAX_REFERENCE_ATTEMPTS,
            eligibility_delay_ms: DEFAULT_ELIGIBILITY_DELAY_MS,
            standard_session_fee: Decimal::new(15000, 2), // 150.00
            policy: WorkflowPolicy::default(),
        }
    }
}
