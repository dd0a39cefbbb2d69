pub mod catalog;
pub mod claims;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod store;

use tracing_subscriber::EnvFilter;

pub use claims::{ClaimError, ClaimWorkflow, EntryContext, WorkflowStep};
pub use core_state::CoreState;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
