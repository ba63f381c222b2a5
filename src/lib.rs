//! Acuity: emergency-department triage scoring and deterioration alerting.
//!
//! The crate is a library; the surrounding service wires its transport of
//! choice around the engine operations and subscribes to the event bus for
//! live dashboard updates.

pub mod config;
pub mod db;
pub mod engine;
pub mod events;
pub mod models;

use tracing_subscriber::EnvFilter;

/// Initialize tracing from RUST_LOG, falling back to the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
