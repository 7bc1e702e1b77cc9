// src/lib.rs
// Public library surface for integration tests and the binaries.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod pricing;
pub mod sync;
pub mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::catalog::{CatalogItem, CatalogRepository, ItemId};
pub use crate::error::{LookupError, RepositoryError};
pub use crate::pricing::{PriceLookup, PriceQuote};
pub use crate::sync::summary::{Failure, RunSummary, SyncOutcome};
pub use crate::sync::{run_price_sync, PriceSyncEngine};

use crate::api::AppState;
use crate::catalog::postgrest::PostgrestCatalogRepository;
use crate::config::SyncConfig;
use crate::metrics::Metrics;
use crate::pricing::http::HttpPriceLookup;
use crate::sync::schedule::{spawn_sync_schedule, SyncScheduleCfg};

/// Build the production engine: HTTP provider client + hosted catalog.
pub fn engine_from_config(cfg: &SyncConfig) -> Result<PriceSyncEngine> {
    let lookup = HttpPriceLookup::from_config(cfg)?;
    let repo = PostgrestCatalogRepository::from_config(cfg)?;
    Ok(PriceSyncEngine::new(Arc::new(lookup), Arc::new(repo)).with_concurrency(cfg.concurrency))
}

/// Wire the service: Prometheus recorder, trigger routes, `/metrics`, and the
/// periodic schedule when `interval_secs` is set.
///
/// The recorder is installed before the schedule's first (immediate) tick so
/// that run is recorded. Installs a process-global recorder: call once.
pub fn app(cfg: &SyncConfig, engine: PriceSyncEngine) -> Result<Router> {
    let metrics = Metrics::init(cfg.concurrency).context("initializing metrics")?;
    let state = AppState::new(engine.clone(), cfg.sync_secret.as_deref(), cfg.history_capacity);

    if let Some(interval_secs) = cfg.interval_secs {
        tracing::info!(target: "price_sync", interval_secs, "periodic price sync enabled");
        spawn_sync_schedule(
            SyncScheduleCfg { interval_secs },
            engine,
            state.history.clone(),
            state.run_lock.clone(),
        );
    }

    Ok(api::router(state).merge(metrics.router()))
}
