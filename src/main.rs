//! Price sync service, binary entrypoint.
//! Boots the Axum HTTP server with the sync trigger, metrics, and the
//! optional periodic schedule.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use price_sync_engine::{config::SyncConfig, engine_from_config, telemetry};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Shuttle installs its own subscriber; this only takes effect when it does not.
    telemetry::init_tracing();

    let cfg = SyncConfig::load().context("loading price sync config")?;
    let engine = engine_from_config(&cfg).context("building price sync engine")?;
    let router = price_sync_engine::app(&cfg, engine)?;

    Ok(router.into())
}
