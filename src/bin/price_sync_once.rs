//! Run one price sync against the configured provider and catalog, print the
//! summary JSON to stdout. Exits non-zero when the catalog cannot be listed.

use anyhow::{Context, Result};
use price_sync_engine::{config::SyncConfig, engine_from_config, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let cfg = SyncConfig::load().context("loading price sync config")?;
    let engine = engine_from_config(&cfg)?;

    let summary = engine.run().await.context("price sync run failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
