// src/sync/schedule.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::PriceSyncEngine;
use crate::history::RunHistory;

#[derive(Clone, Copy, Debug)]
pub struct SyncScheduleCfg {
    pub interval_secs: u64,
}

/// Spawn a periodic trigger. The first run starts immediately; a listing
/// failure is logged and the next tick tries again.
///
/// `run_lock` is shared with the HTTP trigger so the two never overlap.
pub fn spawn_sync_schedule(
    cfg: SyncScheduleCfg,
    engine: PriceSyncEngine,
    history: Arc<RunHistory>,
    run_lock: Arc<tokio::sync::Mutex<()>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(cfg.interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;

            let Ok(_guard) = run_lock.try_lock() else {
                tracing::info!(target: "price_sync", "scheduled tick skipped, a run is in progress");
                continue;
            };

            match engine.run().await {
                Ok(summary) => {
                    tracing::info!(
                        target: "price_sync",
                        total = summary.total_attempted,
                        updated = summary.succeeded,
                        failed = summary.failed,
                        "scheduled price sync tick"
                    );
                    history.push(summary);
                }
                Err(e) => {
                    tracing::error!(target: "price_sync", error = %e, "scheduled price sync failed");
                }
            }
        }
    })
}
