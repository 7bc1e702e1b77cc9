// src/sync/mod.rs
pub mod schedule;
pub mod scheduler;
pub mod summary;

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::catalog::CatalogRepository;
use crate::config::DEFAULT_CONCURRENCY;
use crate::error::RepositoryError;
use crate::pricing::PriceLookup;
use summary::{RunSummary, SummaryBuilder};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("price_sync_runs_total", "Completed price sync runs.");
        describe_counter!(
            "price_sync_items_total",
            "Catalog items attempted, labelled by outcome."
        );
        describe_counter!(
            "price_sync_run_failures_total",
            "Runs aborted because the catalog could not be listed."
        );
        describe_histogram!(
            "price_sync_run_duration_ms",
            "Wall-clock duration of a sync run in milliseconds."
        );
        describe_histogram!(
            "price_sync_lookup_ms",
            "Provider lookup latency in milliseconds."
        );
        describe_gauge!(
            "price_sync_last_run_ts",
            "Unix ts when the last sync run finished."
        );
    });
}

/// The sync engine: a provider client and a catalog handle, both injected.
///
/// Holds no state between runs, so any run can be retried by running again.
#[derive(Clone)]
pub struct PriceSyncEngine {
    lookup: Arc<dyn PriceLookup>,
    repo: Arc<dyn CatalogRepository>,
    concurrency: usize,
}

impl PriceSyncEngine {
    pub fn new(lookup: Arc<dyn PriceLookup>, repo: Arc<dyn CatalogRepository>) -> Self {
        Self {
            lookup,
            repo,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run with the configured concurrency limit.
    pub async fn run(&self) -> Result<RunSummary, RepositoryError> {
        self.run_with_concurrency(self.concurrency).await
    }

    pub async fn run_with_concurrency(
        &self,
        concurrency: usize,
    ) -> Result<RunSummary, RepositoryError> {
        run_price_sync(
            Arc::clone(&self.lookup),
            Arc::clone(&self.repo),
            concurrency,
        )
        .await
    }
}

/// List syncable items, push them through the bounded worker pool, and
/// summarize. Fails only when the catalog cannot be listed.
///
/// `concurrency` below 1 is treated as 1.
pub async fn run_price_sync(
    lookup: Arc<dyn PriceLookup>,
    repo: Arc<dyn CatalogRepository>,
    concurrency: usize,
) -> Result<RunSummary, RepositoryError> {
    ensure_metrics_described();
    let mut builder = SummaryBuilder::start(Utc::now());

    let items = match repo.list_syncable_items().await {
        Ok(items) => items,
        Err(e) => {
            counter!("price_sync_run_failures_total").increment(1);
            tracing::error!(target: "price_sync", error = %e, "could not list catalog items");
            return Err(e);
        }
    };

    let concurrency = concurrency.max(1);
    tracing::info!(
        target: "price_sync",
        items = items.len(),
        concurrency,
        "price sync started"
    );

    let outcomes = scheduler::process_items(items, concurrency, lookup, repo).await;
    builder.extend(outcomes);
    let summary = builder.finish(Utc::now());

    counter!("price_sync_runs_total").increment(1);
    counter!("price_sync_items_total", "outcome" => "updated").increment(summary.succeeded as u64);
    counter!("price_sync_items_total", "outcome" => "failed").increment(summary.failed as u64);
    histogram!("price_sync_run_duration_ms").record(summary.duration_ms as f64);
    gauge!("price_sync_last_run_ts").set(summary.finished_at.timestamp().max(0) as f64);

    tracing::info!(
        target: "price_sync",
        total = summary.total_attempted,
        updated = summary.succeeded,
        failed = summary.failed,
        duration_ms = summary.duration_ms,
        "price sync finished"
    );
    Ok(summary)
}
