// src/sync/scheduler.rs
//! Bounded fan-out/fan-in over catalog items.
//!
//! `min(N, items)` tokio tasks drain a shared atomic cursor. Each claimed index
//! runs lookup then write, and its outcome is sent back tagged with the index,
//! so the returned outcomes line up with the input order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::summary::SyncOutcome;
use crate::catalog::{CatalogItem, CatalogRepository};
use crate::pricing::PriceLookup;

pub(crate) const WORKER_ABORTED: &str = "worker aborted before completing item";

/// Run every item through `lookup` -> `apply_quote` with at most `concurrency`
/// pipelines in flight. Returns one outcome per item, in input order.
///
/// Never fails: item errors become `SyncOutcome::Failure`, and an item whose
/// worker died mid-flight is reported as aborted.
pub async fn process_items(
    items: Vec<CatalogItem>,
    concurrency: usize,
    lookup: Arc<dyn PriceLookup>,
    repo: Arc<dyn CatalogRepository>,
) -> Vec<SyncOutcome> {
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let workers = concurrency.max(1).min(total);
    let items = Arc::new(items);
    let cursor = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, SyncOutcome)>();

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let items = Arc::clone(&items);
        let cursor = Arc::clone(&cursor);
        let lookup = Arc::clone(&lookup);
        let repo = Arc::clone(&repo);
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let idx = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(idx) else {
                    break;
                };
                let outcome = sync_item(item, lookup.as_ref(), repo.as_ref()).await;
                if tx.send((idx, outcome)).is_err() {
                    break;
                }
            }
            tracing::trace!(target: "price_sync", worker, "worker drained queue");
        }));
    }
    drop(tx);

    let mut slots: Vec<Option<SyncOutcome>> = vec![None; total];
    while let Some((idx, outcome)) = rx.recv().await {
        slots[idx] = Some(outcome);
    }

    for h in handles {
        if let Err(e) = h.await {
            tracing::error!(target: "price_sync", error = %e, "sync worker terminated abnormally");
        }
    }

    slots
        .into_iter()
        .zip(items.iter())
        .map(|(slot, item)| {
            slot.unwrap_or_else(|| SyncOutcome::failed(item.id.clone(), &item.sku, WORKER_ABORTED))
        })
        .collect()
}

/// Lookup strictly precedes write; no write without a valid quote.
async fn sync_item(
    item: &CatalogItem,
    lookup: &dyn PriceLookup,
    repo: &dyn CatalogRepository,
) -> SyncOutcome {
    let quote = match lookup.fetch_quote(&item.sku).await {
        Ok(q) => q,
        Err(e) => {
            tracing::warn!(
                target: "price_sync",
                item_id = %item.id,
                sku = %item.sku,
                stage = "lookup",
                reason = %e,
                "item sync failed"
            );
            return SyncOutcome::failed(item.id.clone(), &item.sku, e);
        }
    };

    match repo.apply_quote(&item.id, &quote).await {
        Ok(()) => {
            tracing::debug!(
                target: "price_sync",
                item_id = %item.id,
                sku = %item.sku,
                price = %quote.gross_price,
                stock = quote.stock_available,
                "item updated"
            );
            SyncOutcome::Success
        }
        Err(e) => {
            tracing::warn!(
                target: "price_sync",
                item_id = %item.id,
                sku = %item.sku,
                stage = "write",
                reason = %e,
                "item sync failed"
            );
            SyncOutcome::failed(item.id.clone(), &item.sku, e)
        }
    }
}
