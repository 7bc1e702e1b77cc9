// src/catalog/in_memory.rs
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{syncable_item, CatalogItem, CatalogRepository, ItemId};
use crate::error::RepositoryError;
use crate::pricing::PriceQuote;

/// A catalog row as the store sees it, SKU optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub id: ItemId,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub net_price: Option<Decimal>,
    pub stock: Option<u64>,
    pub price_updated_at: Option<DateTime<Utc>>,
}

impl CatalogRow {
    pub fn new(id: impl Into<ItemId>, sku: Option<&str>) -> Self {
        Self {
            id: id.into(),
            sku: sku.map(str::to_string),
            price: None,
            net_price: None,
            stock: None,
            price_updated_at: None,
        }
    }
}

/// One `apply_quote` call that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedUpdate {
    pub id: ItemId,
    pub price: Decimal,
    pub net_price: Decimal,
    pub stock: u64,
    pub written_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    rows: BTreeMap<ItemId, CatalogRow>,
    applied: Vec<AppliedUpdate>,
    reject_writes: HashSet<ItemId>,
    listing_error: Option<String>,
}

/// Thread-safe in-process catalog. Used for local runs and tests.
///
/// Clones share the same rows, so a handle kept by a test observes writes
/// made through the engine.
#[derive(Default, Clone)]
pub struct InMemoryCatalogRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = CatalogRow>) -> Self {
        let state = State {
            rows: rows.into_iter().map(|r| (r.id.clone(), r)).collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Make every write to `id` fail as a store-side rejection.
    pub async fn reject_writes_for(&self, id: impl Into<ItemId>) {
        self.state.write().await.reject_writes.insert(id.into());
    }

    /// Make the next listings fail until cleared with `None`.
    pub async fn set_listing_error(&self, msg: Option<&str>) {
        self.state.write().await.listing_error = msg.map(str::to_string);
    }

    pub async fn row(&self, id: &ItemId) -> Option<CatalogRow> {
        self.state.read().await.rows.get(id).cloned()
    }

    pub async fn applied_updates(&self) -> Vec<AppliedUpdate> {
        self.state.read().await.applied.clone()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_syncable_items(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let state = self.state.read().await;
        if let Some(msg) = &state.listing_error {
            return Err(RepositoryError::Transport(msg.clone()));
        }
        Ok(state
            .rows
            .values()
            .filter_map(|r| syncable_item(r.id.clone(), r.sku.as_deref()))
            .collect())
    }

    async fn apply_quote(&self, id: &ItemId, quote: &PriceQuote) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.reject_writes.contains(id) {
            return Err(RepositoryError::Rejected {
                status: 409,
                body: format!("write to row {id} rejected"),
            });
        }
        let now = Utc::now();
        let row = state
            .rows
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })?;
        row.price = Some(quote.gross_price);
        row.net_price = Some(quote.net_price);
        row.stock = Some(quote.stock_available);
        row.price_updated_at = Some(now);

        state.applied.push(AppliedUpdate {
            id: id.clone(),
            price: quote.gross_price,
            net_price: quote.net_price,
            stock: quote.stock_available,
            written_at: now,
        });
        Ok(())
    }
}
