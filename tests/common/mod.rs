// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use price_sync_engine::catalog::in_memory::{CatalogRow, InMemoryCatalogRepository};
use price_sync_engine::{LookupError, PriceLookup, PriceQuote};
use rust_decimal_macros::dec;

/// Provider double: fixed quote per SKU, optional per-SKU HTTP 500, optional
/// artificial latency, and in-flight accounting.
#[derive(Default)]
pub struct FakeLookup {
    failing: HashSet<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, sku: &str) -> Self {
        self.failing.insert(sku.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceLookup for FakeLookup {
    async fn fetch_quote(&self, sku: &str) -> Result<PriceQuote, LookupError> {
        self.calls.lock().unwrap().push(sku.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(sku) {
            return Err(LookupError::Status { status: 500 });
        }
        Ok(PriceQuote {
            sku: sku.to_string(),
            gross_price: dec!(1000),
            net_price: dec!(850),
            currency: "CLP".into(),
            stock_available: 5,
        })
    }
}

/// Catalog with ids 1..=n and SKUs "SKU-1".."SKU-n".
pub fn catalog_of(n: usize) -> InMemoryCatalogRepository {
    InMemoryCatalogRepository::with_rows(
        (1..=n).map(|i| CatalogRow::new(i as i64, Some(format!("SKU-{i}").as_str()))),
    )
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}
