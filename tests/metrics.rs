// tests/metrics.rs
//
// Full in-process app with the periodic schedule enabled. The schedule's
// first tick fires right away, so its run must land on /metrics with the
// series descriptions attached.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{catalog_of, FakeLookup};
use price_sync_engine::config::SyncConfig;
use price_sync_engine::PriceSyncEngine;

async fn scrape(app: &axum::Router) -> String {
    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn first_scheduled_run_is_exported_with_descriptions() {
    let cfg = SyncConfig {
        concurrency: 4,
        interval_secs: Some(3600),
        ..SyncConfig::default()
    };
    let engine = PriceSyncEngine::new(
        Arc::new(FakeLookup::new().failing_for("SKU-3")),
        Arc::new(catalog_of(3)),
    )
    .with_concurrency(cfg.concurrency);
    let app = price_sync_engine::app(&cfg, engine).expect("app should build in tests");

    let mut text = String::new();
    for _ in 0..100 {
        text = scrape(&app).await;
        if text.contains("price_sync_runs_total 1") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    for needle in [
        "# HELP price_sync_runs_total",
        "# HELP price_sync_items_total",
        "price_sync_runs_total 1",
        "price_sync_items_total{outcome=\"updated\"} 2",
        "price_sync_items_total{outcome=\"failed\"} 1",
        "price_sync_concurrency_limit 4",
    ] {
        assert!(text.contains(needle), "missing `{needle}` in:\n{text}");
    }
}
