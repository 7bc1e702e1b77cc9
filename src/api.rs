//! Trigger adapter: authorizes HTTP callers and runs the sync synchronously.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sha2::{Digest, Sha256};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::MAX_CONCURRENCY;
use crate::history::RunHistory;
use crate::sync::summary::RunSummary;
use crate::sync::PriceSyncEngine;

pub const SECRET_HEADER: &str = "x-sync-secret";

#[derive(Clone)]
pub struct AppState {
    pub engine: PriceSyncEngine,
    pub history: Arc<RunHistory>,
    /// Held for the duration of a run; shared with the periodic schedule.
    pub run_lock: Arc<tokio::sync::Mutex<()>>,
    secret_digest: Option<[u8; 32]>,
}

impl AppState {
    /// `sync_secret = None` (or blank) rejects every trigger request.
    pub fn new(engine: PriceSyncEngine, sync_secret: Option<&str>, history_capacity: usize) -> Self {
        let secret_digest = sync_secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(digest);
        if secret_digest.is_none() {
            tracing::warn!(target: "api", "SYNC_SECRET not set; trigger endpoint will refuse all requests");
        }
        Self {
            engine,
            history: Arc::new(RunHistory::with_capacity(history_capacity)),
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
            secret_digest,
        }
    }

    fn authorized(&self, headers: &HeaderMap, query_secret: Option<&str>) -> bool {
        let Some(expected) = &self.secret_digest else {
            return false;
        };
        let header_secret = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        [header_secret, bearer, query_secret]
            .into_iter()
            .flatten()
            .any(|candidate| constant_time_eq(&digest(candidate.trim()), expected))
    }
}

fn digest(s: &str) -> [u8; 32] {
    Sha256::digest(s.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/sync-prices", get(trigger_sync).post(trigger_sync))
        .route("/api/sync-prices/history", get(sync_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn error_json(status: StatusCode, msg: &str) -> Response {
    (status, Json(serde_json::json!({ "error": msg }))).into_response()
}

/// Query parameters are read loosely so authorization is decided before any
/// of them is validated.
type RawParams = HashMap<String, String>;

/// Absent is `None`; present but unparsable is a 400.
fn parse_param<T: FromStr>(params: &RawParams, name: &str) -> Result<Option<T>, Response> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            error_json(
                StatusCode::BAD_REQUEST,
                &format!("{name} must be a non-negative integer, got {raw:?}"),
            )
        }),
    }
}

async fn trigger_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RawParams>,
) -> Response {
    if !state.authorized(&headers, params.get("secret").map(String::as_str)) {
        tracing::warn!(target: "api", "unauthorized sync trigger");
        return error_json(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let requested = match parse_param::<usize>(&params, "concurrency") {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    let concurrency = match requested {
        None => state.engine.concurrency(),
        Some(n) if (1..=MAX_CONCURRENCY).contains(&n) => n,
        Some(n) => {
            return error_json(
                StatusCode::BAD_REQUEST,
                &format!("concurrency must be between 1 and {MAX_CONCURRENCY}, got {n}"),
            )
        }
    };

    let Ok(_guard) = state.run_lock.try_lock() else {
        return error_json(StatusCode::CONFLICT, "sync already running");
    };

    match state.engine.run_with_concurrency(concurrency).await {
        Ok(summary) => {
            state.history.push(summary.clone());
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => error_json(StatusCode::BAD_GATEWAY, &e.to_string()),
    }
}

async fn sync_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RawParams>,
) -> Result<Json<Vec<RunSummary>>, Response> {
    if !state.authorized(&headers, params.get("secret").map(String::as_str)) {
        return Err(error_json(StatusCode::UNAUTHORIZED, "unauthorized"));
    }
    let n = parse_param::<usize>(&params, "limit")?.unwrap_or(usize::MAX);
    Ok(Json(state.history.snapshot_last_n(n)))
}
