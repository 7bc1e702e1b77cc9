//! Tracing subscriber setup shared by the service and the one-shot binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "price_sync=info,pricing=info,catalog=info,api=info,warn";

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines;
/// the filter comes from `RUST_LOG` or falls back to [`DEFAULT_FILTER`].
///
/// Safe to call more than once: later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
