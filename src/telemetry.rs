// src/telemetry.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "calendar=info,warn";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter (`calendar=info,warn`).
/// `LOG_FORMAT=json` switches to JSON lines; anything else is compact text.
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
        // Shuttle may already have installed a subscriber.
        tracing::debug!("tracing subscriber already set");
    }
}
