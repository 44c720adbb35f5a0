//! Economic calendar service — binary entrypoint.
//! Boots tracing, loads config, wires the calendar services into the Axum
//! router, and closes the headless browser on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use trade_journal_calendar::calendar::{spawn_refresh_task, RefreshCoordinator};
use trade_journal_calendar::metrics::Metrics;
use trade_journal_calendar::{build_state, router, telemetry, CalendarConfig};

struct CalendarService {
    router: axum::Router,
    coordinator: Arc<RefreshCoordinator>,
    refresh_every: Option<std::time::Duration>,
}

#[shuttle_runtime::async_trait]
impl shuttle_runtime::Service for CalendarService {
    async fn bind(self, addr: SocketAddr) -> Result<(), shuttle_runtime::Error> {
        let refresh_task = self
            .refresh_every
            .map(|period| spawn_refresh_task(Arc::clone(&self.coordinator), period));

        let listener = TcpListener::bind(addr).await?;
        info!(target: "calendar", %addr, "calendar service listening");
        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(task) = refresh_task {
            task.abort();
        }
        self.coordinator.close().await;
        info!(target: "calendar", "calendar service stopped");

        served.map_err(Into::into)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(target: "calendar", error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[shuttle_runtime::main]
async fn main() -> Result<CalendarService, shuttle_runtime::Error> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let cfg = CalendarConfig::load().map_err(anyhow::Error::from)?;
    info!(
        target: "calendar",
        url = %cfg.target_url,
        data_path = %cfg.data_path.display(),
        settle_delay_secs = cfg.settle_delay_secs,
        "calendar config loaded"
    );

    let state = build_state(&cfg);
    let coordinator = Arc::clone(&state.coordinator);

    let mut app = router(state);
    match Metrics::init() {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => warn!(target: "calendar", error = %e, "metrics recorder not installed"),
    }

    Ok(CalendarService {
        router: app,
        coordinator,
        refresh_every: cfg.refresh_check_interval(),
    })
}
