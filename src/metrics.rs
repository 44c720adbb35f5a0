// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the calendar series.
    /// Fails if a recorder is already installed in this process.
    pub fn init() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe_calendar_metrics();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_calendar_metrics() {
    describe_counter!("calendar_scrape_total", "Calendar page scrapes started.");
    describe_counter!(
        "calendar_scrape_errors_total",
        "Calendar scrapes that failed to render the page."
    );
    describe_counter!(
        "calendar_store_write_errors_total",
        "Scraped snapshots that could not be persisted."
    );
    describe_counter!(
        "calendar_rows_skipped_total",
        "Malformed rows skipped while reading the calendar file."
    );
    describe_counter!(
        "calendar_requests_total",
        "Calendar datasets served, labelled by source tag."
    );
    describe_gauge!(
        "calendar_last_scrape_ts",
        "Unix ts of the last successful page scrape."
    );
    describe_histogram!("calendar_scrape_ms", "Scrape duration in milliseconds.");
}
