// src/calendar/coordinator.rs
//! Refresh coordination: at most one coordinated scrape at a time, plus a
//! fire-and-forget refresh when the dashboard loads stale data.
//!
//! Direct `DataService` callers (manual refresh) bypass the in-progress flag.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::calendar::service::DataService;
use crate::calendar::types::{CalendarSnapshot, SourceTag};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeOutcome {
    /// Another coordinated run was already in progress.
    Skipped,
    Scraped { source: SourceTag, count: usize },
    /// Today's file already exists; nothing scraped.
    CsvFresh { count: usize },
    Failed { source: SourceTag, count: usize, error: String },
}

impl ScrapeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeOutcome::Scraped { .. } | ScrapeOutcome::CsvFresh { .. })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorStatus {
    pub in_progress: bool,
    /// Epoch milliseconds of the last successful run.
    pub last_run_timestamp: Option<i64>,
    pub has_today_data: bool,
}

#[derive(Debug, Default)]
struct RunState {
    in_progress: bool,
    last_run: Option<DateTime<Utc>>,
}

pub struct RefreshCoordinator {
    service: Arc<DataService>,
    state: Mutex<RunState>,
}

/// Clears the in-progress flag on every exit path, unwinding included.
struct InProgress<'a> {
    state: &'a Mutex<RunState>,
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_progress = false;
    }
}

impl RefreshCoordinator {
    pub fn new(service: Arc<DataService>) -> Arc<Self> {
        Arc::new(Self {
            service,
            state: Mutex::new(RunState::default()),
        })
    }

    pub fn service(&self) -> &Arc<DataService> {
        &self.service
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check-and-set under one lock, so two callers can never both start.
    fn try_begin(&self) -> Option<InProgress<'_>> {
        let mut st = self.lock_state();
        if st.in_progress {
            return None;
        }
        st.in_progress = true;
        Some(InProgress { state: &self.state })
    }

    pub fn in_progress(&self) -> bool {
        self.lock_state().in_progress
    }

    fn mark_success(&self) {
        self.lock_state().last_run = Some(Utc::now());
    }

    pub async fn run_scraper(&self) -> ScrapeOutcome {
        let Some(_running) = self.try_begin() else {
            info!(target: "calendar", "scrape already in progress, skipping");
            return ScrapeOutcome::Skipped;
        };

        let due = match self.service.freshness().should_run_daily_scraper().await {
            Ok(due) => due,
            Err(e) => {
                warn!(target: "calendar", error = %e, "freshness check failed, scraping anyway");
                true
            }
        };

        let outcome = if due {
            let snap = self.service.get_data(true).await;
            if snap.source == SourceTag::ScrapedForce {
                ScrapeOutcome::Scraped {
                    source: snap.source,
                    count: snap.data.len(),
                }
            } else {
                ScrapeOutcome::Failed {
                    source: snap.source,
                    count: snap.data.len(),
                    error: format!("scrape produced no data, served {}", snap.source),
                }
            }
        } else {
            match self.service.store().read().await {
                Ok(events) => ScrapeOutcome::CsvFresh {
                    count: events.map_or(0, |v| v.len()),
                },
                Err(e) => ScrapeOutcome::Failed {
                    source: SourceTag::Error,
                    count: 0,
                    error: e.to_string(),
                },
            }
        };

        if outcome.is_success() {
            self.mark_success();
        }
        info!(target: "calendar", ?outcome, "coordinated scrape finished");
        outcome
    }

    /// Serve cached/quick data now; if today's data is still missing afterwards,
    /// start a detached scrape so the next request gets fresher data.
    pub async fn run_on_dashboard_load(self: &Arc<Self>) -> CalendarSnapshot {
        let snapshot = self.service.get_data(false).await;

        match self.service.freshness().should_run_daily_scraper().await {
            Ok(true) if !self.in_progress() => {
                let me = Arc::clone(self);
                tokio::spawn(async move {
                    match me.run_scraper().await {
                        ScrapeOutcome::Failed { error, .. } => {
                            warn!(target: "calendar", %error, "background refresh failed")
                        }
                        outcome => debug!(target: "calendar", ?outcome, "background refresh done"),
                    }
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(target: "calendar", error = %e, "freshness check failed on dashboard load")
            }
        }

        snapshot
    }

    pub async fn status(&self) -> CoordinatorStatus {
        let (in_progress, last_run) = {
            let st = self.lock_state();
            (st.in_progress, st.last_run)
        };
        let has_today_data = match self.service.freshness().is_data_from_today().await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "calendar", error = %e, "freshness check failed for status");
                false
            }
        };
        CoordinatorStatus {
            in_progress,
            last_run_timestamp: last_run.map(|t| t.timestamp_millis()),
            has_today_data,
        }
    }

    /// Release the browser. Safe to call more than once.
    pub async fn close(&self) {
        self.service.close().await;
    }
}

/// Tick `run_scraper` every `period`; the coordinator decides whether a scrape is due.
pub fn spawn_refresh_task(coordinator: Arc<RefreshCoordinator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = coordinator.run_scraper().await;
            debug!(target: "calendar", ?outcome, "refresh tick");
        }
    })
}
