// src/calendar/service.rs
//! Single entry point that always returns *some* calendar dataset.
//!
//! Decision order for `get_data(force)`:
//! 1. forced scrape (`scraped_force`)
//! 2. same-day file (`csv_today`)
//! 3. daily scrape when the file is stale (`scraped_daily`)
//! 4. any file content (`csv_fallback`)
//! 5. empty (`none`)
//!
//! A persistence error anywhere in 1-5 drops into recovery: one more file read
//! (`csv_error_fallback`), else empty (`error`).

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use crate::calendar::extractor::{CalendarSource, Extractor};
use crate::calendar::freshness::FreshnessPolicy;
use crate::calendar::store::FlatFileStore;
use crate::calendar::types::{CalendarSnapshot, SourceTag};
use crate::config::CalendarConfig;
use crate::error::{ExtractionError, PersistenceError};

pub struct DataService {
    store: FlatFileStore,
    freshness: FreshnessPolicy,
    source: Arc<dyn CalendarSource>,
}

impl DataService {
    pub fn new(
        store: FlatFileStore,
        freshness: FreshnessPolicy,
        source: Arc<dyn CalendarSource>,
    ) -> Self {
        Self {
            store,
            freshness,
            source,
        }
    }

    pub fn from_config(cfg: &CalendarConfig) -> Self {
        Self::new(
            FlatFileStore::new(&cfg.data_path),
            FreshnessPolicy::new(&cfg.data_path, cfg.utc_offset_minutes),
            Arc::new(Extractor::from_config(cfg)),
        )
    }

    pub fn store(&self) -> &FlatFileStore {
        &self.store
    }

    pub fn freshness(&self) -> &FreshnessPolicy {
        &self.freshness
    }

    /// Never fails; every path ends in a snapshot.
    pub async fn get_data(&self, force_refresh: bool) -> CalendarSnapshot {
        let snapshot = match self.resolve(force_refresh).await {
            Ok(s) => s,
            Err(e) => self.recover(e).await,
        };
        counter!("calendar_requests_total", "source" => snapshot.source.as_str()).increment(1);
        info!(
            target: "calendar",
            force_refresh,
            source = %snapshot.source,
            events = snapshot.data.len(),
            "calendar data served"
        );
        snapshot
    }

    async fn resolve(&self, force_refresh: bool) -> Result<CalendarSnapshot, PersistenceError> {
        if force_refresh {
            if let Some(s) = self.scrape_and_persist(SourceTag::ScrapedForce).await {
                return Ok(s);
            }
        }

        if self.freshness.is_data_from_today().await? {
            if let Some(events) = self.store.read().await? {
                return Ok(CalendarSnapshot::new(events, SourceTag::CsvToday));
            }
        }

        // A failed forced scrape already counts as this request's attempt.
        if !force_refresh && self.freshness.should_run_daily_scraper().await? {
            if let Some(s) = self.scrape_and_persist(SourceTag::ScrapedDaily).await {
                return Ok(s);
            }
        }

        if let Some(events) = self.store.read().await? {
            return Ok(CalendarSnapshot::new(events, SourceTag::CsvFallback));
        }

        Ok(CalendarSnapshot::empty(SourceTag::None))
    }

    /// Scrape and write through. `None` when the scrape failed or found nothing;
    /// a failed write still returns the fresh data for this request.
    async fn scrape_and_persist(&self, tag: SourceTag) -> Option<CalendarSnapshot> {
        match self.source.fetch_events().await {
            Ok(events) if events.is_empty() => {
                info!(target: "calendar", source = self.source.name(), "scrape found no events");
                None
            }
            Ok(events) => {
                if let Err(e) = self.store.write(&events).await {
                    counter!("calendar_store_write_errors_total").increment(1);
                    warn!(target: "calendar", error = %e, "failed to persist scraped events");
                }
                Some(CalendarSnapshot::new(events, tag))
            }
            Err(ExtractionError::NavigationTimeout { url, timeout }) => {
                warn!(target: "calendar", %url, ?timeout, "calendar page timed out");
                None
            }
            Err(e) => {
                warn!(target: "calendar", source = self.source.name(), error = %e, "scrape failed");
                None
            }
        }
    }

    async fn recover(&self, err: PersistenceError) -> CalendarSnapshot {
        warn!(target: "calendar", error = %err, "calendar pipeline failed, attempting recovery read");
        match self.store.read().await {
            Ok(Some(events)) => CalendarSnapshot::new(events, SourceTag::CsvErrorFallback),
            Ok(None) => CalendarSnapshot::empty(SourceTag::Error),
            Err(e) => {
                warn!(target: "calendar", error = %e, "recovery read failed");
                CalendarSnapshot::empty(SourceTag::Error)
            }
        }
    }

    /// Release the browser held by the source.
    pub async fn close(&self) {
        self.source.close().await;
    }
}
