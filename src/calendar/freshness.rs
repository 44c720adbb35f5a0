// src/calendar/freshness.rs
//! Daily freshness of the persisted snapshot.
//!
//! "Today" is the calendar day after shifting both the current time and the
//! file mtime by one fixed offset (UTC-4 by default, no DST). Only the mtime is
//! trusted; the timestamp column inside the file is ignored here.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::PersistenceError;

/// Source of "now". Injected so tests can move the clock across day boundaries.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Calendar date of `ts` after shifting it by `offset_minutes`.
pub fn shifted_day(ts: DateTime<Utc>, offset_minutes: i32) -> NaiveDate {
    (ts + Duration::minutes(offset_minutes as i64)).date_naive()
}

pub fn same_shifted_day(a: DateTime<Utc>, b: DateTime<Utc>, offset_minutes: i32) -> bool {
    shifted_day(a, offset_minutes) == shifted_day(b, offset_minutes)
}

#[derive(Clone)]
pub struct FreshnessPolicy {
    path: PathBuf,
    offset_minutes: i32,
    clock: Clock,
}

impl std::fmt::Debug for FreshnessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshnessPolicy")
            .field("path", &self.path)
            .field("offset_minutes", &self.offset_minutes)
            .finish_non_exhaustive()
    }
}

impl FreshnessPolicy {
    pub fn new(path: impl Into<PathBuf>, offset_minutes: i32) -> Self {
        Self::with_clock(path, offset_minutes, system_clock())
    }

    pub fn with_clock(path: impl Into<PathBuf>, offset_minutes: i32, clock: Clock) -> Self {
        Self {
            path: path.into(),
            offset_minutes,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Last-modified time of the persisted file, `None` if it does not exist.
    pub async fn modified_at(&self) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::io(&self.path, e)),
        };
        let mtime = meta
            .modified()
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        Ok(Some(DateTime::<Utc>::from(mtime)))
    }

    pub async fn is_data_from_today(&self) -> Result<bool, PersistenceError> {
        let Some(modified) = self.modified_at().await? else {
            return Ok(false);
        };
        let fresh = same_shifted_day(self.now(), modified, self.offset_minutes);
        tracing::debug!(
            target: "calendar",
            %modified,
            fresh,
            "freshness check"
        );
        Ok(fresh)
    }

    /// One successful scrape per shifted day is enough, whatever the time of day.
    pub async fn should_run_daily_scraper(&self) -> Result<bool, PersistenceError> {
        Ok(!self.is_data_from_today().await?)
    }
}
