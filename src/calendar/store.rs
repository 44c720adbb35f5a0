// src/calendar/store.rs
//! Flat-file persistence of one calendar snapshot.
//!
//! Format: UTF-8, unquoted header row, then one row per event with every field
//! double-quoted and embedded quotes doubled. The 10th column carries the write
//! time and is informational only; freshness is derived from the file mtime.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::calendar::types::{EconomicEvent, Importance};
use crate::error::PersistenceError;

pub const HEADER: &str = "ID,Time,Currency,Event,Description,Importance,Forecast,Previous,Actual,Timestamp";

/// Rows with fewer parsed fields than this are skipped on read.
const MIN_FIELDS: usize = 9;

/// Per-process sequence for temp file names; concurrent writers never share one.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FlatFileStore {
    path: PathBuf,
}

impl FlatFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with `events`. The new content is written to a sibling
    /// temp file unique to this call and renamed over the target, so readers
    /// never see a partial file and concurrent writers end as last-writer-wins.
    pub async fn write(&self, events: &[EconomicEvent]) -> Result<(), PersistenceError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PersistenceError::io(dir, e))?;
        }

        let body = encode(events)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| PersistenceError::io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(PersistenceError::io(&self.path, e));
        }

        info!(
            target: "calendar",
            path = %self.path.display(),
            events = events.len(),
            "calendar snapshot written"
        );
        Ok(())
    }

    /// Read the snapshot back. `Ok(None)` when the file is missing or holds no
    /// valid rows; `Err` only for I/O failures other than not-found.
    pub async fn read(&self) -> Result<Option<Vec<EconomicEvent>>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "calendar", path = %self.path.display(), "no calendar file");
                return Ok(None);
            }
            Err(e) => return Err(PersistenceError::io(&self.path, e)),
        };

        let events = decode(&bytes);
        if events.is_empty() {
            warn!(target: "calendar", path = %self.path.display(), "no valid rows in calendar file");
            return Ok(None);
        }
        Ok(Some(events))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        name.push(format!(".{}.{seq}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}

fn encode(events: &[EconomicEvent]) -> Result<Vec<u8>, PersistenceError> {
    let generated = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut out = Vec::with_capacity(128 * (events.len() + 1));
    out.extend_from_slice(HEADER.as_bytes());
    out.push(b'\n');

    let mut w = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .from_writer(out);

    for ev in events {
        let id = ev.id.to_string();
        w.write_record([
            id.as_str(),
            ev.time.as_str(),
            ev.currency.as_str(),
            ev.event.as_str(),
            ev.description.as_str(),
            ev.importance.as_str(),
            ev.forecast.as_deref().unwrap_or(""),
            ev.previous.as_deref().unwrap_or(""),
            ev.actual.as_deref().unwrap_or(""),
            generated.as_str(),
        ])?;
    }

    w.into_inner()
        .map_err(|e| PersistenceError::Encode(e.error().to_string()))
}

fn decode(bytes: &[u8]) -> Vec<EconomicEvent> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let mut events: Vec<EconomicEvent> = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = match rec {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "calendar", row = line + 1, error = %e, "skipping unparsable row");
                counter!("calendar_rows_skipped_total").increment(1);
                continue;
            }
        };
        if rec.len() < MIN_FIELDS {
            warn!(target: "calendar", row = line + 1, fields = rec.len(), "skipping short row");
            counter!("calendar_rows_skipped_total").increment(1);
            continue;
        }
        let event = rec[3].to_string();
        if event.is_empty() {
            warn!(target: "calendar", row = line + 1, "skipping row without event title");
            counter!("calendar_rows_skipped_total").increment(1);
            continue;
        }

        let id = rec[0]
            .trim()
            .parse::<u32>()
            .unwrap_or(events.len() as u32 + 1);

        events.push(EconomicEvent {
            id,
            time: rec[1].to_string(),
            currency: rec[2].to_string(),
            event,
            description: rec[4].to_string(),
            importance: Importance::parse_label(&rec[5]),
            forecast: optional(&rec[6]),
            previous: optional(&rec[7]),
            actual: optional(&rec[8]),
        });
    }
    events
}

fn optional(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
