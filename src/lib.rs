// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

use std::sync::Arc;

pub use crate::api::{router, AppState};
pub use crate::calendar::{DataService, RefreshCoordinator};
pub use crate::config::CalendarConfig;

/// Wire the production services from config: headless Chrome extractor,
/// flat-file store at `cfg.data_path`, and a coordinator around them.
pub fn build_state(cfg: &CalendarConfig) -> AppState {
    let service = Arc::new(DataService::from_config(cfg));
    AppState::new(RefreshCoordinator::new(service))
}
