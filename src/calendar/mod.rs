// src/calendar/mod.rs
//! Economic calendar pipeline: scrape, cache on disk, serve.
pub mod browser;
pub mod coordinator;
pub mod dom;
pub mod extractor;
pub mod freshness;
pub mod mock;
pub mod service;
pub mod store;
pub mod types;

pub use coordinator::{spawn_refresh_task, CoordinatorStatus, RefreshCoordinator, ScrapeOutcome};
pub use extractor::{CalendarSource, Extractor};
pub use service::DataService;
pub use types::{CalendarSnapshot, EconomicEvent, Importance, SourceTag};
