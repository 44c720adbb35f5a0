// tests/service_fallback.rs
//
// Data service decision order and fallback chain, driven by mock sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use trade_journal_calendar::calendar::freshness::FreshnessPolicy;
use trade_journal_calendar::calendar::store::FlatFileStore;
use trade_journal_calendar::calendar::{
    CalendarSource, DataService, EconomicEvent, Importance, SourceTag,
};
use trade_journal_calendar::error::ExtractionError;

enum Behavior {
    Events(usize),
    Empty,
    Fail,
}

struct MockSource {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockSource {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarSource for MockSource {
    async fn fetch_events(&self) -> Result<Vec<EconomicEvent>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Events(n) => Ok((1..=n as u32).map(|i| sample(i, "Scraped Event Title")).collect()),
            Behavior::Empty => Ok(Vec::new()),
            Behavior::Fail => Err(ExtractionError::Browser("boom".into())),
        }
    }
    async fn close(&self) {}
    fn name(&self) -> &'static str {
        "mock"
    }
}

fn sample(id: u32, title: &str) -> EconomicEvent {
    EconomicEvent {
        id,
        time: "08:30".into(),
        currency: "USD".into(),
        event: title.into(),
        description: "desc".into(),
        importance: Importance::Medium,
        forecast: None,
        previous: None,
        actual: None,
    }
}

fn service(path: &std::path::Path, source: Arc<MockSource>) -> DataService {
    DataService::new(
        FlatFileStore::new(path),
        FreshnessPolicy::new(path, -240),
        source,
    )
}

async fn seed_stale(path: &std::path::Path, title: &str) {
    FlatFileStore::new(path)
        .write(&[sample(1, title)])
        .await
        .unwrap();
    let yesterday = SystemTime::now() - Duration::from_secs(36 * 3600);
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(yesterday)
        .unwrap();
}

#[tokio::test]
async fn same_day_file_is_served_twice_without_scraping() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cal.csv");
    FlatFileStore::new(&path)
        .write(&[sample(1, "Cached Event Title"), sample(2, "Cached Event Two")])
        .await
        .unwrap();

    let src = MockSource::new(Behavior::Events(3));
    let svc = service(&path, src.clone());

    let a = svc.get_data(false).await;
    let b = svc.get_data(false).await;
    assert_eq!(a.source, SourceTag::CsvToday);
    assert_eq!(b.source, SourceTag::CsvToday);
    assert_eq!(a.data, b.data);
    assert_eq!(a.data.len(), 2);
    assert_eq!(src.calls(), 0);
}

#[tokio::test]
async fn force_refresh_scrapes_and_persists() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested/dir/cal.csv");
    let src = MockSource::new(Behavior::Events(4));
    let svc = service(&path, src.clone());

    let snap = svc.get_data(true).await;
    assert_eq!(snap.source, SourceTag::ScrapedForce);
    assert_eq!(snap.data.len(), 4);
    assert_eq!(src.calls(), 1);

    // the write-through makes the next plain request a cache hit
    let next = svc.get_data(false).await;
    assert_eq!(next.source, SourceTag::CsvToday);
    assert_eq!(next.data, snap.data);
    assert_eq!(src.calls(), 1);
}

#[tokio::test]
async fn stale_file_triggers_daily_scrape() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cal.csv");
    seed_stale(&path, "Old Cached Title").await;

    let src = MockSource::new(Behavior::Events(2));
    let svc = service(&path, src.clone());

    let snap = svc.get_data(false).await;
    assert_eq!(snap.source, SourceTag::ScrapedDaily);
    assert_eq!(snap.data.len(), 2);
    assert_eq!(src.calls(), 1);
}

#[tokio::test]
async fn failed_daily_scrape_falls_back_to_stale_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cal.csv");
    seed_stale(&path, "Old Cached Title").await;

    let src = MockSource::new(Behavior::Fail);
    let snap = service(&path, src.clone()).get_data(false).await;
    assert_eq!(snap.source, SourceTag::CsvFallback);
    assert_eq!(snap.data[0].event, "Old Cached Title");
    assert_eq!(src.calls(), 1);
}

#[tokio::test]
async fn failed_forced_scrape_is_not_retried_in_the_same_call() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cal.csv");
    seed_stale(&path, "Old Cached Title").await;

    let src = MockSource::new(Behavior::Fail);
    let snap = service(&path, src.clone()).get_data(true).await;
    assert_eq!(snap.source, SourceTag::CsvFallback);
    assert_eq!(src.calls(), 1);
}

#[tokio::test]
async fn empty_scrape_is_not_persisted() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cal.csv");
    seed_stale(&path, "Old Cached Title").await;

    let src = MockSource::new(Behavior::Empty);
    let snap = service(&path, src.clone()).get_data(true).await;
    assert_eq!(snap.source, SourceTag::CsvFallback);
    let kept = FlatFileStore::new(&path).read().await.unwrap().unwrap();
    assert_eq!(kept[0].event, "Old Cached Title");
}

#[tokio::test]
async fn nothing_anywhere_terminates_with_none() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cal.csv");
    let src = MockSource::new(Behavior::Fail);
    let svc = service(&path, src.clone());

    let snap = tokio::time::timeout(Duration::from_secs(5), svc.get_data(false))
        .await
        .expect("must not hang");
    assert_eq!(snap.source, SourceTag::None);
    assert!(snap.data.is_empty());

    let forced = svc.get_data(true).await;
    assert_eq!(forced.source, SourceTag::None);
    assert!(forced.data.is_empty());
}

#[tokio::test]
async fn unreadable_store_ends_in_error_tag() {
    let tmp = tempfile::tempdir().unwrap();
    // A directory where the file should be: metadata works, reads fail.
    let path = tmp.path().join("cal.csv");
    std::fs::create_dir(&path).unwrap();

    let src = MockSource::new(Behavior::Fail);
    let snap = service(&path, src).get_data(false).await;
    assert_eq!(snap.source, SourceTag::Error);
    assert!(snap.data.is_empty());
}

#[tokio::test]
async fn failed_persist_still_returns_scraped_data() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("data");
    std::fs::write(&blocker, "file, not dir").unwrap();
    let path = blocker.join("cal.csv");

    let src = MockSource::new(Behavior::Events(3));
    let snap = service(&path, src).get_data(true).await;
    assert_eq!(snap.source, SourceTag::ScrapedForce);
    assert_eq!(snap.data.len(), 3);
}
