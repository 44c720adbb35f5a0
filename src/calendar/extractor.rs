// src/calendar/extractor.rs
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, gauge, histogram};
use tracing::{info, warn};

use crate::calendar::browser::{ChromeRenderer, PageRenderer, RenderRequest};
use crate::calendar::dom::DomExtractor;
use crate::calendar::types::{normalize_rows, EconomicEvent};
use crate::config::CalendarConfig;
use crate::error::ExtractionError;

/// Anything that can produce a fresh list of calendar events.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Empty `Ok` means the page had no recognisable rows; that is not an error.
    async fn fetch_events(&self) -> Result<Vec<EconomicEvent>, ExtractionError>;
    async fn close(&self);
    fn name(&self) -> &'static str;
}

/// Renders the calendar page and pulls events out of its DOM.
pub struct Extractor {
    renderer: Arc<dyn PageRenderer>,
    dom: DomExtractor,
    request: RenderRequest,
}

impl Extractor {
    pub fn new(renderer: Arc<dyn PageRenderer>, dom: DomExtractor, request: RenderRequest) -> Self {
        Self {
            renderer,
            dom,
            request,
        }
    }

    /// Headless Chrome with the default selector list.
    pub fn from_config(cfg: &CalendarConfig) -> Self {
        Self::new(
            Arc::new(ChromeRenderer::new(cfg.chrome_executable.clone())),
            DomExtractor::default(),
            RenderRequest {
                url: cfg.target_url.clone(),
                user_agent: cfg.user_agent.clone(),
                navigation_timeout: cfg.navigation_timeout(),
                settle_delay: cfg.settle_delay(),
            },
        )
    }
}

#[async_trait]
impl CalendarSource for Extractor {
    async fn fetch_events(&self) -> Result<Vec<EconomicEvent>, ExtractionError> {
        let t0 = Instant::now();
        counter!("calendar_scrape_total").increment(1);

        // Bounds every CDP call, so a wedged browser cannot hold the caller forever.
        let deadline = self.request.deadline();
        let rendered = tokio::time::timeout(deadline, self.renderer.render(&self.request))
            .await
            .unwrap_or_else(|_| {
                Err(ExtractionError::NavigationTimeout {
                    url: self.request.url.clone(),
                    timeout: deadline,
                })
            });
        let html = match rendered {
            Ok(h) => h,
            Err(e) => {
                counter!("calendar_scrape_errors_total").increment(1);
                warn!(target: "calendar", url = %self.request.url, error = %e, "page render failed");
                return Err(e);
            }
        };

        let events = normalize_rows(self.dom.extract(&html));

        histogram!("calendar_scrape_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("calendar_last_scrape_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(
            target: "calendar",
            events = events.len(),
            html_bytes = html.len(),
            "calendar page scraped"
        );
        Ok(events)
    }

    async fn close(&self) {
        self.renderer.close().await;
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}
