// src/calendar/browser.rs
//! Headless browser rendering.
//!
//! `ChromeRenderer` keeps one browser session alive per instance, started on
//! first use. The session sits behind an async mutex that is held for the whole
//! render, so renders through the same instance run one at a time.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;

/// What to load and how long to wait for it.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
}

impl RenderRequest {
    /// Upper bound for a whole render: opening the tab, navigating, settling
    /// and reading the DOM.
    pub fn deadline(&self) -> Duration {
        self.navigation_timeout * 2 + self.settle_delay
    }

    fn timed_out(&self) -> ExtractionError {
        ExtractionError::NavigationTimeout {
            url: self.url.clone(),
            timeout: self.navigation_timeout,
        }
    }
}

/// Produces the rendered HTML of a page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, req: &RenderRequest) -> Result<String, ExtractionError>;
    /// Release any held session. Safe to call more than once.
    async fn close(&self);
}

struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

pub struct ChromeRenderer {
    executable: Option<PathBuf>,
    session: Mutex<Option<BrowserSession>>,
}

impl ChromeRenderer {
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self {
            executable,
            session: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<BrowserSession, ExtractionError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if let Some(exe) = &self.executable {
            builder = builder.chrome_executable(exe);
        }
        let config = builder.build().map_err(ExtractionError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractionError::BrowserLaunch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(target: "calendar", error = %e, "browser handler stopped");
                    break;
                }
            }
        });

        info!(target: "calendar", "headless browser launched");
        Ok(BrowserSession { browser, handler })
    }

    async fn load(page: &Page, req: &RenderRequest) -> Result<String, ExtractionError> {
        page.set_user_agent(SetUserAgentOverrideParams::new(req.user_agent.clone()))
            .await?;

        let t0 = Instant::now();
        tokio::time::timeout(req.navigation_timeout, page.goto(req.url.as_str()))
            .await
            .map_err(|_| req.timed_out())??;
        debug!(
            target: "calendar",
            url = %req.url,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "navigation finished"
        );

        tokio::time::sleep(req.settle_delay).await;

        tokio::time::timeout(req.navigation_timeout, page.content())
            .await
            .map_err(|_| req.timed_out())?
            .map_err(|e| ExtractionError::Render(e.to_string()))
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, req: &RenderRequest) -> Result<String, ExtractionError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let Some(session) = guard.as_ref() else {
            return Err(ExtractionError::BrowserLaunch("session unavailable".into()));
        };

        let page = tokio::time::timeout(req.navigation_timeout, session.browser.new_page("about:blank"))
            .await
            .map_err(|_| req.timed_out())??;
        let result = Self::load(&page, req).await;

        // Close the tab whatever happened; the browser stays up for the next call.
        if let Err(e) = page.close().await {
            warn!(target: "calendar", error = %e, "failed to close page");
        }
        result
    }

    async fn close(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        if let Err(e) = session.browser.close().await {
            warn!(target: "calendar", error = %e, "browser close failed");
        }
        if let Err(e) = session.browser.wait().await {
            debug!(target: "calendar", error = %e, "browser wait failed");
        }
        session.handler.abort();
        info!(target: "calendar", "headless browser closed");
    }
}
