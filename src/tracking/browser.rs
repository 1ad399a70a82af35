//! Headless browser pool
//!
//! Owns at most one chromium process, lazily launched and re-launched after
//! a crash. Each fetch gets a fresh page with a rotated user agent; heavy
//! resource types are blocked at the CDP fetch layer to keep page loads
//! cheap. Fetches are serialized through the pool lock, which also
//! serializes launch, crash recovery, and shutdown.

use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::BrowserConfig;

/// Small fixed pool of desktop user agents
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

/// Grace period for closing the browser on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Error message fragments that indicate the browser session is gone
const DEAD_SESSION_MARKERS: &[&str] = &[
    "browser closed",
    "connection closed",
    "channel closed",
    "websocket",
    "target closed",
    "session closed",
];

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    NavigationFailed(String),
    #[error("navigation timed out after {0:?}")]
    FetchTimeout(Duration),
    #[error("browser session died: {0}")]
    BrowserCrashed(String),
}

impl BrowserError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Launch(_) => "browser_crashed",
            Self::NavigationFailed(_) => "navigation_failed",
            Self::FetchTimeout(_) => "fetch_timeout",
            Self::BrowserCrashed(_) => "browser_crashed",
        }
    }
}

struct BrowserHandle {
    browser: Browser,
    event_task: JoinHandle<()>,
}

/// Singleton headless browser behind a lock
pub struct BrowserPool {
    config: BrowserConfig,
    inner: Mutex<Option<BrowserHandle>>,
}

impl BrowserPool {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(None),
        }
    }

    /// Locate the chromium executable: config override, then env, then PATH.
    fn find_executable(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config.executable {
            if path.exists() {
                return Some(path.clone());
            }
            warn!("configured browser executable {} does not exist", path.display());
        }
        if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }
        for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
            if let Ok(path) = which::which(name) {
                return Some(path);
            }
        }
        None
    }

    async fn launch(&self) -> Result<BrowserHandle, BrowserError> {
        let executable = self
            .find_executable()
            .ok_or_else(|| BrowserError::Launch("no chromium executable found".to_string()))?;

        let chrome_config = ChromeConfig::builder()
            .chrome_executable(executable)
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let event_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        info!("headless browser launched");
        Ok(BrowserHandle { browser, event_task })
    }

    /// Fetch a page and return its rendered HTML.
    ///
    /// Holds the pool lock for the duration, so fetches are serialized and
    /// lifecycle events never race.
    pub async fn fetch(&self, url: &Url) -> Result<String, BrowserError> {
        let mut guard = self.inner.lock().await;

        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let handle = guard.as_ref().expect("browser handle present");

        let result = self.fetch_with(&handle.browser, url).await;

        // A dead session poisons the whole process; drop the handle so the
        // next fetch relaunches.
        if let Err(err) = &result {
            if is_dead_session(&err.to_string()) {
                warn!("browser session died, will relaunch on next fetch: {err}");
                if let Some(mut dead) = guard.take() {
                    let _ = dead.browser.close().await;
                    let _ = dead.browser.wait().await;
                    dead.event_task.abort();
                }
                return Err(BrowserError::BrowserCrashed(err.to_string()));
            }
        }

        result
    }

    async fn fetch_with(&self, browser: &Browser, url: &Url) -> Result<String, BrowserError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        let result = self.navigate_and_capture(&page, url).await;

        // The page is always released; only the browser survives the call
        if let Err(e) = page.close().await {
            debug!("page close failed: {e}");
        }

        result
    }

    async fn navigate_and_capture(&self, page: &Page, url: &Url) -> Result<String, BrowserError> {
        let ua = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        page.set_user_agent(ua)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        self.block_heavy_resources(page).await?;

        let timeout = Duration::from_secs(self.config.navigation_timeout_secs);
        let settle = Duration::from_millis(self.config.settle_delay_ms);

        let navigation = async {
            page.goto(url.as_str())
                .await
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
            // Let client frameworks hydrate before capturing
            tokio::time::sleep(settle).await;
            page.content()
                .await
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::FetchTimeout(timeout)),
        }
    }

    /// Fail image/stylesheet/font/media requests at the CDP fetch layer.
    async fn block_heavy_resources(&self, page: &Page) -> Result<(), BrowserError> {
        page.execute(EnableParams {
            patterns: Some(vec![RequestPattern {
                url_pattern: Some("*".to_string()),
                resource_type: None,
                request_stage: Some(RequestStage::Request),
            }]),
            handle_auth_requests: None,
        })
        .await
        .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        let page = page.clone();

        tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let blocked = matches!(
                    event.resource_type,
                    ResourceType::Image
                        | ResourceType::Stylesheet
                        | ResourceType::Font
                        | ResourceType::Media
                );
                let outcome = if blocked {
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                // The page going away ends the interception loop
                if outcome.is_err() {
                    break;
                }
            }
        });

        Ok(())
    }

    /// Close the browser, best-effort, bounded by the shutdown grace period.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(mut handle) = guard.take() {
            let close = async {
                let _ = handle.browser.close().await;
                let _ = handle.browser.wait().await;
            };
            if tokio::time::timeout(SHUTDOWN_GRACE, close).await.is_err() {
                warn!("browser did not close within grace period, killing");
                let _ = handle.browser.kill().await;
            }
            handle.event_task.abort();
            info!("headless browser closed");
        }
    }
}

fn is_dead_session(message: &str) -> bool {
    let lower = message.to_lowercase();
    DEAD_SESSION_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_session_markers() {
        assert!(is_dead_session("Browser closed unexpectedly"));
        assert!(is_dead_session("WebSocket protocol error"));
        assert!(is_dead_session("Target closed before response"));
        assert!(!is_dead_session("net::ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(BrowserError::Launch("x".into()).kind(), "browser_crashed");
        assert_eq!(
            BrowserError::FetchTimeout(Duration::from_secs(45)).kind(),
            "fetch_timeout"
        );
        assert_eq!(
            BrowserError::NavigationFailed("x".into()).kind(),
            "navigation_failed"
        );
    }

    #[tokio::test]
    #[ignore] // Requires a chromium install
    async fn fetch_data_url() {
        let pool = BrowserPool::new(BrowserConfig {
            settle_delay_ms: 100,
            ..BrowserConfig::default()
        });
        let url = Url::parse("data:text/html,<h1>Hello</h1>").unwrap();
        let html = pool.fetch(&url).await.expect("fetch failed");
        assert!(html.contains("<h1>Hello</h1>"));
        pool.shutdown().await;
    }
}
