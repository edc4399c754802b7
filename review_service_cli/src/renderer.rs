//! Headless browser rendering.
//!
//! Each render launches a fresh incognito browser, loads the page, scrolls to
//! the bottom so lazy content loads, waits briefly and snapshots the DOM. The
//! browser is shut down whether or not the render succeeded.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::{PageRequest, RenderedDocument};

/// "Render a URL to HTML."
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, request: &PageRequest) -> Result<RenderedDocument, RenderError>;
}

/// Identification strings one of which is presented to each site.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
];

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

#[cfg(target_os = "windows")]
const BROWSER_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(target_os = "macos")]
const BROWSER_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const BROWSER_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/usr/bin/microsoft-edge",
];

const BROWSER_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "microsoft-edge",
];

/// Pick the configured user agent or a random one from [`USER_AGENTS`].
pub fn pick_user_agent(configured: Option<&str>) -> String {
    configured
        .map(str::to_string)
        .or_else(|| {
            USER_AGENTS
                .choose(&mut rand::thread_rng())
                .map(|ua| ua.to_string())
        })
        .unwrap_or_default()
}

/// Locate a Chromium-family browser binary.
pub fn find_browser(configured: Option<&Path>) -> Result<PathBuf, RenderError> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }
    for path in BROWSER_PATHS {
        let p = Path::new(path);
        if p.exists() {
            debug!("Found browser at: {}", path);
            return Ok(p.to_path_buf());
        }
    }
    BROWSER_COMMANDS
        .iter()
        .find_map(|cmd| which::which(cmd).ok())
        .ok_or(RenderError::BrowserNotFound)
}

/// Browser process plus the task pumping its CDP connection.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: BrowserConfig) -> Result<Self, RenderError> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to reap browser process: {}", e);
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Reached without close() only on cancellation or panic; dropping the
        // Browser kills the child process.
        self.handler.abort();
    }
}

pub struct ChromeRenderer {
    config: RendererConfig,
}

impl ChromeRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, RenderError> {
        let executable = find_browser(self.config.browser_path.as_deref())?;
        let user_agent = pick_user_agent(self.config.user_agent.as_deref());
        let (width, height) = self.config.window_size;
        debug!(%user_agent, "configuring browser");

        BrowserConfig::builder()
            .chrome_executable(executable)
            .no_sandbox()
            .incognito()
            .window_size(width, height)
            .request_timeout(self.config.navigation_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", user_agent))
            .build()
            .map_err(RenderError::Launch)
    }

    async fn render_in(&self, browser: &Browser, url: &str) -> Result<String, RenderError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let timeout = self.config.navigation_timeout;
        tokio::time::timeout(timeout, navigate(&page, url))
            .await
            .map_err(|_| RenderError::Timeout {
                url: url.to_string(),
                secs: timeout.as_secs(),
            })??;

        if let Err(e) = page.evaluate(SCROLL_SCRIPT).await {
            debug!("Scroll script failed (non-HTML page?): {}", e);
        }
        tokio::time::sleep(self.config.settle_delay).await;

        page.content()
            .await
            .map_err(|e| RenderError::Snapshot(e.to_string()))
    }
}

async fn navigate(page: &Page, url: &str) -> Result<(), RenderError> {
    let failed = |e: chromiumoxide::error::CdpError| RenderError::Navigation {
        url: url.to_string(),
        reason: e.to_string(),
    };
    page.goto(url).await.map_err(failed)?;
    page.wait_for_navigation().await.map_err(failed)?;
    Ok(())
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, request: &PageRequest) -> Result<RenderedDocument, RenderError> {
        let url = request.url();
        info!("Rendering {}", url);

        let session = BrowserSession::launch(self.browser_config()?).await?;
        let result = self.render_in(&session.browser, url).await;
        session.close().await;

        let html = result?;
        debug!(bytes = html.len(), "page rendered");
        Ok(RenderedDocument::new(html))
    }
}
