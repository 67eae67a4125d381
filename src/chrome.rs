//! Chromium-backed [`BrowserSession`] using chromiumoxide.
//!
//! Runs headed by default so an operator can solve challenges in the window
//! the pipeline is driving.

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::error::{CitationError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Launch settings for Chromium.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,
    /// User agent applied to the tab
    pub user_agent: String,
}

fn cdp(e: CdpError) -> CitationError {
    CitationError::Browser(e.to_string())
}

/// A single Chromium tab plus the browser process that owns it.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch Chromium and open one blank tab.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox");
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(CitationError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(cdp)?;
        page.set_user_agent(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await
            .map_err(cdp)?;

        info!(headless = options.headless, "Browser launched");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.page
            .goto(url.as_str())
            .await
            .map_err(|e| CitationError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.page.url().await.map_err(cdp)?.unwrap_or_default())
    }

    async fn page_text(&mut self) -> Result<String> {
        self.page
            .evaluate("document.body.innerText")
            .await
            .map_err(cdp)?
            .into_value::<String>()
            .map_err(|e| CitationError::Parse(format!("page body has no text: {}", e)))
    }

    async fn has_element(&mut self, selector: &str) -> Result<bool> {
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        self.page
            .evaluate(script)
            .await
            .map_err(cdp)?
            .into_value::<bool>()
            .map_err(|e| CitationError::Browser(format!("selector query failed: {}", e)))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().build(), path)
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn wait_for_navigation(&mut self) -> Result<()> {
        self.page.wait_for_navigation().await.map_err(cdp)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.browser.close().await.map_err(cdp)?;
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        info!("Browser closed");
        Ok(())
    }
}

/// Launches a [`ChromeSession`] with fixed options.
pub struct ChromeLauncher {
    options: LaunchOptions,
}

impl ChromeLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(ChromeSession::launch(&self.options).await?))
    }
}
