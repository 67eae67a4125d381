//! Browser capability surface used by the pipeline.
//!
//! The pipeline never talks to a concrete driver. It needs a handful of page
//! operations on one long-lived tab, and a launcher the driver calls once per
//! run. [`crate::chrome`] provides the Chromium implementation.

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use url::Url;

/// One long-lived browser tab.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate the tab and wait for the page to load.
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// URL the tab currently shows (after redirects).
    async fn current_url(&mut self) -> Result<String>;

    /// Rendered text of the page body.
    async fn page_text(&mut self) -> Result<String>;

    /// Whether an element matching the CSS selector is present.
    async fn has_element(&mut self, selector: &str) -> Result<bool>;

    /// Save a screenshot of the page, overwriting `path`.
    async fn screenshot(&mut self, path: &Path) -> Result<()>;

    /// Wait until any in-flight navigation has settled.
    async fn wait_for_navigation(&mut self) -> Result<()>;

    /// Release the browser.
    async fn close(&mut self) -> Result<()>;
}

/// Acquires the browser session for a run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}
