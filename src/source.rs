//! Pluggable lookup source: where to search, what a challenge looks like,
//! and how to read a citation count out of the result page.

use crate::error::Result;
use url::Url;

pub trait LookupSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Search URL for an already-normalized title.
    fn search_url(&self, title: &str) -> Result<Url>;

    /// CSS selector whose presence means an anti-automation challenge is shown.
    fn challenge_selector(&self) -> &str;

    /// Citation count on a result page, `None` when the page has none.
    fn extract_citations(&self, page_text: &str) -> Result<Option<u64>>;
}
