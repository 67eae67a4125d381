//! Google Scholar as a [`LookupSource`].
//!
//! Queries go through the rendered search page rather than an API, so this
//! module only knows the URL scheme, the CAPTCHA form and the "Cited by"
//! wording of the result list.

use crate::error::{CitationError, Result};
use crate::extractor::CitationExtractor;
use crate::source::LookupSource;
use rand::seq::SliceRandom;
use tracing::debug;
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// Form Google Scholar serves instead of results when it suspects automation
pub const CAPTCHA_SELECTOR: &str = "form#captcha-form";

/// Citation line of a result entry; the search URL forces the English locale
const CITED_BY_PATTERN: &str = r"Cited by (\d+)";

/// Desktop user agents; one is picked per browser launch
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Pick a random desktop user agent.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Google Scholar search, optionally through a mirror site.
#[derive(Debug, Clone)]
pub struct GoogleScholar {
    base_url: String,
    extractor: CitationExtractor,
}

impl GoogleScholar {
    /// Create a source rooted at `base_url` (defaults to scholar.google.com).
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let base_url = base_url
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SCHOLAR_URL.to_string());
        Url::parse(&base_url)
            .map_err(|e| CitationError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            base_url,
            extractor: CitationExtractor::new(CITED_BY_PATTERN)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl LookupSource for GoogleScholar {
    fn name(&self) -> &str {
        "Google Scholar"
    }

    fn search_url(&self, title: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/scholar", self.base_url))
            .map_err(|e| CitationError::Config(format!("Invalid base URL: {}", e)))?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("hl", "en"); // Force English locale for consistent parsing
            params.append_pair("q", title);
        }

        debug!(url = %url, "Built search URL");
        Ok(url)
    }

    fn challenge_selector(&self) -> &str {
        CAPTCHA_SELECTOR
    }

    fn extract_citations(&self, page_text: &str) -> Result<Option<u64>> {
        self.extractor.extract(page_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_search_url() -> Result<()> {
        let scholar = GoogleScholar::new(None)?;
        let url = scholar.search_url("machine learning: a survey")?;
        assert_eq!(url.host_str(), Some("scholar.google.com"));
        assert_eq!(url.path(), "/scholar");
        assert!(url.as_str().contains("hl=en"));
        assert!(url.as_str().contains("q=machine+learning%3A+a+survey"));
        Ok(())
    }

    #[test]
    fn test_mirror_trailing_slash() -> Result<()> {
        let scholar = GoogleScholar::new(Some("https://scholar.example.org/"))?;
        assert_eq!(scholar.base_url(), "https://scholar.example.org");
        let url = scholar.search_url("graph neural networks")?;
        assert!(url.as_str().starts_with("https://scholar.example.org/scholar?"));
        Ok(())
    }

    #[test]
    fn test_invalid_mirror_rejected() {
        assert!(matches!(
            GoogleScholar::new(Some("not a url")),
            Err(CitationError::Config(_))
        ));
    }

    #[test]
    fn test_extract_english_citation_line() -> Result<()> {
        let scholar = GoogleScholar::new(None)?;
        assert_eq!(scholar.extract_citations("Save Cite Cited by 42 Related articles")?, Some(42));
        assert_eq!(scholar.extract_citations("被引用 17 次")?, None);
        assert_eq!(scholar.extract_citations("Cited by\n17")?, None);
        assert_eq!(scholar.extract_citations("Related articles All 2 versions")?, None);
        Ok(())
    }

    #[test]
    fn test_random_user_agent_is_known() {
        assert!(USER_AGENTS.contains(&random_user_agent()));
    }
}
