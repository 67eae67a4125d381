//! One end-to-end citation lookup for a single title.
//!
//! Validate, normalize, navigate, pass the anomaly gate, extract. Failures are
//! not swallowed here: anything other than "skipped" or "not found" goes back
//! to the pipeline driver.

use crate::anomaly::AnomalyGate;
use crate::browser::BrowserSession;
use crate::error::{CitationError, Result};
use crate::retry::RetryPolicy;
use crate::source::LookupSource;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};

/// Result of looking up one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Citation count found on the result page
    Found(u64),
    /// Lookup ran but the page had no citation line
    NotFound,
    /// Title failed validation; no request was made
    Skipped,
}

impl LookupOutcome {
    /// Value stored in the `cited_by` column.
    pub fn cited_by(&self) -> String {
        match self {
            LookupOutcome::Found(count) => count.to_string(),
            LookupOutcome::NotFound | LookupOutcome::Skipped => String::new(),
        }
    }

    /// Whether a request hit the lookup source.
    pub fn made_request(&self) -> bool {
        !matches!(self, LookupOutcome::Skipped)
    }
}

fn title_regex() -> &'static Regex {
    static TITLE: OnceLock<Regex> = OnceLock::new();
    TITLE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\s\-:]+$").expect("title pattern is valid"))
}

/// Whether a title may be sent to the lookup source.
///
/// Only non-empty titles made of ASCII letters, digits, whitespace, hyphens
/// and colons qualify.
pub fn is_valid_title(title: &str) -> bool {
    title_regex().is_match(title)
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Performs lookups against one [`LookupSource`] through a browser session.
pub struct LookupExecutor {
    source: Arc<dyn LookupSource>,
    gate: AnomalyGate,
    navigation_timeout: Duration,
    retry: RetryPolicy,
}

impl LookupExecutor {
    pub fn new(source: Arc<dyn LookupSource>, gate: AnomalyGate, navigation_timeout: Duration) -> Self {
        Self {
            source,
            gate,
            navigation_timeout,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Look up the citation count for `title`.
    pub async fn lookup(&self, session: &mut dyn BrowserSession, title: &str) -> Result<LookupOutcome> {
        if !is_valid_title(title) {
            return Ok(LookupOutcome::Skipped);
        }
        let title = normalize_title(title);

        let mut attempt = 0;
        loop {
            match self.attempt(session, &title).await {
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff.delay_for_attempt(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Lookup failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn attempt(&self, session: &mut dyn BrowserSession, title: &str) -> Result<LookupOutcome> {
        info!(source = self.source.name(), "Searching for: {}", title);

        let url = self.source.search_url(title)?;
        tokio::time::timeout(self.navigation_timeout, session.navigate(&url))
            .await
            .map_err(|_| CitationError::Timeout {
                operation: "navigating to the search page",
                secs: self.navigation_timeout.as_secs(),
            })??;

        self.gate.check(session).await?;

        let current_url = session.current_url().await?;
        info!("Current URL: {}", current_url);

        let text = session.page_text().await?;
        match self.source.extract_citations(&text)? {
            Some(count) => {
                info!(citations = count, "Citations found: {}", count);
                Ok(LookupOutcome::Found(count))
            }
            None => {
                info!("No citations found for this paper");
                Ok(LookupOutcome::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::ChannelSignal;
    use crate::gscholar::GoogleScholar;
    use crate::retry::BackoffPolicy;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use url::Url;

    /// Serves scripted page texts; each navigation pops the next response.
    #[derive(Default)]
    struct ScriptedPage {
        responses: VecDeque<Result<String>>,
        current: String,
        visited: Vec<String>,
    }

    #[async_trait]
    impl BrowserSession for ScriptedPage {
        async fn navigate(&mut self, url: &Url) -> Result<()> {
            self.visited.push(url.to_string());
            self.current = self
                .responses
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))?;
            Ok(())
        }
        async fn current_url(&mut self) -> Result<String> {
            Ok(self.visited.last().cloned().unwrap_or_default())
        }
        async fn page_text(&mut self) -> Result<String> {
            Ok(self.current.clone())
        }
        async fn has_element(&mut self, _selector: &str) -> Result<bool> {
            Ok(false)
        }
        async fn screenshot(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
        async fn wait_for_navigation(&mut self) -> Result<()> {
            Ok(())
        }
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn executor() -> Result<LookupExecutor> {
        let (_tx, signal) = ChannelSignal::new();
        let gate = AnomalyGate::new(
            "form#captcha-form",
            PathBuf::from("captcha.png"),
            Arc::new(signal),
            Duration::from_secs(1),
        );
        Ok(LookupExecutor::new(
            Arc::new(GoogleScholar::new(None)?),
            gate,
            Duration::from_secs(5),
        ))
    }

    fn navigation_error() -> CitationError {
        CitationError::Navigation {
            url: "https://scholar.google.com/scholar".to_string(),
            message: "net::ERR_CONNECTION_RESET".to_string(),
        }
    }

    #[test]
    fn test_title_validation() {
        assert!(is_valid_title("Deep Residual Learning for Image Recognition"));
        assert!(is_valid_title("BERT: Pre-training of Deep Bidirectional Transformers"));
        assert!(is_valid_title("A  multi-line\n title"));
        assert!(!is_valid_title(""));
        assert!(!is_valid_title("Bad Title!!"));
        assert!(!is_valid_title("Schrödinger bridges"));
        assert!(!is_valid_title("What's new?"));
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Graph \t Neural\n\nNetworks  "), "Graph Neural Networks");
    }

    #[test]
    fn test_outcome_cited_by() {
        assert_eq!(LookupOutcome::Found(12).cited_by(), "12");
        assert_eq!(LookupOutcome::Found(0).cited_by(), "0");
        assert_eq!(LookupOutcome::NotFound.cited_by(), "");
        assert_eq!(LookupOutcome::Skipped.cited_by(), "");
        assert!(!LookupOutcome::Skipped.made_request());
    }

    #[tokio::test]
    async fn test_invalid_title_never_navigates() -> Result<()> {
        let mut page = ScriptedPage::default();
        let outcome = executor()?.lookup(&mut page, "Bad Title!!").await?;
        assert_eq!(outcome, LookupOutcome::Skipped);
        assert!(page.visited.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_found_and_not_found() -> Result<()> {
        let mut page = ScriptedPage {
            responses: VecDeque::from(vec![
                Ok("Deep learning\nY LeCun - Nature, 2015\nCited by 80000".to_string()),
                Ok("Your search did not match any articles".to_string()),
            ]),
            ..Default::default()
        };
        let exec = executor()?;

        assert_eq!(exec.lookup(&mut page, "Deep   learning").await?, LookupOutcome::Found(80000));
        assert_eq!(exec.lookup(&mut page, "An uncited note").await?, LookupOutcome::NotFound);
        assert_eq!(page.visited.len(), 2);
        assert!(page.visited[0].contains("q=Deep+learning"));
        Ok(())
    }

    #[tokio::test]
    async fn test_navigation_failure_propagates_without_retry() -> Result<()> {
        let mut page = ScriptedPage {
            responses: VecDeque::from(vec![Err(navigation_error()), Ok("Cited by 3".to_string())]),
            ..Default::default()
        };
        let err = executor()?
            .lookup(&mut page, "Some title")
            .await
            .expect_err("navigation fails");
        assert!(matches!(err, CitationError::Navigation { .. }));
        assert_eq!(page.visited.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_opt_in_retry_recovers() -> Result<()> {
        let mut page = ScriptedPage {
            responses: VecDeque::from(vec![Err(navigation_error()), Ok("Cited by 3".to_string())]),
            ..Default::default()
        };
        let exec = executor()?.with_retry(RetryPolicy {
            max_retries: 1,
            backoff: BackoffPolicy::Fixed(Duration::ZERO),
        });
        assert_eq!(exec.lookup(&mut page, "Some title").await?, LookupOutcome::Found(3));
        assert_eq!(page.visited.len(), 2);
        Ok(())
    }
}
