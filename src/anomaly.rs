//! CAPTCHA detection and hand-off to a human operator.
//!
//! When the lookup source shows a challenge instead of results, the gate saves
//! a screenshot, then blocks the whole pipeline until an operator says the
//! challenge is solved. There is no default time limit on that wait.

use crate::browser::BrowserSession;
use crate::error::{CitationError, Result};
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// Prompt shown to the operator while the pipeline is paused
pub const RESUME_PROMPT: &str = "Please solve the CAPTCHA and press Enter when done...";

/// Delivers the human "continue" signal.
#[async_trait]
pub trait OperatorSignal: Send + Sync {
    /// Block until the operator signals that the pipeline may continue.
    async fn wait_for_resume(&self, prompt: &str) -> Result<()>;
}

/// Waits for Enter on stdin.
pub struct StdinSignal;

#[async_trait]
impl OperatorSignal for StdinSignal {
    async fn wait_for_resume(&self, prompt: &str) -> Result<()> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            print!("{} ", prompt);
            io::stdout().flush()?;
            let mut input = String::new();
            let read = io::stdin().read_line(&mut input)?;
            if read == 0 {
                return Err(CitationError::Signal("stdin closed while waiting for operator".to_string()));
            }
            Ok(())
        })
        .await
        .map_err(|e| CitationError::Signal(e.to_string()))?
    }
}

/// Resumes once per message received on a channel.
pub struct ChannelSignal {
    receiver: Mutex<mpsc::Receiver<()>>,
}

impl ChannelSignal {
    /// Create the signal together with the sender an operator surface holds.
    pub fn new() -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(8);
        (
            tx,
            Self {
                receiver: Mutex::new(rx),
            },
        )
    }
}

#[async_trait]
impl OperatorSignal for ChannelSignal {
    async fn wait_for_resume(&self, prompt: &str) -> Result<()> {
        info!(prompt, "Waiting for operator signal");
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| CitationError::Signal("operator channel closed".to_string()))
    }
}

/// Detects the challenge marker and pauses for the operator.
pub struct AnomalyGate {
    selector: String,
    screenshot_path: PathBuf,
    signal: std::sync::Arc<dyn OperatorSignal>,
    /// Optional limit on the operator wait; `None` waits forever
    operator_timeout: Option<Duration>,
    settle_timeout: Duration,
}

impl AnomalyGate {
    pub fn new(
        selector: impl Into<String>,
        screenshot_path: PathBuf,
        signal: std::sync::Arc<dyn OperatorSignal>,
        settle_timeout: Duration,
    ) -> Self {
        Self {
            selector: selector.into(),
            screenshot_path,
            signal,
            operator_timeout: None,
            settle_timeout,
        }
    }

    /// Fail with [`CitationError::AnomalyTimeout`] if the operator takes longer than `timeout`.
    pub fn with_operator_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operator_timeout = timeout;
        self
    }

    /// Check the current page; returns `true` if a challenge was handled.
    pub async fn check(&self, session: &mut dyn BrowserSession) -> Result<bool> {
        if !session.has_element(&self.selector).await? {
            return Ok(false);
        }

        warn!("CAPTCHA detected. Please solve it manually.");
        match session.screenshot(&self.screenshot_path).await {
            Ok(()) => info!(path = %self.screenshot_path.display(), "CAPTCHA screenshot saved"),
            Err(e) => warn!(error = %e, "Failed to save CAPTCHA screenshot"),
        }

        match self.operator_timeout {
            None => self.signal.wait_for_resume(RESUME_PROMPT).await?,
            Some(limit) => tokio::time::timeout(limit, self.signal.wait_for_resume(RESUME_PROMPT))
                .await
                .map_err(|_| CitationError::AnomalyTimeout(limit.as_secs()))??,
        }

        info!("Operator resumed, waiting for page to settle");
        tokio::time::timeout(self.settle_timeout, session.wait_for_navigation())
            .await
            .map_err(|_| CitationError::Timeout {
                operation: "waiting for the page to settle after CAPTCHA",
                secs: self.settle_timeout.as_secs(),
            })??;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use url::Url;

    /// Page that shows the challenge until `wait_for_navigation` is called.
    #[derive(Default)]
    struct ChallengePage {
        challenged: bool,
        events: Vec<&'static str>,
    }

    #[async_trait]
    impl BrowserSession for ChallengePage {
        async fn navigate(&mut self, _url: &Url) -> Result<()> {
            Ok(())
        }
        async fn current_url(&mut self) -> Result<String> {
            Ok(String::new())
        }
        async fn page_text(&mut self) -> Result<String> {
            Ok(String::new())
        }
        async fn has_element(&mut self, _selector: &str) -> Result<bool> {
            self.events.push("has_element");
            Ok(self.challenged)
        }
        async fn screenshot(&mut self, _path: &Path) -> Result<()> {
            self.events.push("screenshot");
            Ok(())
        }
        async fn wait_for_navigation(&mut self) -> Result<()> {
            self.events.push("settle");
            self.challenged = false;
            Ok(())
        }
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn gate(signal: Arc<dyn OperatorSignal>) -> AnomalyGate {
        AnomalyGate::new(
            "form#captcha-form",
            PathBuf::from("captcha.png"),
            signal,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_no_challenge_returns_immediately() -> Result<()> {
        let (_tx, signal) = ChannelSignal::new();
        let mut page = ChallengePage::default();
        assert!(!gate(Arc::new(signal)).check(&mut page).await?);
        assert_eq!(page.events, vec!["has_element"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_challenge_waits_for_signal_then_settles() -> Result<()> {
        let (tx, signal) = ChannelSignal::new();
        let mut page = ChallengePage {
            challenged: true,
            ..Default::default()
        };
        tx.send(()).await.map_err(|e| CitationError::Signal(e.to_string()))?;

        assert!(gate(Arc::new(signal)).check(&mut page).await?);
        assert_eq!(page.events, vec!["has_element", "screenshot", "settle"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_channel_is_fatal() {
        let (tx, signal) = ChannelSignal::new();
        drop(tx);
        let mut page = ChallengePage {
            challenged: true,
            ..Default::default()
        };
        let err = gate(Arc::new(signal))
            .check(&mut page)
            .await
            .expect_err("closed channel");
        assert!(matches!(err, CitationError::Signal(_)));
    }

    #[tokio::test]
    async fn test_optional_operator_timeout() {
        let (_tx, signal) = ChannelSignal::new();
        let mut page = ChallengePage {
            challenged: true,
            ..Default::default()
        };
        let err = gate(Arc::new(signal))
            .with_operator_timeout(Some(Duration::from_millis(20)))
            .check(&mut page)
            .await
            .expect_err("operator never answers");
        assert!(matches!(err, CitationError::AnomalyTimeout(_)));
        assert!(!page.events.contains(&"settle"));
    }
}
