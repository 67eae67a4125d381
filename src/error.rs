//! Custom error types for gscholar-citations.
//!
//! Every fallible operation in the library returns `Result<T, CitationError>`.
//! Outcomes that are expected during a run (a skipped title, a paper with no
//! citation line) are not errors and never show up here.

use thiserror::Error;

/// Main error type for the citation pipeline.
///
/// Anything that reaches the pipeline driver as a `CitationError` ends the run.
#[derive(Debug, Error)]
pub enum CitationError {
    /// Browser automation error (launch, CDP command, page evaluation)
    #[error("Browser error: {0}")]
    Browser(String),

    /// Navigation to the lookup source failed
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// Target URL
        url: String,
        /// Driver-reported reason
        message: String,
    },

    /// A bounded suspension point ran out of time
    #[error("Timed out after {secs}s while {operation}")]
    Timeout {
        /// What the pipeline was waiting on
        operation: &'static str,
        /// Configured limit in seconds
        secs: u64,
    },

    /// Page content could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// The optional anomaly wait limit expired before the operator resumed
    #[error("No operator response within {0}s of CAPTCHA detection")]
    AnomalyTimeout(u64),

    /// The interactive channel closed before delivering a resume signal
    #[error("Operator signal error: {0}")]
    Signal(String),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error, including resume points inconsistent with checkpoints
    #[error("Config error: {0}")]
    Config(String),

    /// Checkpoint store invariant violated
    #[error("Store error: {0}")]
    Store(String),
}

impl CitationError {
    /// Whether an opt-in retry policy may attempt the lookup again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Navigation { .. } | Self::Timeout { .. })
    }
}

/// Result type alias using `CitationError`
pub type Result<T> = std::result::Result<T, CitationError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| CitationError::Parse(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        let nav = CitationError::Navigation {
            url: "https://scholar.google.com".to_string(),
            message: "net::ERR_CONNECTION_RESET".to_string(),
        };
        assert!(nav.is_retryable());
        assert!(CitationError::Timeout { operation: "navigating", secs: 60 }.is_retryable());
        assert!(!CitationError::Parse("bad".to_string()).is_retryable());
        assert!(!CitationError::Config("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_ok_or_parse() {
        let missing: Option<u32> = None;
        let err = missing.ok_or_parse("no capture").expect_err("should fail");
        assert_eq!(err.to_string(), "Parse error: no capture");
    }
}
