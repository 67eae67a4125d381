//! Run configuration for the enrichment pipeline.

use crate::checkpoint::DEFAULT_PREFIX;
use crate::error::{CitationError, Result};
use crate::rate_limit::DelayRange;
use crate::resume::ResumePoint;
use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of processed records between checkpoints
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Everything the pipeline driver needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Authoritative input CSV
    pub input: PathBuf,
    /// Column holding the paper title
    pub title_column: String,
    /// Directory for checkpoints and the final artifact
    pub output_dir: PathBuf,
    /// Filename prefix for checkpoints and the final artifact
    pub output_prefix: String,
    /// Records processed between checkpoints
    pub batch_size: usize,
    /// Pause between lookups
    pub delay: DelayRange,
    pub resume: ResumePoint,
    /// Where the most recent CAPTCHA screenshot is written
    pub screenshot_path: PathBuf,
    /// Limit on navigation and post-CAPTCHA settling
    pub navigation_timeout: Duration,
    /// Optional limit on waiting for the operator; `None` waits indefinitely
    pub operator_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            title_column: "title".to_string(),
            output_dir: PathBuf::from("."),
            output_prefix: DEFAULT_PREFIX.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            delay: DelayRange::default(),
            resume: ResumePoint::None,
            screenshot_path: PathBuf::from("captcha.png"),
            navigation_timeout: Duration::from_secs(60),
            operator_timeout: None,
            retry: RetryPolicy::none(),
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CitationError::Config("batch size must be at least 1".to_string()));
        }
        if self.title_column.trim().is_empty() {
            return Err(CitationError::Config("title column name is empty".to_string()));
        }
        if self.navigation_timeout.is_zero() {
            return Err(CitationError::Config("navigation timeout must be positive".to_string()));
        }
        Ok(())
    }
}
