//! The sequential enrichment driver.
//!
//! ```text
//! Init -> Resuming -> Running -> Finalizing -> Done
//!   \________\___________\___________\______-> Failed
//! ```
//!
//! Exactly one record is in flight at a time. Every `batch_size` processed
//! records the finalized prefix is checkpointed; at the end the whole table is
//! written to the final artifact. Any error that reaches the driver ends the
//! run, leaving the checkpoints already on disk as the recovery point.

use crate::anomaly::{AnomalyGate, OperatorSignal};
use crate::browser::{BrowserLauncher, BrowserSession};
use crate::checkpoint::CheckpointStore;
use crate::config::PipelineConfig;
use crate::error::{CitationError, Result};
use crate::lookup::{is_valid_title, LookupExecutor, LookupOutcome};
use crate::rate_limit::RateLimiter;
use crate::resume::{self, ResumePlan};
use crate::source::LookupSource;
use crate::table::{Table, CITED_BY};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Resuming,
    Running,
    Finalizing,
    Done,
    Failed,
}

/// Count of finalized records: `[0, cursor)` are done, `[cursor, total)` pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    cursor: usize,
    total: usize,
}

impl Progress {
    pub fn new(cursor: usize, total: usize) -> Result<Self> {
        if cursor > total {
            return Err(CitationError::Config(format!(
                "cursor {} exceeds table length {}",
                cursor, total
            )));
        }
        Ok(Self { cursor, total })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.total
    }

    /// Mark the record at the cursor processed; returns the new cursor.
    pub fn advance(&mut self) -> usize {
        debug_assert!(self.cursor < self.total, "cursor advanced past end");
        self.cursor = (self.cursor + 1).min(self.total);
        self.cursor
    }
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Rows in the working table
    pub total: usize,
    /// Cursor the run started from
    pub resumed_from: usize,
    pub found: usize,
    pub not_found: usize,
    pub skipped: usize,
    /// Keys of checkpoints written during this run
    pub checkpoints: Vec<usize>,
    pub final_path: PathBuf,
}

impl RunSummary {
    fn record(&mut self, outcome: LookupOutcome) {
        match outcome {
            LookupOutcome::Found(_) => self.found += 1,
            LookupOutcome::NotFound => self.not_found += 1,
            LookupOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Owns the working table, the cursor and the browser session for one run.
pub struct Pipeline {
    config: PipelineConfig,
    launcher: Box<dyn BrowserLauncher>,
    executor: LookupExecutor,
    store: CheckpointStore,
    limiter: RateLimiter,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        launcher: Box<dyn BrowserLauncher>,
        source: Arc<dyn LookupSource>,
        signal: Arc<dyn OperatorSignal>,
    ) -> Result<Self> {
        config.validate()?;

        let gate = AnomalyGate::new(
            source.challenge_selector(),
            config.screenshot_path.clone(),
            signal,
            config.navigation_timeout,
        )
        .with_operator_timeout(config.operator_timeout);
        let executor = LookupExecutor::new(source, gate, config.navigation_timeout)
            .with_retry(config.retry.clone());
        let store = CheckpointStore::new(config.output_dir.clone(), config.output_prefix.clone());
        let limiter = RateLimiter::new(config.delay);

        Ok(Self {
            config,
            launcher,
            executor,
            store,
            limiter,
            state: PipelineState::Init,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "Pipeline state");
        self.state = next;
    }

    /// Run to completion: launch the browser, resume, process every pending
    /// record, write the final artifact and release the browser.
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.transition(PipelineState::Init);
        info!("Starting the Google Scholar Citation Scraper");

        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        let result = self.drive(session.as_mut()).await;
        match result {
            Ok(summary) => {
                if let Err(e) = session.close().await {
                    warn!(error = %e, "Failed to close browser");
                }
                self.transition(PipelineState::Done);
                info!(
                    total = summary.total,
                    resumed_from = summary.resumed_from,
                    checkpoints = ?summary.checkpoints,
                    found = summary.found,
                    not_found = summary.not_found,
                    skipped = summary.skipped,
                    "Finished processing all rows. Script complete."
                );
                Ok(summary)
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                if let Err(close_err) = session.close().await {
                    warn!(error = %close_err, "Failed to close browser after error");
                }
                Err(e)
            }
        }
    }

    async fn drive(&mut self, session: &mut dyn BrowserSession) -> Result<RunSummary> {
        self.transition(PipelineState::Resuming);
        info!("Reading input file: {}", self.config.input.display());
        let table = Table::read_csv(&self.config.input)?;
        let title_column = self.config.title_column.clone();
        if !table.is_empty() && !table.columns().contains(&title_column) {
            return Err(CitationError::Config(format!(
                "input {} has no '{}' column",
                self.config.input.display(),
                title_column
            )));
        }

        let ResumePlan { cursor, mut table } = resume::plan(table, self.config.resume, &self.store)?;
        let mut progress = Progress::new(cursor, table.len())?;
        info!(cursor, "Total rows to process: {}", table.len());

        let mut summary = RunSummary {
            total: table.len(),
            resumed_from: cursor,
            ..Default::default()
        };
        let batch_size = self.config.batch_size;

        self.transition(PipelineState::Running);
        while !progress.is_complete() {
            let index = progress.cursor();
            let title = table
                .get(index)
                .and_then(|record| record.get(&title_column))
                .unwrap_or_default()
                .to_string();

            let outcome = if is_valid_title(&title) {
                self.executor.lookup(session, &title).await?
            } else {
                info!(index, "Skipping invalid title: {}", title);
                LookupOutcome::Skipped
            };
            summary.record(outcome);
            if let Some(record) = table.get_mut(index) {
                record.set(CITED_BY, outcome.cited_by());
            }

            let processed = progress.advance();
            if processed % batch_size == 0 {
                self.store.write(table.prefix(processed), processed)?;
                summary.checkpoints.push(processed);
            }

            if outcome.made_request() && !progress.is_complete() {
                let delay = self.limiter.next_delay();
                info!("Waiting for {} seconds before next request", delay.as_secs());
                tokio::time::sleep(delay).await;
            }
        }

        self.transition(PipelineState::Finalizing);
        summary.final_path = self.store.write_final(table.records())?;
        Ok(summary)
    }
}
