//! # gscholar-citations
//!
//! Resumable Google Scholar citation-count enrichment for large CSV datasets.
//!
//! One title is looked up at a time through a real browser tab, with a random
//! pause between requests. Progress is checkpointed every few records so a
//! run can be stopped and resumed at will.
//!
//! ## Modules
//!
//! - [`pipeline`] - Sequential driver and its state machine
//! - [`resume`] - Startup reconciliation with a saved checkpoint
//! - [`checkpoint`] - Checkpoint and final artifact persistence
//! - [`lookup`] - Single-title lookup: validate, navigate, gate, extract
//! - [`anomaly`] - CAPTCHA detection and operator hand-off
//! - [`extractor`] - "Cited by N" extraction
//! - [`rate_limit`] - Randomized pacing
//! - [`gscholar`] - Google Scholar as a lookup source
//! - [`chrome`] - Chromium browser session
//! - [`table`] - Schema-evolving CSV records
//! - [`runtime`] - Process runtime with bounded shutdown
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gscholar_citations::anomaly::StdinSignal;
//! use gscholar_citations::chrome::{ChromeLauncher, LaunchOptions};
//! use gscholar_citations::gscholar::{self, GoogleScholar};
//! use gscholar_citations::{Pipeline, PipelineConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let launcher = ChromeLauncher::new(LaunchOptions {
//!         headless: false,
//!         user_agent: gscholar::random_user_agent().to_string(),
//!     });
//!     let mut pipeline = Pipeline::new(
//!         PipelineConfig::new("random_sample_200k.csv"),
//!         Box::new(launcher),
//!         Arc::new(GoogleScholar::new(None)?),
//!         Arc::new(StdinSignal),
//!     )?;
//!     let summary = pipeline.run().await?;
//!     println!("Found citations for {} of {} rows", summary.found, summary.total);
//!     Ok(())
//! }
//! ```

pub mod anomaly;
pub mod browser;
pub mod checkpoint;
pub mod chrome;
pub mod config;
pub mod error;
pub mod extractor;
pub mod gscholar;
pub mod logging;
pub mod lookup;
pub mod pipeline;
pub mod rate_limit;
pub mod resume;
pub mod retry;
pub mod runtime;
pub mod source;
pub mod table;

pub use config::PipelineConfig;
pub use error::{CitationError, Result};
pub use pipeline::{Pipeline, PipelineState, RunSummary};
