//! gscholar-citations - resumable citation-count enrichment
//!
//! ## Usage
//!
//! ### Enrich a dataset
//! ```bash
//! gscholar-citations run --input random_sample_200k.csv --resume-from latest
//! ```
//!
//! ### Check a single title
//! ```bash
//! gscholar-citations lookup "Attention Is All You Need"
//! ```
//!
//! ### List checkpoints
//! ```bash
//! gscholar-citations checkpoints --output-dir ./output
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gscholar_citations::anomaly::{AnomalyGate, StdinSignal};
use gscholar_citations::browser::BrowserSession;
use gscholar_citations::checkpoint::{CheckpointStore, DEFAULT_PREFIX};
use gscholar_citations::chrome::{ChromeLauncher, ChromeSession, LaunchOptions};
use gscholar_citations::config::DEFAULT_BATCH_SIZE;
use gscholar_citations::gscholar::{self, GoogleScholar};
use gscholar_citations::lookup::{LookupExecutor, LookupOutcome};
use gscholar_citations::rate_limit::DelayRange;
use gscholar_citations::resume::ResumePoint;
use gscholar_citations::retry::{BackoffPolicy, RetryPolicy};
use gscholar_citations::source::LookupSource;
use gscholar_citations::runtime::{self, SHUTDOWN_GRACE};
use gscholar_citations::{logging, Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

// ============================================================================
// CLI Definition
// ============================================================================

/// Resumable Google Scholar citation-count enrichment
#[derive(Parser)]
#[command(name = "gscholar-citations")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log file (appended to)
    #[arg(long, global = true, default_value = "scraper.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up citation counts for every row of a CSV file
    Run {
        /// Input CSV with a title column
        #[arg(short, long)]
        input: PathBuf,

        /// Name of the title column
        #[arg(long, default_value = "title")]
        title_column: String,

        /// Directory for checkpoints and the final file
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Filename prefix for checkpoints and the final file
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,

        /// Rows processed between checkpoints
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Minimum pause between lookups, in seconds
        #[arg(long, default_value_t = 10)]
        delay_min: u64,

        /// Maximum pause between lookups, in seconds
        #[arg(long, default_value_t = 20)]
        delay_max: u64,

        /// Checkpoint to resume from: a row count, "latest" or "none"
        #[arg(long, default_value = "none")]
        resume_from: ResumePoint,

        /// Where to save the CAPTCHA screenshot
        #[arg(long, default_value = "captcha.png")]
        screenshot: PathBuf,

        /// Give up waiting for the operator after this many seconds (default: wait forever)
        #[arg(long)]
        operator_timeout: Option<u64>,

        /// Retries for a failed navigation (0 disables retrying)
        #[arg(long, default_value_t = 0)]
        max_retries: u32,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Look up the citation count of a single title
    Lookup {
        /// Paper title
        title: String,

        /// Where to save the CAPTCHA screenshot
        #[arg(long, default_value = "captcha.png")]
        screenshot: PathBuf,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// List checkpoints available for resuming
    Checkpoints {
        /// Directory holding the checkpoints
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Filename prefix of the checkpoints
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct BrowserArgs {
    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// User agent (default: a random desktop browser)
    #[arg(long)]
    user_agent: Option<String>,

    /// Mirror site URL
    #[arg(long)]
    mirror: Option<String>,

    /// Navigation timeout in seconds
    #[arg(long, default_value_t = 60)]
    navigation_timeout: u64,
}

impl BrowserArgs {
    fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| gscholar::random_user_agent().to_string()),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_file, cli.debug) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    // An unanswered operator prompt must not keep the process alive
    let result = runtime::block_on_with_shutdown(dispatch(cli.command), SHUTDOWN_GRACE)
        .context("Failed to start async runtime")
        .and_then(|result| result);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Unhandled error in main function: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            input,
            title_column,
            output_dir,
            prefix,
            batch_size,
            delay_min,
            delay_max,
            resume_from,
            screenshot,
            operator_timeout,
            max_retries,
            browser,
        } => {
            run_pipeline(
                input,
                title_column,
                output_dir,
                prefix,
                batch_size,
                (delay_min, delay_max),
                resume_from,
                screenshot,
                operator_timeout,
                max_retries,
                browser,
            )
            .await
        }
        Commands::Lookup {
            title,
            screenshot,
            browser,
        } => lookup_single(title, screenshot, browser).await,
        Commands::Checkpoints {
            output_dir,
            prefix,
            json,
        } => list_checkpoints(output_dir, prefix, json),
    }
}

// ============================================================================
// Enrichment Pipeline
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn run_pipeline(
    input: PathBuf,
    title_column: String,
    output_dir: PathBuf,
    prefix: String,
    batch_size: usize,
    (delay_min, delay_max): (u64, u64),
    resume_from: ResumePoint,
    screenshot: PathBuf,
    operator_timeout: Option<u64>,
    max_retries: u32,
    browser: BrowserArgs,
) -> Result<()> {
    let mut config = PipelineConfig::new(input);
    config.title_column = title_column;
    config.output_dir = output_dir;
    config.output_prefix = prefix;
    config.batch_size = batch_size;
    config.delay = DelayRange::from_secs(delay_min, delay_max).context("Invalid delay range")?;
    config.resume = resume_from;
    config.screenshot_path = screenshot;
    config.navigation_timeout = Duration::from_secs(browser.navigation_timeout);
    config.operator_timeout = operator_timeout.map(Duration::from_secs);
    config.retry = RetryPolicy {
        max_retries,
        backoff: BackoffPolicy::default(),
    };

    let source = GoogleScholar::new(browser.mirror.as_deref())?;
    let launcher = ChromeLauncher::new(browser.launch_options());

    let mut pipeline = Pipeline::new(
        config,
        Box::new(launcher),
        Arc::new(source),
        Arc::new(StdinSignal),
    )?;
    let summary = pipeline.run().await?;

    println!(
        "Done: {} rows ({} with citations, {} without, {} skipped). Output: {}",
        summary.total,
        summary.found,
        summary.not_found,
        summary.skipped,
        summary.final_path.display()
    );
    Ok(())
}

// ============================================================================
// Single Lookup
// ============================================================================

async fn lookup_single(title: String, screenshot: PathBuf, browser: BrowserArgs) -> Result<()> {
    let source = Arc::new(GoogleScholar::new(browser.mirror.as_deref())?);
    let navigation_timeout = Duration::from_secs(browser.navigation_timeout);
    let gate = AnomalyGate::new(
        source.challenge_selector(),
        screenshot,
        Arc::new(StdinSignal),
        navigation_timeout,
    );
    let executor = LookupExecutor::new(source, gate, navigation_timeout);

    let mut session = ChromeSession::launch(&browser.launch_options())
        .await
        .context("Failed to launch browser")?;
    let outcome = executor.lookup(&mut session, &title).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser");
    }

    match outcome? {
        LookupOutcome::Found(count) => println!("Citations for '{}': {}", title, count),
        LookupOutcome::NotFound => println!("No citations found for '{}'", title),
        LookupOutcome::Skipped => println!("Skipping invalid title: {}", title),
    }
    Ok(())
}

// ============================================================================
// Checkpoint Listing
// ============================================================================

fn list_checkpoints(output_dir: PathBuf, prefix: String, json: bool) -> Result<()> {
    let store = CheckpointStore::new(output_dir, prefix);
    let checkpoints = store.list()?;
    info!(count = checkpoints.len(), dir = %store.dir().display(), "Listed checkpoints");

    if json {
        println!("{}", serde_json::to_string_pretty(&checkpoints)?);
        return Ok(());
    }

    if checkpoints.is_empty() {
        println!("No checkpoints in {}", store.dir().display());
    }
    for checkpoint in &checkpoints {
        println!("{:>8}  {}", checkpoint.count, checkpoint.path.display());
    }
    Ok(())
}
