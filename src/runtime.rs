//! Process runtime with a bounded shutdown.
//!
//! [`StdinSignal`](crate::anomaly::StdinSignal) reads the terminal on a
//! blocking thread that cannot be cancelled. Dropping a runtime waits for such
//! threads, so an abandoned operator prompt would keep the process alive after
//! the run has already failed. Shutting down with a grace period leaves them
//! behind instead.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How long shutdown waits for blocking tasks before abandoning them
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Run `future` to completion on a fresh multi-threaded runtime, then shut the
/// runtime down without waiting more than `grace` for blocking tasks.
pub fn block_on_with_shutdown<F: Future>(future: F, grace: Duration) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    debug!(grace_ms = grace.as_millis() as u64, "Shutting down runtime");
    runtime.shutdown_timeout(grace);
    Ok(output)
}
