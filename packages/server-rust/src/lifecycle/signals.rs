//! OS termination signals that start a drain.

use tokio::signal;
use tracing::{error, info};

/// Which signal asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    CtrlC,
    #[cfg(unix)]
    Sigterm,
}

/// Waits for Ctrl+C or SIGTERM, whichever arrives first.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown_signal() -> anyhow::Result<ShutdownSignal> {
    let received = tokio::select! {
        result = wait_ctrl_c() => result?,
        result = wait_sigterm() => result?,
    };
    info!(signal = ?received, "shutdown signal received, draining");
    Ok(received)
}

async fn wait_ctrl_c() -> anyhow::Result<ShutdownSignal> {
    signal::ctrl_c().await.map_err(|e| {
        error!(%e, "error handling Ctrl+C signal");
        e
    })?;
    Ok(ShutdownSignal::CtrlC)
}

#[cfg(unix)]
async fn wait_sigterm() -> anyhow::Result<ShutdownSignal> {
    let mut terminate =
        signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
            error!(%e, "failed to install SIGTERM handler");
            e
        })?;
    terminate.recv().await;
    Ok(ShutdownSignal::Sigterm)
}

#[cfg(not(unix))]
async fn wait_sigterm() -> anyhow::Result<ShutdownSignal> {
    std::future::pending::<anyhow::Result<ShutdownSignal>>().await
}
