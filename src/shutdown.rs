use std::str::FromStr;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::error::BatchError;

/// How much outstanding work to finish before the system stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainMode {
    /// Stop now; a running job is abandoned and pending jobs are dropped.
    Immediate,
    /// Let the running job finish, drop the pending ones.
    #[default]
    AfterCurrent,
    /// Run every pending job first.
    AfterAll,
}

impl std::fmt::Display for DrainMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrainMode::Immediate => write!(f, "immediate"),
            DrainMode::AfterCurrent => write!(f, "after-current"),
            DrainMode::AfterAll => write!(f, "after-all"),
        }
    }
}

impl FromStr for DrainMode {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "-i" | "immediate" => Ok(DrainMode::Immediate),
            "-c" | "current" | "after-current" => Ok(DrainMode::AfterCurrent),
            "-a" | "all" | "after-all" => Ok(DrainMode::AfterAll),
            other => Err(BatchError::Usage(format!(
                "quit [-i|-c|-a], unknown mode '{}'",
                other
            ))),
        }
    }
}

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received. Must be called from within a tokio runtime.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }

        token_clone.cancel();
    });

    Ok(token)
}
