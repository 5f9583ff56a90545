use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::Instant;

use crate::config::{ExecutorConfig, ExecutorKind};
use crate::error::{BatchError, Result};

/// Runs one job to completion.
///
/// Implementations return the elapsed run time, or an error if the job could
/// not be started or did not finish successfully. The dispatcher never
/// retries.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, command: &str, expected_burst: u32) -> Result<Duration>;
}

/// Build the executor described by `config`.
pub fn from_config(config: &ExecutorConfig) -> Arc<dyn Executor> {
    match config.kind {
        ExecutorKind::Process => Arc::new(ProcessExecutor::new(config.clone())),
        ExecutorKind::Sleep => Arc::new(SleepExecutor::new(config.sleep_unit)),
    }
}

/// Executes jobs as `<shell> -c "<command> <burst>"`.
///
/// The child is killed if the execution future is dropped, so cancelling
/// the dispatcher does not leave orphaned jobs behind.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    config: ExecutorConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    fn process_output(
        command: &str,
        result: std::io::Result<std::process::Output>,
        elapsed: Duration,
    ) -> Result<Duration> {
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(command, error = %e, "Failed to start job");
                return Err(BatchError::Io(e));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.is_empty() {
            tracing::debug!(command, stdout = %stdout.trim_end(), "Job output");
        }

        if output.status.success() {
            tracing::info!(command, elapsed_ms = elapsed.as_millis() as u64, "Job exited");
            return Ok(elapsed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("Exit code: {:?}", output.status.code())
        } else {
            stderr.trim_end().to_string()
        };
        tracing::warn!(command, exit_code = ?output.status.code(), error = %message, "Job failed");
        Err(BatchError::Execution(message))
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, command: &str, expected_burst: u32) -> Result<Duration> {
        let line = format!("{} {}", command, expected_burst);
        tracing::info!(command = %line, shell = %self.config.shell, "Executing job");

        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.config.working_dir {
            cmd.current_dir(dir);
        }

        let started = Instant::now();
        let result = cmd.output().await;
        Self::process_output(command, result, started.elapsed())
    }
}

/// Simulates a job by sleeping for its burst, one `unit` per burst second.
#[derive(Debug, Clone)]
pub struct SleepExecutor {
    unit: Duration,
}

impl Default for SleepExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl SleepExecutor {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }
}

#[async_trait]
impl Executor for SleepExecutor {
    async fn execute(&self, command: &str, expected_burst: u32) -> Result<Duration> {
        tracing::info!(command, burst = expected_burst, "Simulating job");
        let duration = self.unit.checked_mul(expected_burst).ok_or_else(|| {
            BatchError::Execution(format!(
                "sleep of {} x {:?} overflows",
                expected_burst, self.unit
            ))
        })?;
        let started = Instant::now();
        tokio::time::sleep(duration).await;
        Ok(started.elapsed())
    }
}
