use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::metrics::{CompletionRecord, MetricsRecorder, Outcome};
use crate::scheduler::{Job, JobQueue};
use crate::worker::executor::Executor;

/// Execution side of the batch system. Runs one job at a time, to
/// completion, in the order the queue hands them out.
pub struct Dispatcher {
    queue: Arc<JobQueue>,
    metrics: Arc<RwLock<MetricsRecorder>>,
    executor: Arc<dyn Executor>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<JobQueue>,
        metrics: Arc<RwLock<MetricsRecorder>>,
        executor: Arc<dyn Executor>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            metrics,
            executor,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Dispatch loop.
    ///
    /// Exits when the queue is halted, or when the shutdown token is
    /// cancelled, in which case a job in flight is abandoned: it gets no
    /// completion record and is only counted.
    pub async fn run(self) {
        tracing::info!("Dispatcher started");
        loop {
            let job = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                job = self.queue.claim_next() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            if !self.run_job(job).await {
                break;
            }
        }
        tracing::info!("Dispatcher stopped");
    }

    /// Returns false if the job was abandoned because of shutdown.
    async fn run_job(&self, mut job: Job) -> bool {
        tracing::info!(
            job_id = %job.id,
            command = %job.command,
            burst = job.remaining_burst,
            priority = job.priority,
            "Dispatching job"
        );

        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                tracing::warn!(job_id = %job.id, command = %job.command, "Job abandoned on shutdown");
                let mut metrics = self.metrics.write().await;
                self.queue.complete(job.id).await;
                metrics.record_abandoned();
                return false;
            }
            result = self.executor.execute(&job.command, job.remaining_burst) => result,
        };

        let finished = Instant::now();
        job.remaining_burst = 0;
        let (elapsed, outcome) = match result {
            Ok(elapsed) => (elapsed, Outcome::Succeeded),
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Recording failed job as completed");
                let started = job.first_scheduled.unwrap_or(finished);
                (
                    finished.saturating_duration_since(started),
                    Outcome::Failed {
                        error: e.to_string(),
                    },
                )
            }
        };
        let record = CompletionRecord::new(&job, finished, elapsed, outcome);
        log_completion(&record);

        // The metrics lock spans the slot release: readers that take metrics
        // before the queue see the job either running or finished.
        let mut metrics = self.metrics.write().await;
        self.queue.complete(job.id).await;
        metrics.record(record);
        true
    }
}

fn log_completion(record: &CompletionRecord) {
    let ms = |d: Duration| d.as_millis() as u64;
    tracing::info!(
        job_id = %record.job_id,
        command = %record.command,
        success = record.outcome.is_success(),
        turnaround_ms = ms(record.turnaround),
        waiting_ms = ms(record.waiting),
        response_ms = ms(record.response),
        "Job completed"
    );
}
