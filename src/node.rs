use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::metrics::{MetricsRecorder, MetricsReport};
use crate::scheduler::{Admission, Job, JobQueue, JobStatus, Policy, Scheduler};
use crate::shutdown::DrainMode;
use crate::worker::executor::{self, Executor};
use crate::worker::Dispatcher;

/// One row of [`Node::list_status`].
#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub job_id: Uuid,
    pub name: String,
    pub burst: u32,
    pub priority: i32,
    pub arrival: DateTime<Utc>,
    pub state: JobStatus,
}

impl StatusRow {
    fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            name: job.command.clone(),
            burst: job.burst,
            priority: job.priority,
            arrival: job.created_at,
            state: job.status(),
        }
    }
}

/// The batch system: job queue, admission, dispatcher and metrics wired
/// together, plus the administrative operations.
pub struct Node {
    pub config: SchedulerConfig,
    pub queue: Arc<JobQueue>,
    pub scheduler: Scheduler,
    pub metrics: Arc<RwLock<MetricsRecorder>>,
    shutdown: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    /// Start a node with the executor described by `config.executor`.
    ///
    /// Spawns the dispatcher, so this must be called from within a tokio
    /// runtime.
    pub fn start(config: SchedulerConfig) -> Self {
        let executor = executor::from_config(&config.executor);
        Self::start_with_executor(config, executor)
    }

    pub fn start_with_executor(config: SchedulerConfig, executor: Arc<dyn Executor>) -> Self {
        let queue = Arc::new(JobQueue::with_capacity(config.capacity, config.policy));
        let metrics = Arc::new(RwLock::new(MetricsRecorder::new()));
        let shutdown = CancellationToken::new();

        let handle = Dispatcher::new(
            queue.clone(),
            metrics.clone(),
            executor,
            shutdown.clone(),
        )
        .spawn();

        tracing::info!(
            capacity = config.capacity,
            policy = %config.policy,
            executor = ?config.executor.kind,
            "Batch node started"
        );

        Self {
            scheduler: Scheduler::new(queue.clone()),
            config,
            queue,
            metrics,
            shutdown,
            dispatcher: Mutex::new(Some(handle)),
        }
    }

    /// See [`Scheduler::submit_job`].
    pub async fn submit_job(&self, name: &str, burst: i64, priority: i32) -> Result<Admission> {
        self.scheduler.submit_job(name, burst, priority).await
    }

    /// Switch policy and re-rank pending jobs immediately. Returns the
    /// previous policy.
    pub async fn change_policy(&self, policy: Policy) -> Policy {
        let previous = self.queue.reorder(policy).await;
        let pending = self.queue.len().await;
        tracing::info!(%previous, %policy, pending, "Scheduling policy changed");
        previous
    }

    pub async fn policy(&self) -> Policy {
        self.queue.policy().await
    }

    /// Finished jobs in completion order, then the running job, then pending
    /// jobs in dispatch order.
    pub async fn list_status(&self) -> Vec<StatusRow> {
        // Metrics before queue, the same order the dispatcher locks them in.
        let metrics = self.metrics.read().await;
        let snapshot = self.queue.snapshot().await;

        let mut rows: Vec<StatusRow> = metrics
            .records()
            .iter()
            .map(|r| StatusRow {
                job_id: r.job_id,
                name: r.command.clone(),
                burst: r.burst,
                priority: r.priority,
                arrival: r.arrival_at,
                state: JobStatus::Finished,
            })
            .collect();
        rows.extend(snapshot.running.iter().map(StatusRow::from_job));
        rows.extend(snapshot.pending.iter().map(StatusRow::from_job));
        rows
    }

    pub async fn report(&self) -> MetricsReport {
        let metrics = self.metrics.read().await;
        let snapshot = self.queue.snapshot().await;
        let queued = snapshot.pending.len() + usize::from(snapshot.running.is_some());
        metrics.report(snapshot.policy, queued)
    }

    pub async fn reset_metrics(&self) {
        self.metrics.write().await.reset();
        tracing::info!("Metrics reset");
    }

    /// Wait until every admitted job has finished.
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    /// Stop accepting jobs, finish outstanding work according to `mode`, stop
    /// the dispatcher and return the final report.
    ///
    /// Waiting is driven by completion notifications, not polling. Calling
    /// this again after the dispatcher has stopped just returns the report.
    pub async fn drain_and_quit(&self, mode: DrainMode) -> MetricsReport {
        tracing::info!(%mode, "Draining batch node");
        self.queue.close().await;

        match mode {
            DrainMode::Immediate => {
                self.shutdown.cancel();
                self.queue.halt().await;
            }
            DrainMode::AfterCurrent => {
                self.queue.halt().await;
            }
            DrainMode::AfterAll => {
                self.queue.wait_idle().await;
                self.queue.halt().await;
            }
        }

        if let Some(handle) = self.dispatcher.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Dispatcher task failed");
            }
        }

        let report = self.report().await;
        tracing::info!(
            completed = report.completed,
            dropped = report.submitted - report.completed,
            "Batch node stopped"
        );
        report
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
