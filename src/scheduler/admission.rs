use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{BatchError, Result};
use crate::scheduler::job::Job;
use crate::scheduler::queue::{Admission, JobQueue};

/// Admission side of the batch system: validates requests, builds jobs and
/// hands them to the queue.
#[derive(Debug)]
pub struct Scheduler {
    queue: Arc<JobQueue>,
    next_seq: AtomicU64,
}

impl Scheduler {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self {
            queue,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Submit a job, waiting while the queue is full.
    ///
    /// `burst` is in seconds and must be positive. A rejected request never
    /// touches the queue.
    pub async fn submit_job(&self, name: &str, burst: i64, priority: i32) -> Result<Admission> {
        let job = self.build_job(name, burst, priority)?;
        let job_id = job.id;
        let command = job.command.clone();

        let admission = self.queue.submit(job).await?;
        tracing::info!(
            job_id = %job_id,
            command = %command,
            burst,
            priority,
            queue_depth = admission.queue_depth,
            estimated_wait_secs = admission.estimated_wait.as_secs(),
            policy = %admission.policy,
            "Job submitted"
        );
        Ok(admission)
    }

    fn build_job(&self, name: &str, burst: i64, priority: i32) -> Result<Job> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BatchError::EmptyCommand);
        }
        let burst = match u32::try_from(burst) {
            Ok(b) if b > 0 => b,
            _ => return Err(BatchError::InvalidBurst(burst)),
        };
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        Ok(Job::new(seq, name.to_string(), burst, priority))
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }
}
