use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Finished,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Finished => write!(f, "finished"),
        }
    }
}

/// A submitted batch job.
///
/// Everything except `remaining_burst` and `first_scheduled` is fixed at
/// admission. `arrival` and `first_scheduled` are monotonic instants used for
/// metrics; the `*_at` fields carry the matching wall-clock time for display.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    /// Submission sequence number, the final tie-break of every policy.
    pub seq: u64,
    pub command: String,
    pub arrival: Instant,
    pub created_at: DateTime<Utc>,
    /// Requested CPU time in seconds.
    pub burst: u32,
    /// Equal to `burst` until the job completes, then zero.
    pub remaining_burst: u32,
    /// Lower values are more urgent.
    pub priority: i32,
    /// Always zero: jobs are never preempted.
    pub interruptions: u32,
    pub first_scheduled: Option<Instant>,
    pub first_scheduled_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(seq: u64, command: String, burst: u32, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq,
            command,
            arrival: Instant::now(),
            created_at: Utc::now(),
            burst,
            remaining_burst: burst,
            priority,
            interruptions: 0,
            first_scheduled: None,
            first_scheduled_at: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        if self.remaining_burst == 0 {
            JobStatus::Finished
        } else if self.first_scheduled.is_some() {
            JobStatus::Running
        } else {
            JobStatus::Pending
        }
    }

    /// Stamp the moment the dispatcher selected this job. Only the first call
    /// has any effect.
    pub fn mark_scheduled(&mut self) {
        if self.first_scheduled.is_none() {
            self.first_scheduled = Some(Instant::now());
            self.first_scheduled_at = Some(Utc::now());
        }
    }

    pub fn burst_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.burst))
    }
}
