//! Scheduling policies.
//!
//! Each policy is a total order over pending jobs expressed as a sort key.
//! Keys always end in `(arrival, seq)` so that equal primary keys keep
//! submission order, and [`Policy::reorder`] uses a stable sort on top of
//! that.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::BatchError;
use crate::scheduler::job::Job;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// First come, first served: ascending arrival.
    #[default]
    Fcfs,
    /// Shortest job first: ascending remaining burst.
    Sjf,
    /// Ascending priority value; 0 runs before 1.
    Priority,
}

impl Policy {
    pub fn long_name(&self) -> &'static str {
        match self {
            Policy::Fcfs => "First Come First Serve",
            Policy::Sjf => "Shortest Job First",
            Policy::Priority => "Priority",
        }
    }

    fn key(&self, job: &Job) -> (i64, Instant, u64) {
        let primary = match self {
            Policy::Fcfs => 0,
            Policy::Sjf => i64::from(job.remaining_burst),
            Policy::Priority => i64::from(job.priority),
        };
        (primary, job.arrival, job.seq)
    }

    /// Sort `jobs` into dispatch order. The slice must only contain jobs that
    /// have not been claimed by the dispatcher.
    pub fn reorder(&self, jobs: &mut [Job]) {
        jobs.sort_by_key(|job| self.key(job));
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::Fcfs => write!(f, "FCFS"),
            Policy::Sjf => write!(f, "SJF"),
            Policy::Priority => write!(f, "Priority"),
        }
    }
}

impl FromStr for Policy {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fcfs" => Ok(Policy::Fcfs),
            "sjf" => Ok(Policy::Sjf),
            "priority" => Ok(Policy::Priority),
            _ => Err(BatchError::UnknownPolicy(s.trim().to_string())),
        }
    }
}
