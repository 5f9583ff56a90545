//! Completion accounting.
//!
//! The dispatcher turns every finished job into a [`CompletionRecord`] and
//! hands it to the [`MetricsRecorder`], which keeps the ordered log plus
//! running totals and extrema. [`MetricsRecorder::report`] renders both.
//!
//! Derived times:
//! - turnaround = finish - arrival
//! - waiting = turnaround - burst
//! - response = first scheduled - arrival

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tokio::time::Instant;
use uuid::Uuid;

use crate::scheduler::{Job, Policy};

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    Failed { error: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// Frozen snapshot of a job at completion.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRecord {
    pub job_id: Uuid,
    pub seq: u64,
    pub command: String,
    pub burst: u32,
    pub priority: i32,
    pub interruptions: u32,
    pub arrival_at: DateTime<Utc>,
    pub first_scheduled_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Run time reported by the executor.
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
    #[serde(serialize_with = "as_secs")]
    pub turnaround: Duration,
    #[serde(serialize_with = "as_secs")]
    pub waiting: Duration,
    #[serde(serialize_with = "as_secs")]
    pub response: Duration,
    pub outcome: Outcome,
}

impl CompletionRecord {
    /// Build the record for `job` finishing at `finished`.
    ///
    /// A job that was never stamped as scheduled gets `finished` as its first
    /// scheduled time. Waiting time is clamped at zero; a successful job that
    /// would need clamping finished faster than its burst, which is logged.
    pub fn new(job: &Job, finished: Instant, elapsed: Duration, outcome: Outcome) -> Self {
        let first_scheduled = job.first_scheduled.unwrap_or(finished);
        let turnaround = finished.saturating_duration_since(job.arrival);
        let response = first_scheduled.saturating_duration_since(job.arrival);
        let waiting = match turnaround.checked_sub(job.burst_duration()) {
            Some(waiting) => waiting,
            None => {
                if outcome.is_success() {
                    tracing::warn!(
                        job_id = %job.id,
                        burst = job.burst,
                        turnaround_ms = turnaround.as_millis() as u64,
                        "Job finished faster than its burst, waiting time clamped to zero"
                    );
                }
                Duration::ZERO
            }
        };
        let finished_at = Utc::now();

        Self {
            job_id: job.id,
            seq: job.seq,
            command: job.command.clone(),
            burst: job.burst,
            priority: job.priority,
            interruptions: job.interruptions,
            arrival_at: job.created_at,
            first_scheduled_at: job.first_scheduled_at.unwrap_or(finished_at),
            finished_at,
            elapsed,
            turnaround,
            waiting,
            response,
            outcome,
        }
    }

    pub fn burst_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.burst))
    }
}

/// Running total and extrema of one measure.
#[derive(Debug, Clone, Copy, Default)]
struct Aggregate {
    total: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
}

impl Aggregate {
    fn add(&mut self, value: Duration) {
        self.total += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn spread(&self, count: usize) -> Spread {
        Spread {
            avg: self.total.as_secs_f64() / count as f64,
            min: self.min.unwrap_or_default().as_secs_f64(),
            max: self.max.unwrap_or_default().as_secs_f64(),
        }
    }
}

/// Average and extrema of one measure, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spread {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub turnaround: Spread,
    pub waiting: Spread,
    pub response: Spread,
    pub burst: Spread,
    pub total_burst_secs: u64,
    /// Jobs per second, `1 / average turnaround`. Absent when the average
    /// turnaround is zero.
    pub throughput: Option<f64>,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub policy: Policy,
    pub completed: usize,
    /// Jobs cut off mid-run by an immediate shutdown; never part of `jobs`.
    pub abandoned: usize,
    /// Completed and abandoned jobs plus jobs still queued or running.
    pub submitted: usize,
    pub jobs: Vec<CompletionRecord>,
    /// `None` when no job has completed.
    pub summary: Option<Summary>,
}

/// Append-only completion log with running aggregates.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    records: Vec<CompletionRecord>,
    turnaround: Aggregate,
    waiting: Aggregate,
    response: Aggregate,
    burst: Aggregate,
    failed: usize,
    abandoned: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: CompletionRecord) {
        self.turnaround.add(record.turnaround);
        self.waiting.add(record.waiting);
        self.response.add(record.response);
        self.burst.add(record.burst_duration());
        if !record.outcome.is_success() {
            self.failed += 1;
        }
        self.records.push(record);
    }

    /// Count a job that was dispatched but never finished.
    pub fn record_abandoned(&mut self) {
        self.abandoned += 1;
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned
    }

    pub fn completed(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[CompletionRecord] {
        &self.records
    }

    /// Forget everything recorded so far. Used between benchmark runs.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn summary(&self) -> Option<Summary> {
        let count = self.records.len();
        if count == 0 {
            return None;
        }
        let turnaround = self.turnaround.spread(count);
        let throughput = (turnaround.avg > 0.0).then(|| 1.0 / turnaround.avg);
        Some(Summary {
            turnaround,
            waiting: self.waiting.spread(count),
            response: self.response.spread(count),
            burst: self.burst.spread(count),
            total_burst_secs: self.burst.total.as_secs(),
            throughput,
            failed: self.failed,
        })
    }

    /// `queued` is the number of jobs still pending or running.
    pub fn report(&self, policy: Policy, queued: usize) -> MetricsReport {
        MetricsReport {
            policy,
            completed: self.records.len(),
            abandoned: self.abandoned,
            submitted: self.records.len() + self.abandoned + queued,
            jobs: self.records.clone(),
            summary: self.summary(),
        }
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(summary) = &self.summary else {
            writeln!(f, "No jobs completed.")?;
            if self.abandoned > 0 {
                writeln!(f, "Jobs abandoned: {}", self.abandoned)?;
            }
            return Ok(());
        };

        writeln!(f, "=== Metrics for {} ===", self.policy.long_name())?;
        writeln!(f)?;
        for job in &self.jobs {
            writeln!(f, "Job {} ({}):", job.command, job.job_id)?;
            writeln!(f, "  CPU burst:         {} s", job.burst)?;
            writeln!(f, "  Priority:          {}", job.priority)?;
            writeln!(f, "  Interruptions:     {}", job.interruptions)?;
            writeln!(f, "  Arrival:           {}", job.arrival_at.format(TIME_FORMAT))?;
            writeln!(f, "  First on CPU:      {}", job.first_scheduled_at.format(TIME_FORMAT))?;
            writeln!(f, "  Finished:          {}", job.finished_at.format(TIME_FORMAT))?;
            writeln!(f, "  Turnaround:        {:.3} s", job.turnaround.as_secs_f64())?;
            writeln!(f, "  Waiting:           {:.3} s", job.waiting.as_secs_f64())?;
            writeln!(f, "  Response:          {:.3} s", job.response.as_secs_f64())?;
            if let Outcome::Failed { error } = &job.outcome {
                writeln!(f, "  Failed:            {}", error)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Overall:")?;
        writeln!(f, "  Jobs completed:    {}", self.completed)?;
        writeln!(f, "  Jobs submitted:    {}", self.submitted)?;
        writeln!(f, "  Jobs failed:       {}", summary.failed)?;
        if self.abandoned > 0 {
            writeln!(f, "  Jobs abandoned:    {}", self.abandoned)?;
        }
        writeln!(f, "  Total CPU burst:   {} s", summary.total_burst_secs)?;
        match summary.throughput {
            Some(t) => writeln!(f, "  Throughput:        {:.3} jobs/s", t)?,
            None => writeln!(f, "  Throughput:        n/a")?,
        }
        for (name, spread) in [
            ("Turnaround", &summary.turnaround),
            ("Waiting", &summary.waiting),
            ("Response", &summary.response),
            ("CPU burst", &summary.burst),
        ] {
            writeln!(
                f,
                "  {:<18} avg {:.3} s, min {:.3} s, max {:.3} s",
                format!("{}:", name),
                spread.avg,
                spread.min,
                spread.max
            )?;
        }
        Ok(())
    }
}
