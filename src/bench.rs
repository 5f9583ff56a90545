//! Synthetic load: generate a batch of jobs with random bursts and
//! priorities and push them through a [`Node`].

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{BatchError, Result};
use crate::metrics::MetricsReport;
use crate::node::Node;
use crate::scheduler::Policy;

#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub name: String,
    pub burst: u32,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSpec {
    /// Command every generated job runs.
    pub name: String,
    pub policy: Policy,
    pub num_jobs: usize,
    /// Seconds between submissions; zero submits the whole batch at once.
    pub arrival_rate: u64,
    /// Priorities are drawn from `0..priority_levels`.
    pub priority_levels: u32,
    pub min_burst: u32,
    pub max_burst: u32,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl BenchmarkSpec {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(BatchError::InvalidBenchmark(msg.to_string()));
        if self.name.trim().is_empty() {
            return invalid("benchmark name must not be empty");
        }
        if self.num_jobs == 0 {
            return invalid("number of jobs must be positive");
        }
        if self.priority_levels == 0 {
            return invalid("priority levels must be positive");
        }
        if self.min_burst == 0 {
            return invalid("minimum burst must be positive");
        }
        if self.min_burst > self.max_burst {
            return invalid("minimum burst exceeds maximum burst");
        }
        Ok(())
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> Vec<JobRequest> {
        (0..self.num_jobs)
            .map(|_| JobRequest {
                name: self.name.clone(),
                burst: rng.gen_range(self.min_burst..=self.max_burst),
                priority: rng.gen_range(0..self.priority_levels) as i32,
            })
            .collect()
    }

    /// Total burst of one run, which bounds how long the run takes.
    pub fn expected_runtime(requests: &[JobRequest]) -> Duration {
        Duration::from_secs(requests.iter().map(|r| u64::from(r.burst)).sum())
    }
}

/// Run a benchmark on `node` and return its metrics.
///
/// Waits for jobs already in the system to finish, resets the metrics,
/// switches to the benchmark's policy, submits every generated job (blocking
/// when the queue is full) and waits for all of them to complete.
pub async fn run_benchmark(node: &Node, spec: &BenchmarkSpec) -> Result<MetricsReport> {
    spec.validate()?;
    let mut rng = match spec.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let requests = spec.generate(&mut rng);

    node.wait_idle().await;
    node.reset_metrics().await;
    node.change_policy(spec.policy).await;

    tracing::info!(
        benchmark = %spec.name,
        policy = %spec.policy,
        jobs = requests.len(),
        expected_runtime_secs = BenchmarkSpec::expected_runtime(&requests).as_secs(),
        "Starting benchmark"
    );

    let last = requests.len().saturating_sub(1);
    for (i, request) in requests.iter().enumerate() {
        node.submit_job(&request.name, i64::from(request.burst), request.priority)
            .await?;
        if spec.arrival_rate > 0 && i < last {
            tokio::time::sleep(Duration::from_secs(spec.arrival_rate)).await;
        }
    }

    node.wait_idle().await;
    Ok(node.report().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> BenchmarkSpec {
        BenchmarkSpec {
            name: "microbatch".to_string(),
            policy: Policy::Sjf,
            num_jobs: 50,
            arrival_rate: 0,
            priority_levels: 4,
            min_burst: 2,
            max_burst: 6,
            seed: Some(7),
        }
    }

    #[test]
    fn generated_jobs_respect_bounds() {
        let spec = spec();
        let jobs = spec.generate(&mut StdRng::seed_from_u64(1));
        assert_eq!(jobs.len(), 50);
        for job in &jobs {
            assert_eq!(job.name, "microbatch");
            assert!((2..=6).contains(&job.burst));
            assert!((0..4).contains(&job.priority));
        }
    }

    #[test]
    fn generation_is_deterministic_for_a_seed() {
        let spec = spec();
        let a = spec.generate(&mut StdRng::seed_from_u64(42));
        let b = spec.generate(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn validate_rejects_bad_bounds() {
        let mut bad = spec();
        bad.min_burst = 7;
        assert!(matches!(bad.validate(), Err(BatchError::InvalidBenchmark(_))));

        let mut bad = spec();
        bad.min_burst = 0;
        assert!(bad.validate().is_err());

        let mut bad = spec();
        bad.num_jobs = 0;
        assert!(bad.validate().is_err());

        let mut bad = spec();
        bad.priority_levels = 0;
        assert!(bad.validate().is_err());

        assert!(spec().validate().is_ok());
    }

    #[test]
    fn expected_runtime_sums_bursts() {
        let requests = vec![
            JobRequest {
                name: "a".to_string(),
                burst: 2,
                priority: 0,
            },
            JobRequest {
                name: "b".to_string(),
                burst: 5,
                priority: 1,
            },
        ];
        assert_eq!(
            BenchmarkSpec::expected_runtime(&requests),
            Duration::from_secs(7)
        );
    }
}
