//! Shared helpers for batch-lite integration tests.
//!
//! Most tests run with tokio's clock paused, so a [`MockExecutor`] that
//! sleeps for a job's burst finishes instantly in real time while the
//! virtual clock advances by exactly the burst. That makes every derived
//! metric an exact number of seconds.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use batch_lite::config::SchedulerConfig;
use batch_lite::error::{BatchError, Result};
use batch_lite::node::Node;
use batch_lite::scheduler::{Job, JobStatus, Policy};
use batch_lite::worker::Executor;

/// Executor that records every call and sleeps for the requested burst.
///
/// Commands listed in `failing` return an execution error after their
/// sleep. Commands listed in `gated` wait for a permit from `gate` before
/// they start sleeping, which lets a test hold the dispatcher on a job.
pub struct MockExecutor {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    gated: HashSet<String>,
    gate: Arc<Semaphore>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            gated: HashSet::new(),
            gate: Arc::new(Semaphore::new(0)),
        }
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, command: &str) -> Self {
        self.failing.insert(command.to_string());
        self
    }

    pub fn gated(mut self, command: &str) -> Self {
        self.gated.insert(command.to_string());
        self
    }

    /// Let one gated job proceed.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    /// Commands in the order they were executed.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, command: &str, expected_burst: u32) -> Result<Duration> {
        self.calls.lock().unwrap().push(command.to_string());
        if self.gated.contains(command) {
            self.gate
                .acquire()
                .await
                .expect("gate semaphore closed")
                .forget();
        }
        let started = Instant::now();
        tokio::time::sleep(Duration::from_secs(u64::from(expected_burst))).await;
        if self.failing.contains(command) {
            return Err(BatchError::Execution(format!("{} exited with 1", command)));
        }
        Ok(started.elapsed())
    }
}

/// Start a node backed by `executor`.
pub fn start_node(capacity: usize, policy: Policy, executor: Arc<MockExecutor>) -> Node {
    Node::start_with_executor(SchedulerConfig::new(capacity, policy), executor)
}

/// Wait until the dispatcher is running the job named `name`, giving up
/// after a minute of virtual time.
pub async fn wait_until_running(node: &Node, name: &str) {
    for _ in 0..60_000 {
        let snapshot = node.queue.snapshot().await;
        if snapshot.running.as_ref().map(|j| j.command.as_str()) == Some(name) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("job {} never started running", name);
}

pub fn job(seq: u64, name: &str, burst: u32, priority: i32) -> Job {
    Job::new(seq, name.to_string(), burst, priority)
}

pub fn names(jobs: &[Job]) -> Vec<String> {
    jobs.iter().map(|j| j.command.clone()).collect()
}

pub fn assert_pending(job: &Job) {
    assert_eq!(job.status(), JobStatus::Pending);
    assert!(job.first_scheduled.is_none());
}
