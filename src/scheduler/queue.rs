use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::error::{BatchError, Result};
use crate::scheduler::job::Job;
use crate::scheduler::policy::Policy;

pub const DEFAULT_CAPACITY: usize = 10;

/// Outcome of a successful admission.
#[derive(Debug, Clone)]
pub struct Admission {
    pub job_id: Uuid,
    /// Pending jobs after this admission, including the new one.
    pub queue_depth: usize,
    /// Position of the new job in dispatch order (0 runs next).
    pub position: usize,
    /// Remaining burst of everything pending or running when the job arrived.
    pub estimated_wait: Duration,
    pub policy: Policy,
}

/// Point-in-time copy of the queue contents.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub policy: Policy,
    pub capacity: usize,
    pub running: Option<Job>,
    /// Pending jobs in dispatch order.
    pub pending: Vec<Job>,
}

/// Ring buffer plus everything else guarded by the queue lock.
#[derive(Debug)]
struct QueueState {
    slots: Vec<Option<Job>>,
    /// Next slot to fill on admission.
    head: usize,
    /// Next slot to drain on dispatch.
    tail: usize,
    count: usize,
    policy: Policy,
    running: Option<Job>,
    closed: bool,
    halted: bool,
}

impl QueueState {
    fn new(capacity: usize, policy: Policy) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            count: 0,
            policy,
            running: None,
            closed: false,
            halted: false,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    fn is_idle(&self) -> bool {
        self.count == 0 && self.running.is_none()
    }

    /// Slot indices of the pending region, in dispatch order.
    fn pending_slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.count).map(move |i| (self.tail + i) % self.capacity())
    }

    fn pending(&self) -> impl Iterator<Item = &Job> + '_ {
        self.pending_slots().filter_map(move |idx| self.slots[idx].as_ref())
    }

    fn estimated_wait(&self) -> Duration {
        let pending: u64 = self.pending().map(|j| u64::from(j.remaining_burst)).sum();
        let running = self
            .running
            .as_ref()
            .map(|j| u64::from(j.remaining_burst))
            .unwrap_or(0);
        Duration::from_secs(pending + running)
    }

    fn push(&mut self, job: Job) {
        debug_assert!(!self.is_full(), "push into a full queue");
        let head = self.head;
        self.slots[head] = Some(job);
        self.head = (head + 1) % self.capacity();
        self.count += 1;
        debug_assert_eq!(
            self.count % self.capacity(),
            (self.head + self.capacity() - self.tail) % self.capacity()
        );
    }

    fn pop(&mut self) -> Option<Job> {
        if self.count == 0 {
            return None;
        }
        let tail = self.tail;
        let job = self.slots[tail].take();
        debug_assert!(job.is_some(), "slot {tail} inside the pending region is empty");
        self.tail = (tail + 1) % self.capacity();
        self.count -= 1;
        job
    }

    /// Re-sort the pending region in place. The running slot is not part of
    /// the buffer, so a claimed job can never move.
    fn reorder(&mut self) {
        let indices: Vec<usize> = self.pending_slots().collect();
        let mut jobs: Vec<Job> = indices
            .iter()
            .filter_map(|&idx| self.slots[idx].take())
            .collect();
        self.policy.reorder(&mut jobs);
        for (idx, job) in indices.into_iter().zip(jobs) {
            self.slots[idx] = Some(job);
        }
    }
}

/// Bounded job queue shared by the admission side and the dispatcher.
///
/// A single lock guards the buffer, its indices, the active policy and the
/// running slot. Three notifications gate the blocking operations:
/// `not_full` after a claim, `not_empty` after an admission and `idle` after
/// a completion. Every wait re-checks its condition after waking. The
/// `Notified` future is created before the condition is checked, and
/// `notify_waiters` reaches every future created before it is called, so a
/// signal raised between the check and the await is not lost.
#[derive(Debug)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    not_full: Notify,
    not_empty: Notify,
    idle: Notify,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, Policy::default())
    }

    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize, policy: Policy) -> Self {
        Self {
            state: Mutex::new(QueueState::new(capacity.max(1), policy)),
            not_full: Notify::new(),
            not_empty: Notify::new(),
            idle: Notify::new(),
        }
    }

    /// Admit a job, waiting while the queue is full.
    ///
    /// The pending region is re-sorted under the current policy before the
    /// lock is released. Fails with [`BatchError::QueueClosed`] once the
    /// queue has been closed, including for callers already waiting.
    pub async fn submit(&self, job: Job) -> Result<Admission> {
        loop {
            let notified = self.not_full.notified();
            {
                let mut state = self.state.lock().await;
                if state.closed {
                    return Err(BatchError::QueueClosed);
                }
                if !state.is_full() {
                    let job_id = job.id;
                    let estimated_wait = state.estimated_wait();
                    state.push(job);
                    state.reorder();
                    let position = state
                        .pending()
                        .position(|j| j.id == job_id)
                        .unwrap_or(state.count - 1);
                    let admission = Admission {
                        job_id,
                        queue_depth: state.count,
                        position,
                        estimated_wait,
                        policy: state.policy,
                    };
                    drop(state);

                    tracing::debug!(
                        job_id = %job_id,
                        queue_depth = admission.queue_depth,
                        position,
                        "Job admitted"
                    );
                    self.not_empty.notify_waiters();
                    return Ok(admission);
                }
            }
            tracing::debug!("Job queue full, waiting for a free slot");
            notified.await;
        }
    }

    /// Take the next job in dispatch order, waiting while the queue is empty.
    ///
    /// The job's first-scheduled time is stamped and the tail advanced in the
    /// same critical section, and the job moves into the running slot.
    /// Returns `None` once the queue has been halted.
    pub async fn claim_next(&self) -> Option<Job> {
        loop {
            let notified = self.not_empty.notified();
            {
                let mut state = self.state.lock().await;
                if state.halted {
                    return None;
                }
                if let Some(mut job) = state.pop() {
                    job.mark_scheduled();
                    state.running = Some(job.clone());
                    drop(state);

                    self.not_full.notify_waiters();
                    return Some(job);
                }
            }
            notified.await;
        }
    }

    /// Clear the running slot once the dispatcher is done with `job_id`.
    pub async fn complete(&self, job_id: Uuid) -> Option<Job> {
        let mut state = self.state.lock().await;
        let finished = match state.running.take() {
            Some(job) if job.id == job_id => Some(job),
            other => {
                tracing::warn!(job_id = %job_id, "Completed job is not the running job");
                state.running = other;
                None
            }
        };
        drop(state);
        self.idle.notify_waiters();
        finished
    }

    /// Make `policy` current and re-rank the pending jobs under it. The
    /// running job is unaffected. Returns the previous policy.
    pub async fn reorder(&self, policy: Policy) -> Policy {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut state.policy, policy);
        state.reorder();
        tracing::debug!(%previous, %policy, pending = state.count, "Pending jobs reordered");
        previous
    }

    pub async fn policy(&self) -> Policy {
        self.state.lock().await.policy
    }

    /// Stop accepting jobs. Submitters blocked on a full queue fail with
    /// [`BatchError::QueueClosed`].
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.not_full.notify_waiters();
    }

    /// Stop handing out jobs. Pending jobs stay where they are and every
    /// blocked `claim_next` returns `None`.
    pub async fn halt(&self) {
        self.state.lock().await.halted = true;
        self.not_empty.notify_waiters();
        self.idle.notify_waiters();
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Wait until nothing is pending or running, or the queue is halted.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            {
                let state = self.state.lock().await;
                if state.is_idle() || state.halted {
                    return;
                }
            }
            notified.await;
        }
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            policy: state.policy,
            capacity: state.capacity(),
            running: state.running.clone(),
            pending: state.pending().cloned().collect(),
        }
    }

    /// Sum of remaining bursts of all pending jobs plus the running one.
    pub async fn estimated_wait(&self) -> Duration {
        self.state.lock().await.estimated_wait()
    }

    /// Number of pending jobs (the running job is not counted).
    pub async fn len(&self) -> usize {
        self.state.lock().await.count
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_full(&self) -> bool {
        self.state.lock().await.is_full()
    }

    pub async fn capacity(&self) -> usize {
        self.state.lock().await.capacity()
    }
}
