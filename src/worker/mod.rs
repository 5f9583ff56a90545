//! Execution side of the batch system.
//!
//! - [`Dispatcher`]: pulls jobs off the queue one at a time, runs them and
//!   records their metrics
//! - [`Executor`]: the capability that actually runs a job
//!
//! # Execution Flow
//!
//! 1. [`Dispatcher::run`] waits on [`JobQueue::claim_next`](crate::scheduler::JobQueue::claim_next)
//! 2. The claimed job is handed to [`Executor::execute`] with its remaining burst
//! 3. The result becomes a [`CompletionRecord`](crate::metrics::CompletionRecord),
//!    successful or not
//! 4. The running slot is cleared and the loop continues
//!
//! Jobs are never preempted, retried or requeued.

pub mod dispatcher;
pub mod executor;

pub use dispatcher::Dispatcher;
pub use executor::{Executor, ProcessExecutor, SleepExecutor};
