//! Single-node batch job scheduler.
//!
//! Jobs are admitted into a bounded queue, ordered by the active
//! [`Policy`](scheduler::Policy) (FCFS, SJF or priority), and run one at a
//! time, without preemption, by the [`Dispatcher`](worker::Dispatcher).
//! Every completion is recorded by the [`MetricsRecorder`](metrics::MetricsRecorder).
//!
//! [`Node`](node::Node) wires the pieces together and exposes the
//! administrative operations.

pub mod bench;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod node;
pub mod scheduler;
pub mod shutdown;
pub mod worker;
