use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::queue::DEFAULT_CAPACITY;
use crate::scheduler::Policy;

/// How the dispatcher runs a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExecutorKind {
    /// Run the job's command through the shell with its burst as the last
    /// argument.
    #[default]
    Process,
    /// Sleep for the job's burst instead of running anything.
    Sleep,
}

/// Configuration for job execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub kind: ExecutorKind,
    /// Shell used to interpret job commands (invoked as `<shell> -c`)
    pub shell: String,
    /// Working directory for job processes. Inherited when `None`.
    pub working_dir: Option<PathBuf>,
    /// Wall-clock length of one burst unit for the sleep executor.
    pub sleep_unit: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::Process,
            shell: "sh".to_string(),
            working_dir: None,
            sleep_unit: Duration::from_secs(1),
        }
    }
}

impl ExecutorConfig {
    pub fn sleep() -> Self {
        Self {
            kind: ExecutorKind::Sleep,
            ..Default::default()
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of pending jobs; admission blocks beyond this.
    pub capacity: usize,
    /// Policy in force at startup.
    pub policy: Policy,
    pub executor: ExecutorConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: Policy::Fcfs,
            executor: ExecutorConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn new(capacity: usize, policy: Policy) -> Self {
        Self {
            capacity,
            policy,
            ..Default::default()
        }
    }

    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }
}
