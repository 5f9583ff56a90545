pub mod admission;
pub mod job;
pub mod policy;
pub mod queue;

pub use admission::Scheduler;
pub use job::{Job, JobStatus};
pub use policy::Policy;
pub use queue::{Admission, JobQueue, QueueSnapshot};
