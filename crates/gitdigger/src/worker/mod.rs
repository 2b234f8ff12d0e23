pub mod job;
pub mod pool;

pub use job::{JobRequest, JobResult};
pub use pool::WorkerPool;

// Re-exported so consumers can select on the result channel.
pub use crossbeam_channel;
