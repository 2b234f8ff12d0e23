//! Job records, their lifecycle and persistence.

pub mod model;
pub mod store;

pub use model::{GitHubMember, Job, JobStatus};
pub use store::{JobStore, JobStoreError};
