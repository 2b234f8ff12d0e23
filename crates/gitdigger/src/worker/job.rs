use std::path::PathBuf;

use crate::jobs::{Job, JobStatus};

/// A unit of background work: one stored document for one persisted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub job_id: String,
    pub document_path: PathBuf,
}

impl JobRequest {
    pub fn new(job_id: impl Into<String>, document_path: impl Into<PathBuf>) -> Self {
        Self {
            job_id: job_id.into(),
            document_path: document_path.into(),
        }
    }
}

/// Outcome of one pipeline run, published on the pool's result channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub job_id: String,
    pub status: JobStatus,
    pub company_name: Option<String>,
    pub num_members: i64,
    pub error: Option<String>,
}

impl JobResult {
    pub fn completed(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: JobStatus::Completed,
            company_name: job.company_name.clone(),
            num_members: job.num_members,
            error: None,
        }
    }

    pub fn failed(job_id: &str, error: String) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Failed,
            company_name: None,
            num_members: 0,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}
