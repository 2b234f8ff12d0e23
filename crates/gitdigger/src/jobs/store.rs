//! Persistent job store backed by SQLite.
//!
//! The store is the single source of truth for polling clients. Every
//! mutation runs in one transaction: the current row is read, the mutator
//! is applied, the result is checked against the state machine and the
//! field invariants, and only then written back.

use rusqlite::Connection;
use thiserror::Error;

use crate::db::{job_repo, member_repo, Database, DatabaseError};

use super::model::{GitHubMember, Job, JobStatus};

#[derive(Error, Debug)]
pub enum JobStoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} is already {status}")]
    AlreadyFinished { job_id: String, status: JobStatus },

    #[error("Invalid update for job {job_id}: {reason}")]
    InvalidTransition { job_id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, JobStoreError>;

/// Handle to persisted jobs. Cheap to clone.
#[derive(Clone)]
pub struct JobStore {
    db: Database,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Inserts a new `pending` job.
    pub fn create(&self, job_id: &str, pdf_filename: &str) -> Result<Job> {
        let job = Job::pending(job_id, pdf_filename);
        self.db
            .with_conn(|conn| job_repo::insert(conn, &job.to_row()))?;
        log::debug!("Created job {} for '{}'", job_id, pdf_filename);
        Ok(job)
    }

    /// Loads a job. A missing id is `Ok(None)`, not an error.
    pub fn get(&self, job_id: &str) -> Result<Option<Job>> {
        let row = self.db.with_conn(|conn| job_repo::find_by_id(conn, job_id))?;
        Ok(row.map(Job::from_row).transpose()?)
    }

    /// Applies `mutator` to the stored job atomically and returns the new state.
    ///
    /// Fails with `AlreadyFinished` when the job is terminal and with
    /// `InvalidTransition` when the result breaks the state machine or
    /// the result/status invariants. Nothing is written on failure.
    pub fn update<F>(&self, job_id: &str, mutator: F) -> Result<Job>
    where
        F: FnOnce(&mut Job),
    {
        self.apply(job_id, mutator, &[])
    }

    /// Moves a pending job into `processing`.
    pub fn mark_processing(&self, job_id: &str) -> Result<Job> {
        self.update(job_id, |job| job.status = JobStatus::Processing)
    }

    /// Moves a job into `failed` with the given message.
    pub fn mark_failed(&self, job_id: &str, message: &str) -> Result<Job> {
        let message = message.to_string();
        self.update(job_id, move |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(message);
            job.completed_at = Some(chrono::Utc::now());
        })
    }

    /// Completes a job, writing the summary fields and every member in the
    /// same transaction as the status change.
    pub fn mark_completed(
        &self,
        job_id: &str,
        resolved: &[String],
        members: &[GitHubMember],
    ) -> Result<Job> {
        let company_name = resolved.join(", ");
        let total = members.len() as i64;
        self.apply(
            job_id,
            move |job| {
                job.status = JobStatus::Completed;
                job.company_name = Some(company_name);
                job.num_members = total;
                job.completed_at = Some(chrono::Utc::now());
            },
            members,
        )
    }

    /// Members persisted for a job, in insertion order.
    pub fn list_members(&self, job_id: &str) -> Result<Vec<GitHubMember>> {
        let rows = self
            .db
            .with_conn(|conn| member_repo::list_by_job(conn, job_id))?;
        Ok(rows.into_iter().map(GitHubMember::from).collect())
    }

    /// Total number of jobs.
    pub fn count(&self) -> Result<u64> {
        Ok(self.db.with_conn(job_repo::count)?)
    }

    /// Number of jobs per status. Statuses without jobs are omitted.
    pub fn status_counts(&self) -> Result<Vec<(JobStatus, u64)>> {
        let rows = self.db.with_conn(job_repo::count_by_status)?;
        rows.into_iter()
            .map(|(raw, n)| -> Result<(JobStatus, u64)> {
                let status: JobStatus = raw.parse().map_err(|_| DatabaseError::CorruptValue {
                    column: "status",
                    value: raw.clone(),
                })?;
                Ok((status, n))
            })
            .collect()
    }

    fn apply<F>(&self, job_id: &str, mutator: F, members: &[GitHubMember]) -> Result<Job>
    where
        F: FnOnce(&mut Job),
    {
        self.db.with_transaction(|conn| {
            let current = load(conn, job_id)?;
            if current.status.is_terminal() {
                return Err(JobStoreError::AlreadyFinished {
                    job_id: job_id.to_string(),
                    status: current.status,
                });
            }

            let mut next = current.clone();
            mutator(&mut next);
            validate(&current, &next, members)?;

            job_repo::update(conn, &next.to_row())?;
            if !members.is_empty() {
                let rows: Vec<_> = members.iter().map(GitHubMember::as_new_row).collect();
                member_repo::insert_many(conn, job_id, &rows)?;
            }

            log::debug!(
                "Job {} moved {} -> {}",
                job_id,
                current.status,
                next.status
            );
            Ok(next)
        })
    }
}

fn load(conn: &Connection, job_id: &str) -> Result<Job> {
    let row = job_repo::find_by_id(conn, job_id)?
        .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
    Ok(Job::from_row(row)?)
}

fn validate(current: &Job, next: &Job, members: &[GitHubMember]) -> Result<()> {
    let invalid = |reason: String| JobStoreError::InvalidTransition {
        job_id: current.job_id.clone(),
        reason,
    };

    if next.job_id != current.job_id
        || next.pdf_filename != current.pdf_filename
        || next.created_at != current.created_at
    {
        return Err(invalid("identity fields are immutable".to_string()));
    }
    if !current.status.can_transition_to(next.status) {
        return Err(invalid(format!(
            "cannot move from {} to {}",
            current.status, next.status
        )));
    }
    if !members.is_empty() && next.status != JobStatus::Completed {
        return Err(invalid("members are only written on completion".to_string()));
    }
    next.check_invariants().map_err(invalid)
}
