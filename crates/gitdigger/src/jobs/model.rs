//! Domain types for document jobs and the members they collect.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::job_repo::JobRow;
use crate::db::member_repo::{MemberRow, NewMemberRow};
use crate::db::DatabaseError;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Pending) => true,
            (JobStatus::Pending, JobStatus::Processing) => true,
            // A job that never reaches a worker (pool shut down) fails directly.
            (JobStatus::Pending, JobStatus::Failed) => true,
            (JobStatus::Processing, JobStatus::Processing) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

// ─── Job ────────────────────────────────────────────────────────────────────

/// One uploaded document and the state of its processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    /// Name of the file as uploaded by the client.
    pub pdf_filename: String,
    pub status: JobStatus,
    /// Resolved organization identifiers joined with ", ".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Total member count across resolved organizations. Stored as 0 until completion.
    pub num_members: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    /// A freshly created job in the `pending` state.
    pub fn pending(job_id: impl Into<String>, pdf_filename: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            pdf_filename: pdf_filename.into(),
            status: JobStatus::Pending,
            company_name: None,
            num_members: 0,
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }

    /// Member count as reported to clients: present only once completed.
    pub fn reported_members(&self) -> Option<i64> {
        (self.status == JobStatus::Completed).then_some(self.num_members)
    }

    /// Checks the field-level invariants tying results to the status.
    pub fn check_invariants(&self) -> Result<(), String> {
        let failed = self.status == JobStatus::Failed;
        let completed = self.status == JobStatus::Completed;

        if self.error_message.is_some() != failed {
            return Err(format!(
                "error_message must be set iff failed (status {})",
                self.status
            ));
        }
        if self.company_name.is_some() != completed {
            return Err(format!(
                "company_name must be set iff completed (status {})",
                self.status
            ));
        }
        if !completed && self.num_members != 0 {
            return Err(format!(
                "num_members must stay 0 until completed (status {})",
                self.status
            ));
        }
        if self.completed_at.is_some() != self.status.is_terminal() {
            return Err(format!(
                "completed_at must be set iff terminal (status {})",
                self.status
            ));
        }
        Ok(())
    }

    pub(crate) fn to_row(&self) -> JobRow {
        JobRow {
            job_id: self.job_id.clone(),
            pdf_filename: self.pdf_filename.clone(),
            status: self.status.as_str().to_string(),
            company_name: self.company_name.clone(),
            num_members: self.num_members,
            created_at: format_timestamp(self.created_at),
            completed_at: self.completed_at.map(format_timestamp),
            error_message: self.error_message.clone(),
        }
    }

    pub(crate) fn from_row(row: JobRow) -> Result<Self, DatabaseError> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|_| DatabaseError::CorruptValue {
                column: "status",
                value: row.status.clone(),
            })?;
        let created_at = parse_timestamp("created_at", &row.created_at)?;
        let completed_at = row
            .completed_at
            .as_deref()
            .map(|s| parse_timestamp("completed_at", s))
            .transpose()?;

        Ok(Self {
            job_id: row.job_id,
            pdf_filename: row.pdf_filename,
            status,
            company_name: row.company_name,
            num_members: row.num_members,
            created_at,
            completed_at,
            error_message: row.error_message,
        })
    }
}

fn parse_timestamp(column: &'static str, s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::CorruptValue {
            column,
            value: s.to_string(),
        })
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ─── GitHubMember ───────────────────────────────────────────────────────────

/// A public member of a resolved organization, tagged with that organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubMember {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub member_type: Option<String>,
    pub organization: String,
}

impl GitHubMember {
    pub(crate) fn as_new_row(&self) -> NewMemberRow<'_> {
        NewMemberRow {
            login: &self.login,
            avatar_url: self.avatar_url.as_deref(),
            html_url: self.html_url.as_deref(),
            member_type: self.member_type.as_deref(),
            organization: &self.organization,
        }
    }
}

impl From<MemberRow> for GitHubMember {
    fn from(row: MemberRow) -> Self {
        Self {
            login: row.login,
            avatar_url: row.avatar_url,
            html_url: row.html_url,
            member_type: row.member_type,
            organization: row.organization,
        }
    }
}
