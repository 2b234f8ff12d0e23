use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use gitdigger::jobs::{GitHubMember, Job, JobStatus};
use gitdigger::worker::JobRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const INVALID_FILE_TYPE: &str = "Invalid file type. Please upload a PDF document.";
pub const NO_FILE_PROVIDED: &str = "No file provided";
const PDF_CONTENT_TYPE: &str = "application/pdf";
const DEFAULT_FILENAME: &str = "document.pdf";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub pdf_filename: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_members: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_members: Option<Vec<GitHubMember>>,
}

impl StatusResponse {
    fn new(job: Job, members: Option<Vec<GitHubMember>>) -> Self {
        let num_members = job.reported_members();
        Self {
            job_id: job.job_id,
            status: job.status,
            pdf_filename: job.pdf_filename,
            created_at: job.created_at,
            completed_at: job.completed_at,
            company_name: job.company_name,
            num_members,
            error_message: job.error_message,
            github_members: members,
        }
    }
}

struct UploadedFile {
    filename: String,
    content: axum::body::Bytes,
}

/// Reads the `file` field. Other fields are ignored.
async fn read_file_field(multipart: &mut Multipart) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Rejected(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        if field.content_type() != Some(PDF_CONTENT_TYPE) {
            return Err(ApiError::Rejected(INVALID_FILE_TYPE.to_string()));
        }

        let filename = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::Rejected(format!("Invalid upload: {}", e)))?;

        return Ok(UploadedFile { filename, content });
    }

    Err(ApiError::Rejected(NO_FILE_PROVIDED.to_string()))
}

/// `POST /documents/upload`
///
/// Saves the PDF, records a `pending` job and queues it. Returns as soon as
/// the job is queued; processing happens on the worker pool.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let upload = read_file_field(&mut multipart).await?;
    let job_id = Uuid::new_v4().to_string();

    let documents = state.documents.clone();
    let save_id = job_id.clone();
    let content = upload.content;
    let stored = tokio::task::spawn_blocking(move || documents.save(&save_id, &content))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            warn!(job_id = %job_id, error = %e, "Failed to save upload");
            ApiError::Rejected(format!("Failed to save file: {}", e.public_message()))
        })?;

    let job = match state.jobs.create(&job_id, &upload.filename) {
        Ok(job) => job,
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(&stored.path) {
                warn!(job_id = %job_id, error = %remove_err, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    info!(
        job_id = %job_id,
        filename = %upload.filename,
        stored_name = %stored.stored_name,
        "Document uploaded"
    );

    let status = match state.pool.submit(JobRequest::new(&job_id, stored.path)) {
        Ok(()) => job.status,
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Worker pool refused job");
            state.jobs.mark_failed(&job_id, &e.to_string())?.status
        }
    };

    Ok(Json(UploadResponse { job_id, status }))
}

/// `GET /documents/status/:job_id`
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let job = state
        .jobs
        .get(&job_id)?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    let members = if job.status == JobStatus::Completed {
        Some(state.jobs.list_members(&job_id)?)
    } else {
        None
    };

    Ok(Json(StatusResponse::new(job, members)))
}
