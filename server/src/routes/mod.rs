pub mod documents;
pub mod health;

pub use documents::{job_status, upload_document, StatusResponse, UploadResponse};
pub use health::{health_check, HealthResponse};
