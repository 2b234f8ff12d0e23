use thiserror::Error;

/// Reasons a job ends in `failed`. The `Display` text is what clients see
/// in `error_message`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to extract text from PDF")]
    EmptyText,

    #[error("No organizations identified in document")]
    NoOrganizations,

    #[error("No valid organizations resolved")]
    NoneResolved,

    #[error("{0}")]
    Store(#[from] crate::jobs::JobStoreError),

    #[error("Pipeline panicked: {0}")]
    Panicked(String),
}
