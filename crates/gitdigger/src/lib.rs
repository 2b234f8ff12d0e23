pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod jobs;
pub mod llm;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod worker;

pub use config::{Config, LogFormat};
pub use db::{Database, DatabaseError};
pub use error::{
    ConfigError, GitDiggerError, ProcessError, Result, StorageError, WorkerError,
};
pub use github::{GitHubClient, GitHubError, OrganizationData, OrganizationSource};
pub use jobs::{GitHubMember, Job, JobStatus, JobStore, JobStoreError};
pub use llm::{
    GeminiClient, LanguageModel, LlmError, LlmNameExtractor, OrganizationNameExtractor,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError};
pub use processor::{DocumentInfo, PdfTextExtractor, TextExtractor};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use storage::{DocumentStore, StoredDocument};
pub use worker::{JobRequest, JobResult, WorkerPool};
