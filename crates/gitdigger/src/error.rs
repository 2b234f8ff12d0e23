use std::path::PathBuf;
use thiserror::Error;

use crate::sanitize::redact_path;

#[derive(Error, Debug)]
pub enum GitDiggerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Job store error: {0}")]
    JobStore(#[from] crate::jobs::JobStoreError),

    #[error("GitHub error: {0}")]
    GitHub(#[from] crate::github::GitHubError),

    #[error("Language model error: {0}")]
    Llm(#[from] crate::llm::LlmError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to resolve secret {key}: {source}")]
    Secret {
        key: &'static str,
        #[source]
        source: crate::secrets::SecretError,
    },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("Invalid stored filename: {0}")]
    InvalidFilename(String),
}

impl StorageError {
    /// Description safe to return to clients: file names only, no directories.
    pub fn public_message(&self) -> String {
        match self {
            Self::CreateDirectory { source, .. } => {
                format!("could not create upload directory: {}", source)
            }
            Self::WriteFile { path, source } => {
                format!("could not write '{}': {}", redact_path(path), source)
            }
            Self::FileExists(path) => format!("'{}' already exists", redact_path(path)),
            Self::InvalidFilename(name) => format!("invalid stored filename '{}'", name),
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker pool is not accepting jobs")]
    ChannelClosed,

    #[error("Worker count must be greater than zero")]
    NoWorkers,
}

pub type Result<T> = std::result::Result<T, GitDiggerError>;
