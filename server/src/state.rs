use std::sync::Arc;

use gitdigger::jobs::JobStore;
use gitdigger::storage::DocumentStore;
use gitdigger::worker::WorkerPool;

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobStore,
    pub documents: DocumentStore,
    pub pool: Arc<WorkerPool>,
}

impl AppState {
    pub fn new(jobs: JobStore, documents: DocumentStore, pool: Arc<WorkerPool>) -> Self {
        Self {
            jobs,
            documents,
            pool,
        }
    }
}
