//! Wiring of the core crate into a running server.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::net::TcpListener;
use tracing::{info, warn};

use gitdigger::db::Database;
use gitdigger::github::GitHubClient;
use gitdigger::jobs::JobStore;
use gitdigger::llm::{GeminiClient, LlmNameExtractor};
use gitdigger::pipeline::Pipeline;
use gitdigger::processor::PdfTextExtractor;
use gitdigger::storage::DocumentStore;
use gitdigger::worker::{JobResult, WorkerPool};
use gitdigger::{Config, GitDiggerError};

use crate::app::build_router;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Core(#[from] GitDiggerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds the pipeline from configuration and starts the worker pool.
pub fn build_worker_pool(config: &Config, jobs: JobStore) -> gitdigger::Result<WorkerPool> {
    let github = GitHubClient::new(&config.github_api_url, config.github_token.as_ref())?;
    let gemini = GeminiClient::new(
        &config.gemini_api_url,
        &config.gemini_model,
        config.gemini_api_key.as_ref(),
        config.llm_grounding,
    )?;
    info!(model = gemini.model(), grounding = config.llm_grounding, "Language model configured");

    let names = LlmNameExtractor::new(Arc::new(gemini)).with_max_prompt_chars(config.max_prompt_chars);

    let pipeline = Pipeline::new(
        config.pipeline_config(),
        jobs,
        Arc::new(PdfTextExtractor::new()),
        Arc::new(names),
        Arc::new(github),
    );

    Ok(WorkerPool::new(Arc::new(pipeline), config.worker_count)?)
}

fn log_result(result: &JobResult) {
    if result.success() {
        info!(
            job_id = %result.job_id,
            company_name = result.company_name.as_deref().unwrap_or_default(),
            num_members = result.num_members,
            "Job completed"
        );
    } else {
        warn!(
            job_id = %result.job_id,
            error = result.error.as_deref().unwrap_or_default(),
            "Job failed"
        );
    }
}

fn log_existing_jobs(jobs: &JobStore) {
    match jobs.status_counts() {
        Ok(counts) => {
            for (status, count) in counts {
                if status.is_terminal() {
                    info!(status = %status, count, "Existing jobs");
                } else {
                    // Queues are in memory, so these are never picked up again.
                    warn!(status = %status, count, "Jobs left unfinished by a previous run");
                }
            }
        }
        Err(e) => warn!(error = %e, "Could not count existing jobs"),
    }
}

/// Serves until Ctrl-C, then drains the worker pool.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let db = Database::open(&config.database_path).map_err(GitDiggerError::from)?;
    info!(path = %config.database_path.display(), "Database ready");

    let jobs = JobStore::new(db);
    log_existing_jobs(&jobs);
    let documents = DocumentStore::new(&config.upload_dir);
    let pool = Arc::new(build_worker_pool(&config, jobs.clone())?);

    let result_logger = spawn_result_logger(&pool)?;

    let app = build_router(AppState::new(jobs, documents, Arc::clone(&pool)));

    let listener = TcpListener::bind(config.bind_address).await?;
    info!(
        address = %config.bind_address,
        workers = pool.worker_count(),
        "GitDigger listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drain_pool(pool, result_logger).await;

    info!("Shutdown complete");
    Ok(())
}

/// Logs every job result on a dedicated thread until the workers are gone.
fn spawn_result_logger(pool: &WorkerPool) -> std::io::Result<JoinHandle<()>> {
    let results = pool.results();
    std::thread::Builder::new()
        .name("gitdigger-results".to_string())
        .spawn(move || {
            for result in results.iter() {
                log_result(&result);
            }
        })
}

/// Stops intake and waits for queued jobs. The result logger only ends once
/// every worker has exited, so it is joined only when the pool was drained.
async fn drain_pool(pool: Arc<WorkerPool>, result_logger: JoinHandle<()>) {
    pool.shutdown();
    let pool = match Arc::try_unwrap(pool) {
        Ok(pool) => pool,
        Err(_) => {
            warn!("Worker pool still shared at shutdown; queued jobs stay pending");
            return;
        }
    };

    info!(queued = pool.queued(), "Draining worker pool");
    let drained = tokio::task::spawn_blocking(move || {
        pool.wait();
        result_logger.join().is_ok()
    })
    .await;
    match drained {
        Ok(true) => {}
        Ok(false) => warn!("Result logger panicked"),
        Err(e) => warn!(error = %e, "Worker pool drain did not finish cleanly"),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
    }
}
