//! Isolated environment for running jobs end to end.
//!
//! Each harness owns a temp directory (upload dir + SQLite file), a fake
//! GitHub API on a local port, a scripted language model, and a worker pool
//! wired to the real `PdfTextExtractor`, `LlmNameExtractor` and `GitHubClient`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::SecretString;
use tempfile::TempDir;

use gitdigger::db::Database;
use gitdigger::github::GitHubClient;
use gitdigger::jobs::{Job, JobStore};
use gitdigger::llm::{LanguageModel, LlmError, LlmNameExtractor};
use gitdigger::pipeline::{Pipeline, PipelineConfig};
use gitdigger::processor::PdfTextExtractor;
use gitdigger::storage::DocumentStore;
use gitdigger::worker::{JobRequest, JobResult, WorkerPool};

const TOKEN: &str = "integration-token";

/// Organizations known to the fake GitHub, with their public member counts.
type OrgDirectory = Arc<HashMap<String, usize>>;

async fn org_handler(State(orgs): State<OrgDirectory>, Path(org): Path<String>) -> Response {
    match orgs.get(&org) {
        Some(count) => Json(serde_json::json!({
            "login": org,
            "name": format!("{} Inc.", org),
            "public_members": count,
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, r#"{"message":"Not Found"}"#).into_response(),
    }
}

async fn members_handler(
    State(orgs): State<OrgDirectory>,
    Path(org): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let total = orgs.get(&org).copied().unwrap_or(0);
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = params
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(30);
    let start = ((page - 1) * per_page).min(total);
    let end = (start + per_page).min(total);

    let members: Vec<_> = (start..end)
        .map(|i| {
            serde_json::json!({
                "login": format!("{}-dev{}", org, i),
                "avatar_url": format!("https://avatars.example/{}/{}", org, i),
                "html_url": format!("https://github.com/{}-dev{}", org, i),
                "type": "User",
            })
        })
        .collect();
    Json(members).into_response()
}

async fn spawn_fake_github(orgs: &[(&str, usize)]) -> String {
    let directory: OrgDirectory = Arc::new(
        orgs.iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect(),
    );
    let app = Router::new()
        .route("/orgs/:org", get(org_handler))
        .route("/orgs/:org/public_members", get(members_handler))
        .with_state(directory);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake GitHub");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fake GitHub stopped");
    });
    format!("http://{}", addr)
}

/// Answers every prompt with a fixed reply, or fails when there is none.
pub struct ScriptedModel {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(LlmError::EmptyResponse)
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub store: JobStore,
    pub documents: DocumentStore,
    pub model: Arc<ScriptedModel>,
    pool: WorkerPool,
}

impl TestHarness {
    /// Starts a harness whose GitHub knows `orgs` and whose model answers `model`.
    pub async fn start(orgs: &[(&str, usize)], model: ScriptedModel) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("gitdigger.db"))
            .expect("Failed to open database");
        let store = JobStore::new(db);
        let documents = DocumentStore::new(temp_dir.path().join("uploads"));

        let github_url = spawn_fake_github(orgs).await;
        let token = SecretString::from(TOKEN.to_string());
        let github = GitHubClient::new(&github_url, Some(&token)).expect("GitHub client");

        let model = Arc::new(model);
        let names = LlmNameExtractor::new(model.clone());

        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            store.clone(),
            Arc::new(PdfTextExtractor::new()),
            Arc::new(names),
            Arc::new(github),
        );
        let pool = WorkerPool::new(Arc::new(pipeline), 2).expect("Failed to start workers");

        Self {
            temp_dir,
            store,
            documents,
            model,
            pool,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.temp_dir.path().join("gitdigger.db")
    }

    /// Stores the document, records the job, and queues it, like an upload does.
    pub fn submit(&self, job_id: &str, filename: &str, pdf: &[u8]) -> Job {
        let stored = self.documents.save(job_id, pdf).expect("Failed to save upload");
        let job = self.store.create(job_id, filename).expect("Failed to create job");
        self.pool
            .submit(JobRequest::new(job_id, stored.path))
            .expect("Failed to submit job");
        job
    }

    /// Waits for the next published result without blocking the test runtime.
    pub async fn next_result(&self) -> JobResult {
        let results = self.pool.results();
        tokio::task::spawn_blocking(move || results.recv_timeout(Duration::from_secs(30)))
            .await
            .expect("Result waiter panicked")
            .expect("No job result within 30s")
    }

    /// Drains the pool and returns the temp directory so files outlive the workers.
    pub async fn finish(self) -> TempDir {
        let pool = self.pool;
        pool.shutdown();
        tokio::task::spawn_blocking(move || pool.wait())
            .await
            .expect("Worker pool drain panicked");
        self.temp_dir
    }
}
