//! Fake collaborators and a ready-made `AppState` for route tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use gitdigger::db::Database;
use gitdigger::github::{ApiMember, GitHubError, OrganizationData, OrganizationProfile};
use gitdigger::jobs::JobStore;
use gitdigger::llm::OrganizationNameExtractor;
use gitdigger::pipeline::{Pipeline, PipelineConfig};
use gitdigger::processor::TextExtractor;
use gitdigger::storage::DocumentStore;
use gitdigger::worker::WorkerPool;
use gitdigger::OrganizationSource;

use crate::state::AppState;

/// Reads the uploaded bytes as text, dropping the `%PDF-x.y` marker.
struct RawText;

impl TextExtractor for RawText {
    fn extract_text(&self, path: &Path) -> String {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .split_whitespace()
            .filter(|word| !word.starts_with("%PDF"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Every word is an organization, except "empty".
struct WordNames;

#[async_trait]
impl OrganizationNameExtractor for WordNames {
    async fn extract_names(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .filter(|word| *word != "empty")
            .map(str::to_string)
            .collect()
    }
}

/// Each organization has members `<org>-a` and `<org>-b`.
struct TwoMembers;

#[async_trait]
impl OrganizationSource for TwoMembers {
    async fn fetch_organization(
        &self,
        name: &str,
    ) -> Result<Option<OrganizationData>, GitHubError> {
        Ok(Some(OrganizationData {
            identifier: name.to_string(),
            profile: OrganizationProfile {
                login: name.to_string(),
                ..Default::default()
            },
            members: ["a", "b"]
                .iter()
                .map(|suffix| ApiMember {
                    login: format!("{}-{}", name, suffix),
                    avatar_url: None,
                    html_url: Some(format!("https://github.com/{}-{}", name, suffix)),
                    member_type: Some("User".to_string()),
                })
                .collect(),
        }))
    }
}

pub struct TestContext {
    pub state: AppState,
    pub upload_dir: TempDir,
}

pub fn test_state() -> TestContext {
    let upload_dir = TempDir::new().unwrap();
    let jobs = JobStore::new(Database::open_in_memory().unwrap());
    let pipeline = Arc::new(Pipeline::new(
        PipelineConfig::default(),
        jobs.clone(),
        Arc::new(RawText),
        Arc::new(WordNames),
        Arc::new(TwoMembers),
    ));
    let pool = WorkerPool::new(pipeline, 2).unwrap();

    TestContext {
        state: AppState::new(jobs, DocumentStore::new(upload_dir.path()), Arc::new(pool)),
        upload_dir,
    }
}
