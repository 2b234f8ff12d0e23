use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::github::OrganizationSource;
use crate::jobs::{GitHubMember, JobStore};
use crate::llm::OrganizationNameExtractor;
use crate::processor::TextExtractor;
use crate::sanitize;
use crate::worker::job::{JobRequest, JobResult};

use super::config::PipelineConfig;
use super::error::PipelineError;

/// Organizations that resolved during a run, in lookup order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub names: Vec<String>,
    pub members: Vec<GitHubMember>,
}

/// Drives one job from `pending` to a terminal state.
pub struct Pipeline {
    config: PipelineConfig,
    store: JobStore,
    text_extractor: Arc<dyn TextExtractor>,
    name_extractor: Arc<dyn OrganizationNameExtractor>,
    organizations: Arc<dyn OrganizationSource>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        store: JobStore,
        text_extractor: Arc<dyn TextExtractor>,
        name_extractor: Arc<dyn OrganizationNameExtractor>,
        organizations: Arc<dyn OrganizationSource>,
    ) -> Self {
        Self {
            config,
            store,
            text_extractor,
            name_extractor,
            organizations,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Runs the job to completion. Never returns an error: every fault
    /// after the job is picked up is recorded as a `failed` job.
    pub async fn run(&self, request: &JobRequest) -> JobResult {
        let span = info_span!("pipeline",
            job_id = %request.job_id,
            filename = %sanitize::redact_path(&request.document_path),
        );
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: &JobRequest) -> JobResult {
        if let Err(e) = self.store.mark_processing(&request.job_id) {
            return self.fail(request, PipelineError::Store(e));
        }
        info!("Job processing started");

        let outcome = AssertUnwindSafe(self.execute(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineError::Panicked(panic_message(panic.as_ref()))));

        let resolution = match outcome {
            Ok(resolution) => resolution,
            Err(e) => return self.fail(request, e),
        };

        match self
            .store
            .mark_completed(&request.job_id, &resolution.names, &resolution.members)
        {
            Ok(job) => {
                info!(
                    organizations = resolution.names.len(),
                    members = job.num_members,
                    "Job completed"
                );
                JobResult::completed(&job)
            }
            Err(e) => self.fail(request, PipelineError::Store(e)),
        }
    }

    async fn execute(&self, request: &JobRequest) -> Result<Resolution, PipelineError> {
        if !self.config.simulated_delay.is_zero() {
            debug!(
                delay_ms = self.config.simulated_delay.as_millis() as u64,
                "Simulating processing delay"
            );
            tokio::time::sleep(self.config.simulated_delay).await;
        }

        let text = {
            let _step = info_span!("extract_text").entered();
            if let Some(info) = self.text_extractor.inspect(&request.document_path) {
                info!(
                    pages = info.pages,
                    size_bytes = info.size_bytes,
                    title = info.title.as_deref().unwrap_or(""),
                    "Document inspected"
                );
            }
            self.text_extractor.extract_text(&request.document_path)
        };
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyText);
        }
        debug!(chars = text.chars().count(), "Extracted document text");

        let candidates = self
            .name_extractor
            .extract_names(&text)
            .instrument(info_span!("extract_names"))
            .await;
        if candidates.is_empty() {
            return Err(PipelineError::NoOrganizations);
        }
        info!(candidates = ?candidates, "Identified candidate organizations");

        let resolution = self
            .resolve(&candidates)
            .instrument(info_span!("resolve_organizations", candidates = candidates.len()))
            .await;
        if resolution.names.is_empty() {
            return Err(PipelineError::NoneResolved);
        }
        Ok(resolution)
    }

    /// Looks up each candidate in order. Missing and failing organizations
    /// are skipped alike; they never abort the job.
    async fn resolve(&self, candidates: &[String]) -> Resolution {
        let mut resolution = Resolution::default();
        for name in candidates {
            match self.organizations.fetch_organization(name).await {
                Ok(Some(data)) => {
                    info!(
                        org = %name,
                        display_name = %data.display_name(),
                        members = data.members.len(),
                        "Resolved organization"
                    );
                    resolution.members.extend(data.tagged_members());
                    resolution.names.push(name.clone());
                }
                Ok(None) => warn!(org = %name, "Organization not found, skipping"),
                Err(e) => warn!(org = %name, error = %e, "Organization lookup failed, skipping"),
            }
        }
        resolution
    }

    fn fail(&self, request: &JobRequest, error: PipelineError) -> JobResult {
        let message = error.to_string();
        warn!(error = %message, "Job failed");
        if let Err(e) = self.store.mark_failed(&request.job_id, &message) {
            error!("Could not record failure for job {}: {}", request.job_id, e);
        }
        JobResult::failed(&request.job_id, message)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
