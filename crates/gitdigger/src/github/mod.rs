//! GitHub organization lookups.

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::GitHubClient;
pub use types::{ApiMember, OrganizationData, OrganizationProfile};

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("GitHub access token is not configured (set GITHUB_ACCESS_TOKEN)")]
    MissingToken,

    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("GitHub rate limit exceeded")]
    RateLimited,

    #[error("Invalid organization identifier: '{0}'")]
    InvalidOrganization(String),
}

/// Source of organization metadata and membership.
///
/// `Ok(None)` means the organization does not exist. Callers in the
/// pipeline treat `None` and `Err` alike: the organization is skipped.
#[async_trait]
pub trait OrganizationSource: Send + Sync {
    async fn fetch_organization(&self, name: &str)
        -> Result<Option<OrganizationData>, GitHubError>;
}
