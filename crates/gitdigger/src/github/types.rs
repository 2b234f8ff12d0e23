use serde::{Deserialize, Serialize};

use crate::jobs::GitHubMember;

/// Organization profile as returned by `GET /orgs/{org}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_repos: Option<u64>,
    #[serde(default)]
    pub public_members: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Entry of `GET /orgs/{org}/public_members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMember {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default, rename = "type")]
    pub member_type: Option<String>,
}

/// Everything collected for one resolved organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationData {
    /// The identifier that was looked up.
    pub identifier: String,
    pub profile: OrganizationProfile,
    pub members: Vec<ApiMember>,
}

impl OrganizationData {
    /// Human-facing name: the profile name, falling back to the login.
    pub fn display_name(&self) -> &str {
        self.profile
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(self.profile.login.as_str())
    }

    /// Members tagged with the identifier they were resolved from.
    pub fn tagged_members(&self) -> Vec<GitHubMember> {
        self.members
            .iter()
            .map(|m| GitHubMember {
                login: m.login.clone(),
                avatar_url: m.avatar_url.clone(),
                html_url: m.html_url.clone(),
                member_type: m.member_type.clone(),
                organization: self.identifier.clone(),
            })
            .collect()
    }
}
