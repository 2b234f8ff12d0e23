use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use crate::sanitize::{truncate_for_log, MAX_LOGGED_BODY};

use super::types::{ApiMember, OrganizationData, OrganizationProfile};
use super::{GitHubError, OrganizationSource};

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "gitdigger";
const PER_PAGE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60 * 60);

/// REST v3 client for organization profiles and public members.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
    max_rate_limit_wait: Duration,
}

impl GitHubClient {
    /// Builds a client. A missing or empty token is a configuration fault.
    pub fn new(base_url: &str, token: Option<&SecretString>) -> Result<Self, GitHubError> {
        let token = token
            .map(|t| t.expose_secret().trim())
            .filter(|t| !t.is_empty())
            .ok_or(GitHubError::MissingToken)?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: SecretString::from(token.to_string()),
            max_rate_limit_wait: DEFAULT_MAX_RATE_LIMIT_WAIT,
        })
    }

    /// Caps how long a rate-limited request sleeps before its single retry.
    pub fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = wait;
        self
    }

    /// `GET /orgs/{org}`. A 404 means the organization does not exist.
    pub async fn get_organization(
        &self,
        org: &str,
    ) -> Result<Option<OrganizationProfile>, GitHubError> {
        validate_identifier(org)?;
        let url = format!("{}/orgs/{}", self.base_url, org);

        let response = self.send(&url, &[]).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(org, "Organization not found");
            return Ok(None);
        }
        let response = ensure_success(&url, response).await?;
        Ok(Some(response.json().await?))
    }

    /// All public members, following pages of 100 until a short page.
    pub async fn get_public_members(&self, org: &str) -> Result<Vec<ApiMember>, GitHubError> {
        self.collect_members(org, false).await
    }

    /// Walks the member pages. With `keep_partial`, a failing page ends the
    /// walk and the members gathered so far are returned.
    async fn collect_members(
        &self,
        org: &str,
        keep_partial: bool,
    ) -> Result<Vec<ApiMember>, GitHubError> {
        validate_identifier(org)?;
        let url = format!("{}/orgs/{}/public_members", self.base_url, org);

        let mut members = Vec::new();
        let mut page: u32 = 1;
        loop {
            let batch = match self.members_page(&url, page).await {
                Ok(batch) => batch,
                Err(e) if keep_partial => {
                    tracing::warn!(
                        org,
                        page,
                        collected = members.len(),
                        error = %e,
                        "Member page failed, keeping members fetched so far"
                    );
                    break;
                }
                Err(e) => return Err(e),
            };
            let last_page = batch.len() < PER_PAGE;
            members.extend(batch);
            if last_page {
                break;
            }
            page += 1;
        }

        tracing::debug!(org, pages = page, members = members.len(), "Fetched public members");
        Ok(members)
    }

    async fn members_page(&self, url: &str, page: u32) -> Result<Vec<ApiMember>, GitHubError> {
        let query = [("page", page.to_string()), ("per_page", PER_PAGE.to_string())];
        let response = ensure_success(url, self.send(url, &query).await?).await?;
        Ok(response.json().await?)
    }

    /// Sends a GET. A 403 rate-limit answer with a reset time in the future
    /// sleeps until that reset and retries once; without one it is `RateLimited`.
    async fn send(&self, url: &str, query: &[(&str, String)]) -> Result<Response, GitHubError> {
        let response = self.request(url, query).send().await?;
        if response.status() != StatusCode::FORBIDDEN {
            return Ok(response);
        }

        let reset = rate_limit_reset(&response);
        let body = response.text().await.unwrap_or_default();
        if !is_rate_limit_body(&body) {
            return Err(GitHubError::Status {
                status: StatusCode::FORBIDDEN.as_u16(),
                url: url.to_string(),
                body: truncate_for_log(&body, MAX_LOGGED_BODY),
            });
        }

        let Some(wait) = self.rate_limit_wait(reset) else {
            tracing::warn!(url, "GitHub rate limit exceeded with no pending reset");
            return Err(GitHubError::RateLimited);
        };
        tracing::warn!(
            url,
            wait_secs = wait.as_secs_f64(),
            "GitHub rate limit exceeded, waiting for reset"
        );
        tokio::time::sleep(wait).await;

        let retry = self.request(url, query).send().await?;
        if retry.status() == StatusCode::FORBIDDEN {
            let body = retry.text().await.unwrap_or_default();
            if is_rate_limit_body(&body) {
                return Err(GitHubError::RateLimited);
            }
            return Err(GitHubError::Status {
                status: StatusCode::FORBIDDEN.as_u16(),
                url: url.to_string(),
                body: truncate_for_log(&body, MAX_LOGGED_BODY),
            });
        }
        Ok(retry)
    }

    fn request(&self, url: &str, query: &[(&str, String)]) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .query(query)
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::ACCEPT, ACCEPT)
    }

    /// Time until `reset` (epoch seconds) plus one second, capped. `None`
    /// when there is no reset time or it has already passed.
    fn rate_limit_wait(&self, reset: Option<i64>) -> Option<Duration> {
        let now = chrono::Utc::now().timestamp();
        let until_reset = reset.filter(|r| *r > now)? - now;
        Some(Duration::from_secs(until_reset as u64 + 1).min(self.max_rate_limit_wait))
    }
}

#[async_trait]
impl OrganizationSource for GitHubClient {
    async fn fetch_organization(&self, name: &str) -> Result<Option<OrganizationData>, GitHubError> {
        let Some(profile) = self.get_organization(name).await? else {
            return Ok(None);
        };
        let members = self.collect_members(name, true).await?;

        Ok(Some(OrganizationData {
            identifier: name.to_string(),
            profile,
            members,
        }))
    }
}

fn validate_identifier(org: &str) -> Result<(), GitHubError> {
    let valid = !org.is_empty()
        && org
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !org.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(GitHubError::InvalidOrganization(org.to_string()))
    }
}

fn rate_limit_reset(response: &Response) -> Option<i64> {
    response
        .headers()
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn is_rate_limit_body(body: &str) -> bool {
    body.to_ascii_lowercase().contains("rate limit")
}

async fn ensure_success(url: &str, response: Response) -> Result<Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GitHubError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body: truncate_for_log(&body, MAX_LOGGED_BODY),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::get;
    use axum::{Json, Router};

    #[derive(Default)]
    struct FakeGitHub {
        org_calls: AtomicUsize,
        member_calls: AtomicUsize,
        /// Number of initial org requests answered with a rate-limit 403.
        rate_limited_org_calls: usize,
        /// Rate-limit answers carry no `x-ratelimit-reset` header.
        omit_reset: bool,
        member_total: usize,
        /// Member page answered with a 500.
        failing_member_page: Option<usize>,
    }

    async fn org_handler(
        State(fake): State<Arc<FakeGitHub>>,
        Path(org): Path<String>,
        headers: HeaderMap,
    ) -> AxumResponse {
        let call = fake.org_calls.fetch_add(1, Ordering::SeqCst);
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-token")
        {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        if call < fake.rate_limited_org_calls {
            let body = r#"{"message":"API rate limit exceeded for user"}"#;
            if fake.omit_reset {
                return (AxumStatus::FORBIDDEN, body).into_response();
            }
            let reset = (chrono::Utc::now().timestamp() + 5).to_string();
            return (AxumStatus::FORBIDDEN, [("x-ratelimit-reset", reset)], body).into_response();
        }
        match org.as_str() {
            "acme" => Json(serde_json::json!({
                "login": "acme",
                "name": "Acme Corp",
                "public_repos": 42,
                "location": "Desert",
            }))
            .into_response(),
            "private" => (AxumStatus::FORBIDDEN, r#"{"message":"Resource not accessible"}"#)
                .into_response(),
            _ => (AxumStatus::NOT_FOUND, r#"{"message":"Not Found"}"#).into_response(),
        }
    }

    async fn members_handler(
        State(fake): State<Arc<FakeGitHub>>,
        Path(_org): Path<String>,
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> AxumResponse {
        fake.member_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(
            headers.get("accept").and_then(|v| v.to_str().ok()),
            Some("application/vnd.github.v3+json")
        );
        let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        let per_page: usize = params
            .get("per_page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(30);
        if fake.failing_member_page == Some(page) {
            return (AxumStatus::INTERNAL_SERVER_ERROR, "boom").into_response();
        }
        let start = ((page - 1) * per_page).min(fake.member_total);
        let end = (start + per_page).min(fake.member_total);
        let members: Vec<_> = (start..end)
            .map(|i| {
                serde_json::json!({
                    "login": format!("user{}", i),
                    "avatar_url": format!("https://avatars.example/{}", i),
                    "html_url": format!("https://github.com/user{}", i),
                    "type": "User",
                })
            })
            .collect();
        Json(members).into_response()
    }

    async fn spawn_fake(fake: Arc<FakeGitHub>) -> String {
        let app = Router::new()
            .route("/orgs/:org", get(org_handler))
            .route("/orgs/:org/public_members", get(members_handler))
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str) -> GitHubClient {
        let token = SecretString::from("test-token".to_string());
        GitHubClient::new(base_url, Some(&token))
            .unwrap()
            .with_max_rate_limit_wait(Duration::from_millis(20))
    }

    #[test]
    fn test_missing_token_is_rejected() {
        assert!(matches!(
            GitHubClient::new("https://api.github.com", None),
            Err(GitHubError::MissingToken)
        ));
        let blank = SecretString::from("   ".to_string());
        assert!(matches!(
            GitHubClient::new("https://api.github.com", Some(&blank)),
            Err(GitHubError::MissingToken)
        ));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("acme").is_ok());
        assert!(validate_identifier("acme-labs_2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("../admin").is_err());
        assert!(validate_identifier("a b").is_err());
    }

    #[tokio::test]
    async fn test_fetch_organization_with_paginated_members() {
        let fake = Arc::new(FakeGitHub {
            member_total: 250,
            ..Default::default()
        });
        let base = spawn_fake(Arc::clone(&fake)).await;

        let data = client(&base)
            .fetch_organization("acme")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(data.identifier, "acme");
        assert_eq!(data.display_name(), "Acme Corp");
        assert_eq!(data.profile.public_repos, Some(42));
        assert_eq!(data.members.len(), 250);
        assert_eq!(data.members[0].login, "user0");
        assert_eq!(data.members[249].login, "user249");
        assert_eq!(fake.member_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_page_size_stops_on_empty_page() {
        let fake = Arc::new(FakeGitHub {
            member_total: 100,
            ..Default::default()
        });
        let base = spawn_fake(Arc::clone(&fake)).await;

        let members = client(&base).get_public_members("acme").await.unwrap();

        assert_eq!(members.len(), 100);
        assert_eq!(fake.member_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_organization_is_none() {
        let fake = Arc::new(FakeGitHub::default());
        let base = spawn_fake(Arc::clone(&fake)).await;

        let result = client(&base).fetch_organization("doesnotexist123").await.unwrap();

        assert!(result.is_none());
        assert_eq!(fake.member_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_once() {
        let fake = Arc::new(FakeGitHub {
            rate_limited_org_calls: 1,
            member_total: 3,
            ..Default::default()
        });
        let base = spawn_fake(Arc::clone(&fake)).await;

        let profile = client(&base).get_organization("acme").await.unwrap();

        assert!(profile.is_some());
        assert_eq!(fake.org_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_gives_up_after_one_retry() {
        let fake = Arc::new(FakeGitHub {
            rate_limited_org_calls: 5,
            ..Default::default()
        });
        let base = spawn_fake(Arc::clone(&fake)).await;

        let result = client(&base).get_organization("acme").await;

        assert!(matches!(result, Err(GitHubError::RateLimited)));
        assert_eq!(fake.org_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_without_reset_is_not_retried() {
        let fake = Arc::new(FakeGitHub {
            rate_limited_org_calls: 5,
            omit_reset: true,
            ..Default::default()
        });
        let base = spawn_fake(Arc::clone(&fake)).await;

        let result = client(&base).get_organization("acme").await;

        assert!(matches!(result, Err(GitHubError::RateLimited)));
        assert_eq!(fake.org_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_member_page_keeps_earlier_pages() {
        let fake = Arc::new(FakeGitHub {
            member_total: 250,
            failing_member_page: Some(2),
            ..Default::default()
        });
        let base = spawn_fake(Arc::clone(&fake)).await;
        let client = client(&base);

        let data = client.fetch_organization("acme").await.unwrap().unwrap();
        assert_eq!(data.members.len(), 100);
        assert_eq!(data.members[99].login, "user99");
        assert_eq!(fake.member_calls.load(Ordering::SeqCst), 2);

        let strict = client.get_public_members("acme").await;
        assert!(matches!(strict, Err(GitHubError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_plain_forbidden_is_status_error() {
        let fake = Arc::new(FakeGitHub::default());
        let base = spawn_fake(Arc::clone(&fake)).await;

        let result = client(&base).get_organization("private").await;

        match result {
            Err(GitHubError::Status { status, body, .. }) => {
                assert_eq!(status, 403);
                assert!(body.contains("Resource not accessible"));
            }
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(fake.org_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let result = client("http://127.0.0.1:1").get_organization("acme").await;
        assert!(matches!(result, Err(GitHubError::Http(_))));
    }

    #[test]
    fn test_rate_limit_wait_needs_future_reset() {
        let token = SecretString::from("t".to_string());
        let client = GitHubClient::new("http://localhost", Some(&token))
            .unwrap()
            .with_max_rate_limit_wait(Duration::from_secs(10));

        assert_eq!(client.rate_limit_wait(None), None);
        let now = chrono::Utc::now().timestamp();
        assert_eq!(client.rate_limit_wait(Some(now - 100)), None);
        assert_eq!(client.rate_limit_wait(Some(now)), None);
        let soon = client.rate_limit_wait(Some(now + 3)).unwrap();
        assert!(soon >= Duration::from_secs(3) && soon <= Duration::from_secs(4));
        let far = chrono::Utc::now().timestamp() + 3600;
        assert_eq!(client.rate_limit_wait(Some(far)), Some(Duration::from_secs(10)));
    }
}
