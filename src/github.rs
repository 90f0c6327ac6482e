//! GitHub issue-list API client.
//!
//! Defines the [`IssueSource`] trait (the upstream seam the scan engine
//! drives) and its production implementation [`GithubClient`]. Upstream
//! payloads are parsed into typed [`RemoteIssue`] records at this boundary,
//! failing closed on missing required fields rather than letting untyped
//! data reach the store. Records that are really pull requests (GitHub
//! serves them from the same endpoint) are flagged, not dropped; filtering
//! is the scan engine's decision.
//!
//! Authentication is optional: when the `GITHUB_TOKEN` environment variable
//! is set it is sent as a bearer token, raising the unauthenticated rate
//! limit. Nothing else changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::GithubConfig;
use crate::models::Issue;

/// Errors surfaced by an [`IssueSource`] fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream returned 404 for the repository.
    #[error("repository not found")]
    RepoNotFound,

    /// Any other non-success status.
    #[error("unexpected upstream status {status}: {body}")]
    Status { status: u16, body: String },

    /// Network-level or body-decoding failure.
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A record in an otherwise valid page is missing required fields.
    #[error("malformed issue record: {0}")]
    Malformed(String),
}

/// One parsed upstream record, before the engine's pull-request filter.
#[derive(Debug, Clone)]
pub struct RemoteIssue {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub body: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub is_pull_request: bool,
}

impl RemoteIssue {
    pub fn into_issue(self, repo: &str) -> Issue {
        Issue {
            repo: repo.to_string(),
            id: self.id,
            number: self.number,
            title: self.title,
            body: self.body,
            url: self.url,
            created_at: self.created_at,
        }
    }
}

/// A paginated source of open issues for a repository.
///
/// The production implementation is [`GithubClient`]; tests substitute
/// in-memory fakes. Page numbering starts at 1.
#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn fetch_page(
        &self,
        repo: &str,
        page: u32,
        per_page: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteIssue>, FetchError>;
}

/// Issue-list client for the GitHub REST API.
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("issue-lens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl IssueSource for GithubClient {
    async fn fetch_page(
        &self,
        repo: &str,
        page: u32,
        per_page: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteIssue>, FetchError> {
        let url = format!("{}/repos/{}/issues", self.api_base, repo);

        let mut req = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("state", "open"),
                ("sort", "created"),
                ("direction", "desc"),
            ])
            .query(&[("per_page", per_page.to_string()), ("page", page.to_string())]);

        if let Some(since) = since {
            req = req.query(&[("since", since.to_rfc3339())]);
        }
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let response = req.send().await?;
        let status = response.status();

        if status.as_u16() == 404 {
            return Err(FetchError::RepoNotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let records: Vec<serde_json::Value> = response.json().await?;
        records
            .iter()
            .enumerate()
            .map(|(index, value)| parse_record(index, value))
            .collect()
    }
}

/// Raw wire shape of one issue-list record. GitHub sends `body: null` for
/// empty bodies and includes a `pull_request` object only on PRs.
#[derive(Debug, Deserialize)]
struct RawRecord {
    id: i64,
    number: i64,
    title: String,
    body: Option<String>,
    html_url: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

/// Parse one record, failing closed when required fields are missing.
fn parse_record(index: usize, value: &serde_json::Value) -> Result<RemoteIssue, FetchError> {
    let raw: RawRecord = serde_json::from_value(value.clone())
        .map_err(|e| FetchError::Malformed(format!("record {}: {}", index, e)))?;

    Ok(RemoteIssue {
        id: raw.id,
        number: raw.number,
        title: raw.title,
        body: raw.body.unwrap_or_default(),
        url: raw.html_url,
        created_at: raw.created_at,
        is_pull_request: raw.pull_request.is_some(),
    })
}

/// Returns true for a canonical `owner/name` slug. Used by the CLI and
/// server to reject malformed requests before they reach the core.
pub fn valid_repo_slug(repo: &str) -> bool {
    let mut parts = repo.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) => {
            !owner.is_empty()
                && !name.is_empty()
                && repo
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
        }
        _ => false,
    }
}
