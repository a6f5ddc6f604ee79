//! Buildkite REST API client
//!
//! Lists and creates pipeline builds through the Buildkite v2 REST API.
//! The client is an ordinary value: construct it once and inject it where a
//! [`revhunt_core::BuildLedger`] is needed.

use std::time::Duration;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BuildkiteError;
use crate::Result;
use revhunt_core::{BuildQuery, BuildRecord, BuildState, NewBuild, Revision};

/// Default Buildkite REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.buildkite.com/v2";

/// Largest page size the builds endpoint honours.
pub const MAX_PER_PAGE: u32 = 100;

/// Default page size for build listings.
pub const DEFAULT_PER_PAGE: u32 = MAX_PER_PAGE;

/// Buildkite client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildkiteConfig {
    /// REST API base URL
    pub api_url: String,
    /// API access token
    pub token: Option<String>,
    /// Builds requested per page when listing
    pub per_page: u32,
    /// Per-request timeout in seconds (0 = no timeout)
    pub timeout_secs: u64,
}

impl Default for BuildkiteConfig {
    fn default() -> Self {
        BuildkiteConfig {
            api_url: std::env::var("BUILDKITE_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            token: std::env::var("BUILDKITE_API_TOKEN").ok(),
            per_page: std::env::var("BUILDKITE_PER_PAGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PER_PAGE),
            timeout_secs: 60,
        }
    }
}

impl BuildkiteConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific API endpoint
    pub fn new(api_url: &str) -> Self {
        BuildkiteConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: None,
            per_page: DEFAULT_PER_PAGE,
            timeout_secs: 60,
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Set listing page size
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Set per-request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Build as returned by the REST API (only the fields revhunt reads).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiBuild {
    pub number: u64,
    pub state: String,
    pub commit: String,
}

impl From<ApiBuild> for BuildRecord {
    fn from(build: ApiBuild) -> Self {
        BuildRecord {
            number: build.number,
            state: BuildState::from(build.state),
            commit: Revision::new(build.commit),
        }
    }
}

/// Body of a create-build request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateBuildBody<'a> {
    pub commit: &'a str,
    pub branch: &'a str,
    pub message: String,
}

/// Buildkite client for build listing and creation
pub struct BuildkiteClient {
    config: BuildkiteConfig,
    http_client: reqwest::Client,
}

impl BuildkiteClient {
    /// Create a new Buildkite client
    pub fn new(config: BuildkiteConfig) -> Result<Self> {
        if config.per_page == 0 || config.per_page > MAX_PER_PAGE {
            return Err(BuildkiteError::Config(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}, got {}",
                config.per_page
            )));
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("revhunt-buildkite-ledger/", env!("CARGO_PKG_VERSION")));
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let http_client = builder.build()?;

        Ok(BuildkiteClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(BuildkiteConfig::from_env())
    }

    pub fn config(&self) -> &BuildkiteConfig {
        &self.config
    }

    fn builds_url(&self, organization: &str, pipeline: &str) -> String {
        format!(
            "{}/organizations/{}/pipelines/{}/builds",
            self.config.api_url, organization, pipeline
        )
    }

    fn token(&self) -> Result<&str> {
        self.config
            .token
            .as_deref()
            .ok_or(BuildkiteError::MissingToken)
    }

    /// Fetch every page of builds matching the query
    pub async fn list_all_for_pipeline(&self, query: &BuildQuery) -> Result<Vec<BuildRecord>> {
        let token = self.token()?;
        let url = self.builds_url(&query.organization, &query.pipeline);
        let created_from = query
            .created_from
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let per_page = self.config.per_page.to_string();

        let mut builds = Vec::new();
        let mut page: u32 = 1;
        loop {
            let page_param = page.to_string();
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(token)
                .query(&[
                    ("branch", query.branch.as_str()),
                    ("created_from", created_from.as_str()),
                    ("per_page", per_page.as_str()),
                    ("page", page_param.as_str()),
                ])
                .send()
                .await?;
            let next = has_next_page(&response);
            let body = success_body(response).await?;
            let batch: Vec<ApiBuild> = serde_json::from_str(&body)?;
            debug!(page, count = batch.len(), ?next, "fetched build page");

            // Without a Link header, a short page is the last one.
            let last_page = batch.is_empty()
                || !next.unwrap_or(batch.len() >= self.config.per_page as usize);
            builds.extend(batch.into_iter().map(BuildRecord::from));
            if last_page {
                break;
            }
            page += 1;
        }

        info!(
            organization = %query.organization,
            pipeline = %query.pipeline,
            count = builds.len(),
            "listed builds"
        );
        Ok(builds)
    }

    /// Create a build and return its number
    pub async fn create_build(&self, request: &NewBuild) -> Result<u64> {
        let token = self.token()?;
        let url = self.builds_url(&request.organization, &request.pipeline);
        let body = CreateBuildBody {
            commit: request.commit.as_str(),
            branch: &request.branch,
            message: format!("Gap filling build for {}", request.commit.short()),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let body = success_body(response).await?;
        let build: ApiBuild = serde_json::from_str(&body)?;

        info!(
            commit = %request.commit,
            number = build.number,
            "created build"
        );
        Ok(build.number)
    }
}

/// Whether the `Link` header advertises a `rel="next"` page; `None` without a header.
fn has_next_page(response: &reqwest::Response) -> Option<bool> {
    let link = response.headers().get(reqwest::header::LINK)?.to_str().ok()?;
    Some(link_has_next(link))
}

fn link_has_next(link: &str) -> bool {
    link.split(',').any(|entry| {
        entry.split(';').skip(1).any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        })
    })
}

/// Return the body of a 2xx response, or the status and body as an error.
async fn success_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(BuildkiteError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for BuildkiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildkiteClient")
            .field("api_url", &self.config.api_url)
            .field("per_page", &self.config.per_page)
            .finish_non_exhaustive()
    }
}
