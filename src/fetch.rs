//! GitHub REST implementation of [`ContentFetcher`].
//!
//! Two endpoints are used, selected by the item:
//! - `GET /repos/{owner}/{repo}` for metadata-only items
//! - `GET /repos/{owner}/{repo}/contents/{path}` for files
//!
//! Each call makes one attempt. Non-200 answers become
//! [`FetchResult::NotFound`], everything that prevents reading a usable
//! answer becomes [`FetchResult::TransportError`].

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::HarvestConfig;
use crate::model::{FetchResult, HarvestItem, Payload, RepoStats};
use crate::traits::{ContentFetcher, HarvestError};

const USER_AGENT: &str = concat!("repo-harvester/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// API payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    subscribers_count: u64,
    stargazers_count: u64,
    forks_count: u64,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
    /// `"none"` for files above the 1 MB contents limit, whose `content` is empty
    encoding: Option<String>,
}

// ============================================================================
// Fetcher
// ============================================================================

#[derive(Debug, Clone)]
pub struct GithubFetcher {
    client: Client,
    api_base: String,
}

impl GithubFetcher {
    /// Builds a fetcher with the configured API base and request timeout.
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// URL addressed by `item`.
    pub fn url_for(&self, item: &HarvestItem) -> String {
        let repo = item.owner_repo.trim().trim_matches('/');
        match &item.path {
            Some(path) => format!(
                "{}/repos/{}/contents/{}",
                self.api_base,
                repo,
                path.trim().trim_start_matches('/')
            ),
            None => format!("{}/repos/{}", self.api_base, repo),
        }
    }
}

#[async_trait]
impl ContentFetcher for GithubFetcher {
    #[instrument(skip(self, credential), fields(repo = %item.owner_repo))]
    async fn fetch(&self, item: &HarvestItem, credential: &str) -> FetchResult {
        let url = self.url_for(item);
        debug!(%url, "GET request");

        let response = match self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Token {}", credential))
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::TransportError {
                    detail: e.to_string(),
                }
            }
        };

        let status = response.status();
        debug!(%status, "Response received");

        if status != StatusCode::OK {
            // The body is diagnostic only; an unreadable one is reported empty.
            let body = response.text().await.unwrap_or_default();
            return FetchResult::NotFound {
                status: status.as_u16(),
                body,
            };
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                return FetchResult::TransportError {
                    detail: e.to_string(),
                }
            }
        };

        let payload = if item.path.is_some() {
            decode_content(&body).map(Payload::Source)
        } else {
            decode_repository(&body).map(Payload::Repository)
        };

        match payload {
            Ok(payload) => FetchResult::Success(payload),
            Err(detail) => FetchResult::TransportError { detail },
        }
    }
}

/// Recovers file text from a contents response.
///
/// GitHub wraps the base64 text every 60 characters, so whitespace is
/// stripped before decoding.
fn decode_content(body: &[u8]) -> Result<String, String> {
    let response: ContentResponse =
        serde_json::from_slice(body).map_err(|e| format!("Invalid contents response: {}", e))?;

    match response.encoding.as_deref() {
        None | Some("base64") => {}
        Some(other) => {
            return Err(format!("Unsupported content encoding '{}'", other))
        }
    }

    let encoded: String = response
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let raw = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| format!("Invalid base64 content: {}", e))?;

    String::from_utf8(raw).map_err(|e| format!("Content is not UTF-8: {}", e))
}

fn decode_repository(body: &[u8]) -> Result<RepoStats, String> {
    let repo: RepoResponse = serde_json::from_slice(body)
        .map_err(|e| format!("Invalid repository response: {}", e))?;

    Ok(RepoStats {
        name: repo.name,
        watchers: repo.subscribers_count,
        stars: repo.stargazers_count,
        forks: repo.forks_count,
    })
}

// ============================================================================
// Tests
// ============================================================================
