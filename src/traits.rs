use crate::model::{FetchResult, HarvestItem};
use async_trait::async_trait;
use thiserror::Error;

/// Environment variable holding the API token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_ACCESS_TOKEN";

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Access token not found. Set the GITHUB_ACCESS_TOKEN environment variable")]
    MissingCredential,
    #[error("Malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Retrieves remote content for one item.
///
/// Implementations make exactly one attempt and classify the outcome;
/// they never return an error.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, item: &HarvestItem, credential: &str) -> FetchResult;
}

/// Resolves the bearer credential.
pub trait CredentialProvider {
    /// Returns `None` when no credential is configured. An empty value
    /// counts as not configured.
    fn get_credential(&self) -> Option<String>;
}

/// Reads the token from the process environment on every call.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }
}

impl CredentialProvider for EnvCredential {
    fn get_credential(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|v| !v.is_empty())
    }
}
