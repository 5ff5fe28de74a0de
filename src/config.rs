//! Explicit harvest configuration.
//!
//! [`HarvestConfig`] carries everything a harvest run needs, including the
//! credential, so the loop itself never consults process-wide state.

use std::path::PathBuf;
use std::time::Duration;

use crate::harvest::traits::Derivation;
use crate::traits::{CredentialProvider, EnvCredential};

/// Public GitHub REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Pause between consecutive requests.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// API token; `None` makes every run fail before the first request
    pub credential: Option<String>,

    /// Base URL of the REST API, without trailing slash
    pub api_base: String,

    /// Fixed delay applied before each request
    pub delay: Duration,

    /// Timeout for a single request
    pub request_timeout: Duration,

    /// What to derive from fetched source files
    pub derivation: Derivation,

    /// Directory receiving `<index>.<extension>` copies of fetched sources
    pub artifact_dir: Option<PathBuf>,

    /// Extension of the raw-content artifacts (e.g., "go")
    pub extension: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            credential: None,
            api_base: DEFAULT_API_BASE.to_string(),
            delay: DEFAULT_DELAY,
            request_timeout: DEFAULT_TIMEOUT,
            derivation: Derivation::LineCount,
            artifact_dir: None,
            extension: "go".to_string(),
        }
    }
}

impl HarvestConfig {
    /// Default configuration with the credential resolved from
    /// `GITHUB_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        Self::default().with_credential_from(&EnvCredential::default())
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_credential_from<P: CredentialProvider>(mut self, provider: &P) -> Self {
        self.credential = provider.get_credential();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivation = derivation;
        self
    }

    pub fn with_artifacts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }
}
