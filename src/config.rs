//! Configuration loaded from `firecrawl.toml`.
//!
//! [`AppConfig`] holds every tunable. Fields missing from the file fall back
//! to defaults. `FIRECRAWL_API_KEY` and `FIRECRAWL_API_URL` take precedence
//! over the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::firecrawl::FirecrawlClient;
use crate::firecrawl::client::API_URL;
use crate::waiter::JobWaiter;

pub const CONFIG_FILE: &str = "firecrawl.toml";

const API_KEY_VAR: &str = "FIRECRAWL_API_KEY";
const API_URL_VAR: &str = "FIRECRAWL_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Firecrawl API key (`fc-...`).
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the API; point it at a self-hosted instance if needed.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Seconds between status checks while waiting on a job.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds after which a wait gives up.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    API_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_max_wait_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_api_url(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Loads `firecrawl.toml` from the working directory, or defaults if absent.
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Loads the given file (defaults if it does not exist), then applies
    /// environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_overrides(
            std::env::var(API_KEY_VAR).ok(),
            std::env::var(API_URL_VAR).ok(),
        );
        Ok(config)
    }

    fn apply_overrides(&mut self, api_key: Option<String>, api_url: Option<String>) {
        if let Some(key) = api_key
            && !key.is_empty()
        {
            self.api_key = key;
        }
        if let Some(url) = api_url
            && !url.is_empty()
        {
            self.api_url = url;
        }
    }

    pub fn require_api_key(&self) -> Result<&str, AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::MissingApiKey);
        }
        Ok(&self.api_key)
    }

    /// Builds the API client described by this configuration.
    pub fn client(&self) -> Result<FirecrawlClient, AppError> {
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        let client = FirecrawlClient::with_base_url(
            self.require_api_key()?.to_string(),
            self.api_url.clone(),
            Duration::from_secs(self.request_timeout_secs),
        )?;
        Ok(client)
    }

    /// Builds a waiter from the configured intervals.
    pub fn waiter(&self) -> Result<JobWaiter, AppError> {
        Ok(JobWaiter::new(
            Duration::from_secs(self.poll_interval_secs),
            Duration::from_secs(self.max_wait_secs),
        )?)
    }

    /// Key safe to print: the first few characters only.
    pub fn masked_api_key(&self) -> String {
        let prefix: String = self.api_key.chars().take(6).collect();
        format!("{prefix}...")
    }
}
