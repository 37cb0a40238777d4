//! Endpoint configuration for the remote cleaning service.
//!
//! Both base URLs come from the environment and fall back to the local
//! development address, matching the service's default bind.

use std::env;

use crate::error::ConfigError;

/// Environment variable holding the REST base URL.
pub const API_BASE_URL_ENV: &str = "DATAWASH_API_BASE_URL";

/// Environment variable holding the push-transport base URL.
pub const PUSH_BASE_URL_ENV: &str = "DATAWASH_PUSH_BASE_URL";

/// REST base used when the environment does not provide one.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Push base used when the environment does not provide one.
pub const DEFAULT_PUSH_BASE_URL: &str = "ws://127.0.0.1:8000/api/v1";

/// Resolved service addresses: one base for REST calls, one for the
/// WebSocket push endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base_url: String,
    push_base_url: String,
}

impl Endpoints {
    /// Builds endpoints from explicit base URLs.
    ///
    /// Trailing slashes are stripped so joined paths stay canonical.
    pub fn new(api_base_url: &str, push_base_url: &str) -> Result<Self, ConfigError> {
        let api_base_url = api_base_url.trim().trim_end_matches('/').to_string();
        let push_base_url = push_base_url.trim().trim_end_matches('/').to_string();

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidApiBaseUrl {
                url: api_base_url,
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }
        if !push_base_url.starts_with("ws://") && !push_base_url.starts_with("wss://") {
            return Err(ConfigError::InvalidPushBaseUrl {
                url: push_base_url,
                reason: "expected a ws:// or wss:// URL".to_string(),
            });
        }

        Ok(Self {
            api_base_url,
            push_base_url,
        })
    }

    /// Builds endpoints from `DATAWASH_API_BASE_URL` / `DATAWASH_PUSH_BASE_URL`,
    /// falling back to the loopback defaults for any unset (or blank) variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api = env_or_default(API_BASE_URL_ENV, DEFAULT_API_BASE_URL);
        let push = env_or_default(PUSH_BASE_URL_ENV, DEFAULT_PUSH_BASE_URL);
        Self::new(&api, &push)
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn push_base_url(&self) -> &str {
        &self.push_base_url
    }

    // ─── URL builders ───────────────────────────────────────────────────────

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.api_base_url)
    }

    pub fn process_url(&self, job_id: &str) -> String {
        format!("{}/process/{}", self.api_base_url, job_id)
    }

    pub fn status_url(&self, job_id: &str) -> String {
        format!("{}/status/{}", self.api_base_url, job_id)
    }

    /// Direct download link for the cleaned CSV. Not fetched by this crate;
    /// handed to whatever opens downloads.
    pub fn csv_download_url(&self, job_id: &str) -> String {
        format!("{}/download/{}/csv", self.api_base_url, job_id)
    }

    /// Direct download link for the analysis report.
    pub fn report_download_url(&self, job_id: &str) -> String {
        format!("{}/download/{}/report", self.api_base_url, job_id)
    }

    /// WebSocket URL the service pushes status frames on.
    pub fn push_url(&self, job_id: &str) -> String {
        format!("{}/ws/{}", self.push_base_url, job_id)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            push_base_url: DEFAULT_PUSH_BASE_URL.to_string(),
        }
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}
