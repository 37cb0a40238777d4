use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatawashError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] DashboardError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidApiBaseUrl { url: String, reason: String },

    #[error("Invalid push base URL '{url}': {reason}")]
    InvalidPushBaseUrl { url: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Failed to read upload file '{path}': {source}")]
    ReadUpload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to parse response from {url}: {source}")]
    ParseResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Status request failed: {0}")]
    StatusRequest(#[from] ApiError),

    #[error("Status response is not a valid job event: {0}")]
    InvalidStatus(String),
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Cannot submit a file while the dashboard is {phase}")]
    Busy { phase: String },

    #[error("Upload failed: {0}")]
    UploadFailed(#[source] ApiError),

    #[error("No active job")]
    NoActiveJob,
}

pub type Result<T> = std::result::Result<T, DatawashError>;
