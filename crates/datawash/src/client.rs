//! REST client for the cleaning service.
//!
//! Covers the four HTTP operations the dashboard needs: uploading a CSV,
//! kicking off processing, pulling job status, and fetching the report.
//! Download links for the browser are built here too, but never fetched.

use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;

use crate::config::Endpoints;
use crate::error::ApiError;
use crate::event::JobEvent;

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP requests (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates an HTTP client with appropriate timeouts.
fn create_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
        .map_err(ApiError::ClientBuild)
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    job_id: String,
}

/// HTTP access to the cleaning service's REST surface.
#[derive(Debug, Clone)]
pub struct PipelineClient {
    client: Client,
    endpoints: Endpoints,
}

impl PipelineClient {
    pub fn new(endpoints: Endpoints) -> Result<Self, ApiError> {
        Ok(Self {
            client: create_http_client()?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Uploads a CSV as multipart form data and returns the job id the
    /// service assigned to it.
    pub async fn upload_file(&self, path: &Path) -> Result<String, ApiError> {
        let url = self.endpoints.upload_url();
        info!("Uploading {} to {}", path.display(), url);

        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::ReadUpload {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&mime)
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ApiError::UnexpectedStatus {
                url,
                status: response.status(),
            });
        }

        let body: UploadResponse =
            response
                .json()
                .await
                .map_err(|source| ApiError::ParseResponse { url, source })?;
        Ok(body.job_id)
    }

    /// Starts the cleaning pipeline for an uploaded job. The response body
    /// carries nothing the dashboard uses, so only the status is checked.
    pub async fn start_processing(&self, job_id: &str) -> Result<(), ApiError> {
        let url = self.endpoints.process_url(job_id);
        info!("Starting processing for job {}", job_id);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ApiError::UnexpectedStatus {
                url,
                status: response.status(),
            });
        }
        Ok(())
    }

    /// Pulls the current status of a job.
    pub async fn fetch_status(&self, job_id: &str) -> Result<JobEvent, ApiError> {
        let url = self.endpoints.status_url(job_id);
        debug!("Fetching status from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ApiError::UnexpectedStatus {
                url,
                status: response.status(),
            });
        }

        response
            .json()
            .await
            .map_err(|source| ApiError::ParseResponse { url, source })
    }

    /// Fetches the analysis report body for a finished job.
    pub async fn fetch_report(&self, job_id: &str) -> Result<String, ApiError> {
        let url = self.endpoints.report_download_url(job_id);
        info!("Fetching report for job {}", job_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ApiError::UnexpectedStatus {
                url,
                status: response.status(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| ApiError::ParseResponse { url, source })
    }

    /// Browser-facing link to the cleaned CSV.
    pub fn csv_download_url(&self, job_id: &str) -> String {
        self.endpoints.csv_download_url(job_id)
    }

    /// Browser-facing link to the analysis report.
    pub fn report_download_url(&self, job_id: &str) -> String {
        self.endpoints.report_download_url(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_defaults() {
        let client = PipelineClient::new(Endpoints::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_download_urls_use_api_base() {
        let client = PipelineClient::new(Endpoints::default()).unwrap();
        assert_eq!(
            client.csv_download_url("job-42"),
            "http://127.0.0.1:8000/api/v1/download/job-42/csv"
        );
        assert_eq!(
            client.report_download_url("job-42"),
            "http://127.0.0.1:8000/api/v1/download/job-42/report"
        );
    }

    #[test]
    fn test_upload_response_shape() {
        let body: UploadResponse = serde_json::from_str(r#"{"job_id": "job-42"}"#).unwrap();
        assert_eq!(body.job_id, "job-42");
    }
}
