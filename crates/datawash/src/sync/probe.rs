//! Pull-side status sources for the fallback poll loop.

use async_trait::async_trait;

use crate::client::PipelineClient;
use crate::demo::DemoFeed;
use crate::error::SyncError;
use crate::event::JobEvent;

/// Something the poll loop can ask for a job's current status.
///
/// The push transport needs no probe; this seam exists so the fallback
/// loop drives the HTTP endpoint and the demo script identically.
#[async_trait]
pub trait StatusProbe: Send {
    async fn poll(&mut self) -> Result<JobEvent, SyncError>;
}

/// Probe backed by `GET /status/{job_id}`.
pub struct HttpStatusProbe {
    client: PipelineClient,
    job_id: String,
}

impl HttpStatusProbe {
    pub fn new(client: PipelineClient, job_id: &str) -> Self {
        Self {
            client,
            job_id: job_id.to_string(),
        }
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    async fn poll(&mut self) -> Result<JobEvent, SyncError> {
        let event = self.client.fetch_status(&self.job_id).await?;
        Ok(event)
    }
}

/// Probe backed by the scripted demo run. Never fails.
pub struct DemoStatusProbe {
    feed: DemoFeed,
}

impl DemoStatusProbe {
    pub fn new() -> Self {
        Self {
            feed: DemoFeed::new(),
        }
    }
}

impl Default for DemoStatusProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusProbe for DemoStatusProbe {
    async fn poll(&mut self) -> Result<JobEvent, SyncError> {
        Ok(self.feed.next_event())
    }
}
