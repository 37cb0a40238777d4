//! Top-level state machine for one upload-and-clean cycle.
//!
//! The controller owns everything a dashboard rendering needs: the phase,
//! the active job, the derived stage column, and the activity feed. It
//! drives the REST client for uploads and consumes one [`JobSyncChannel`]
//! per job for status updates.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::Serialize;

use crate::client::PipelineClient;
use crate::config::Endpoints;
use crate::demo::DEMO_JOB_ID;
use crate::error::{DashboardError, Result};
use crate::event::{JobEvent, JobStats};
use crate::logs::{LogBuffer, LogEntry, DEFAULT_LOG_CAPACITY};
use crate::pipeline::{PipelineStage, StageId, StagePipeline};
use crate::sync::{JobSyncChannel, SyncMessage, DEFAULT_POLL_INTERVAL};

/// Log line recorded when a job fails without a service-supplied message.
const GENERIC_FAILURE: &str = "Pipeline processing failed.";

/// Where the controller is in the upload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardPhase {
    Idle,
    Uploading,
    Processing,
    Results,
    Failed,
}

impl DashboardPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DashboardPhase::Results | DashboardPhase::Failed)
    }
}

impl fmt::Display for DashboardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DashboardPhase::Idle => "idle",
            DashboardPhase::Uploading => "uploading",
            DashboardPhase::Processing => "processing",
            DashboardPhase::Results => "results",
            DashboardPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Tunables for a controller instance.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// Fall back to the scripted demo feed when the upload fails. Off by
    /// default: a failed upload is then reported as an error instead.
    pub demo_mode: bool,
    /// Cadence of the pull fallback.
    pub poll_interval: Duration,
    /// Activity feed retention.
    pub log_capacity: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            demo_mode: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

/// The job currently tracked by the controller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// True when this job runs on the scripted demo feed.
    pub demo: bool,
    /// Last progress value received, passed through without clamping.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<JobStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    fn new(id: &str, file_name: &str, demo: bool) -> Self {
        Self {
            id: id.to_string(),
            file_name: Some(file_name.to_string()),
            demo,
            progress: 0,
            current_agent: None,
            stats: None,
            error: None,
        }
    }
}

/// Serializable snapshot of everything a presentation layer renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    pub phase: DashboardPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_agent: Option<String>,
    pub stages: Vec<PipelineStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<JobStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Newest first.
    pub logs: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_download_url: Option<String>,
}

/// State machine for one upload cycle: `idle` → `uploading` →
/// `processing` → `results` or `failed`, back to `idle` via [`reset`].
///
/// [`reset`]: DashboardController::reset
pub struct DashboardController {
    client: PipelineClient,
    options: DashboardOptions,
    phase: DashboardPhase,
    job: Option<Job>,
    stages: StagePipeline,
    logs: LogBuffer,
    channel: Option<JobSyncChannel>,
}

impl DashboardController {
    pub fn new(endpoints: Endpoints, options: DashboardOptions) -> Result<Self> {
        let client = PipelineClient::new(endpoints)?;
        let logs = LogBuffer::new(options.log_capacity);
        Ok(Self {
            client,
            options,
            phase: DashboardPhase::Idle,
            job: None,
            stages: StagePipeline::new(),
            logs,
            channel: None,
        })
    }

    /// Controller with endpoints from the environment and default options.
    pub fn from_env() -> Result<Self> {
        Self::new(Endpoints::from_env()?, DashboardOptions::default())
    }

    pub fn phase(&self) -> DashboardPhase {
        self.phase
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn stages(&self) -> &[PipelineStage] {
        self.stages.stages()
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Uploads a CSV and moves into `processing`.
    ///
    /// Only valid from `idle`. On upload failure the default policy is to
    /// log the error, drop back to `idle`, and return the failure; with
    /// demo mode enabled the controller instead starts the scripted feed
    /// under the reserved demo job id.
    pub async fn submit_file(&mut self, path: &Path) -> Result<()> {
        if self.phase != DashboardPhase::Idle {
            return Err(DashboardError::Busy {
                phase: self.phase.to_string(),
            }
            .into());
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();

        self.phase = DashboardPhase::Uploading;
        self.logs
            .push(LogEntry::info("System", &format!("Uploading file: {}", file_name)));

        match self.client.upload_file(path).await {
            Ok(job_id) => {
                self.logs.push(LogEntry::info(
                    "System",
                    "File uploaded successfully. Initializing pipeline...",
                ));
                self.begin_processing(&job_id, &file_name).await;
                Ok(())
            }
            Err(err) if self.options.demo_mode => {
                warn!("Upload failed, starting demo feed: {}", err);
                self.logs.push(LogEntry::error(
                    "System",
                    "Backend unavailable. Demo mode active.",
                ));
                self.begin_demo(&file_name);
                Ok(())
            }
            Err(err) => {
                warn!("Upload failed: {}", err);
                self.logs
                    .push(LogEntry::error("System", "Upload failed. Please try again."));
                self.phase = DashboardPhase::Idle;
                Err(DashboardError::UploadFailed(err).into())
            }
        }
    }

    async fn begin_processing(&mut self, job_id: &str, file_name: &str) {
        // Fire and forget: the status stream decides the outcome either way.
        if let Err(err) = self.client.start_processing(job_id).await {
            warn!("Pipeline start request failed: {}", err);
            self.logs.push(LogEntry::warning(
                "System",
                "Pipeline start request failed; watching job status anyway.",
            ));
        }

        self.job = Some(Job::new(job_id, file_name, false));
        self.stages.reset();
        self.phase = DashboardPhase::Processing;
        self.channel = Some(JobSyncChannel::connect(
            self.client.clone(),
            job_id,
            self.options.poll_interval,
        ));
    }

    fn begin_demo(&mut self, file_name: &str) {
        self.job = Some(Job::new(DEMO_JOB_ID, file_name, true));
        self.stages.reset();
        self.phase = DashboardPhase::Processing;
        self.channel = Some(JobSyncChannel::demo(self.options.poll_interval));
    }

    /// Consumes one message from the sync channel.
    ///
    /// Returns `Ok(true)` while the job is still running and `Ok(false)`
    /// once it reached a terminal phase (or the stream ended).
    pub async fn step(&mut self) -> Result<bool> {
        let channel = self.channel.as_mut().ok_or(DashboardError::NoActiveJob)?;
        match channel.next_message().await {
            Some(SyncMessage::Event(event)) => {
                self.apply_event(event);
                Ok(!self.phase.is_terminal())
            }
            Some(SyncMessage::Log(entry)) => {
                self.logs.push(entry);
                Ok(true)
            }
            None => {
                self.handle_stream_end();
                Ok(false)
            }
        }
    }

    /// Pumps the sync channel until the job reaches `results` or `failed`.
    pub async fn run_to_completion(&mut self) -> Result<DashboardPhase> {
        while self.step().await? {}
        Ok(self.phase)
    }

    /// Folds one status event into the job, the stage column, and the
    /// activity feed. Events after a terminal phase are ignored, so a
    /// duplicated terminal report cannot re-run completion effects.
    fn apply_event(&mut self, event: JobEvent) {
        if self.phase.is_terminal() || self.job.is_none() {
            return;
        }

        if let JobEvent::Processing {
            current_agent: Some(agent),
            ..
        } = &event
        {
            if let Some(stage) = StageId::from_agent(agent) {
                let previous = self
                    .job
                    .as_ref()
                    .and_then(|job| job.current_agent.as_deref());
                if previous != Some(agent.as_str()) {
                    self.logs.push(LogEntry::info(
                        stage.as_str(),
                        &format!("Starting {}", stage.display_name()),
                    ));
                }
            }
        }

        self.stages.apply(&event);

        if let Some(job) = self.job.as_mut() {
            if let Some(progress) = event.progress() {
                job.progress = progress;
            }
            match &event {
                JobEvent::Processing { current_agent, .. } => {
                    job.current_agent = current_agent.clone();
                }
                JobEvent::Failed {
                    current_agent: Some(agent),
                    ..
                } => {
                    job.current_agent = Some(agent.clone());
                }
                _ => {}
            }
        }

        match event {
            JobEvent::Completed { stats, .. } => self.complete(stats),
            JobEvent::Failed { error, .. } => self.fail(error),
            _ => {}
        }
    }

    fn complete(&mut self, stats: Option<JobStats>) {
        if let Some(job) = self.job.as_mut() {
            job.stats = Some(stats.unwrap_or_else(JobStats::placeholder));
        }
        self.phase = DashboardPhase::Results;
        self.logs
            .push(LogEntry::success("System", "Pipeline completed successfully."));
        self.close_channel();
    }

    fn fail(&mut self, error: Option<String>) {
        let message = error.unwrap_or_else(|| GENERIC_FAILURE.to_string());
        if let Some(job) = self.job.as_mut() {
            job.error = Some(message);
        }
        self.phase = DashboardPhase::Failed;
        self.logs.push(LogEntry::error("System", GENERIC_FAILURE));
        self.close_channel();
    }

    /// A stream that ends without a terminal event must not strand the
    /// controller in `processing`.
    fn handle_stream_end(&mut self) {
        self.close_channel();
        if self.phase == DashboardPhase::Processing {
            self.fail(Some("Status stream ended unexpectedly.".to_string()));
        }
    }

    fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.terminate();
        }
    }

    /// Stops the sync channel without touching the rest of the state.
    /// Used on teardown paths like a console interrupt.
    pub fn terminate(&mut self) {
        self.close_channel();
    }

    /// Returns to `idle` for a new upload. The activity feed is kept; the
    /// buffer is bounded, and the original flow carries history across
    /// retries as well.
    pub fn reset(&mut self) {
        self.close_channel();
        self.job = None;
        self.stages.reset();
        self.phase = DashboardPhase::Idle;
    }

    /// Fetches the report body for the tracked job.
    pub async fn fetch_report(&self) -> Result<String> {
        let job = self.job.as_ref().ok_or(DashboardError::NoActiveJob)?;
        Ok(self.client.fetch_report(&job.id).await?)
    }

    /// Snapshot for a presentation layer. Download links are only
    /// populated once a real (non-demo) job has results.
    pub fn render_state(&self) -> RenderState {
        let job = self.job.as_ref();
        let (csv_download_url, report_download_url) = match job {
            Some(j) if self.phase == DashboardPhase::Results && !j.demo => (
                Some(self.client.csv_download_url(&j.id)),
                Some(self.client.report_download_url(&j.id)),
            ),
            _ => (None, None),
        };

        RenderState {
            phase: self.phase,
            job_id: job.map(|j| j.id.clone()),
            file_name: job.and_then(|j| j.file_name.clone()),
            progress: job.map(|j| j.progress).unwrap_or(0),
            current_agent: job.and_then(|j| j.current_agent.clone()),
            stages: self.stages.stages().to_vec(),
            stats: job.and_then(|j| j.stats),
            error: job.and_then(|j| j.error.clone()),
            logs: self.logs.entries().cloned().collect(),
            csv_download_url,
            report_download_url,
        }
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        self.close_channel();
    }
}
