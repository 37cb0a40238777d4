pub mod client;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod event;
pub mod logs;
pub mod pipeline;
pub mod sync;

pub use client::PipelineClient;
pub use config::Endpoints;
pub use dashboard::{DashboardController, DashboardOptions, DashboardPhase, Job, RenderState};
pub use demo::{DemoFeed, DEMO_JOB_ID};
pub use error::{ApiError, ConfigError, DashboardError, DatawashError, Result, SyncError};
pub use event::{JobEvent, JobStats};
pub use logs::{LogBuffer, LogEntry, LogSeverity};
pub use pipeline::{PipelineStage, StageId, StagePipeline, StageState};
pub use sync::{JobSyncChannel, StatusProbe, SyncMessage, DEFAULT_POLL_INTERVAL};
