//! Stage identities and per-stage display state.

use std::fmt;

use serde::Serialize;

/// The cleaning agents, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    SchemaValidator,
    Imputer,
    OutlierDetector,
    Transformer,
    Reporter,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [StageId; 5] = [
        StageId::SchemaValidator,
        StageId::Imputer,
        StageId::OutlierDetector,
        StageId::Transformer,
        StageId::Reporter,
    ];

    /// Key the service uses in `current_agent`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::SchemaValidator => "schema_validator",
            StageId::Imputer => "imputer",
            StageId::OutlierDetector => "outlier_detector",
            StageId::Transformer => "transformer",
            StageId::Reporter => "reporter",
        }
    }

    /// Human-readable name shown in the stage column and in logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            StageId::SchemaValidator => "Schema Validator",
            StageId::Imputer => "Missing Value Imputer",
            StageId::OutlierDetector => "Outlier Detector",
            StageId::Transformer => "Data Transformer",
            StageId::Reporter => "Report Generator",
        }
    }

    /// Zero-based position in the pipeline.
    pub fn order(&self) -> usize {
        match self {
            StageId::SchemaValidator => 0,
            StageId::Imputer => 1,
            StageId::OutlierDetector => 2,
            StageId::Transformer => 3,
            StageId::Reporter => 4,
        }
    }

    /// Resolves an agent key from the wire. Unknown keys return `None`;
    /// the caller decides whether that deserves a warning.
    pub fn from_agent(agent: &str) -> Option<Self> {
        match agent {
            "schema_validator" => Some(StageId::SchemaValidator),
            "imputer" => Some(StageId::Imputer),
            "outlier_detector" => Some(StageId::OutlierDetector),
            "transformer" => Some(StageId::Transformer),
            "reporter" => Some(StageId::Reporter),
            _ => None,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Display state of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Pending,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageState::Pending => "pending",
            StageState::Processing => "processing",
            StageState::Completed => "completed",
            StageState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// One row of the stage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub id: StageId,
    pub display_name: &'static str,
    pub order: usize,
    pub state: StageState,
}

impl PipelineStage {
    pub fn pending(id: StageId) -> Self {
        Self {
            id,
            display_name: id.display_name(),
            order: id.order(),
            state: StageState::Pending,
        }
    }
}
