//! The fixed five-stage cleaning pipeline and its derived view state.
//!
//! The service never sends per-stage states; it only names the agent
//! currently running. Everything the stage column shows is derived here
//! from that single field and the job status.

pub mod stages;
pub mod tracker;

pub use stages::{PipelineStage, StageId, StageState};
pub use tracker::StagePipeline;
