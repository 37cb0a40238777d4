//! Derives per-stage states from the job status stream.

use log::warn;

use crate::event::JobEvent;
use crate::pipeline::stages::{PipelineStage, StageId, StageState};

/// The stage column: one entry per cleaning agent, kept in pipeline
/// order and updated from each accepted [`JobEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePipeline {
    stages: Vec<PipelineStage>,
}

impl StagePipeline {
    /// A fresh pipeline with every stage pending.
    pub fn new() -> Self {
        Self {
            stages: StageId::ALL.iter().map(|id| PipelineStage::pending(*id)).collect(),
        }
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn state_of(&self, id: StageId) -> StageState {
        self.stages[id.order()].state
    }

    pub fn reset(&mut self) {
        self.set_all(StageState::Pending);
    }

    /// Folds one event into the stage states.
    ///
    /// The rules mirror what the dashboard shows: a running agent implies
    /// everything before it finished and everything after it has not
    /// started; a failure freezes the stages behind the failing one.
    pub fn apply(&mut self, event: &JobEvent) {
        match event {
            JobEvent::Queued { .. } => self.set_all(StageState::Pending),
            JobEvent::Processing { current_agent, .. } => match current_agent.as_deref() {
                Some(agent) => match StageId::from_agent(agent) {
                    Some(active) => self.mark_processing(active),
                    None => {
                        warn!("Unknown pipeline agent '{}', no stage marked processing", agent);
                        self.clear_processing();
                    }
                },
                None => self.clear_processing(),
            },
            JobEvent::Completed { .. } => self.set_all(StageState::Completed),
            JobEvent::Failed { current_agent, .. } => match current_agent.as_deref() {
                Some(agent) => match StageId::from_agent(agent) {
                    Some(failed) => self.mark_failed(failed),
                    None => {
                        warn!("Unknown pipeline agent '{}' in failure, stage states unchanged", agent);
                    }
                },
                // Without a named agent the column keeps its last shape.
                None => {}
            },
        }
    }

    fn set_all(&mut self, state: StageState) {
        for stage in &mut self.stages {
            stage.state = state;
        }
    }

    fn mark_processing(&mut self, active: StageId) {
        let pivot = active.order();
        for stage in &mut self.stages {
            stage.state = match stage.order.cmp(&pivot) {
                std::cmp::Ordering::Less => StageState::Completed,
                std::cmp::Ordering::Equal => StageState::Processing,
                std::cmp::Ordering::Greater => StageState::Pending,
            };
        }
    }

    fn mark_failed(&mut self, failed: StageId) {
        let pivot = failed.order();
        for stage in &mut self.stages {
            if stage.order < pivot {
                stage.state = StageState::Completed;
            } else if stage.order == pivot {
                stage.state = StageState::Error;
            }
            // Later stages keep whatever state they had.
        }
    }

    fn clear_processing(&mut self) {
        for stage in &mut self.stages {
            if stage.state == StageState::Processing {
                stage.state = StageState::Pending;
            }
        }
    }
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_all_pending() {
        let pipeline = StagePipeline::new();
        assert_eq!(pipeline.stages().len(), 5);
        for stage in pipeline.stages() {
            assert_eq!(stage.state, StageState::Pending);
        }
    }

    #[test]
    fn test_processing_splits_around_active_stage() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::processing(45, "outlier_detector"));

        assert_eq!(pipeline.state_of(StageId::SchemaValidator), StageState::Completed);
        assert_eq!(pipeline.state_of(StageId::Imputer), StageState::Completed);
        assert_eq!(pipeline.state_of(StageId::OutlierDetector), StageState::Processing);
        assert_eq!(pipeline.state_of(StageId::Transformer), StageState::Pending);
        assert_eq!(pipeline.state_of(StageId::Reporter), StageState::Pending);
    }

    #[test]
    fn test_queued_resets_to_pending() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::processing(45, "transformer"));
        pipeline.apply(&JobEvent::queued());

        for stage in pipeline.stages() {
            assert_eq!(stage.state, StageState::Pending);
        }
    }

    #[test]
    fn test_unknown_agent_clears_highlight() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::processing(20, "imputer"));
        pipeline.apply(&JobEvent::processing(25, "deduplicator"));

        // The finished stage survives, but nothing is shown running.
        assert_eq!(pipeline.state_of(StageId::SchemaValidator), StageState::Completed);
        assert_eq!(pipeline.state_of(StageId::Imputer), StageState::Pending);
    }

    #[test]
    fn test_processing_without_agent_clears_highlight() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::processing(10, "schema_validator"));
        pipeline.apply(&JobEvent::Processing {
            progress: 12,
            current_agent: None,
        });

        assert_eq!(pipeline.state_of(StageId::SchemaValidator), StageState::Pending);
    }

    #[test]
    fn test_completed_marks_all() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::processing(80, "reporter"));
        pipeline.apply(&JobEvent::completed(None));

        for stage in pipeline.stages() {
            assert_eq!(stage.state, StageState::Completed);
        }
    }

    #[test]
    fn test_failed_marks_matching_stage_error() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::Failed {
            error: Some("type mismatch".to_string()),
            current_agent: Some("imputer".to_string()),
        });

        assert_eq!(pipeline.state_of(StageId::SchemaValidator), StageState::Completed);
        assert_eq!(pipeline.state_of(StageId::Imputer), StageState::Error);
        assert_eq!(pipeline.state_of(StageId::OutlierDetector), StageState::Pending);
    }

    #[test]
    fn test_failed_leaves_later_stages_untouched() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::processing(70, "transformer"));
        pipeline.apply(&JobEvent::Failed {
            error: Some("retry storm".to_string()),
            current_agent: Some("imputer".to_string()),
        });

        assert_eq!(pipeline.state_of(StageId::Imputer), StageState::Error);
        // These two were past the failing stage when the failure landed.
        assert_eq!(pipeline.state_of(StageId::OutlierDetector), StageState::Completed);
        assert_eq!(pipeline.state_of(StageId::Transformer), StageState::Processing);
    }

    #[test]
    fn test_failed_without_agent_preserves_state() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::processing(45, "outlier_detector"));
        let before = pipeline.clone();

        pipeline.apply(&JobEvent::failed("upstream crash"));
        assert_eq!(pipeline, before);
    }

    #[test]
    fn test_failed_with_unknown_agent_preserves_state() {
        let mut pipeline = StagePipeline::new();
        pipeline.apply(&JobEvent::processing(45, "outlier_detector"));
        let before = pipeline.clone();

        pipeline.apply(&JobEvent::Failed {
            error: Some("boom".to_string()),
            current_agent: Some("compressor".to_string()),
        });
        assert_eq!(pipeline, before);
    }
}
