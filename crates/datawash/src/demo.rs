//! Scripted status feed used when no cleaning service is reachable.
//!
//! The feed walks the five stages in order, three ticks per stage, then
//! settles on a completed event with no stats so consumers exercise the
//! placeholder-summary path. Each feed owns its own tick counter, so two
//! concurrent demo runs never bleed into each other.

use crate::event::JobEvent;
use crate::pipeline::StageId;

/// Job identifier reported for demo runs. Never issued by the service.
pub const DEMO_JOB_ID: &str = "demo-job";

const TICKS_PER_STAGE: u32 = 3;

/// Generator for the scripted demo run.
#[derive(Debug)]
pub struct DemoFeed {
    tick: u32,
}

impl DemoFeed {
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    /// Advances the script by one tick and returns that tick's event.
    ///
    /// Once the script has run out it keeps returning `completed`, so a
    /// caller polling past the end sees a stable terminal state.
    pub fn next_event(&mut self) -> JobEvent {
        self.tick += 1;

        let stage_count = StageId::ALL.len() as u32;
        let total_ticks = stage_count * TICKS_PER_STAGE;
        let stage_idx = self.tick / TICKS_PER_STAGE;

        if stage_idx >= stage_count {
            return JobEvent::completed(None);
        }

        let stage = StageId::ALL[stage_idx as usize];
        let progress = (self.tick * 100 / total_ticks) as u8;
        JobEvent::processing(progress, stage.as_str())
    }
}

impl Default for DemoFeed {
    fn default() -> Self {
        Self::new()
    }
}
