//! Analysis run metrics.
//!
//! Collected on every run; cheap enough that there is no separate
//! "with metrics" entry point. The CLI prints them in debug mode.

use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time for [`Analyzer::analyze`](crate::Analyzer::analyze).
    pub total: Duration,
    /// Time spent building the raw forest.
    pub build: Duration,
    /// Solutions in the raw forest.
    pub built: usize,
    /// One entry per pipeline stage, in run order.
    pub stages: Vec<StageMetrics>,
}

/// Timing and solution counts for one stage.
#[derive(Debug, Clone)]
pub struct StageMetrics {
    pub name: &'static str,
    pub duration: Duration,
    /// Solutions in the whole forest before the stage.
    pub before: usize,
    pub after: usize,
}

impl StageMetrics {
    pub fn removed(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

impl RunMetrics {
    pub fn pipeline(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }
}
