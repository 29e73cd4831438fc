//! Forest reduction pipeline.
//!
//! A raw forest from the [builder](crate::builder) holds every explanation the
//! corpus allows, including broken ones. The pipeline reduces it in nine
//! ordered stages, each a pure `Forest -> Forest` transformation:
//!
//! ```text
//! raw forest
//!   │  1 depth        tag solutions deeper than max_depth_level
//!   │  2 collapse     merge collapsible twins, scale collapse_rating by 1/n
//!   │  3 derivatives  drop derived solutions that add nothing to their original
//!   │  4 update       fill unknown parameter slots from valid combinations
//!   │  5 dedup        drop structurally identical alternatives
//!   │  6 unsuitable   prune error/incomplete branches (kept in Debug)
//!   │  7 sort         rank alternatives (Release), successes only (Debug)
//!   │  8 validate     re-check combinations: drop, or tag in Debug
//!   │  9 caches       clear every manager memo
//!   v
//! reduced forest
//! ```
//!
//! Stages never edit a node in place that another stage can observe: each one
//! consumes the forest and rebuilds it bottom-up with [`rebuild`], so children
//! are always processed before the word form that owns them. Sibling
//! solutions are rebuilt in parallel.
//!
//! ## Cancellation
//!
//! The token is checked between stages and at every node. A cancelled run
//! returns `Err(Cancelled)`; memo tables only ever hold completed answers.

#[path = "pipeline/keys.rs"]
mod keys;
#[path = "pipeline/metrics.rs"]
mod metrics;
#[path = "pipeline/stages.rs"]
mod stages;

pub use metrics::{RunMetrics, StageMetrics};
pub use stages::{
    ClearCaches, Collapse, DepthLimit, DropDerivatives, DropUnsuitable, Deduplicate, SortSolutions, UpdateParameters,
    Validate,
};

use crate::error::{Result, ensure_active};
use crate::forest::{Forest, Solution, WordForm};
use crate::lookup::Managers;
use crate::settings::ParsingType;
use rayon::prelude::*;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Input of one pipeline run.
#[derive(Debug, Clone)]
pub struct Request {
    pub forest: Forest,
    pub parsing_type: ParsingType,
    pub max_depth_level: usize,
}

/// What a stage may consult while transforming.
pub struct StageContext<'a> {
    pub parsing_type: ParsingType,
    pub max_depth_level: usize,
    pub managers: &'a Managers,
    pub cancel: &'a CancellationToken,
}

impl StageContext<'_> {
    pub fn is_debug(&self) -> bool {
        self.parsing_type == ParsingType::Debug
    }
}

/// One reduction step.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest>;
}

/// Reduced forest plus per-stage timings.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub forest: Forest,
    pub stages: Vec<StageMetrics>,
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("stages", &self.names()).finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// The nine stages in their required order.
    pub fn standard() -> Self {
        Pipeline::new(vec![
            Box::new(DepthLimit),
            Box::new(Collapse),
            Box::new(DropDerivatives),
            Box::new(UpdateParameters),
            Box::new(Deduplicate),
            Box::new(DropUnsuitable),
            Box::new(SortSolutions),
            Box::new(Validate),
            Box::new(ClearCaches),
        ])
    }

    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Pipeline { stages }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, request: Request, managers: &Managers, cancel: &CancellationToken) -> Result<PipelineRun> {
        let Request { mut forest, parsing_type, max_depth_level } = request;
        let cx = StageContext { parsing_type, max_depth_level, managers, cancel };
        let mut metrics = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            ensure_active(cancel)?;
            let before = forest.count();
            let started = Instant::now();
            forest = stage.transform(forest, &cx)?;
            let m = StageMetrics { name: stage.name(), duration: started.elapsed(), before, after: forest.count() };
            tracing::debug!(stage = m.name, before = m.before, after = m.after, elapsed = ?m.duration, "stage done");
            metrics.push(m);
        }

        Ok(PipelineRun { forest, stages: metrics })
    }
}

// --- Traversal ---------------------------------------------------------------

/// Rebuild `wf` bottom-up: every child word form is rebuilt first, then `f`
/// receives this word form's surface and its (already rebuilt) solutions.
pub(crate) fn rebuild<F>(wf: WordForm, cancel: &CancellationToken, f: &F) -> Result<WordForm>
where
    F: Fn(&str, Vec<Solution>) -> Result<Vec<Solution>> + Sync,
{
    let WordForm { entry, solutions } = wf;
    let solutions = solutions
        .into_par_iter()
        .map(|mut s| {
            ensure_active(cancel)?;
            s.left = s.left.map(|child| rebuild(*child, cancel, f).map(Box::new)).transpose()?;
            s.right = s.right.map(|child| rebuild(*child, cancel, f).map(Box::new)).transpose()?;
            Ok(s)
        })
        .collect::<Result<Vec<_>>>()?;
    let solutions = f(&entry, solutions)?;
    Ok(WordForm { entry, solutions })
}

/// [`rebuild`] with a per-solution map.
pub(crate) fn map_solutions<G>(wf: WordForm, cancel: &CancellationToken, g: &G) -> Result<WordForm>
where
    G: Fn(Solution) -> Result<Solution> + Sync,
{
    rebuild(wf, cancel, &|_: &str, solutions: Vec<Solution>| solutions.into_iter().map(g).collect())
}

/// [`rebuild`] with a per-solution keep/drop decision.
pub(crate) fn retain_solutions<P>(wf: WordForm, cancel: &CancellationToken, keep: &P) -> Result<WordForm>
where
    P: Fn(&Solution) -> Result<bool> + Sync,
{
    rebuild(wf, cancel, &|_: &str, solutions: Vec<Solution>| {
        let mut kept = Vec::with_capacity(solutions.len());
        for s in solutions {
            if keep(&s)? {
                kept.push(s);
            }
        }
        Ok(kept)
    })
}
