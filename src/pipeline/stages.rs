//! The nine reduction stages.

use super::keys::{CollapseKey, SolutionKey};
use super::{Stage, StageContext, map_solutions, rebuild, retain_solutions};
use crate::error::{MorphError, Result};
use crate::forest::{Forest, Solution, SolutionError};
use crate::settings::ParsingType;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

// --- 1. Depth ----------------------------------------------------------------

/// Tags every solution deeper than `max_depth_level`, replacing any earlier
/// error. They stay in the tree so Debug output can show them; stage 6 drops
/// them otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthLimit;

impl Stage for DepthLimit {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        let max = cx.max_depth_level;
        let Forest { root, originals } = forest;
        let root = map_solutions(root, cx.cancel, &|s: Solution| {
            Ok(if s.height() > max { s.with_error(SolutionError::DepthIsExceeded) } else { s })
        })?;
        Ok(Forest { root, originals })
    }
}

// --- 2. Collapse -------------------------------------------------------------

/// Collapsible solutions with the same content and the same child surfaces
/// are kept once; the survivor's `collapse_rating` is scaled by `1/n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collapse;

impl Stage for Collapse {
    fn name(&self) -> &'static str {
        "collapse"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        let Forest { root, originals } = forest;
        let root = rebuild(root, cx.cancel, &|_: &str, solutions: Vec<Solution>| Ok(collapse(solutions)))?;
        Ok(Forest { root, originals })
    }
}

fn collapse(solutions: Vec<Solution>) -> Vec<Solution> {
    let mut out: Vec<(Solution, usize)> = Vec::with_capacity(solutions.len());
    let mut groups: HashMap<CollapseKey, usize> = HashMap::new();

    for s in solutions {
        if !s.is_collapsible() {
            out.push((s, 1));
            continue;
        }
        let key = CollapseKey::from_solution(&s);
        match groups.get(&key) {
            Some(&at) => out[at].1 += 1,
            None => {
                groups.insert(key, out.len());
                out.push((s, 1));
            }
        }
    }

    out.into_iter()
        .map(|(mut s, n)| {
            if n > 1 {
                s.collapse_rating *= 1.0 / n as f64;
            }
            s
        })
        .collect()
}

// --- 3. Derivatives ----------------------------------------------------------

/// Drops derived solutions that do not strictly refine the dictionary
/// solution they were linked to.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropDerivatives;

impl Stage for DropDerivatives {
    fn name(&self) -> &'static str {
        "derivatives"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        let Forest { root, originals } = forest;
        let root = retain_solutions(root, cx.cancel, &|s: &Solution| {
            let Some(id) = s.original else {
                return Ok(true);
            };
            let original = originals
                .get(id.0 as usize)
                .ok_or_else(|| MorphError::Defect(format!("dangling original {}", id.0)))?;
            Ok(s.content.parameters.strictly_refines(&original.content.parameters))
        })?;
        Ok(Forest { root, originals })
    }
}

// --- 4. Update ---------------------------------------------------------------

/// Fills the unknown slots of each successful solution from the collective of
/// its valid combinations. Children are updated before their parents.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateParameters;

impl Stage for UpdateParameters {
    fn name(&self) -> &'static str {
        "update"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        let validator = &cx.managers.combinations;
        let Forest { root, originals } = forest;
        let root = map_solutions(root, cx.cancel, &|mut s: Solution| {
            if !s.is_success() {
                return Ok(s);
            }
            let (valid, collective) = validator.check_and_cache_collective(&s.content.parameters, cx.cancel)?;
            if valid {
                s.content.parameters = s.content.parameters.fill_unknown_from(&collective);
            }
            Ok(s)
        })?;
        Ok(Forest { root, originals })
    }
}

// --- 5. Dedup ----------------------------------------------------------------

/// Within each word form, keeps the first of structurally identical
/// solutions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicate;

impl Stage for Deduplicate {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        let Forest { root, originals } = forest;
        let root = rebuild(root, cx.cancel, &|_: &str, solutions: Vec<Solution>| {
            let mut seen = HashSet::with_capacity(solutions.len());
            Ok(solutions.into_iter().filter(|s| seen.insert(SolutionKey::from_solution(s))).collect())
        })?;
        Ok(Forest { root, originals })
    }
}

// --- 6. Unsuitable -----------------------------------------------------------

/// Outside Debug, keeps only successful complete solutions. A child word form
/// left without alternatives makes its parent incomplete too.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropUnsuitable;

impl Stage for DropUnsuitable {
    fn name(&self) -> &'static str {
        "unsuitable"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        if cx.is_debug() {
            return Ok(forest);
        }
        let Forest { root, originals } = forest;
        let root = retain_solutions(root, cx.cancel, &|s: &Solution| Ok(is_suitable(s)))?;
        Ok(Forest { root, originals })
    }
}

fn is_suitable(s: &Solution) -> bool {
    s.is_success() && s.is_complete() && !has_empty_child(s)
}

fn has_empty_child(s: &Solution) -> bool {
    [&s.left, &s.right].into_iter().flatten().any(|wf| wf.solutions.is_empty())
}

// --- 7. Sort -----------------------------------------------------------------

/// Release: every word form by rating (descending), dictionary solutions
/// first on ties. Debug: same order, applied to successful solutions within
/// the positions they already occupy. Import: untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortSolutions;

impl Stage for SortSolutions {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        let parsing_type = cx.parsing_type;
        if parsing_type == ParsingType::Import {
            return Ok(forest);
        }
        let Forest { root, originals } = forest;
        let root = rebuild(root, cx.cancel, &|_: &str, mut solutions: Vec<Solution>| {
            match parsing_type {
                ParsingType::Debug => sort_successes_in_place(&mut solutions),
                _ => solutions.sort_by(rank),
            }
            Ok(solutions)
        })?;
        Ok(Forest { root, originals })
    }
}

fn rank(a: &Solution, b: &Solution) -> Ordering {
    b.rating.total_cmp(&a.rating).then_with(|| b.is_dictionary().cmp(&a.is_dictionary()))
}

fn sort_successes_in_place(solutions: &mut [Solution]) {
    let slots: Vec<usize> = solutions.iter().enumerate().filter(|(_, s)| s.is_success()).map(|(i, _)| i).collect();
    let mut ranked: Vec<Solution> = slots.iter().map(|&i| solutions[i].clone()).collect();
    ranked.sort_by(rank);
    for (slot, s) in slots.into_iter().zip(ranked) {
        solutions[slot] = s;
    }
}

// --- 8. Validate -------------------------------------------------------------

/// Re-checks every successful complete solution against the combination
/// corpus: Debug tags failures, other modes drop them. Outside Debug a
/// solution whose child word form lost all its solutions goes too.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validate;

impl Stage for Validate {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        let validator = &cx.managers.combinations;
        let debug = cx.is_debug();
        let Forest { root, originals } = forest;
        let root = rebuild(root, cx.cancel, &|_: &str, solutions: Vec<Solution>| {
            let mut kept = Vec::with_capacity(solutions.len());
            for s in solutions {
                if !debug && has_empty_child(&s) {
                    continue;
                }
                if !(s.is_success() && s.is_complete()) || validator.check_and_cache(&s.content.parameters, cx.cancel)? {
                    kept.push(s);
                } else if debug {
                    kept.push(s.with_error(SolutionError::NoMorphCombinationMatches));
                }
            }
            Ok(kept)
        })?;
        Ok(Forest { root, originals })
    }
}

// --- 9. Caches ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct ClearCaches;

impl Stage for ClearCaches {
    fn name(&self) -> &'static str {
        "caches"
    }

    fn transform(&self, forest: Forest, cx: &StageContext<'_>) -> Result<Forest> {
        let cached = cx.managers.cached();
        cx.managers.clear();
        tracing::trace!(cached, "caches cleared");
        Ok(forest)
    }
}
