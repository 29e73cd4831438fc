//! Structural keys for the collapse and dedup stages.
//!
//! ## What counts as "the same solution"
//!
//! [`SolutionKey`] covers everything observable about a solution: content,
//! original, both ratings, the justifying rules and sandhi spellings, and the
//! full subtrees (recursively, as [`WordFormKey`]). Two solutions with equal
//! keys are indistinguishable to a caller, so one can go.
//!
//! [`CollapseKey`] is coarser: id, parameters, base, virtuality and the
//! surfaces of the two children.
//! Collapsible rules produce families of solutions that differ only below
//! that level.
//!
//! Ratings are `f64`; their bit patterns are hashed.

use crate::forest::{Solution, SolutionError, SolutionId, WordForm};
use crate::model::MorphBase;
use crate::parameters::Parameters;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SolutionKey {
    id: u32,
    parameters: Parameters,
    base: MorphBase,
    is_virtual: bool,
    error: SolutionError,
    original: Option<SolutionId>,
    collapse_rating: u64,
    rating: u64,
    rules: Vec<u32>,
    sandhi: Vec<String>,
    left: Option<WordFormKey>,
    right: Option<WordFormKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct WordFormKey {
    entry: String,
    solutions: Vec<SolutionKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CollapseKey {
    id: u32,
    parameters: Parameters,
    base: MorphBase,
    is_virtual: bool,
    left: Option<String>,
    right: Option<String>,
}

impl SolutionKey {
    pub(crate) fn from_solution(s: &Solution) -> Self {
        let c = &s.content;
        SolutionKey {
            id: c.id,
            parameters: c.parameters,
            base: c.base,
            is_virtual: c.is_virtual,
            error: c.error,
            original: s.original,
            collapse_rating: s.collapse_rating.to_bits(),
            rating: s.rating.to_bits(),
            rules: s.rule_ids(),
            sandhi: s.sandhi.iter().map(|m| m.sandhi_expression.clone()).collect(),
            left: s.left.as_deref().map(WordFormKey::from_word_form),
            right: s.right.as_deref().map(WordFormKey::from_word_form),
        }
    }
}

impl WordFormKey {
    pub(crate) fn from_word_form(wf: &WordForm) -> Self {
        WordFormKey { entry: wf.entry.clone(), solutions: wf.solutions.iter().map(SolutionKey::from_solution).collect() }
    }
}

impl CollapseKey {
    pub(crate) fn from_solution(s: &Solution) -> Self {
        let c = &s.content;
        CollapseKey {
            id: c.id,
            parameters: c.parameters,
            base: c.base,
            is_virtual: c.is_virtual,
            left: s.left.as_ref().map(|wf| wf.entry.clone()),
            right: s.right.as_ref().map(|wf| wf.entry.clone()),
        }
    }
}
