//! The solution forest.
//!
//! A [`WordForm`] is a surface string together with its alternative analyses;
//! each [`Solution`] may own a left and a right child `WordForm`, so the whole
//! structure is a tree of alternating layers:
//!
//! ```text
//! WordForm "buddhena"
//! ├─ Solution #1  (dictionary, base=None)
//! └─ Solution #2  (rule "noun-ending", base=Both)
//!    ├─ left:  WordForm "buddha"  ─┬─ Solution (dictionary)
//!    │                             └─ ...
//!    └─ right: WordForm "ena"     ─── Solution (dictionary)
//! ```
//!
//! Children are owned exclusively. The only cross-link is
//! [`Solution::original`], an index into [`Forest::originals`], the arena of
//! dictionary-sourced solutions a derived solution was checked against. The
//! arena is never part of the tree itself, so following `original` can not
//! loop, and cloning a tree copies indices instead of walking shared nodes.

use crate::model::{MorphBase, MorphRule, SandhiMatch};
use crate::parameters::Parameters;
use std::sync::Arc;

/// Why a solution is defective. `Success` marks a usable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SolutionError {
    #[default]
    Success,
    NoLeftMatches,
    NoRightMatches,
    NoRuleMatches,
    NoSandhiMatches,
    NoMorphCombinationMatches,
    NotFoundLeftByParameters,
    NotFoundRightByParameters,
    DepthIsExceeded,
}

impl SolutionError {
    pub fn is_success(self) -> bool {
        self == SolutionError::Success
    }
}

/// Index into [`Forest::originals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolutionId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionContent {
    /// `MorphEntry::id` for dictionary-sourced solutions, else `0`.
    pub id: u32,
    pub parameters: Parameters,
    pub base: MorphBase,
    pub is_virtual: bool,
    pub error: SolutionError,
}

impl SolutionContent {
    pub fn new(id: u32, parameters: Parameters, base: MorphBase, is_virtual: bool) -> Self {
        SolutionContent { id, parameters, base, is_virtual, error: SolutionError::Success }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub content: SolutionContent,
    pub left: Option<Box<WordForm>>,
    pub right: Option<Box<WordForm>>,
    pub original: Option<SolutionId>,
    /// Rules that justified the construction.
    pub rules: Vec<Arc<MorphRule>>,
    /// Sandhi matches that justify the surface spelling.
    pub sandhi: Vec<SandhiMatch>,
    pub collapse_rating: f64,
    /// In `[0, 2]`; `-1` while unrated.
    pub rating: f64,
}

impl Solution {
    pub const UNRATED: f64 = -1.0;

    pub fn new(content: SolutionContent) -> Self {
        Solution {
            content,
            left: None,
            right: None,
            original: None,
            rules: Vec::new(),
            sandhi: Vec::new(),
            collapse_rating: 1.0,
            rating: Self::UNRATED,
        }
    }

    /// A defective solution recorded for diagnostics.
    pub fn failed(error: SolutionError, rule: Arc<MorphRule>) -> Self {
        let mut content = SolutionContent::new(0, rule.parameters, rule.base, true);
        content.error = error;
        Solution { rules: vec![rule], ..Solution::new(content) }
    }

    pub fn with_error(mut self, error: SolutionError) -> Self {
        self.content.error = error;
        self
    }

    pub fn is_success(&self) -> bool {
        self.content.error.is_success()
    }

    pub fn is_dictionary(&self) -> bool {
        self.content.id > 0
    }

    /// Completeness per `base`: an `Unknown` base is never complete.
    pub fn is_complete(&self) -> bool {
        match self.content.base {
            MorphBase::Unknown => false,
            MorphBase::None => true,
            MorphBase::Left => self.left.is_some(),
            MorphBase::Right | MorphBase::Both => self.left.is_some() && self.right.is_some(),
        }
    }

    /// Maximum recursive depth below this solution; `0` for a leaf.
    pub fn height(&self) -> usize {
        let child = |wf: &Option<Box<WordForm>>| wf.as_deref().map_or(0, WordForm::height);
        if self.left.is_none() && self.right.is_none() { 0 } else { 1 + child(&self.left).max(child(&self.right)) }
    }

    pub fn is_collapsible(&self) -> bool {
        self.rules.iter().any(|r| r.is_collapsed)
    }

    pub fn rule_ids(&self) -> Vec<u32> {
        self.rules.iter().map(|r| r.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordForm {
    pub entry: String,
    pub solutions: Vec<Solution>,
}

impl WordForm {
    pub fn new(entry: impl Into<String>) -> Self {
        WordForm { entry: entry.into(), solutions: Vec::new() }
    }

    pub fn with_solutions(entry: impl Into<String>, solutions: Vec<Solution>) -> Self {
        WordForm { entry: entry.into(), solutions }
    }

    /// Height of the deepest alternative.
    pub fn height(&self) -> usize {
        self.solutions.iter().map(Solution::height).max().unwrap_or(0)
    }

    /// Number of solutions in the whole subtree.
    pub fn count(&self) -> usize {
        self.solutions
            .iter()
            .map(|s| {
                1 + s.left.as_deref().map_or(0, WordForm::count) + s.right.as_deref().map_or(0, WordForm::count)
            })
            .sum()
    }

    /// Highest rating among the alternatives, if any is rated.
    pub fn best_rating(&self) -> Option<f64> {
        self.solutions.iter().map(|s| s.rating).filter(|r| *r >= 0.0).reduce(f64::max)
    }
}

/// A word's full analysis: the tree plus the arena of dictionary-sourced
/// solutions referenced by [`Solution::original`].
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    pub root: WordForm,
    pub originals: Vec<Solution>,
}

impl Forest {
    pub fn new(root: WordForm) -> Self {
        Forest { root, originals: Vec::new() }
    }

    pub fn original(&self, id: SolutionId) -> Option<&Solution> {
        self.originals.get(id.0 as usize)
    }

    pub fn push_original(&mut self, solution: Solution) -> SolutionId {
        self.originals.push(solution);
        SolutionId((self.originals.len() - 1) as u32)
    }

    pub fn count(&self) -> usize {
        self.root.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u32, base: MorphBase) -> Solution {
        Solution::new(SolutionContent::new(id, Parameters::EMPTY, base, false))
    }

    #[test]
    fn completeness_follows_base() {
        assert!(leaf(1, MorphBase::None).is_complete());
        assert!(!leaf(1, MorphBase::Unknown).is_complete());
        assert!(!leaf(1, MorphBase::Left).is_complete());

        let mut both = leaf(0, MorphBase::Both);
        both.left = Some(Box::new(WordForm::with_solutions("a", vec![leaf(2, MorphBase::None)])));
        assert!(!both.is_complete());
        both.right = Some(Box::new(WordForm::new("b")));
        assert!(both.is_complete());
    }

    #[test]
    fn height_counts_solution_layers() {
        let inner = leaf(2, MorphBase::None);
        let mut mid = leaf(0, MorphBase::Left);
        mid.left = Some(Box::new(WordForm::with_solutions("x", vec![inner])));
        let mut top = leaf(0, MorphBase::Both);
        top.left = Some(Box::new(WordForm::with_solutions("xy", vec![mid])));
        top.right = Some(Box::new(WordForm::with_solutions("z", vec![leaf(3, MorphBase::None)])));

        assert_eq!(leaf(1, MorphBase::None).height(), 0);
        assert_eq!(top.height(), 2);
        assert_eq!(WordForm::with_solutions("w", vec![top]).count(), 4);
    }

    #[test]
    fn originals_are_indexed_in_push_order() {
        let mut forest = Forest::new(WordForm::new("w"));
        let a = forest.push_original(leaf(1, MorphBase::None));
        let b = forest.push_original(leaf(2, MorphBase::None));
        assert_eq!((a, b), (SolutionId(0), SolutionId(1)));
        assert_eq!(forest.original(b).map(|s| s.content.id), Some(2));
        assert!(forest.original(SolutionId(9)).is_none());
    }
}
