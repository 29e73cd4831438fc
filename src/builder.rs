//! Raw forest construction.
//!
//! The reduction pipeline does not care how a forest was built; it only needs
//! the invariants of [`crate::forest`]. [`CorpusBuilder`] is the construction
//! used by the [`Analyzer`](crate::Analyzer): it explains a surface with the
//! dictionary first and then with every applicable grammar rule.
//!
//! ```text
//! word_form(surface, label, constraint, depth)
//!   ├─ dictionary: entries with this surface  ──▶ Solution per entry (children by id)
//!   └─ rules (unless the surface is a root morpheme, and while depth allows)
//!        for each rule whose `entry` pattern matches:
//!          sandhi_matches(surface, rule)          e.g. "buddha+ena"
//!            └─ splits at `+` (or every char)      ("buddha", "ena")
//!                 ├─ left side:  New  -> word_form(left, left.label, ..., depth + 1)
//!                 │              Copy -> dictionary entries only
//!                 └─ right side: same
//!          compose: rule parameters, combination check, link to dictionary original
//! ```
//!
//! Rules at one level are tried in parallel. Anything that fails to match is
//! kept as an error-tagged solution so Debug callers can see why.

use crate::error::{MorphError, Result, ensure_active};
use crate::forest::{Forest, Solution, SolutionContent, SolutionError, SolutionId, WordForm};
use crate::lookup::Managers;
use crate::model::{EntryRef, MorphBase, MorphEntry, MorphRule, RuleSide, SandhiMatch, SideType};
use crate::parameters::Parameters;
use crate::settings::Settings;
use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a builder may consult.
pub struct BuildContext<'a> {
    pub managers: &'a Managers,
    pub settings: &'a Settings,
    pub max_depth_level: usize,
    pub cancel: &'a CancellationToken,
}

/// Builds the raw (unreduced) forest for one word.
pub trait ForestBuilder: Send + Sync {
    fn build(&self, word: &str, cx: &BuildContext<'_>) -> Result<Forest>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CorpusBuilder;

impl ForestBuilder for CorpusBuilder {
    fn build(&self, word: &str, cx: &BuildContext<'_>) -> Result<Forest> {
        let run = Run { cx, originals: Mutex::new(Vec::new()), by_entry: DashMap::new() };
        let root = run.word_form(word, None, &Parameters::EMPTY, 0)?;
        let originals = run.originals.into_inner();
        tracing::debug!(word, solutions = root.count(), originals = originals.len(), "forest built");
        Ok(Forest { root, originals })
    }
}

/// State of one build.
struct Run<'a> {
    cx: &'a BuildContext<'a>,
    originals: Mutex<Vec<Solution>>,
    by_entry: DashMap<u32, SolutionId>,
}

enum Side {
    Left,
    Right,
}

impl Side {
    fn no_matches(&self) -> SolutionError {
        match self {
            Side::Left => SolutionError::NoLeftMatches,
            Side::Right => SolutionError::NoRightMatches,
        }
    }

    fn not_found_by_parameters(&self) -> SolutionError {
        match self {
            Side::Left => SolutionError::NotFoundLeftByParameters,
            Side::Right => SolutionError::NotFoundRightByParameters,
        }
    }
}

impl Run<'_> {
    fn managers(&self) -> &Managers {
        self.cx.managers
    }

    fn cancel(&self) -> &CancellationToken {
        self.cx.cancel
    }

    /// Rule derivation is attempted up to one level past the caller's limit so
    /// the depth stage has something to tag.
    fn depth_budget(&self) -> usize {
        self.cx.max_depth_level + 1
    }

    fn dictionary_entries(&self, surface: &str) -> Result<Arc<[MorphEntry]>> {
        self.managers().entries.values_and_cache(surface, Parameters::EMPTY, MorphBase::Unknown, None, self.cancel())
    }

    fn word_form(&self, surface: &str, label: Option<&str>, constraint: &Parameters, depth: usize) -> Result<WordForm> {
        ensure_active(self.cancel())?;
        let entries = self.dictionary_entries(surface)?;
        let mut solutions = entries
            .iter()
            .map(|entry| self.dictionary_solution(entry, &mut Vec::new()))
            .collect::<Result<Vec<_>>>()?;

        let atomic = entries.iter().any(|e| self.cx.settings.root_term.matches(&e.parameters));
        if atomic || depth >= self.depth_budget() {
            tracing::trace!(surface, depth, atomic, "no rule derivation");
            return Ok(WordForm::with_solutions(surface, solutions));
        }

        let rules = self.candidate_rules(label, constraint)?;
        let derived = rules
            .par_iter()
            .map(|rule| self.derive(surface, rule, depth))
            .collect::<Result<Vec<Vec<Solution>>>>()?;
        solutions.extend(derived.into_iter().flatten());

        Ok(WordForm::with_solutions(surface, solutions))
    }

    fn candidate_rules(&self, label: Option<&str>, constraint: &Parameters) -> Result<Vec<Arc<MorphRule>>> {
        let rules = &self.managers().rules;
        match label {
            Some(label) => Ok(rules.rules_and_cache(label, constraint, self.cancel())?.to_vec()),
            None => {
                let mut all = Vec::new();
                for label in rules.labels() {
                    all.extend(rules.rules_and_cache(label, constraint, self.cancel())?.iter().cloned());
                }
                Ok(all)
            }
        }
    }

    // --- Dictionary ------------------------------------------------------------

    fn dictionary_rating(&self, surface: &str) -> Result<f64> {
        Ok(1.0 + self.managers().frequencies.rating(surface, self.cancel())?)
    }

    /// Expand a dictionary entry into a solution, following its links by `base`.
    fn dictionary_solution(&self, entry: &MorphEntry, path: &mut Vec<u32>) -> Result<Solution> {
        if entry.id != 0 && path.contains(&entry.id) {
            return Err(MorphError::Defect(format!("cyclic entry links through {} '{}'", entry.id, entry.entry)));
        }
        path.push(entry.id);

        let mut solution =
            Solution::new(SolutionContent::new(entry.id, entry.parameters, entry.base, entry.is_virtual));
        solution.rating = self.dictionary_rating(&entry.entry)?;

        let (take_left, take_right) = match entry.base {
            MorphBase::None => (false, false),
            MorphBase::Left => (true, false),
            MorphBase::Right | MorphBase::Both | MorphBase::Unknown => (true, true),
        };
        if let Some(link) = entry.left.as_ref().filter(|_| take_left) {
            solution.left = Some(Box::new(self.linked_word_form(link, path)?));
        }
        if let Some(link) = entry.right.as_ref().filter(|_| take_right) {
            solution.right = Some(Box::new(self.linked_word_form(link, path)?));
        }

        path.pop();
        Ok(solution)
    }

    fn linked_word_form(&self, link: &EntryRef, path: &mut Vec<u32>) -> Result<WordForm> {
        if link.id > 0 {
            let child = self.managers().entries.value(link.id)?;
            let solution = self.dictionary_solution(&child, path)?;
            return Ok(WordForm::with_solutions(child.entry, vec![solution]));
        }
        let entries = self.dictionary_entries(&link.entry)?;
        let solutions = entries.iter().map(|e| self.dictionary_solution(e, path)).collect::<Result<Vec<_>>>()?;
        Ok(WordForm::with_solutions(link.entry.clone(), solutions))
    }

    /// Arena id of the dictionary solution for `entry`, registering it once.
    fn original(&self, entry: &MorphEntry) -> Result<SolutionId> {
        if let Some(id) = self.by_entry.get(&entry.id) {
            return Ok(*id);
        }
        let solution = self.dictionary_solution(entry, &mut Vec::new())?;
        let id = *self.by_entry.entry(entry.id).or_insert_with(|| {
            let mut originals = self.originals.lock();
            originals.push(solution);
            SolutionId((originals.len() - 1) as u32)
        });
        Ok(id)
    }

    // --- Rules -----------------------------------------------------------------

    fn derive(&self, surface: &str, rule: &Arc<MorphRule>, depth: usize) -> Result<Vec<Solution>> {
        ensure_active(self.cancel())?;
        let rules = &self.managers().rules;
        if !rules.pattern(&rule.entry)?.is_match(surface) {
            return Ok(Vec::new());
        }

        let matches = rules.sandhi_matches_and_cache(surface, rule, self.cancel())?;
        if matches.is_empty() {
            return Ok(vec![Solution::failed(SolutionError::NoSandhiMatches, rule.clone())]);
        }

        let mut out = Vec::new();
        for sandhi in matches.iter() {
            for (left, right) in self.splits(&sandhi.sandhi_expression, rule)? {
                out.push(self.compose(surface, rule, sandhi, &left, right.as_deref(), depth)?);
            }
        }
        if out.is_empty() {
            let mut failed = Solution::failed(SolutionError::NoRuleMatches, rule.clone());
            failed.sandhi = matches.to_vec();
            out.push(failed);
        }
        Ok(out)
    }

    /// Candidate `(left, right)` surfaces of a sandhi expression.
    fn splits(&self, expression: &str, rule: &MorphRule) -> Result<Vec<(String, Option<String>)>> {
        if !rule.left.is_present() {
            return Ok(Vec::new());
        }
        let rules = &self.managers().rules;
        let left_pattern = rules.pattern(&rule.left.pattern)?;

        if !rule.right.is_present() {
            let whole = expression.replace(SandhiMatch::BOUNDARY, "");
            return Ok(if left_pattern.is_match(&whole) { vec![(whole, None)] } else { Vec::new() });
        }

        let right_pattern = rules.pattern(&rule.right.pattern)?;
        let candidates: Vec<(String, String)> = if expression.contains(SandhiMatch::BOUNDARY) {
            expression
                .match_indices(SandhiMatch::BOUNDARY)
                .map(|(at, _)| {
                    let left = expression[..at].replace(SandhiMatch::BOUNDARY, "");
                    let right = expression[at + 1..].replace(SandhiMatch::BOUNDARY, "");
                    (left, right)
                })
                .collect()
        } else {
            expression
                .char_indices()
                .skip(1)
                .map(|(at, _)| (expression[..at].to_string(), expression[at..].to_string()))
                .collect()
        };

        Ok(candidates
            .into_iter()
            .filter(|(l, r)| !l.is_empty() && !r.is_empty())
            .filter(|(l, r)| left_pattern.is_match(l) && right_pattern.is_match(r))
            .map(|(l, r)| (l, Some(r)))
            .collect())
    }

    fn compose(
        &self,
        surface: &str,
        rule: &Arc<MorphRule>,
        sandhi: &SandhiMatch,
        left: &str,
        right: Option<&str>,
        depth: usize,
    ) -> Result<Solution> {
        let fail = |error: SolutionError| {
            let mut failed = Solution::failed(error, rule.clone());
            failed.sandhi = vec![sandhi.clone()];
            failed
        };

        let left = match self.side(&rule.left, Some(left), Side::Left, depth)? {
            Ok(wf) => wf,
            Err(error) => return Ok(fail(error)),
        };
        let right = match self.side(&rule.right, right, Side::Right, depth)? {
            Ok(wf) => wf,
            Err(error) => return Ok(fail(error)),
        };

        let parameters = rule.parameters;
        let mut solution = Solution::new(SolutionContent::new(0, parameters, rule.base, true));
        solution.rules = vec![rule.clone()];
        solution.sandhi = vec![sandhi.clone()];

        let children: Vec<f64> =
            [&left, &right].into_iter().flatten().map(|wf| wf.best_rating().unwrap_or(0.0)).collect();
        let support = if children.is_empty() { 1.0 } else { children.iter().sum::<f64>() / children.len() as f64 };
        solution.rating = (rule.rating.clamp(0.0, 1.0) * support).clamp(0.0, 2.0);

        solution.left = left.map(Box::new);
        solution.right = right.map(Box::new);

        // Attested formation with the same surface: remember it as the original.
        let attested = self.dictionary_entries(surface)?;
        if let Some(entry) = attested.iter().find(|e| e.base != MorphBase::None && parameters.accepts(&e.parameters)) {
            solution.original = Some(self.original(entry)?);
            solution.content.is_virtual = entry.is_virtual;
        }

        if !self.managers().combinations.check_and_cache(&parameters, self.cancel())? {
            solution.content.error = SolutionError::NoMorphCombinationMatches;
        }
        Ok(solution)
    }

    /// Resolve one side of a rule. The inner `Err` is a matching failure, not
    /// an engine error.
    fn side(
        &self,
        rule_side: &RuleSide,
        text: Option<&str>,
        side: Side,
        depth: usize,
    ) -> Result<std::result::Result<Option<WordForm>, SolutionError>> {
        let Some(text) = text.filter(|_| rule_side.is_present()) else {
            return Ok(Ok(None));
        };

        let candidates = match rule_side.kind {
            SideType::None => return Ok(Ok(None)),
            SideType::New => {
                let label = (!rule_side.label.is_empty()).then_some(rule_side.label.as_str());
                self.word_form(text, label, &rule_side.parameters, depth + 1)?.solutions
            }
            SideType::Copy => self
                .dictionary_entries(text)?
                .iter()
                .map(|e| self.dictionary_solution(e, &mut Vec::new()))
                .collect::<Result<Vec<_>>>()?,
        };

        let successful: Vec<Solution> = candidates.into_iter().filter(Solution::is_success).collect();
        if successful.is_empty() {
            return Ok(Err(side.no_matches()));
        }
        let compatible: Vec<Solution> =
            successful.into_iter().filter(|s| rule_side.parameters.accepts(&s.content.parameters)).collect();
        if compatible.is_empty() {
            return Ok(Err(side.not_found_by_parameters()));
        }
        Ok(Ok(Some(WordForm::with_solutions(text, compatible))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{Layer, Managers};
    use crate::sample;

    fn managers() -> (Managers, Settings) {
        let settings = Settings::default();
        let managers = Managers::load(sample::corpus(), &settings).unwrap();
        managers.frequencies.set_layer(Layer::FIRST);
        (managers, settings)
    }

    fn build(word: &str, max_depth_level: usize) -> Forest {
        let (managers, settings) = managers();
        let cancel = CancellationToken::new();
        let cx = BuildContext { managers: &managers, settings: &settings, max_depth_level, cancel: &cancel };
        CorpusBuilder.build(word, &cx).unwrap()
    }

    fn walk<'a>(wf: &'a WordForm, out: &mut Vec<&'a Solution>) {
        for s in &wf.solutions {
            out.push(s);
            for child in [&s.left, &s.right].into_iter().flatten() {
                walk(child, out);
            }
        }
    }

    #[test]
    fn atomic_entries_never_get_children() {
        let forest = build("buddhadhammena", 4);
        let mut all = Vec::new();
        walk(&forest.root, &mut all);
        assert!(!all.is_empty());
        for s in all.iter().filter(|s| s.content.base == MorphBase::None) {
            assert!(s.left.is_none() && s.right.is_none());
        }
    }

    #[test]
    fn dictionary_compound_expands_by_links() {
        let forest = build("buddhadhamma", 4);
        let dict = forest.root.solutions.iter().find(|s| s.is_dictionary()).unwrap();
        assert_eq!(dict.content.base, MorphBase::Both);
        assert_eq!(dict.left.as_ref().unwrap().entry, "buddha");
        assert_eq!(dict.right.as_ref().unwrap().entry, "dhamma");
        assert!(dict.rating >= 1.0);
    }

    #[test]
    fn rule_derivation_splits_at_sandhi_boundary() {
        let forest = build("buddhena", 4);
        let derived: Vec<&Solution> =
            forest.root.solutions.iter().filter(|s| s.is_success() && !s.is_dictionary()).collect();
        assert!(!derived.is_empty());
        let first = derived[0];
        assert_eq!(first.left.as_ref().unwrap().entry, "buddha");
        assert_eq!(first.right.as_ref().unwrap().entry, "ena");
        assert!(first.rating >= 0.0 && first.rating <= 2.0);
    }

    #[test]
    fn unknown_word_yields_only_error_branches() {
        let forest = build("xyz", 4);
        assert!(forest.root.solutions.iter().all(|s| !s.is_success()));
    }

    #[test]
    fn cancelled_build_fails() {
        let (managers, settings) = managers();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let cx = BuildContext { managers: &managers, settings: &settings, max_depth_level: 4, cancel: &cancel };
        assert!(matches!(CorpusBuilder.build("buddhena", &cx), Err(MorphError::Cancelled)));
    }

    #[test]
    fn cyclic_links_are_a_defect() {
        use crate::lookup::{Corpus, MemoryEntryStore, MemoryProvider};
        let entries = vec![
            MorphEntry::atom(1, "a", Parameters::EMPTY).with_base(MorphBase::Left).with_left(EntryRef::new(2, "b")),
            MorphEntry::atom(2, "b", Parameters::EMPTY).with_base(MorphBase::Left).with_left(EntryRef::new(1, "a")),
        ];
        let corpus = Corpus {
            combinations: Box::new(MemoryProvider::new(Vec::new())),
            entries: Box::new(MemoryEntryStore::new(entries)),
            rules: Box::new(MemoryProvider::new(Vec::new())),
            sandhi: Box::new(MemoryProvider::new(Vec::new())),
            frequencies: Box::new(MemoryProvider::new(Vec::new())),
        };
        let settings = Settings::default();
        let managers = Managers::load(corpus, &settings).unwrap();
        managers.frequencies.set_layer(Layer::FIRST);
        let cancel = CancellationToken::new();
        let cx = BuildContext { managers: &managers, settings: &settings, max_depth_level: 4, cancel: &cancel };
        assert!(matches!(CorpusBuilder.build("a", &cx), Err(MorphError::Defect(_))));
    }
}
