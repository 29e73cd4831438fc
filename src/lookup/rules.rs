//! Rule and sandhi matcher.
//!
//! Two lookups live here:
//!
//! - **rules by label**: every rule carrying the label whose parameters hold
//!   the query value in each specified query slot.
//! - **sandhi matches**: the spellings a surface can be rewritten to at a
//!   morpheme boundary. Trivial groups leave the surface alone; real groups run
//!   each sandhi regex and substitute one occurrence at a time:
//!
//! ```text
//! entry "buddhena", rule /e(na)$/ -> ["a+e$1"]
//!
//!   occurrence "ena" at 5..8 ──▶ "buddh" + "a+ena" + ""  = "buddha+ena"
//! ```
//!
//! A group's sandhi rules are the union of the `sandhi_rules` lists of every
//! rule in that group, so a memoized result depends only on group and entry.
//!
//! Several sandhi rules can produce the same spelling; results are grouped by
//! expression (first-seen order) and carry every contributing rule id.

use super::memo::Memo;
use super::pattern::Wildcard;
use super::provider::Provider;
use crate::error::{MorphError, Result, ensure_active};
use crate::model::{MorphRule, SandhiGroup, SandhiMatch, SandhiRule};
use crate::parameters::Parameters;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct CompiledSandhi {
    rule: SandhiRule,
    regex: Regex,
}

#[derive(Debug)]
pub struct RuleMatcher {
    rules: Vec<Arc<MorphRule>>,
    by_id: HashMap<u32, usize>,
    by_label: HashMap<String, Vec<usize>>,
    labels: Vec<String>,
    sandhi: HashMap<u32, CompiledSandhi>,
    groups: HashMap<SandhiGroup, Vec<u32>>,
    rule_memo: Memo<(String, Parameters), Arc<[Arc<MorphRule>]>>,
    sandhi_memo: Memo<(SandhiGroup, String), Arc<[SandhiMatch]>>,
    patterns: Memo<String, Arc<Wildcard>>,
}

impl RuleMatcher {
    pub fn new(rules: &dyn Provider<MorphRule>, sandhi: &dyn Provider<SandhiRule>) -> Result<Self> {
        Self::from_values(rules.values()?, sandhi.values()?)
    }

    pub fn from_values(rules: Vec<MorphRule>, sandhi: Vec<SandhiRule>) -> Result<Self> {
        let mut compiled = HashMap::with_capacity(sandhi.len());
        for rule in sandhi {
            let regex = Regex::new(&rule.regex)
                .map_err(|source| MorphError::InvalidPattern { pattern: rule.regex.clone(), source })?;
            compiled.insert(rule.id, CompiledSandhi { rule, regex });
        }

        let mut by_id = HashMap::new();
        let mut by_label: HashMap<String, Vec<usize>> = HashMap::new();
        let mut labels = Vec::new();
        let mut groups: HashMap<SandhiGroup, Vec<u32>> = HashMap::new();
        for (idx, rule) in rules.iter().enumerate() {
            if let Some(missing) = rule.sandhi_rules.iter().find(|id| !compiled.contains_key(id)) {
                return Err(MorphError::SandhiRuleNotFound(*missing));
            }
            let members = groups.entry(rule.sandhi_group).or_default();
            for id in &rule.sandhi_rules {
                if !members.contains(id) {
                    members.push(*id);
                }
            }
            by_id.insert(rule.id, idx);
            let slot = by_label.entry(rule.label.clone()).or_default();
            if slot.is_empty() {
                labels.push(rule.label.clone());
            }
            slot.push(idx);
        }

        Ok(RuleMatcher {
            rules: rules.into_iter().map(Arc::new).collect(),
            by_id,
            by_label,
            labels,
            sandhi: compiled,
            groups,
            rule_memo: Memo::new("rules.by_label"),
            sandhi_memo: Memo::new("rules.sandhi"),
            patterns: Memo::new("rules.patterns"),
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Distinct rule labels, in corpus order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rule(&self, id: u32) -> Result<Arc<MorphRule>> {
        self.by_id.get(&id).map(|&idx| self.rules[idx].clone()).ok_or(MorphError::RuleNotFound(id))
    }

    /// Rules with `label` compatible with `parameters`.
    pub fn rules_and_cache(
        &self,
        label: &str,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<Arc<[Arc<MorphRule>]>> {
        self.rule_memo.get_or_try_insert_with((label.to_string(), *parameters), || {
            ensure_active(cancel)?;
            let Some(ids) = self.by_label.get(label) else {
                return Ok(Arc::from(Vec::new()));
            };
            let mut candidates: Vec<Arc<MorphRule>> = ids.iter().map(|&i| self.rules[i].clone()).collect();
            for slot in parameters.mask().indices() {
                if candidates.is_empty() {
                    break;
                }
                ensure_active(cancel)?;
                let value = parameters.slots()[slot];
                candidates.retain(|r| r.parameters.slots()[slot] == value);
            }
            Ok(Arc::from(candidates))
        })
    }

    /// Spellings `entry` can take at the rule's boundary, using every sandhi
    /// rule of the rule's group.
    ///
    /// An empty result means "no matches" and is cached as such; see
    /// [`cached_sandhi_matches`](Self::cached_sandhi_matches).
    pub fn sandhi_matches_and_cache(
        &self,
        entry: &str,
        rule: &MorphRule,
        cancel: &CancellationToken,
    ) -> Result<Arc<[SandhiMatch]>> {
        let group = rule.sandhi_group;
        self.sandhi_memo.get_or_try_insert_with((group, entry.to_string()), || {
            if group.is_trivial() {
                return Ok(Arc::from(vec![SandhiMatch::unchanged(entry)]));
            }

            let mut candidates = Vec::new();
            for id in self.groups.get(&group).map(Vec::as_slice).unwrap_or_default() {
                ensure_active(cancel)?;
                let compiled = self.sandhi.get(id).ok_or(MorphError::SandhiRuleNotFound(*id))?;
                for caps in compiled.regex.captures_iter(entry) {
                    let Some(whole) = caps.get(0) else { continue };
                    for result in &compiled.rule.regex_results {
                        let mut replaced = String::new();
                        caps.expand(result, &mut replaced);
                        let expression = format!("{}{}{}", &entry[..whole.start()], replaced, &entry[whole.end()..]);
                        candidates.push(SandhiMatch { sandhi_expression: expression, rules: vec![*id] });
                    }
                }
            }

            tracing::trace!(entry, group = group.0, candidates = candidates.len(), "sandhi candidates");
            Ok(Arc::from(group_by_expression(candidates)))
        })
    }

    /// `None` when the pair was never computed, `Some(empty)` for a cached
    /// "no matches".
    pub fn cached_sandhi_matches(&self, group: SandhiGroup, entry: &str) -> Option<Arc<[SandhiMatch]>> {
        self.sandhi_memo.get(&(group, entry.to_string()))
    }

    /// Compiled wildcard for a rule pattern.
    pub fn pattern(&self, pattern: &str) -> Result<Arc<Wildcard>> {
        self.patterns.get_or_try_insert_with(pattern.to_string(), || Ok(Arc::new(Wildcard::parse(pattern)?)))
    }

    pub fn cached(&self) -> usize {
        self.rule_memo.len() + self.sandhi_memo.len() + self.patterns.len()
    }

    pub fn clear(&self) {
        self.rule_memo.clear();
        self.sandhi_memo.clear();
        self.patterns.clear();
    }
}

fn group_by_expression(candidates: Vec<SandhiMatch>) -> Vec<SandhiMatch> {
    if candidates.len() <= 1 {
        return candidates;
    }
    let mut grouped: Vec<SandhiMatch> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for candidate in candidates {
        match index.get(&candidate.sandhi_expression) {
            Some(&at) => {
                let rules = &mut grouped[at].rules;
                for id in candidate.rules {
                    if !rules.contains(&id) {
                        rules.push(id);
                    }
                }
            }
            None => {
                index.insert(candidate.sandhi_expression.clone(), grouped.len());
                grouped.push(candidate);
            }
        }
    }
    grouped
}
