//! Corpus records: dictionary entries, grammar rules and sandhi rules.
//!
//! These are loaded once per session and shared read-only by every analysis.
//! Only [`MorphEntry`] records can change, and only through the
//! [`EntryResolver`](crate::lookup::EntryResolver), which also drops the caches
//! that depend on them.

use crate::error::{MorphError, Result};
use crate::parameters::Parameters;

/// How a formation is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MorphBase {
    #[default]
    Unknown,
    /// Atomic: no constituents.
    None,
    Left,
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntrySource {
    #[default]
    User,
    ImportWithoutAnalysis,
    ImportWithAnalysis,
}

/// Non-owning link from an entry to one of its constituents.
///
/// `id == 0` or an empty `entry` means "not constrained" when used in a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EntryRef {
    pub id: u32,
    pub entry: String,
}

impl EntryRef {
    pub fn new(id: u32, entry: impl Into<String>) -> Self {
        EntryRef { id, entry: entry.into() }
    }
}

/// A dictionary formation.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphEntry {
    /// `0` while unpersisted.
    pub id: u32,
    pub entry: String,
    pub parameters: Parameters,
    pub base: MorphBase,
    pub left: Option<EntryRef>,
    pub right: Option<EntryRef>,
    pub is_virtual: bool,
    pub source: EntrySource,
}

impl MorphEntry {
    /// An atomic (`base = None`) entry.
    pub fn atom(id: u32, entry: impl Into<String>, parameters: Parameters) -> Self {
        MorphEntry {
            id,
            entry: entry.into(),
            parameters,
            base: MorphBase::None,
            left: None,
            right: None,
            is_virtual: false,
            source: EntrySource::User,
        }
    }

    /// A two-sided (`base = Both`) entry.
    pub fn compound(id: u32, entry: impl Into<String>, parameters: Parameters, left: EntryRef, right: EntryRef) -> Self {
        MorphEntry { base: MorphBase::Both, left: Some(left), right: Some(right), ..Self::atom(id, entry, parameters) }
    }

    pub fn with_base(mut self, base: MorphBase) -> Self {
        self.base = base;
        self
    }

    pub fn with_left(mut self, left: EntryRef) -> Self {
        self.left = Some(left);
        self
    }

    pub fn with_right(mut self, right: EntryRef) -> Self {
        self.right = Some(right);
        self
    }

    pub fn virtual_form(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Check the base/children invariant.
    pub fn check_links(&self) -> Result<()> {
        let ok = match self.base {
            MorphBase::Unknown => true,
            MorphBase::None => self.left.is_none() && self.right.is_none(),
            MorphBase::Left => self.left.is_some() && self.right.is_none(),
            MorphBase::Right | MorphBase::Both => self.left.is_some() && self.right.is_some(),
        };
        if ok {
            Ok(())
        } else {
            Err(MorphError::Defect(format!(
                "entry {} '{}' has base {:?} but left={} right={}",
                self.id,
                self.entry,
                self.base,
                self.left.is_some(),
                self.right.is_some()
            )))
        }
    }
}

// --- Rules -------------------------------------------------------------------

/// How one side of a rule is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SideType {
    /// Side absent.
    #[default]
    None,
    /// Freshly derived: the side is analyzed recursively.
    New,
    /// Taken over as already resolved: dictionary entries only.
    Copy,
}

/// One side (left or right) of a grammar rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSide {
    pub kind: SideType,
    /// Label of the rules allowed to derive this side.
    pub label: String,
    /// Wildcard surface pattern the side must match (empty = any).
    pub pattern: String,
    pub parameters: Parameters,
}

impl RuleSide {
    pub fn new(kind: SideType, label: impl Into<String>, pattern: impl Into<String>, parameters: Parameters) -> Self {
        RuleSide { kind, label: label.into(), pattern: pattern.into(), parameters }
    }

    pub fn absent() -> Self {
        RuleSide::default()
    }

    pub fn is_present(&self) -> bool {
        self.kind != SideType::None
    }
}

/// Sandhi group of a rule. Groups below [`SandhiGroup::OTHER`] are trivial
/// boundaries that never change the spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SandhiGroup(pub u16);

impl SandhiGroup {
    pub const NONE: SandhiGroup = SandhiGroup(0);
    pub const JOIN: SandhiGroup = SandhiGroup(1);
    pub const HYPHEN: SandhiGroup = SandhiGroup(2);
    pub const OTHER: SandhiGroup = SandhiGroup(3);

    pub fn is_trivial(self) -> bool {
        self < Self::OTHER
    }
}

/// A grammar rule describing how a formation is composed.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphRule {
    pub entity_id: u32,
    pub id: u32,
    pub is_collapsed: bool,
    pub label: String,
    pub need_to_check: bool,
    pub sandhi_group: SandhiGroup,
    /// Ids into the sandhi corpus.
    pub sandhi_rules: Vec<u32>,
    /// Wildcard pattern of the composed surface (empty = any).
    pub entry: String,
    /// Constrains the composed result.
    pub parameters: Parameters,
    pub base: MorphBase,
    pub left: RuleSide,
    pub right: RuleSide,
    pub rating: f64,
    pub description: String,
}

impl MorphRule {
    pub fn new(id: u32, label: impl Into<String>, base: MorphBase, parameters: Parameters) -> Self {
        MorphRule {
            entity_id: id,
            id,
            is_collapsed: false,
            label: label.into(),
            need_to_check: false,
            sandhi_group: SandhiGroup::NONE,
            sandhi_rules: Vec::new(),
            entry: String::new(),
            parameters,
            base,
            left: RuleSide::absent(),
            right: RuleSide::absent(),
            rating: 1.0,
            description: String::new(),
        }
    }

    pub fn with_entry(mut self, pattern: impl Into<String>) -> Self {
        self.entry = pattern.into();
        self
    }

    pub fn with_sides(mut self, left: RuleSide, right: RuleSide) -> Self {
        self.left = left;
        self.right = right;
        self
    }

    pub fn with_sandhi(mut self, group: SandhiGroup, rules: impl IntoIterator<Item = u32>) -> Self {
        self.sandhi_group = group;
        self.sandhi_rules = rules.into_iter().collect();
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn collapsed(mut self) -> Self {
        self.is_collapsed = true;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A phonetic boundary transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandhiRule {
    pub id: u32,
    pub regex: String,
    pub description: String,
    /// Ordered replacement patterns (`$1` style capture references).
    pub regex_results: Vec<String>,
}

impl SandhiRule {
    pub fn new(id: u32, regex: impl Into<String>, results: &[&str]) -> Self {
        SandhiRule {
            id,
            regex: regex.into(),
            description: String::new(),
            regex_results: results.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One spelling reachable from a surface through sandhi, with the rules that
/// produce it. A `+` marks a morpheme boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandhiMatch {
    pub sandhi_expression: String,
    pub rules: Vec<u32>,
}

impl SandhiMatch {
    pub const BOUNDARY: char = '+';

    pub fn unchanged(entry: &str) -> Self {
        SandhiMatch { sandhi_expression: entry.to_string(), rules: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_invariant_follows_base() {
        let atom = MorphEntry::atom(1, "buddha", Parameters::EMPTY);
        assert!(atom.check_links().is_ok());

        let broken = atom.clone().with_left(EntryRef::new(2, "x"));
        assert!(matches!(broken.check_links(), Err(MorphError::Defect(_))));

        let left_only = MorphEntry::atom(3, "x", Parameters::EMPTY).with_base(MorphBase::Left);
        assert!(left_only.check_links().is_err());
        assert!(left_only.with_left(EntryRef::new(1, "buddha")).check_links().is_ok());

        let right = MorphEntry::atom(4, "y", Parameters::EMPTY)
            .with_base(MorphBase::Right)
            .with_right(EntryRef::new(1, "buddha"));
        assert!(right.check_links().is_err());
    }

    #[test]
    fn trivial_sandhi_groups_sit_below_other() {
        assert!(SandhiGroup::NONE.is_trivial());
        assert!(SandhiGroup::HYPHEN.is_trivial());
        assert!(!SandhiGroup::OTHER.is_trivial());
        assert!(!SandhiGroup(12).is_trivial());
    }
}
