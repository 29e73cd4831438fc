//! A tiny built-in corpus.
//!
//! Enough Pali to exercise every part of the analyzer: a few a-stem nouns
//! marked as roots, two case endings, one attested compound, an instrumental
//! rule that needs sandhi (`buddhena -> buddha+ena`) and a compounding rule
//! over trivial boundaries.
//!
//! Used by the CLI when no other corpus is configured, and by tests.

use crate::lookup::{Corpus, Frequency, Layer, MemoryEntryStore, MemoryProvider};
use crate::model::{EntryRef, MorphBase, MorphEntry, MorphRule, RuleSide, SandhiGroup, SandhiRule, SideType};
use crate::params;
use crate::parameters::Parameters;

/// Inflection sandhi group; anything at or above `SandhiGroup::OTHER` runs regexes.
const INFLECTION: SandhiGroup = SandhiGroup(4);

fn root_noun() -> Parameters {
    params![PartOfSpeech => 1, Gender => 1, Kind => 1]
}

fn ending(number: u8) -> Parameters {
    params![Kind => 2, Case => 3, Number => number]
}

pub fn entries() -> Vec<MorphEntry> {
    vec![
        MorphEntry::atom(1, "buddha", root_noun()),
        MorphEntry::atom(2, "dhamma", root_noun()),
        MorphEntry::atom(3, "sangha", root_noun()),
        MorphEntry::atom(4, "ena", ending(1)),
        MorphEntry::atom(5, "ehi", ending(2)),
        MorphEntry::compound(
            6,
            "buddhadhamma",
            params![PartOfSpeech => 1, Gender => 1, Compound => 1],
            EntryRef::new(1, "buddha"),
            EntryRef::new(2, "dhamma"),
        ),
    ]
}

pub fn combinations() -> Vec<Parameters> {
    vec![
        root_noun(),
        ending(1),
        ending(2),
        params![PartOfSpeech => 1, Gender => 1, Case => 1, Number => 1],
        params![PartOfSpeech => 1, Gender => 1, Case => 3, Number => 1],
        params![PartOfSpeech => 1, Gender => 1, Case => 3, Number => 2],
        params![PartOfSpeech => 1, Gender => 1, Compound => 1],
    ]
}

pub fn sandhi_rules() -> Vec<SandhiRule> {
    vec![
        SandhiRule::new(1, "e(na)$", &["a+e$1"]).described("a-stem + ena"),
        SandhiRule::new(2, "e(hi)$", &["a+e$1"]).described("a-stem + ehi"),
    ]
}

pub fn rules() -> Vec<MorphRule> {
    let stem = || RuleSide::new(SideType::New, "stem", "*a", params![PartOfSpeech => 1]);
    vec![
        MorphRule::new(1, "word", MorphBase::Both, params![PartOfSpeech => 1, Case => 3, Number => 1])
            .with_entry("*ena")
            .with_sandhi(INFLECTION, [1])
            .with_sides(stem(), RuleSide::new(SideType::Copy, "", "ena", Parameters::EMPTY))
            .with_rating(0.9)
            .described("instrumental singular"),
        MorphRule::new(2, "word", MorphBase::Both, params![PartOfSpeech => 1, Case => 3, Number => 2])
            .with_entry("*ehi")
            .with_sandhi(INFLECTION, [2])
            .with_sides(stem(), RuleSide::new(SideType::Copy, "", "ehi", Parameters::EMPTY))
            .with_rating(0.9)
            .described("instrumental plural"),
        MorphRule::new(3, "word", MorphBase::Both, params![PartOfSpeech => 1, Compound => 1])
            .with_sandhi(SandhiGroup::JOIN, [])
            .with_sides(stem(), stem())
            .with_rating(0.8)
            .collapsed()
            .described("tatpurisa compound"),
    ]
}

pub fn frequencies() -> Vec<Frequency> {
    let first = Layer::FIRST;
    let third = Layer::new(3).unwrap_or(first);
    vec![
        Frequency::new(first, "buddha", 50),
        Frequency::new(first, "dhamma", 40),
        Frequency::new(first, "sangha", 10),
        Frequency::new(first, "ena", 100),
        Frequency::new(first, "ehi", 60),
        Frequency::new(third, "buddhena", 20),
        Frequency::new(third, "buddhadhamma", 5),
    ]
}

pub fn corpus() -> Corpus {
    Corpus {
        combinations: Box::new(MemoryProvider::new(combinations())),
        entries: Box::new(MemoryEntryStore::new(entries())),
        rules: Box::new(MemoryProvider::new(rules())),
        sandhi: Box::new(MemoryProvider::new(sandhi_rules())),
        frequencies: Box::new(MemoryProvider::new(frequencies())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_links_are_consistent() {
        for entry in entries() {
            entry.check_links().unwrap();
        }
    }

    #[test]
    fn every_entry_is_a_valid_combination() {
        let rows = combinations();
        for entry in entries() {
            assert!(rows.iter().any(|r| entry.parameters.selects(r)), "{}", entry.entry);
        }
    }
}
