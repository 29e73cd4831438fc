//! Parameter vectors and their generalization.
//!
//! Every morphological object (dictionary entry, rule, solution) carries a
//! fixed-length vector of grammatical categories. Slot value `0` means
//! "unknown"; when a vector is used as a *query*, `0` is a wildcard.
//!
//! ```text
//! slot:   0    1      2     3      4      ...  20
//!         pos  gender case  number person ...  indeclinable
//! value:  3    1      0     2      0      ...  0
//!                     ^ unknown / wildcard
//! ```
//!
//! Two matching disciplines exist and are easy to confuse:
//!
//! - [`Parameters::selects`]: combination rows and rule parameters must hold the
//!   *exact* query value in every specified query slot.
//! - [`Parameters::accepts`]: dictionary entries may leave a slot open (`0`) and
//!   still be accepted by a query that specifies it.

use std::fmt;

pub const PARAMETER_COUNT: usize = 21;

/// Grammatical category carried by each parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Category {
    PartOfSpeech = 0,
    Gender = 1,
    Case = 2,
    Number = 3,
    Person = 4,
    Tense = 5,
    Mood = 6,
    Voice = 7,
    Pada = 8,
    Conjugation = 9,
    Degree = 10,
    Stem = 11,
    Derivation = 12,
    Compound = 13,
    Kind = 14,
    Transitivity = 15,
    Causative = 16,
    Denominative = 17,
    Desiderative = 18,
    Intensive = 19,
    Indeclinable = 20,
}

impl Category {
    pub const ALL: [Category; PARAMETER_COUNT] = [
        Category::PartOfSpeech,
        Category::Gender,
        Category::Case,
        Category::Number,
        Category::Person,
        Category::Tense,
        Category::Mood,
        Category::Voice,
        Category::Pada,
        Category::Conjugation,
        Category::Degree,
        Category::Stem,
        Category::Derivation,
        Category::Compound,
        Category::Kind,
        Category::Transitivity,
        Category::Causative,
        Category::Denominative,
        Category::Desiderative,
        Category::Intensive,
        Category::Indeclinable,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Category> {
        Self::ALL.get(index).copied()
    }
}

bitflags::bitflags! {
    /// Which slots of a vector are specified (non-zero).
    ///
    /// Used to skip unspecified slots when filtering, and as a cheap
    /// pre-check before comparing whole vectors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SlotMask: u32 {
        const PART_OF_SPEECH = 1 << 0;
        const GENDER         = 1 << 1;
        const CASE           = 1 << 2;
        const NUMBER         = 1 << 3;
        const PERSON         = 1 << 4;
        const TENSE          = 1 << 5;
        const MOOD           = 1 << 6;
        const VOICE          = 1 << 7;
        const PADA           = 1 << 8;
        const CONJUGATION    = 1 << 9;
        const DEGREE         = 1 << 10;
        const STEM           = 1 << 11;
        const DERIVATION     = 1 << 12;
        const COMPOUND       = 1 << 13;
        const KIND           = 1 << 14;
        const TRANSITIVITY   = 1 << 15;
        const CAUSATIVE      = 1 << 16;
        const DENOMINATIVE   = 1 << 17;
        const DESIDERATIVE   = 1 << 18;
        const INTENSIVE      = 1 << 19;
        const INDECLINABLE   = 1 << 20;
    }
}

impl SlotMask {
    /// Iterate the slot indices contained in the mask, lowest first.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..PARAMETER_COUNT).filter(move |i| self.bits() & (1 << i) != 0)
    }
}

/// Fixed-length grammatical parameter vector.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Parameters([u8; PARAMETER_COUNT]);

impl Parameters {
    pub const EMPTY: Parameters = Parameters([0; PARAMETER_COUNT]);

    pub const fn new(slots: [u8; PARAMETER_COUNT]) -> Self {
        Parameters(slots)
    }

    /// Build a vector from a prefix of slots; the rest stay unknown.
    pub fn from_prefix(prefix: &[u8]) -> Self {
        let mut slots = [0; PARAMETER_COUNT];
        for (slot, value) in slots.iter_mut().zip(prefix) {
            *slot = *value;
        }
        Parameters(slots)
    }

    pub fn get(&self, category: Category) -> u8 {
        self.0[category.index()]
    }

    pub fn set(&mut self, category: Category, value: u8) {
        self.0[category.index()] = value;
    }

    pub fn with(mut self, category: Category, value: u8) -> Self {
        self.set(category, value);
        self
    }

    pub fn slots(&self) -> &[u8; PARAMETER_COUNT] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    pub fn mask(&self) -> SlotMask {
        let bits = self.0.iter().enumerate().filter(|(_, v)| **v != 0).fold(0u32, |acc, (i, _)| acc | (1 << i));
        SlotMask::from_bits_truncate(bits)
    }

    /// Combination/rule discipline: every specified query slot must be held
    /// exactly by `row`.
    pub fn selects(&self, row: &Parameters) -> bool {
        self.mask().indices().all(|i| row.0[i] == self.0[i])
    }

    /// Dictionary discipline: every specified query slot must be open (`0`)
    /// or equal in `candidate`.
    pub fn accepts(&self, candidate: &Parameters) -> bool {
        self.mask().indices().all(|i| candidate.0[i] == 0 || candidate.0[i] == self.0[i])
    }

    /// True when `self` keeps every specified slot of `general` and specifies
    /// at least one slot `general` leaves open.
    pub fn strictly_refines(&self, general: &Parameters) -> bool {
        let keeps = general.mask().indices().all(|i| self.0[i] == general.0[i]);
        keeps && self.mask().bits() & !general.mask().bits() != 0
    }

    /// Fill unknown slots from `other`, keeping every slot already known.
    pub fn fill_unknown_from(&self, other: &Parameters) -> Parameters {
        let mut out = *self;
        for (slot, value) in out.0.iter_mut().zip(other.0) {
            if *slot == 0 {
                *slot = value;
            }
        }
        out
    }
}

impl From<[u8; PARAMETER_COUNT]> for Parameters {
    fn from(slots: [u8; PARAMETER_COUNT]) -> Self {
        Parameters(slots)
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameters({})", self)
    }
}

/// Canonical dotted form, e.g. `1.0.3.0...`, trailing unknowns trimmed.
impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.0.iter().rposition(|&v| v != 0).map_or(1, |i| i + 1);
        let parts: Vec<String> = self.0[..used].iter().map(|v| v.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

// --- Collective parameters --------------------------------------------------

/// State of one slot while generalizing a set of vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectiveSlot {
    Unspecified,
    Value(u8),
    Conflicting,
}

impl CollectiveSlot {
    fn from_byte(value: u8) -> Self {
        if value == 0 { CollectiveSlot::Unspecified } else { CollectiveSlot::Value(value) }
    }

    fn absorb(self, value: u8) -> Self {
        match self {
            CollectiveSlot::Conflicting => CollectiveSlot::Conflicting,
            CollectiveSlot::Unspecified => CollectiveSlot::from_byte(value),
            CollectiveSlot::Value(current) if current == value => self,
            CollectiveSlot::Value(_) => CollectiveSlot::Conflicting,
        }
    }

    fn resolve(self) -> u8 {
        match self {
            CollectiveSlot::Value(v) => v,
            CollectiveSlot::Unspecified | CollectiveSlot::Conflicting => 0,
        }
    }
}

/// Running generalization over a sequence of parameter rows.
///
/// Starts from the first row. For every later row and slot: a conflicting slot
/// stays conflicting, an unspecified slot adopts the row's value, a valued slot
/// becomes conflicting when the row disagrees (a row `0` disagrees too).
#[derive(Debug, Clone)]
pub struct Collective {
    slots: [CollectiveSlot; PARAMETER_COUNT],
}

impl Collective {
    pub fn start(first: &Parameters) -> Self {
        let mut slots = [CollectiveSlot::Unspecified; PARAMETER_COUNT];
        for (slot, value) in slots.iter_mut().zip(first.0) {
            *slot = CollectiveSlot::from_byte(value);
        }
        Collective { slots }
    }

    pub fn absorb(&mut self, row: &Parameters) {
        for (slot, value) in self.slots.iter_mut().zip(row.0) {
            *slot = slot.absorb(value);
        }
    }

    pub fn slot(&self, category: Category) -> CollectiveSlot {
        self.slots[category.index()]
    }

    pub fn finish(&self) -> Parameters {
        let mut out = [0; PARAMETER_COUNT];
        for (byte, slot) in out.iter_mut().zip(self.slots) {
            *byte = slot.resolve();
        }
        Parameters(out)
    }
}

/// Generalize `rows`; `None` for an empty set.
pub fn collective<'a>(rows: impl IntoIterator<Item = &'a Parameters>) -> Option<Parameters> {
    let mut rows = rows.into_iter();
    let first = rows.next()?;
    let mut acc = Collective::start(first);
    for row in rows {
        acc.absorb(row);
    }
    Some(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mask_tracks_specified_slots() {
        let p = Parameters::from_prefix(&[1, 0, 3]);
        assert_eq!(p.mask(), SlotMask::PART_OF_SPEECH | SlotMask::CASE);
        assert_eq!(p.mask().indices().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn selects_requires_exact_row_value() {
        let query = Parameters::from_prefix(&[1, 0, 3]);
        assert!(query.selects(&Parameters::from_prefix(&[1, 7, 3])));
        assert!(!query.selects(&Parameters::from_prefix(&[1, 7, 0])));
    }

    #[test]
    fn accepts_treats_open_candidate_slots_as_wildcards() {
        let query = Parameters::from_prefix(&[1, 0, 3]);
        assert!(query.accepts(&Parameters::from_prefix(&[1, 7, 0])));
        assert!(!query.accepts(&Parameters::from_prefix(&[2, 0, 3])));
    }

    #[test]
    fn single_row_collective_is_the_row() {
        let row = Parameters::from_prefix(&[4, 0, 2, 9]);
        assert_eq!(collective([&row]), Some(row));
    }

    #[test]
    fn collective_follows_running_state_rules() {
        let rows = [Parameters::from_prefix(&[1, 2, 0]), Parameters::from_prefix(&[1, 0, 3])];
        // slot 1: 2 vs 0 conflicts; slot 2: unspecified adopts 3.
        assert_eq!(collective(&rows), Some(Parameters::from_prefix(&[1, 0, 3])));

        let mut acc = Collective::start(&rows[0]);
        acc.absorb(&rows[1]);
        assert_eq!(acc.slot(Category::PartOfSpeech), CollectiveSlot::Value(1));
        assert_eq!(acc.slot(Category::Gender), CollectiveSlot::Conflicting);
        assert_eq!(acc.slot(Category::Case), CollectiveSlot::Value(3));
    }

    #[test]
    fn conflicting_slot_never_recovers() {
        let rows = [
            Parameters::from_prefix(&[1, 2]),
            Parameters::from_prefix(&[1, 5]),
            Parameters::from_prefix(&[1, 2]),
        ];
        assert_eq!(collective(&rows), Some(Parameters::from_prefix(&[1])));
    }

    #[test]
    fn strict_refinement_needs_an_extra_slot() {
        let general = Parameters::from_prefix(&[1, 0, 3]);
        assert!(Parameters::from_prefix(&[1, 2, 3]).strictly_refines(&general));
        assert!(!general.strictly_refines(&general));
        assert!(!Parameters::from_prefix(&[1, 2, 4]).strictly_refines(&general));
    }

    #[test]
    fn display_trims_trailing_unknowns() {
        assert_eq!(Parameters::from_prefix(&[1, 0, 3]).to_string(), "1.0.3");
        assert_eq!(Parameters::EMPTY.to_string(), "0");
    }
}
