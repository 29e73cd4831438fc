//! Lookup and validation managers.
//!
//! Forest construction and reduction never touch corpus data directly. They go
//! through four managers, each built once per session over an in-memory
//! provider and each memoizing its answers:
//!
//! ```text
//!                      ┌───────────────────────┐
//! Provider<Parameters> │ CombinationValidator  │ check / collective / valid rows
//!                      ├───────────────────────┤
//! EntryStore ─────────▶│ EntryResolver         │ entries by surface/params/base/links
//!                      ├───────────────────────┤
//! Provider<MorphRule>  │ RuleMatcher           │ rules by label+params, sandhi splits
//! Provider<SandhiRule> │                       │
//!                      ├───────────────────────┤
//! Provider<Frequency>  │ FrequencyRater        │ layer selection, popularity score
//!                      └───────────────────────┘
//! ```
//!
//! ## Memoization
//!
//! Every memo table is a [`Memo`] keyed by the typed input tuple. Entries are
//! pure functions of their key, so concurrent inserts of the same key are
//! harmless. [`Managers::clear`] drops every table and is called once per
//! analysis by the last pipeline stage.
//!
//! ## Failure model
//!
//! "No match" is an empty result, never an error. Errors are reserved for
//! precondition violations (unknown id, no layer), invalid corpus data and
//! cancellation.

#[path = "lookup/combinations.rs"]
mod combinations;
#[path = "lookup/entries.rs"]
mod entries;
#[path = "lookup/frequency.rs"]
mod frequency;
#[path = "lookup/memo.rs"]
mod memo;
#[path = "lookup/pattern.rs"]
mod pattern;
#[path = "lookup/provider.rs"]
mod provider;
#[path = "lookup/rules.rs"]
mod rules;

pub use combinations::CombinationValidator;
pub use entries::{EntryQuery, EntryResolver};
pub use frequency::{Frequency, FrequencyRater, LAYER_COUNT, Layer};
pub use memo::Memo;
pub use pattern::Wildcard;
pub use provider::{EntryStore, MemoryEntryStore, MemoryProvider, Provider};
pub use rules::RuleMatcher;

use crate::error::Result;
use crate::model::{MorphRule, SandhiRule};
use crate::parameters::Parameters;
use crate::settings::Settings;

/// Everything the managers are loaded from.
pub struct Corpus {
    pub combinations: Box<dyn Provider<Parameters>>,
    pub entries: Box<dyn EntryStore>,
    pub rules: Box<dyn Provider<MorphRule>>,
    pub sandhi: Box<dyn Provider<SandhiRule>>,
    pub frequencies: Box<dyn Provider<Frequency>>,
}

/// The four managers of one session.
#[derive(Debug)]
pub struct Managers {
    pub combinations: CombinationValidator,
    pub entries: EntryResolver,
    pub rules: RuleMatcher,
    pub frequencies: FrequencyRater,
}

impl Managers {
    pub fn load(corpus: Corpus, settings: &Settings) -> Result<Self> {
        let Corpus { combinations, entries, rules, sandhi, frequencies } = corpus;
        let managers = Managers {
            combinations: CombinationValidator::new(combinations.as_ref())?,
            entries: EntryResolver::new(entries)?,
            rules: RuleMatcher::new(rules.as_ref(), sandhi.as_ref())?,
            frequencies: FrequencyRater::new(frequencies.as_ref(), settings.default_layer)?,
        };
        tracing::debug!(
            combinations = managers.combinations.len(),
            entries = managers.entries.len(),
            rules = managers.rules.len(),
            "corpus loaded"
        );
        Ok(managers)
    }

    /// Drop every memo table.
    pub fn clear(&self) {
        self.combinations.clear();
        self.entries.clear();
        self.rules.clear();
        self.frequencies.clear();
    }

    /// Total number of memoized answers across managers.
    pub fn cached(&self) -> usize {
        self.combinations.cached() + self.entries.cached() + self.rules.cached() + self.frequencies.cached()
    }
}
