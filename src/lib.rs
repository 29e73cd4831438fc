//! Morphological analysis of Pali wordforms.
//!
//! One surface word goes in; a ranked forest of candidate decompositions comes
//! out. Each candidate ("solution") explains the word either as a dictionary
//! entry or as the product of a grammar rule applied to smaller constituents,
//! with the phonetic boundary changes (sandhi) that rule allows.
//!
//! ```text
//! word ──▶ Analyzer::analyze
//!            │ FrequencyRater::set_layer_by_entry
//!            │ ForestBuilder::build ──▶ raw forest   (rules, sandhi, dictionary)
//!            │ Pipeline::run        ──▶ reduced forest (nine stages)
//!            v
//!          Analysis { forest, metrics }
//! ```
//!
//! ## Modules
//!
//! - `parameters`: the 21-slot grammatical parameter vector and its matching
//!   disciplines.
//! - `model`: corpus records (entries, rules, sandhi rules).
//! - `forest`: the solution forest and its arena of dictionary originals.
//! - `lookup`: the four memoizing managers over in-memory providers.
//! - `builder`: raw forest construction.
//! - `pipeline`: the reduction stages.
//! - `api`: the [`Analyzer`] facade.
//! - `sample`: a small built-in corpus.
//!
//! ## Logging
//!
//! Everything logs through `tracing`. Set `RUST_LOG=pali_morph=debug` (or
//! `trace`) with any subscriber to see cache misses, layer selection and
//! per-stage counts.

#[macro_use]
mod macros;
mod api;
mod builder;
mod error;
mod forest;
mod lookup;
mod model;
mod parameters;
mod pipeline;
pub mod sample;
mod settings;

pub use api::{Analysis, Analyzer};
pub use builder::{BuildContext, CorpusBuilder, ForestBuilder};
pub use error::{MorphError, Result};
pub use forest::{Forest, Solution, SolutionContent, SolutionError, SolutionId, WordForm};
pub use lookup::{
    CombinationValidator, Corpus, EntryQuery, EntryResolver, EntryStore, Frequency, FrequencyRater, LAYER_COUNT, Layer,
    Managers, Memo, MemoryEntryStore, MemoryProvider, Provider, RuleMatcher, Wildcard,
};
pub use model::{
    EntryRef, EntrySource, MorphBase, MorphEntry, MorphRule, RuleSide, SandhiGroup, SandhiMatch, SandhiRule, SideType,
};
pub use parameters::{Category, Collective, CollectiveSlot, PARAMETER_COUNT, Parameters, SlotMask, collective};
pub use pipeline::{
    ClearCaches, Collapse, Deduplicate, DepthLimit, DropDerivatives, DropUnsuitable, Pipeline, PipelineRun, Request,
    RunMetrics, SortSolutions, Stage, StageContext, StageMetrics, UpdateParameters, Validate,
};
pub use settings::{DEFAULT_LAYER_VAR, Options, ParsingType, ROOT_TERM_VAR, RootTerm, Settings};
