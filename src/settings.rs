//! Session settings and per-request options.
//!
//! [`Settings`] are fixed for the lifetime of an [`Analyzer`](crate::Analyzer)
//! and can be read from the environment:
//!
//! - `PALI_MORPH_DEFAULT_LAYER`: layer used when a word occurs in no layer
//!   (`1..=8`, default `1`).
//! - `PALI_MORPH_ROOT_TERM`: `slot:value` marking root morphemes
//!   (default `14:1`, i.e. `Kind = 1`).
//!
//! [`Options`] travel with each request.

use crate::error::{MorphError, Result};
use crate::lookup::Layer;
use crate::parameters::{Category, Parameters};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_LAYER_VAR: &str = "PALI_MORPH_DEFAULT_LAYER";
pub const ROOT_TERM_VAR: &str = "PALI_MORPH_ROOT_TERM";

/// Parameter slot and value that flag a root morpheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootTerm {
    pub category: Category,
    pub value: u8,
}

impl RootTerm {
    pub fn matches(&self, parameters: &Parameters) -> bool {
        self.value != 0 && parameters.get(self.category) == self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub default_layer: Layer,
    pub root_term: RootTerm,
}

impl Default for Settings {
    fn default() -> Self {
        Settings { default_layer: Layer::FIRST, root_term: RootTerm { category: Category::Kind, value: 1 } }
    }
}

impl Settings {
    /// Defaults overridden by whichever variables are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(raw) = lookup(DEFAULT_LAYER_VAR) {
            let n: u8 = raw.trim().parse().map_err(|_| MorphError::InvalidSetting {
                name: DEFAULT_LAYER_VAR,
                reason: format!("'{raw}' is not a number"),
            })?;
            settings.default_layer = Layer::new(n)?;
        }

        if let Some(raw) = lookup(ROOT_TERM_VAR) {
            settings.root_term = parse_root_term(&raw)?;
        }

        Ok(settings)
    }
}

fn parse_root_term(raw: &str) -> Result<RootTerm> {
    let invalid = |reason: &str| MorphError::InvalidSetting { name: ROOT_TERM_VAR, reason: format!("'{raw}': {reason}") };

    let (slot, value) = raw.trim().split_once(':').ok_or_else(|| invalid("expected slot:value"))?;
    let slot: usize = slot.parse().map_err(|_| invalid("slot is not a number"))?;
    let category = Category::from_index(slot).ok_or_else(|| invalid("slot out of range"))?;
    let value: u8 = value.parse().map_err(|_| invalid("value is not a byte"))?;
    if value == 0 {
        return Err(invalid("value 0 means unknown"));
    }
    Ok(RootTerm { category, value })
}

/// How much of the forest the caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParsingType {
    /// Everything, including error-tagged branches.
    Debug,
    /// Clean, validated, ranked trees.
    #[default]
    Release,
    /// Clean trees in derivation order.
    Import,
}

/// Per-request options.
#[derive(Debug, Clone)]
pub struct Options {
    pub parsing_type: ParsingType,
    pub max_depth_level: usize,
    /// Explicit layer; when absent the layer is chosen from the word itself.
    pub layer: Option<Layer>,
    pub cancel: CancellationToken,
}

impl Default for Options {
    fn default() -> Self {
        Options { parsing_type: ParsingType::Release, max_depth_level: 4, layer: None, cancel: CancellationToken::new() }
    }
}

impl Options {
    pub fn debug() -> Self {
        Options { parsing_type: ParsingType::Debug, ..Options::default() }
    }

    pub fn with_depth(mut self, max_depth_level: usize) -> Self {
        self.max_depth_level = max_depth_level;
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn reads_layer_and_root_term() {
        let settings =
            Settings::from_lookup(lookup(&[(DEFAULT_LAYER_VAR, "5"), (ROOT_TERM_VAR, "12:3")])).unwrap();
        assert_eq!(settings.default_layer, Layer::new(5).unwrap());
        assert_eq!(settings.root_term, RootTerm { category: Category::Derivation, value: 3 });
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[(DEFAULT_LAYER_VAR, "9")])),
            Err(MorphError::InvalidLayer(9))
        ));
        assert!(Settings::from_lookup(lookup(&[(ROOT_TERM_VAR, "kind")])).is_err());
        assert!(Settings::from_lookup(lookup(&[(ROOT_TERM_VAR, "30:1")])).is_err());
        assert!(Settings::from_lookup(lookup(&[(ROOT_TERM_VAR, "14:0")])).is_err());
    }

    #[test]
    fn root_term_ignores_other_values() {
        let term = RootTerm { category: Category::Kind, value: 1 };
        assert!(term.matches(&Parameters::EMPTY.with(Category::Kind, 1)));
        assert!(!term.matches(&Parameters::EMPTY.with(Category::Kind, 2)));
    }
}
