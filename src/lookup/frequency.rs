//! Frequency rater.
//!
//! Usage counts are kept per chronological layer. A word's rating is its share
//! of the selected layer, flattened by word length so that long rare compounds
//! are not crushed next to short particles:
//!
//! ```text
//! rating(entry) = (occurrence(layer, entry) / total(layer)) ^ (1 / chars(entry))
//! ```
//!
//! The layer is either set explicitly or picked as the layer where the word is
//! relatively most frequent.

use super::memo::Memo;
use super::provider::Provider;
use crate::error::{MorphError, Result, ensure_active};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

pub const LAYER_COUNT: usize = 8;

/// One of the chronological corpora, numbered `1..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Layer(u8);

impl Layer {
    pub const FIRST: Layer = Layer(1);

    pub fn new(number: u8) -> Result<Self> {
        if (1..=LAYER_COUNT as u8).contains(&number) { Ok(Layer(number)) } else { Err(MorphError::InvalidLayer(number)) }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize - 1
    }

    pub fn all() -> impl Iterator<Item = Layer> {
        (1..=LAYER_COUNT as u8).map(Layer)
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Occurrence count of a surface in one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frequency {
    pub layer: Layer,
    pub entry: String,
    pub count: u64,
}

impl Frequency {
    pub fn new(layer: Layer, entry: impl Into<String>, count: u64) -> Self {
        Frequency { layer, entry: entry.into(), count }
    }
}

#[derive(Debug)]
pub struct FrequencyRater {
    counts: HashMap<String, [u64; LAYER_COUNT]>,
    totals: [u64; LAYER_COUNT],
    default_layer: Layer,
    selected: RwLock<Option<Layer>>,
    memo: Memo<(Layer, String), f64>,
}

impl FrequencyRater {
    pub fn new(provider: &dyn Provider<Frequency>, default_layer: Layer) -> Result<Self> {
        Ok(Self::from_rows(provider.values()?, default_layer))
    }

    /// Totals are the per-layer sums of all rows.
    pub fn from_rows(rows: Vec<Frequency>, default_layer: Layer) -> Self {
        let mut counts: HashMap<String, [u64; LAYER_COUNT]> = HashMap::new();
        let mut totals = [0u64; LAYER_COUNT];
        for row in rows {
            counts.entry(row.entry).or_default()[row.layer.index()] += row.count;
            totals[row.layer.index()] += row.count;
        }
        FrequencyRater { counts, totals, default_layer, selected: RwLock::new(None), memo: Memo::new("frequency.rating") }
    }

    pub fn total(&self, layer: Layer) -> u64 {
        self.totals[layer.index()]
    }

    pub fn occurrence(&self, layer: Layer, entry: &str) -> u64 {
        self.counts.get(entry).map_or(0, |c| c[layer.index()])
    }

    fn ratio(&self, layer: Layer, entry: &str) -> f64 {
        let total = self.total(layer);
        if total == 0 { 0.0 } else { self.occurrence(layer, entry) as f64 / total as f64 }
    }

    pub fn set_layer(&self, layer: Layer) {
        *self.selected.write() = Some(layer);
    }

    pub fn layer(&self) -> Result<Layer> {
        self.selected.read().ok_or(MorphError::LayerNotSet)
    }

    /// Select the layer where `entry` is relatively most frequent; the default
    /// layer when it occurs nowhere. Ties go to the earlier layer.
    pub fn set_layer_by_entry(&self, entry: &str, cancel: &CancellationToken) -> Result<Layer> {
        ensure_active(cancel)?;
        let mut best: Option<(Layer, f64)> = None;
        for layer in Layer::all() {
            let ratio = self.ratio(layer, entry);
            if ratio > 0.0 && best.is_none_or(|(_, r)| ratio > r) {
                best = Some((layer, ratio));
            }
        }
        let layer = best.map_or(self.default_layer, |(layer, _)| layer);
        tracing::debug!(entry, %layer, fallback = best.is_none(), "layer selected");
        self.set_layer(layer);
        Ok(layer)
    }

    /// Popularity of `entry` in the selected layer, in `[0, 1]`.
    pub fn rating(&self, entry: &str, cancel: &CancellationToken) -> Result<f64> {
        let layer = self.layer()?;
        self.memo.get_or_try_insert_with((layer, entry.to_string()), || {
            ensure_active(cancel)?;
            let len = entry.chars().count();
            if len == 0 {
                return Ok(0.0);
            }
            Ok(self.ratio(layer, entry).powf(1.0 / len as f64))
        })
    }

    pub fn cached(&self) -> usize {
        self.memo.len()
    }

    /// Drops the per-entry memo only; the selected layer is kept.
    pub fn clear(&self) {
        self.memo.clear();
    }
}
