//! Error taxonomy.
//!
//! Only two kinds of failure surface as `Err`:
//!
//! - **precondition violations**: the caller asked for something the engine
//!   cannot answer yet (a rating before a layer was selected, an unknown id).
//! - **defects**: an internal invariant does not hold (a cyclic corpus, a
//!   malformed entry link).
//!
//! A lookup that simply has no corpus match is *not* an error. Managers return
//! empty results, and the builder/pipeline turn that into a per-solution
//! [`SolutionError`](crate::SolutionError).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MorphError {
    #[error("morph entry {0} not found")]
    EntryNotFound(u32),

    #[error("morph rule {0} not found")]
    RuleNotFound(u32),

    #[error("sandhi rule {0} not found")]
    SandhiRuleNotFound(u32),

    #[error("no chronological layer selected")]
    LayerNotSet,

    #[error("invalid chronological layer {0} (expected 1..=8)")]
    InvalidLayer(u8),

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("analysis cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Defect(String),
}

pub type Result<T> = std::result::Result<T, MorphError>;

/// Returns `Err(Cancelled)` once the token has fired.
pub(crate) fn ensure_active(cancel: &tokio_util::sync::CancellationToken) -> Result<()> {
    if cancel.is_cancelled() { Err(MorphError::Cancelled) } else { Ok(()) }
}
