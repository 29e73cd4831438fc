use crate::builder::{BuildContext, CorpusBuilder, ForestBuilder};
use crate::error::{Result, ensure_active};
use crate::forest::Forest;
use crate::lookup::{Corpus, Layer, Managers};
use crate::pipeline::{Pipeline, Request, RunMetrics};
use crate::settings::{Options, ParsingType, Settings};
use parking_lot::Mutex;
use std::time::Instant;

/// Result of [`Analyzer::analyze`].
#[derive(Debug, Clone)]
pub struct Analysis {
    /// The analyzed surface.
    pub word: String,
    pub parsing_type: ParsingType,
    /// Chronological layer the ratings were computed in.
    pub layer: Layer,
    /// The reduced solution forest.
    pub forest: Forest,
    pub metrics: RunMetrics,
}

/// A morphological analysis session over one corpus.
///
/// Managers and their memo tables are shared by every call. The selected
/// frequency layer is session state, so analyses run one at a time.
///
/// # Example
/// ```
/// use pali_morph::{Analyzer, Options, Settings, sample};
///
/// let analyzer = Analyzer::new(sample::corpus(), Settings::default()).unwrap();
/// let analysis = analyzer.analyze("buddhena", &Options::default()).unwrap();
/// assert!(!analysis.forest.root.solutions.is_empty());
/// ```
pub struct Analyzer {
    managers: Managers,
    settings: Settings,
    builder: Box<dyn ForestBuilder>,
    pipeline: Pipeline,
    session: Mutex<()>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("managers", &self.managers)
            .field("settings", &self.settings)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    pub fn new(corpus: Corpus, settings: Settings) -> Result<Self> {
        Ok(Analyzer {
            managers: Managers::load(corpus, &settings)?,
            settings,
            builder: Box::new(CorpusBuilder),
            pipeline: Pipeline::standard(),
            session: Mutex::new(()),
        })
    }

    /// Replace the raw forest construction.
    pub fn with_builder(mut self, builder: impl ForestBuilder + 'static) -> Self {
        self.builder = Box::new(builder);
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn managers(&self) -> &Managers {
        &self.managers
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build the solution forest for `word` and reduce it according to
    /// `options.parsing_type`.
    ///
    /// The frequency layer is `options.layer` when given, otherwise the layer
    /// where `word` is relatively most frequent. Memo tables are cleared at
    /// the end of every analysis, including failed ones.
    pub fn analyze(&self, word: &str, options: &Options) -> Result<Analysis> {
        let _session = self.session.lock();
        let result = self.analyze_locked(word, options);
        if result.is_err() {
            self.managers.clear();
        }
        result
    }

    fn analyze_locked(&self, word: &str, options: &Options) -> Result<Analysis> {
        let started = Instant::now();
        let cancel = &options.cancel;
        ensure_active(cancel)?;

        let frequencies = &self.managers.frequencies;
        let layer = match options.layer {
            Some(layer) => {
                frequencies.set_layer(layer);
                layer
            }
            None => frequencies.set_layer_by_entry(word, cancel)?,
        };
        let _span = tracing::info_span!("analyze", word, %layer, mode = ?options.parsing_type).entered();

        let build_started = Instant::now();
        let cx = BuildContext {
            managers: &self.managers,
            settings: &self.settings,
            max_depth_level: options.max_depth_level,
            cancel,
        };
        let forest = self.builder.build(word, &cx)?;
        let build = build_started.elapsed();
        let built = forest.count();

        let request = Request { forest, parsing_type: options.parsing_type, max_depth_level: options.max_depth_level };
        let run = self.pipeline.run(request, &self.managers, cancel)?;

        let metrics = RunMetrics { total: started.elapsed(), build, built, stages: run.stages };
        tracing::info!(built, kept = run.forest.count(), elapsed = ?metrics.total, "analysis done");

        Ok(Analysis { word: word.to_string(), parsing_type: options.parsing_type, layer, forest: run.forest, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MorphError;
    use crate::forest::{Solution, SolutionError, WordForm};
    use crate::model::{MorphBase, MorphEntry};
    use crate::parameters::{Category, Parameters};
    use crate::sample;
    use pretty_assertions::assert_eq;

    fn analyzer() -> Analyzer {
        Analyzer::new(sample::corpus(), Settings::default()).unwrap()
    }

    fn walk<'a>(wf: &'a WordForm, out: &mut Vec<&'a Solution>) {
        for s in &wf.solutions {
            out.push(s);
            for child in [&s.left, &s.right].into_iter().flatten() {
                walk(child, out);
            }
        }
    }

    fn all(forest: &Forest) -> Vec<&Solution> {
        let mut out = Vec::new();
        walk(&forest.root, &mut out);
        out
    }

    #[test]
    fn release_analysis_of_inflected_noun() {
        let analysis = analyzer().analyze("buddhena", &Options::default()).unwrap();
        let root = &analysis.forest.root;
        assert_eq!(root.entry, "buddhena");
        assert_eq!(root.solutions.len(), 1);

        let best = &root.solutions[0];
        assert_eq!(best.rule_ids(), vec![1]);
        assert_eq!(best.sandhi[0].sandhi_expression, "buddha+ena");
        assert_eq!(best.left.as_ref().unwrap().entry, "buddha");
        assert_eq!(best.right.as_ref().unwrap().entry, "ena");
        // Gender filled in from the only matching combination.
        assert_eq!(best.content.parameters.get(Category::Gender), 1);
    }

    #[test]
    fn release_forest_is_clean() {
        for word in ["buddhena", "buddhehi", "buddhadhamma", "dhammena", "sangha", "xyz"] {
            let analysis = analyzer().analyze(word, &Options::default()).unwrap();
            for s in all(&analysis.forest) {
                assert!(s.is_success(), "{word}: {:?}", s.content.error);
                assert!(s.is_complete(), "{word}");
                if s.content.base == MorphBase::None {
                    assert!(s.left.is_none() && s.right.is_none());
                }
            }
        }
    }

    #[test]
    fn attested_compound_hides_its_derivation() {
        let analysis = analyzer().analyze("buddhadhamma", &Options::default()).unwrap();
        let root = &analysis.forest.root;
        assert_eq!(root.solutions.len(), 1);
        assert!(root.solutions[0].is_dictionary());
    }

    #[test]
    fn debug_keeps_error_branches() {
        let analysis = analyzer().analyze("buddhadhamma", &Options::debug()).unwrap();
        assert!(analysis.forest.root.solutions.iter().any(|s| !s.is_success()));

        let release = analyzer().analyze("buddhadhamma", &Options::default()).unwrap();
        assert!(analysis.forest.count() > release.forest.count());
    }

    #[test]
    fn depth_zero_tags_derivations_in_debug() {
        let analysis = analyzer().analyze("buddhena", &Options::debug().with_depth(0)).unwrap();
        let derived = analysis.forest.root.solutions.iter().find(|s| s.rule_ids() == vec![1] && s.left.is_some());
        assert_eq!(derived.unwrap().content.error, SolutionError::DepthIsExceeded);

        let release = analyzer().analyze("buddhena", &Options::default().with_depth(0)).unwrap();
        assert!(release.forest.root.solutions.is_empty());
    }

    #[test]
    fn unknown_word_has_no_release_solutions() {
        let analysis = analyzer().analyze("xyz", &Options::default()).unwrap();
        assert!(analysis.forest.root.solutions.is_empty());
        assert_eq!(analysis.layer, Layer::FIRST);
    }

    #[test]
    fn layer_follows_the_word_unless_given() {
        let a = analyzer();
        assert_eq!(a.analyze("buddhena", &Options::default()).unwrap().layer.number(), 3);
        let five = Layer::new(5).unwrap();
        assert_eq!(a.analyze("buddhena", &Options::default().with_layer(five)).unwrap().layer, five);
    }

    #[test]
    fn caches_are_cleared_after_each_analysis() {
        let a = analyzer();
        a.analyze("buddhena", &Options::default()).unwrap();
        assert_eq!(a.managers().cached(), 0);
    }

    #[test]
    fn metrics_cover_every_stage() {
        let analysis = analyzer().analyze("buddhena", &Options::default()).unwrap();
        let names: Vec<&str> = analysis.metrics.stages.iter().map(|s| s.name).collect();
        assert_eq!(names, Pipeline::standard().names());
        assert!(analysis.metrics.built >= analysis.forest.count());
    }

    #[test]
    fn cancelled_analysis_fails_and_leaves_no_cache() {
        let a = analyzer();
        let options = Options::default();
        options.cancel.cancel();
        assert!(matches!(a.analyze("buddhena", &options), Err(MorphError::Cancelled)));
        assert_eq!(a.managers().cached(), 0);
    }

    #[test]
    fn new_entries_are_visible_to_the_next_analysis() {
        let a = analyzer();
        let before = a.analyze("bodhi", &Options::default()).unwrap();
        assert!(before.forest.root.solutions.is_empty());

        let parameters =
            Parameters::EMPTY.with(Category::PartOfSpeech, 1).with(Category::Gender, 1).with(Category::Kind, 1);
        let id = a.managers().entries.insert(MorphEntry::atom(0, "bodhi", parameters)).unwrap();
        assert!(id > 0);

        let after = a.analyze("bodhi", &Options::default()).unwrap();
        assert_eq!(after.forest.root.solutions.len(), 1);
        assert_eq!(after.forest.root.solutions[0].content.id, id);
    }
}
