//! Configuration types for document enrichment.
//!
//! All enrichment behaviour is controlled through [`EnrichmentConfig`],
//! built via its [`EnrichmentConfigBuilder`]. Keeping every knob in one
//! struct makes it trivial to share configs across threads and to diff two
//! runs to understand why their outputs differ.
//!
//! The config also carries the injected capabilities (language detector,
//! figure classifier, page rasterizer) as shared handles. They are
//! constructed once by the caller and reused across documents; a missing
//! handle selects the documented fallback behaviour instead of failing.

use crate::error::EnrichError;
use crate::figures::{FigureClassifier, PageRasterizer};
use crate::lang::detect::LanguageDetector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one enrichment pipeline.
///
/// Built via [`EnrichmentConfig::builder()`] or using
/// [`EnrichmentConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_enrich::EnrichmentConfig;
///
/// let config = EnrichmentConfig::builder()
///     .max_sample_chars(5_000)
///     .detect_captions(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct EnrichmentConfig {
    /// Run language detection over the document sample. Default: true.
    ///
    /// Has no effect unless a [`LanguageDetector`] handle is also set;
    /// without one the step is skipped and metadata stays neutral.
    pub detect_language: bool,

    /// Detection accuracy/speed trade-off. Default: [`DetectionMethod::Auto`].
    pub detection_method: DetectionMethod,

    /// Total character budget for the detection sample. Range: 100–1 000 000.
    /// Default: 10 000.
    ///
    /// The budget is split evenly across pages (capped at 1 000 chars per
    /// page) so a long appendix in one language cannot drown out the rest
    /// of the document.
    pub max_sample_chars: usize,

    /// Minimum confidence for a secondary language to be reported.
    /// Range: 0.0–1.0. Default: 0.15.
    pub min_secondary_confidence: f64,

    /// Detect and normalize RTL text. Default: true.
    pub process_rtl: bool,

    /// Run figure extraction in the top-level pipeline. Default: true.
    pub extract_figures: bool,

    /// Drop figures whose image bytes digest-match an earlier figure in the
    /// same extraction call. Default: true.
    pub deduplicate_figures: bool,

    /// Link caption lines to extracted figures. Default: true.
    pub detect_captions: bool,

    /// Directory to persist figure images into. Default: None (no files
    /// written). Created on demand; write failures degrade to warnings.
    pub figure_output_dir: Option<PathBuf>,

    /// Shared language detector. Built once (model load is expensive) and
    /// reused for every document.
    pub detector: Option<Arc<LanguageDetector>>,

    /// Optional trained figure classifier. When absent or failing,
    /// extraction falls back to the embedded-image heuristic.
    pub classifier: Option<Arc<dyn FigureClassifier>>,

    /// Optional page rasterizer backing the whole-page figure fallback.
    /// When absent, fallback figures carry no image bytes.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            detect_language: true,
            detection_method: DetectionMethod::default(),
            max_sample_chars: 10_000,
            min_secondary_confidence: 0.15,
            process_rtl: true,
            extract_figures: true,
            deduplicate_figures: true,
            detect_captions: true,
            figure_output_dir: None,
            detector: None,
            classifier: None,
            rasterizer: None,
        }
    }
}

impl fmt::Debug for EnrichmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichmentConfig")
            .field("detect_language", &self.detect_language)
            .field("detection_method", &self.detection_method)
            .field("max_sample_chars", &self.max_sample_chars)
            .field("min_secondary_confidence", &self.min_secondary_confidence)
            .field("process_rtl", &self.process_rtl)
            .field("extract_figures", &self.extract_figures)
            .field("deduplicate_figures", &self.deduplicate_figures)
            .field("detect_captions", &self.detect_captions)
            .field("figure_output_dir", &self.figure_output_dir)
            .field("detector", &self.detector.as_ref().map(|_| "<LanguageDetector>"))
            .field(
                "classifier",
                &self.classifier.as_ref().map(|_| "<dyn FigureClassifier>"),
            )
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"),
            )
            .finish()
    }
}

impl EnrichmentConfig {
    /// Create a new builder for `EnrichmentConfig`.
    pub fn builder() -> EnrichmentConfigBuilder {
        EnrichmentConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EnrichmentConfig`].
#[derive(Debug)]
pub struct EnrichmentConfigBuilder {
    config: EnrichmentConfig,
}

impl EnrichmentConfigBuilder {
    pub fn detect_language(mut self, v: bool) -> Self {
        self.config.detect_language = v;
        self
    }

    pub fn detection_method(mut self, method: DetectionMethod) -> Self {
        self.config.detection_method = method;
        self
    }

    pub fn max_sample_chars(mut self, n: usize) -> Self {
        self.config.max_sample_chars = n.clamp(100, 1_000_000);
        self
    }

    pub fn min_secondary_confidence(mut self, c: f64) -> Self {
        self.config.min_secondary_confidence = c.clamp(0.0, 1.0);
        self
    }

    pub fn process_rtl(mut self, v: bool) -> Self {
        self.config.process_rtl = v;
        self
    }

    pub fn extract_figures(mut self, v: bool) -> Self {
        self.config.extract_figures = v;
        self
    }

    pub fn deduplicate_figures(mut self, v: bool) -> Self {
        self.config.deduplicate_figures = v;
        self
    }

    pub fn detect_captions(mut self, v: bool) -> Self {
        self.config.detect_captions = v;
        self
    }

    pub fn figure_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.figure_output_dir = Some(dir.into());
        self
    }

    pub fn detector(mut self, detector: Arc<LanguageDetector>) -> Self {
        self.config.detector = Some(detector);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn FigureClassifier>) -> Self {
        self.config.classifier = Some(classifier);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EnrichmentConfig, EnrichError> {
        let c = &self.config;
        if c.max_sample_chars == 0 {
            return Err(EnrichError::InvalidConfig(
                "max_sample_chars must be ≥ 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.min_secondary_confidence) {
            return Err(EnrichError::InvalidConfig(format!(
                "min_secondary_confidence must be in [0, 1], got {}",
                c.min_secondary_confidence
            )));
        }
        // detect_language without a detector handle is allowed: the step
        // degrades to a skip, so figure-only callers never pay for a model.
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Accuracy/speed trade-off for language detection.
///
/// `Fast` loads lingua's low-accuracy models, roughly halving memory and
/// classification time at a measurable accuracy cost on short samples.
/// `Auto` currently resolves to `Accurate`; it exists so callers can opt
/// into future adaptive behaviour without an API change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Let the library pick (currently: accurate). (default)
    #[default]
    Auto,
    /// Full-size language models.
    Accurate,
    /// Low-accuracy mode: smaller models, faster classification.
    Fast,
}
