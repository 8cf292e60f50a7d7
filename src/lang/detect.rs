//! Language detection backed by lingua.
//!
//! The detector is expensive to construct (it loads n-gram models for
//! every candidate language) and cheap to call, so callers build one and
//! share it through an `Arc` in [`crate::config::EnrichmentConfig`].
//!
//! Detection never returns an error: anything the models cannot classify
//! degrades to [`LanguageResult::unknown`], and very short samples fall
//! back to a script-based guess (RTL characters → Arabic, otherwise
//! English). The pipeline logs a warning when detection degrades but
//! always continues.

use crate::bidi;
use crate::config::DetectionMethod;
use crate::document::{LanguageResult, SecondaryLanguage};
use lingua::{Language, LanguageDetectorBuilder};
use std::cmp::Ordering;
use tracing::debug;

/// ISO 639 codes of right-to-left written languages.
const RTL_LANGUAGE_CODES: &[&str] = &[
    "ar", "arc", "dv", "fa", "ha", "he", "khw", "ks", "ku", "ps", "ur", "yi",
];

/// Samples shorter than this (after cleaning) skip the statistical models.
const MIN_DETECTABLE_CHARS: usize = 10;

/// Whether an ISO 639 code names a right-to-left written language.
pub fn is_rtl_language(code: &str) -> bool {
    RTL_LANGUAGE_CODES.contains(&code)
}

/// A shared, reusable language detector.
pub struct LanguageDetector {
    inner: lingua::LanguageDetector,
    method: DetectionMethod,
}

impl std::fmt::Debug for LanguageDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageDetector")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl LanguageDetector {
    /// Build a detector over all languages lingua knows.
    pub fn new(method: DetectionMethod) -> Self {
        let mut builder = LanguageDetectorBuilder::from_all_languages();
        if method == DetectionMethod::Fast {
            builder.with_low_accuracy_mode();
        }
        Self {
            inner: builder.build(),
            method,
        }
    }

    /// Build a detector restricted to a known candidate set. Smaller sets
    /// load faster and disambiguate better; also the constructor used by
    /// the test suite to keep results deterministic.
    pub fn with_languages(languages: &[Language], method: DetectionMethod) -> Self {
        let mut builder = LanguageDetectorBuilder::from_languages(languages);
        if method == DetectionMethod::Fast {
            builder.with_low_accuracy_mode();
        }
        Self {
            inner: builder.build(),
            method,
        }
    }

    pub fn method(&self) -> DetectionMethod {
        self.method
    }

    /// Classify a text sample.
    ///
    /// `min_secondary_confidence` is the floor for reporting secondary
    /// languages; the primary is always reported regardless of its score.
    /// For a fixed method and input the result is deterministic.
    pub fn detect(&self, text: &str, min_secondary_confidence: f64) -> LanguageResult {
        let cleaned = clean_sample(text);
        if cleaned.is_empty() {
            return LanguageResult::unknown();
        }
        if cleaned.chars().count() < MIN_DETECTABLE_CHARS {
            debug!(len = cleaned.len(), "sample too short, using script heuristic");
            return short_sample_result(&cleaned);
        }

        let confidences = self
            .inner
            .compute_language_confidence_values(cleaned.as_str());
        let Some((primary, confidence)) = confidences.first() else {
            return LanguageResult::unknown();
        };
        if *confidence <= 0.0 {
            return LanguageResult::unknown();
        }

        let code = language_code(primary);
        let mut additional: Vec<SecondaryLanguage> = confidences
            .iter()
            .skip(1)
            .filter(|(_, c)| *c > 0.0 && *c >= min_secondary_confidence)
            .map(|(lang, c)| SecondaryLanguage {
                code: language_code(lang),
                name: lang.to_string(),
                confidence: *c,
            })
            .collect();
        sort_secondary(&mut additional);

        debug!(%code, confidence, secondary = additional.len(), "language detected");
        LanguageResult {
            is_rtl: is_rtl_language(&code),
            code,
            name: primary.to_string(),
            confidence: *confidence,
            additional,
        }
    }
}

fn language_code(language: &Language) -> String {
    language.iso_code_639_1().to_string().to_lowercase()
}

/// Confidence descending, ties broken by code ascending, so equal-scored
/// candidates always appear in the same order.
fn sort_secondary(languages: &mut [SecondaryLanguage]) {
    languages.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.code.cmp(&b.code))
    });
}

/// Collapse whitespace runs to single spaces and drop ASCII digits.
/// Digits are language-neutral and dilute n-gram statistics on
/// number-heavy pages (tables, references).
fn clean_sample(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_ascii_digit() {
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Script-based guess for samples too short for the models.
fn short_sample_result(cleaned: &str) -> LanguageResult {
    if cleaned.chars().any(bidi::is_rtl_char) {
        LanguageResult {
            code: "ar".into(),
            name: "Arabic".into(),
            confidence: 0.6,
            is_rtl: true,
            additional: Vec::new(),
        }
    } else {
        LanguageResult {
            code: "en".into(),
            name: "English".into(),
            confidence: 0.5,
            is_rtl: false,
            additional: Vec::new(),
        }
    }
}
