//! Language identification over parsed documents.
//!
//! Two stages, each independently testable:
//!
//! 1. [`sampler`] — build a bounded, representative text sample across all
//!    pages so detection cost does not scale with document length
//! 2. [`detect`] — classify the sample with lingua and derive RTL-ness of
//!    the primary language

pub mod detect;
pub mod sampler;

pub use detect::{is_rtl_language, LanguageDetector};

// Candidate languages are lingua's own enum; re-exported so callers of
// `LanguageDetector::with_languages` need no direct lingua dependency.
pub use lingua::Language;
