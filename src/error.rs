//! Error types for the pdf-enrich library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`EnrichError`] — **Fatal**: the pipeline cannot proceed at all
//!   (missing input, unparseable document, operation called in the wrong
//!   state). Returned as `Err(EnrichError)` from `load`, `convert`, and the
//!   top-level `enrich_document*` functions.
//!
//! * [`StepError`] — **Non-fatal**: an optional enrichment step degraded
//!   (detector produced nothing usable, classifier call failed, one figure
//!   file could not be written) but the document is still valid. Collected
//!   into [`crate::output::EnrichmentOutput::warnings`] so callers can see
//!   exactly what was skipped instead of the step silently vanishing.
//!
//! The separation lets callers decide their own tolerance: treat any warning
//! as a failure, log and continue, or ignore warnings entirely.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-enrich library.
///
/// Recoverable step failures use [`StepError`] and are reported through
/// [`crate::output::EnrichmentOutput::warnings`] rather than propagated here.
#[derive(Debug, Error)]
pub enum EnrichError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("document not found: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The structural parser read the bytes but rejected their content.
    #[error("structural parser rejected the document: {detail}")]
    Parse { detail: String },

    // ── State machine ─────────────────────────────────────────────────────
    /// An operation was called while the enricher was in the wrong state,
    /// e.g. `enrich()` before `load()`.
    #[error("'{operation}' is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The format adapter failed to produce output for an enriched document.
    #[error("conversion to '{format}' failed: {detail}")]
    Conversion { format: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal error from a single enrichment step.
///
/// Stored in [`crate::output::EnrichmentOutput::warnings`]. The pipeline
/// always continues past these: a document with unknown language or a
/// missing figure file is degraded, not broken.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StepError {
    /// The language detector could not identify any language for a
    /// non-empty sample; the document keeps the unknown result.
    #[error("language detection produced no result: {detail}")]
    LanguageDetection { detail: String },

    /// The injected figure classifier failed; extraction fell back to the
    /// embedded-image heuristic.
    #[error("figure classifier failed, falling back to heuristic: {detail}")]
    Classifier { detail: String },

    /// The injected page rasterizer failed for one page; the whole-page
    /// figure candidate is emitted without image bytes.
    #[error("page {page}: rasterisation failed: {detail}")]
    Rasterisation { page: usize, detail: String },

    /// One figure image could not be written to the output directory.
    #[error("failed to write figure '{path}': {detail}")]
    FigureWrite { path: String, detail: String },
}
