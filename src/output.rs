//! Output types returned by the top-level pipeline.
//!
//! Everything here serializes to JSON so a whole run (document, figures,
//! warnings, stats) can be dumped for inspection or piped to another tool.

use crate::document::NativeDocument;
use crate::error::{EnrichError, StepError};
use crate::figures::FigureItem;
use serde::{Deserialize, Serialize};

/// The result of one pipeline run.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnrichmentOutput {
    /// The enriched document: normalized cell text, resolved directions,
    /// populated metadata.
    pub document: NativeDocument,
    /// Extracted figures, page ascending, detection order within a page.
    pub figures: Vec<FigureItem>,
    /// Recovered step failures. Empty on a clean run.
    pub warnings: Vec<StepError>,
    pub stats: EnrichmentStats,
}

impl EnrichmentOutput {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn to_json(&self) -> Result<serde_json::Value, EnrichError> {
        serde_json::to_value(self).map_err(|e| EnrichError::Internal(e.to_string()))
    }
}

/// Run statistics, mostly for logs and the CLI summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentStats {
    pub page_count: usize,
    pub figure_count: usize,
    pub rtl_page_count: usize,
    pub rtl_lines_count: usize,
    /// Primary language code, when detected.
    pub language: Option<String>,
    pub enrich_duration_ms: u64,
    pub figure_duration_ms: u64,
    pub total_duration_ms: u64,
}
