//! The format-adapter boundary: how enriched documents leave the
//! pipeline.
//!
//! [`DocumentEnricher::convert`](crate::enrich::DocumentEnricher::convert)
//! is the only caller of [`FormatAdapter`]. Adapters see a read-only
//! document plus the extracted figures and own the entire wire shape;
//! the built-in [`JsonFormatAdapter`] emits the page/block/table/figure
//! JSON structure downstream tooling consumes.

use crate::document::{DocumentMetadata, NativeDocument, Page};
use crate::error::EnrichError;
use crate::figures::FigureItem;
use serde::{Deserialize, Serialize};

/// Converts an enriched document into an external representation.
pub trait FormatAdapter: Send + Sync {
    /// Short name of the produced format, e.g. "json".
    fn target_format(&self) -> &str;

    /// Produce the output value. Must not mutate anything; failures map
    /// to [`EnrichError::Conversion`] at the call site.
    fn convert(
        &self,
        document: &NativeDocument,
        figures: &[FigureItem],
    ) -> Result<serde_json::Value, EnrichError>;
}

/// The wire shape of one converted document.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub metadata: DocumentMetadata,
    pub pages: Vec<ApiPage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiPage {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub blocks: Vec<ApiBlock>,
    /// Always empty: the native model carries no tables yet. The field
    /// stays so consumers see a stable shape.
    pub tables: Vec<ApiTable>,
    pub figures: Vec<ApiFigure>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiBlock {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiTable {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiFigure {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// The built-in JSON adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatAdapter;

impl FormatAdapter for JsonFormatAdapter {
    fn target_format(&self) -> &str {
        "json"
    }

    fn convert(
        &self,
        document: &NativeDocument,
        figures: &[FigureItem],
    ) -> Result<serde_json::Value, EnrichError> {
        let pages = document
            .pages
            .iter()
            .map(|page| api_page(page, figures))
            .collect();
        let api = ApiDocument {
            source_name: document.source_name.clone(),
            metadata: document.metadata.clone(),
            pages,
        };
        serde_json::to_value(&api).map_err(|e| EnrichError::Conversion {
            format: self.target_format().to_string(),
            detail: e.to_string(),
        })
    }
}

fn api_page(page: &Page, figures: &[FigureItem]) -> ApiPage {
    let blocks = page
        .best_granularity()
        .and_then(|g| page.cells(g))
        .map(|cells| {
            cells
                .iter()
                .map(|cell| ApiBlock {
                    x0: cell.bbox.x0,
                    y0: cell.bbox.y0,
                    x1: cell.bbox.x1,
                    y1: cell.bbox.y1,
                    text: cell.text.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    let page_figures = figures
        .iter()
        .filter(|f| f.page_index == page.index)
        .map(|f| ApiFigure {
            x0: f.bbox.x0,
            y0: f.bbox.y0,
            x1: f.bbox.x1,
            y1: f.bbox.y1,
            caption: f.caption.as_ref().map(|c| c.text.clone()),
        })
        .collect();
    ApiPage {
        index: page.index,
        width: page.width,
        height: page.height,
        blocks,
        tables: Vec::new(),
        figures: page_figures,
    }
}
