//! # pdf-enrich
//!
//! Language, RTL, and figure enrichment for parsed PDF documents.
//!
//! ## Why this crate?
//!
//! Structural PDF parsers stop at geometry: they tell you where the text
//! cells are, not what language they hold, which way they read, or which
//! rectangles are actually figures. This crate takes a parsed document and
//! adds exactly that layer, without re-opening the PDF bytes. The parser
//! itself is an injected seam ([`StructuralParser`]), so any engine that
//! can produce a [`NativeDocument`] plugs in.
//!
//! ## Pipeline Overview
//!
//! ```text
//! NativeDocument
//!  │
//!  ├─ 1. Sample   bounded text slice from every page
//!  ├─ 2. Detect   primary + secondary languages via lingua, RTL-ness
//!  ├─ 3. Bidi     per-cell RTL detection and isolate normalization,
//!  │              propagated to page and document metadata
//!  ├─ 4. Figures  classifier-or-heuristic extraction, MD5 dedup,
//!  │              caption linking, optional persistence
//!  └─ 5. Adapt    the only exit: enriched document → wire format (JSON)
//! ```
//!
//! Optional steps never fail the run; they degrade into [`StepError`]
//! warnings on the output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_enrich::{enrich_document, DocumentSource, EnrichmentConfig, JsonDocumentParser};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EnrichmentConfig::default();
//!     let source = DocumentSource::from(Path::new("parsed.json"));
//!     let output = enrich_document(source, Arc::new(JsonDocumentParser), config).await?;
//!     println!("language: {:?}", output.document.metadata.language);
//!     eprintln!("{} pages / {} figures in {} ms",
//!         output.stats.page_count,
//!         output.stats.figure_count,
//!         output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod bidi;
pub mod config;
pub mod document;
pub mod enrich;
pub mod error;
pub mod figures;
pub mod lang;
pub mod output;
pub mod parser;

pub use adapter::{ApiDocument, FormatAdapter, JsonFormatAdapter};
pub use config::{DetectionMethod, EnrichmentConfig, EnrichmentConfigBuilder};
pub use document::{
    BoundingBox, Direction, DocumentMetadata, EmbeddedImage, Granularity, LanguageResult,
    NativeDocument, Page, SecondaryLanguage, TextCell,
};
pub use enrich::{
    enrich_document, enrich_document_sync, write_json_to_file, DocumentEnricher, EnricherState,
};
pub use error::{EnrichError, StepError};
pub use figures::{
    Caption, FigureClassifier, FigureExtractor, FigureItem, FigurePrediction, PageRasterizer,
};
pub use lang::{is_rtl_language, Language, LanguageDetector};
pub use output::{EnrichmentOutput, EnrichmentStats};
pub use parser::{DocumentSource, JsonDocumentParser, StructuralParser};
