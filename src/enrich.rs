//! Orchestration: the [`DocumentEnricher`] state machine and the
//! top-level pipeline entry points.
//!
//! The enricher walks a fixed state sequence:
//!
//! ```text
//! Created ──load──▶ Loaded ──enrich──▶ (LanguageDetected) ──▶ (RtlProcessed) ──▶ Ready
//! ```
//!
//! The parenthesised states are reached only when the corresponding step
//! is enabled; `Ready` is reached either way. Optional steps degrade
//! rather than fail: a detector that produces nothing usable becomes a
//! [`StepError`] warning, never an `Err`.
//! Only wrong-state calls, unloadable input, and adapter failures are
//! fatal.

use crate::adapter::FormatAdapter;
use crate::bidi;
use crate::config::EnrichmentConfig;
use crate::document::{Direction, Granularity, NativeDocument};
use crate::error::{EnrichError, StepError};
use crate::figures::{FigureExtractor, FigureItem};
use crate::lang::sampler;
use crate::output::{EnrichmentOutput, EnrichmentStats};
use crate::parser::{DocumentSource, StructuralParser};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of a [`DocumentEnricher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnricherState {
    Created,
    Loaded,
    LanguageDetected,
    RtlProcessed,
    Ready,
}

impl std::fmt::Display for EnricherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Drives one document through load → enrich → convert.
///
/// One enricher per document; the expensive collaborators (parser,
/// detector, classifier) live in the config behind `Arc`s and are shared
/// across enrichers.
pub struct DocumentEnricher {
    parser: Arc<dyn StructuralParser>,
    config: EnrichmentConfig,
    state: EnricherState,
    document: Option<NativeDocument>,
}

impl DocumentEnricher {
    pub fn new(parser: Arc<dyn StructuralParser>, config: EnrichmentConfig) -> Self {
        Self {
            parser,
            config,
            state: EnricherState::Created,
            document: None,
        }
    }

    pub fn state(&self) -> EnricherState {
        self.state
    }

    pub fn document(&self) -> Option<&NativeDocument> {
        self.document.as_ref()
    }

    pub fn into_document(self) -> Option<NativeDocument> {
        self.document
    }

    /// Parse the source through the injected structural parser.
    ///
    /// Valid only once, from `Created`; build a fresh enricher for the
    /// next document.
    pub fn load(&mut self, source: &DocumentSource) -> Result<(), EnrichError> {
        if self.state != EnricherState::Created {
            return Err(self.invalid_state("load"));
        }
        let document = self.parser.parse(source)?;
        info!(pages = document.page_count(), "document loaded");
        self.document = Some(document);
        self.state = EnricherState::Loaded;
        Ok(())
    }

    /// Run the enabled enrichment steps and return any recovered
    /// failures.
    ///
    /// Valid from `Loaded`, and from `Ready` to re-enrich: the RTL pass
    /// resets its counters and text normalization is idempotent, so a
    /// second run converges instead of compounding.
    pub fn enrich(&mut self) -> Result<Vec<StepError>, EnrichError> {
        if !matches!(self.state, EnricherState::Loaded | EnricherState::Ready) {
            return Err(self.invalid_state("enrich"));
        }
        let mut warnings = Vec::new();

        if self.config.detect_language {
            if let Some(detector) = self.config.detector.clone() {
                let max_sample_chars = self.config.max_sample_chars;
                let min_secondary = self.config.min_secondary_confidence;
                let document = self.document_mut("enrich")?;
                let started = Instant::now();
                let sample = sampler::sample(document, max_sample_chars);
                let result = detector.detect(&sample, min_secondary);
                if result.is_unknown() && !sample.is_empty() {
                    let e = StepError::LanguageDetection {
                        detail: format!(
                            "no candidate for a {}-char sample",
                            sample.chars().count()
                        ),
                    };
                    warn!(error = %e, "continuing with unknown language");
                    warnings.push(e);
                }
                document.metadata.apply_language(&result);
                debug!(
                    language = %result.code,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "language step done"
                );
                self.state = EnricherState::LanguageDetected;
            } else {
                debug!("no detector configured, skipping language detection");
            }
        }

        if self.config.process_rtl {
            let document = self.document_mut("enrich")?;
            let started = Instant::now();
            apply_rtl_pass(document);
            debug!(
                rtl_pages = document.metadata.rtl_pages.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "RTL step done"
            );
            self.state = EnricherState::RtlProcessed;
        }

        self.state = EnricherState::Ready;
        Ok(warnings)
    }

    /// Hand the enriched document to a format adapter.
    ///
    /// The only place the adapter is ever called; valid from `Ready`.
    /// Adapter failures surface as [`EnrichError::Conversion`].
    pub fn convert(
        &self,
        adapter: &dyn FormatAdapter,
        figures: &[FigureItem],
    ) -> Result<serde_json::Value, EnrichError> {
        if self.state != EnricherState::Ready {
            return Err(self.invalid_state("convert"));
        }
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| EnrichError::Internal("no document in Ready state".into()))?;
        adapter.convert(document, figures)
    }

    fn document_mut(&mut self, operation: &'static str) -> Result<&mut NativeDocument, EnrichError> {
        let state = self.state;
        self.document.as_mut().ok_or_else(|| EnrichError::InvalidState {
            operation,
            state: state.to_string(),
        })
    }

    fn invalid_state(&self, operation: &'static str) -> EnrichError {
        EnrichError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }
}

/// Detect, normalize, and propagate RTL over every page.
///
/// Line and word cells are processed independently; character cells are
/// not touched (normalizing single characters is meaningless and their
/// volume is huge). A cell's direction is resolved only if still
/// `Unknown`, so the pass writes it at most once per cell. The metadata
/// accumulators are reset up front so re-running converges.
fn apply_rtl_pass(document: &mut NativeDocument) {
    document.metadata.has_rtl = false;
    document.metadata.rtl_pages.clear();
    document.metadata.rtl_lines_count = 0;

    let mut rtl_pages: Vec<usize> = Vec::new();
    let mut rtl_lines = 0usize;
    for page in &mut document.pages {
        let mut page_has_rtl = false;
        for granularity in [Granularity::Line, Granularity::Word] {
            let Some(cells) = page.cells_mut(granularity) else {
                continue;
            };
            for cell in cells.iter_mut() {
                if !bidi::contains_rtl(&cell.text) {
                    if cell.direction == Direction::Unknown {
                        cell.direction = Direction::Ltr;
                    }
                    continue;
                }
                page_has_rtl = true;
                if granularity == Granularity::Line {
                    rtl_lines += 1;
                }
                cell.text = bidi::normalize(&cell.text);
                if cell.direction == Direction::Unknown {
                    cell.direction = Direction::Rtl;
                }
            }
        }
        if page_has_rtl {
            rtl_pages.push(page.index);
        }
    }
    rtl_pages.sort_unstable();
    rtl_pages.dedup();

    document.metadata.has_rtl = !rtl_pages.is_empty();
    document.metadata.rtl_pages = rtl_pages;
    document.metadata.rtl_lines_count = rtl_lines;
}

/// Run the whole pipeline: load, enrich, extract figures.
///
/// The core is blocking (model inference, image encoding, file writes),
/// so it runs inside `spawn_blocking` to keep the caller's executor
/// responsive.
pub async fn enrich_document(
    source: DocumentSource,
    parser: Arc<dyn StructuralParser>,
    config: EnrichmentConfig,
) -> Result<EnrichmentOutput, EnrichError> {
    tokio::task::spawn_blocking(move || enrich_document_sync(source, parser, &config))
        .await
        .map_err(|e| EnrichError::Internal(format!("enrichment task panicked: {e}")))?
}

/// Blocking variant of [`enrich_document`] for synchronous callers.
pub fn enrich_document_sync(
    source: DocumentSource,
    parser: Arc<dyn StructuralParser>,
    config: &EnrichmentConfig,
) -> Result<EnrichmentOutput, EnrichError> {
    let started = Instant::now();

    let mut enricher = DocumentEnricher::new(parser, config.clone());
    enricher.load(&source)?;
    let enrich_started = Instant::now();
    let mut warnings = enricher.enrich()?;
    let enrich_duration_ms = enrich_started.elapsed().as_millis() as u64;

    let document = enricher
        .into_document()
        .ok_or_else(|| EnrichError::Internal("document missing after enrichment".into()))?;

    let figure_started = Instant::now();
    let figures = if config.extract_figures {
        let prediction = FigureExtractor::new(config).predict(&document);
        warnings.extend(prediction.warnings);
        prediction.figures
    } else {
        Vec::new()
    };
    let figure_duration_ms = figure_started.elapsed().as_millis() as u64;

    let stats = EnrichmentStats {
        page_count: document.page_count(),
        figure_count: figures.len(),
        rtl_page_count: document.metadata.rtl_pages.len(),
        rtl_lines_count: document.metadata.rtl_lines_count,
        language: document.metadata.language.clone(),
        enrich_duration_ms,
        figure_duration_ms,
        total_duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        pages = stats.page_count,
        figures = stats.figure_count,
        language = stats.language.as_deref().unwrap_or("unknown"),
        total_ms = stats.total_duration_ms,
        "enrichment complete"
    );

    Ok(EnrichmentOutput {
        document,
        figures,
        warnings,
        stats,
    })
}

/// Atomically write a JSON value: temp file in the same directory, then
/// rename, so readers never observe a half-written file.
pub fn write_json_to_file(value: &serde_json::Value, path: &Path) -> Result<(), EnrichError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| EnrichError::Internal(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, rendered).map_err(|e| EnrichError::OutputWriteFailed {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| EnrichError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), "output written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BoundingBox, Page, TextCell};
    use crate::parser::StructuralParser;

    const ARABIC: &str = "\u{0645}\u{0631}\u{062D}\u{0628}\u{0627}";

    struct StaticParser(NativeDocument);
    impl StructuralParser for StaticParser {
        fn parse(&self, _: &DocumentSource) -> Result<NativeDocument, EnrichError> {
            Ok(self.0.clone())
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 100.0, 12.0)
    }

    fn mixed_document() -> NativeDocument {
        let page0 = Page::new(0, 612.0, 792.0)
            .with_lines(vec![TextCell::new("plain english line", bbox(), 0)]);
        let page1 = Page::new(1, 612.0, 792.0)
            .with_lines(vec![
                TextCell::new(ARABIC, bbox(), 1),
                TextCell::new("latin line", bbox(), 1),
            ])
            .with_words(vec![TextCell::new(ARABIC, bbox(), 1)]);
        let page2 = Page::new(2, 612.0, 792.0);
        NativeDocument::new(vec![page0, page1, page2])
    }

    fn enricher_for(doc: NativeDocument, config: EnrichmentConfig) -> DocumentEnricher {
        DocumentEnricher::new(Arc::new(StaticParser(doc)), config)
    }

    fn source() -> DocumentSource {
        DocumentSource::Bytes(Vec::new())
    }

    #[test]
    fn enrich_before_load_is_an_error() {
        let mut e = enricher_for(mixed_document(), EnrichmentConfig::default());
        let err = e.enrich().unwrap_err();
        assert!(matches!(err, EnrichError::InvalidState { operation: "enrich", .. }));
    }

    #[test]
    fn load_twice_is_an_error() {
        let mut e = enricher_for(mixed_document(), EnrichmentConfig::default());
        e.load(&source()).unwrap();
        let err = e.load(&source()).unwrap_err();
        assert!(matches!(err, EnrichError::InvalidState { operation: "load", .. }));
    }

    #[test]
    fn rtl_propagates_from_cells_to_pages_to_document() {
        let mut e = enricher_for(mixed_document(), EnrichmentConfig::default());
        e.load(&source()).unwrap();
        let warnings = e.enrich().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(e.state(), EnricherState::Ready);

        let doc = e.document().unwrap();
        assert!(doc.metadata.has_rtl);
        assert_eq!(doc.metadata.rtl_pages, vec![1]);
        // one RTL line cell; the RTL word cell is normalized but not counted
        assert_eq!(doc.metadata.rtl_lines_count, 1);

        let lines = doc.pages[1].cells(Granularity::Line).unwrap();
        assert_eq!(lines[0].direction, Direction::Rtl);
        assert!(lines[0].text.starts_with('\u{2067}'));
        assert_eq!(lines[1].direction, Direction::Ltr);
        assert_eq!(lines[1].text, "latin line");

        let words = doc.pages[1].cells(Granularity::Word).unwrap();
        assert_eq!(words[0].direction, Direction::Rtl);
        assert!(words[0].text.starts_with('\u{2067}'));
    }

    #[test]
    fn rtl_only_in_word_cells_still_marks_the_page() {
        let page = Page::new(0, 612.0, 792.0)
            .with_words(vec![TextCell::new(ARABIC, bbox(), 0)]);
        let mut e = enricher_for(
            NativeDocument::new(vec![page]),
            EnrichmentConfig::default(),
        );
        e.load(&source()).unwrap();
        e.enrich().unwrap();
        let meta = &e.document().unwrap().metadata;
        assert!(meta.has_rtl);
        assert_eq!(meta.rtl_pages, vec![0]);
        assert_eq!(meta.rtl_lines_count, 0);
    }

    #[test]
    fn disabled_steps_leave_metadata_neutral() {
        let cfg = EnrichmentConfig::builder()
            .detect_language(false)
            .process_rtl(false)
            .build()
            .unwrap();
        let mut e = enricher_for(mixed_document(), cfg);
        e.load(&source()).unwrap();
        e.enrich().unwrap();
        assert_eq!(e.state(), EnricherState::Ready);
        let meta = &e.document().unwrap().metadata;
        assert!(!meta.has_rtl);
        assert!(meta.rtl_pages.is_empty());
        assert!(meta.language.is_none());
        // cells untouched, direction unresolved
        let lines = e.document().unwrap().pages[1].cells(Granularity::Line).unwrap();
        assert_eq!(lines[0].text, ARABIC);
        assert_eq!(lines[0].direction, Direction::Unknown);
    }

    #[test]
    fn re_enriching_converges() {
        let mut e = enricher_for(mixed_document(), EnrichmentConfig::default());
        e.load(&source()).unwrap();
        e.enrich().unwrap();
        let first = e.document().unwrap().clone();
        e.enrich().unwrap();
        let second = e.document().unwrap();
        assert_eq!(&first, second);
    }

    #[test]
    fn re_enriching_holds_at_the_rtl_threshold() {
        // 3 Arabic chars out of 10 non-whitespace: the smallest fraction
        // that still classifies as RTL
        let page = Page::new(0, 612.0, 792.0).with_lines(vec![TextCell::new(
            "abcdefg \u{0645}\u{0631}\u{062D}",
            bbox(),
            0,
        )]);
        let mut e = enricher_for(
            NativeDocument::new(vec![page]),
            EnrichmentConfig::default(),
        );
        e.load(&source()).unwrap();
        e.enrich().unwrap();
        let first = e.document().unwrap().clone();
        assert!(first.metadata.has_rtl);
        assert_eq!(first.metadata.rtl_pages, vec![0]);
        assert_eq!(first.metadata.rtl_lines_count, 1);

        e.enrich().unwrap();
        assert_eq!(&first, e.document().unwrap());
    }

    #[test]
    fn convert_requires_ready() {
        use crate::adapter::JsonFormatAdapter;
        let mut e = enricher_for(mixed_document(), EnrichmentConfig::default());
        e.load(&source()).unwrap();
        let err = e.convert(&JsonFormatAdapter, &[]).unwrap_err();
        assert!(matches!(err, EnrichError::InvalidState { operation: "convert", .. }));
    }

    #[test]
    fn atomic_write_produces_the_final_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json_to_file(&serde_json::json!({"ok": true}), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"ok\""));
        assert!(!dir.path().join("out.json.tmp").exists());
    }
}
