//! End-to-end tests through the public API: JSON document in, enriched
//! output (and converted JSON) out.

use pdf_enrich::{
    enrich_document, enrich_document_sync, BoundingBox, DetectionMethod, Direction,
    DocumentEnricher, DocumentSource, EmbeddedImage, EnrichError, EnrichmentConfig, FormatAdapter,
    Granularity, JsonDocumentParser, JsonFormatAdapter, Language, LanguageDetector,
    NativeDocument, Page, TextCell,
};
use std::path::PathBuf;
use std::sync::Arc;

const ARABIC_LINE: &str =
    "\u{0645}\u{0631}\u{062D}\u{0628}\u{0627} \u{0628}\u{0643}\u{0645} \u{0641}\u{064A} \u{0627}\u{0644}\u{062A}\u{0642}\u{0631}\u{064A}\u{0631}";

fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
    BoundingBox::new(x0, y0, x1, y1)
}

fn line(text: &str, page: usize, y: f64) -> TextCell {
    TextCell::new(text, bbox(50.0, y, 550.0, y + 12.0), page)
}

/// Three pages: mostly English text, one Arabic line on page 1, one
/// embedded image with a caption line on page 0, and an empty page 2.
fn fixture_document() -> NativeDocument {
    let page0 = Page::new(0, 612.0, 792.0)
        .with_lines(vec![
            line("The annual report covers revenue and operations.", 0, 40.0),
            line("Growth was steady across all four quarters of the year.", 0, 60.0),
            line("Figure 1: revenue by quarter", 0, 320.0),
        ])
        .with_images(vec![EmbeddedImage {
            bbox: bbox(100.0, 100.0, 400.0, 300.0),
            data: vec![1, 2, 3, 4],
            format: "png".into(),
        }]);
    let page1 = Page::new(1, 612.0, 792.0).with_lines(vec![
        line("A short bilingual section follows below.", 1, 40.0),
        line(ARABIC_LINE, 1, 60.0),
    ]);
    let page2 = Page::new(2, 612.0, 792.0);
    NativeDocument::new(vec![page0, page1, page2])
}

fn write_fixture(doc: &NativeDocument) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("parsed.json");
    std::fs::write(&path, serde_json::to_vec(doc).expect("serialize")).expect("write fixture");
    (dir, path)
}

fn detector() -> Arc<LanguageDetector> {
    Arc::new(LanguageDetector::with_languages(
        &[Language::English, Language::Arabic],
        DetectionMethod::Accurate,
    ))
}

#[tokio::test]
async fn full_pipeline_enriches_a_mixed_document() {
    let (_dir, path) = write_fixture(&fixture_document());
    let config = EnrichmentConfig::builder()
        .detector(detector())
        .build()
        .expect("config");

    let output = enrich_document(
        DocumentSource::Path(path),
        Arc::new(JsonDocumentParser),
        config,
    )
    .await
    .expect("pipeline");

    let meta = &output.document.metadata;
    assert_eq!(meta.language.as_deref(), Some("en"));
    assert_eq!(meta.language_name.as_deref(), Some("English"));
    assert!(!meta.is_rtl_language);
    assert!(meta.has_rtl);
    assert_eq!(meta.rtl_pages, vec![1]);
    assert_eq!(meta.rtl_lines_count, 1);

    // the Arabic line got isolates and a resolved direction
    let lines = output.document.pages[1].cells(Granularity::Line).unwrap();
    assert_eq!(lines[1].direction, Direction::Rtl);
    assert!(lines[1].text.contains('\u{2067}'));
    assert_eq!(lines[0].direction, Direction::Ltr);

    // figures: one embedded (0.8, with caption), two page fallbacks (0.5)
    assert_eq!(output.figures.len(), 3);
    let embedded = &output.figures[0];
    assert_eq!(embedded.page_index, 0);
    assert!((embedded.confidence - 0.8).abs() < 1e-6);
    assert_eq!(
        embedded.caption.as_ref().map(|c| c.text.as_str()),
        Some("Figure 1: revenue by quarter")
    );
    assert!(output.figures[1..]
        .iter()
        .all(|f| (f.confidence - 0.5).abs() < 1e-6 && f.image_bytes.is_none()));

    assert!(output.warnings.is_empty());
    assert_eq!(output.stats.page_count, 3);
    assert_eq!(output.stats.figure_count, 3);
    assert_eq!(output.stats.language.as_deref(), Some("en"));

    // source name propagated from the file stem
    assert_eq!(output.document.source_name.as_deref(), Some("parsed"));
}

#[test]
fn sync_entry_point_runs_without_a_runtime() {
    let (_dir, path) = write_fixture(&fixture_document());
    let config = EnrichmentConfig::builder()
        .detect_language(false)
        .build()
        .expect("config");
    let output = enrich_document_sync(
        DocumentSource::Path(path),
        Arc::new(JsonDocumentParser),
        &config,
    )
    .expect("pipeline");
    assert!(output.document.metadata.language.is_none());
    assert!(output.document.metadata.has_rtl);
}

#[tokio::test]
async fn missing_input_is_not_found() {
    let err = enrich_document(
        DocumentSource::Path(PathBuf::from("/nonexistent/parsed.json")),
        Arc::new(JsonDocumentParser),
        EnrichmentConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EnrichError::NotFound { .. }));
}

#[tokio::test]
async fn malformed_input_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, b"{\"pages\": 42}").unwrap();
    let err = enrich_document(
        DocumentSource::Path(path),
        Arc::new(JsonDocumentParser),
        EnrichmentConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EnrichError::Parse { .. }));
}

#[test]
fn enricher_convert_produces_the_wire_shape() {
    let config = EnrichmentConfig::default();
    let bytes = serde_json::to_vec(&fixture_document()).unwrap();

    let mut enricher = DocumentEnricher::new(Arc::new(JsonDocumentParser), config.clone());
    enricher.load(&DocumentSource::Bytes(bytes)).unwrap();
    enricher.enrich().unwrap();

    let extractor = pdf_enrich::FigureExtractor::new(&config);
    let figures = extractor.predict(enricher.document().unwrap()).figures;
    let value = enricher.convert(&JsonFormatAdapter, &figures).unwrap();

    let pages = value["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 3);
    for page in pages {
        assert!(page["blocks"].is_array());
        assert!(page["tables"].is_array());
        assert!(page["figures"].is_array());
    }
    assert_eq!(value["metadata"]["has_rtl"], true);
    assert_eq!(pages[0]["figures"][0]["caption"], "Figure 1: revenue by quarter");
}

#[tokio::test]
async fn figure_images_are_persisted_to_the_output_dir() {
    let (_dir, path) = write_fixture(&fixture_document());
    let out_dir = tempfile::tempdir().unwrap();
    let config = EnrichmentConfig::builder()
        .detect_language(false)
        .figure_output_dir(out_dir.path().join("figures"))
        .build()
        .unwrap();

    let output = enrich_document(
        DocumentSource::Path(path),
        Arc::new(JsonDocumentParser),
        config,
    )
    .await
    .unwrap();

    // only the embedded figure has bytes to write
    let saved = out_dir.path().join("figures").join("figure_001_001.png");
    assert_eq!(std::fs::read(&saved).unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(
        output.figures[0].metadata.get("saved_path").unwrap(),
        &saved.display().to_string()
    );
}

#[tokio::test]
async fn disabled_figures_skip_extraction_entirely() {
    let (_dir, path) = write_fixture(&fixture_document());
    let config = EnrichmentConfig::builder()
        .detect_language(false)
        .extract_figures(false)
        .build()
        .unwrap();
    let output = enrich_document(
        DocumentSource::Path(path),
        Arc::new(JsonDocumentParser),
        config,
    )
    .await
    .unwrap();
    assert!(output.figures.is_empty());
    assert_eq!(output.stats.figure_count, 0);
}

#[test]
fn output_serializes_for_raw_dumps() {
    let (_dir, path) = write_fixture(&fixture_document());
    let config = EnrichmentConfig::builder()
        .detect_language(false)
        .build()
        .unwrap();
    let output = enrich_document_sync(
        DocumentSource::Path(path),
        Arc::new(JsonDocumentParser),
        &config,
    )
    .unwrap();
    let value = output.to_json().unwrap();
    assert!(value["document"]["pages"].is_array());
    assert!(value["stats"]["page_count"].is_number());
    assert!(value["warnings"].as_array().unwrap().is_empty());
}
