//! CLI binary for pdf-enrich.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `EnrichmentConfig`, runs the pipeline over a parsed-document JSON file,
//! and writes the adapter output.

use anyhow::{Context, Result};
use clap::Parser;
use pdf_enrich::{
    enrich_document, write_json_to_file, DetectionMethod, DocumentSource, EnrichmentConfig,
    FormatAdapter, JsonDocumentParser, JsonFormatAdapter, LanguageDetector,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Enrich a parsed document and print the converted JSON
  pdf-enrich parsed.json

  # Write to a file, saving figure images alongside
  pdf-enrich parsed.json -o enriched.json --figures-dir figures/

  # Figures only, no language models loaded
  pdf-enrich --no-language --no-rtl parsed.json

  # Fast (low-accuracy) language detection
  pdf-enrich --method fast parsed.json

  # Full pipeline output (document + figures + warnings + stats)
  pdf-enrich --raw parsed.json > run.json

  # Show page/cell counts without enriching
  pdf-enrich --inspect-only parsed.json

INPUT FORMAT:
  The input is a NativeDocument serialized as JSON: pages with line/word/char
  text cells (bbox + text) and optional embedded images (base64). Any
  structural parser that can dump this shape can feed pdf-enrich.

ENVIRONMENT VARIABLES:
  RUST_LOG   Tracing filter (overrides -v/-q), e.g. RUST_LOG=pdf_enrich=debug
"#;

/// Enrich parsed PDF documents with language, RTL, and figure data.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-enrich",
    version,
    about = "Enrich parsed PDF documents with language, RTL, and figure data",
    long_about = "Run language detection, RTL normalization, and figure extraction over a \
parsed PDF document (NativeDocument JSON) and emit the converted page/block/figure JSON.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Parsed document (NativeDocument JSON file).
    input: PathBuf,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "PDF_ENRICH_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory to save extracted figure images into.
    #[arg(long, env = "PDF_ENRICH_FIGURES_DIR")]
    figures_dir: Option<PathBuf>,

    /// Detection method: auto, accurate, fast.
    #[arg(long, env = "PDF_ENRICH_METHOD", value_enum, default_value = "auto")]
    method: MethodArg,

    /// Total character budget for the language-detection sample.
    #[arg(long, env = "PDF_ENRICH_SAMPLE_CHARS", default_value_t = 10_000)]
    max_sample_chars: usize,

    /// Minimum confidence for reporting a secondary language.
    #[arg(long, env = "PDF_ENRICH_MIN_SECONDARY", default_value_t = 0.15)]
    min_secondary_confidence: f64,

    /// Skip language detection (no models are loaded).
    #[arg(long)]
    no_language: bool,

    /// Skip RTL detection and normalization.
    #[arg(long)]
    no_rtl: bool,

    /// Skip figure extraction.
    #[arg(long)]
    no_figures: bool,

    /// Keep duplicate figures instead of digest-deduplicating them.
    #[arg(long)]
    no_dedup: bool,

    /// Skip caption linking.
    #[arg(long)]
    no_captions: bool,

    /// Emit the full pipeline output (document, figures, warnings, stats)
    /// instead of the converted document.
    #[arg(long)]
    raw: bool,

    /// Print page/cell counts only, no enrichment.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_ENRICH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_ENRICH_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum MethodArg {
    Auto,
    Accurate,
    Fast,
}

impl From<MethodArg> for DetectionMethod {
    fn from(v: MethodArg) -> Self {
        match v {
            MethodArg::Auto => DetectionMethod::Auto,
            MethodArg::Accurate => DetectionMethod::Accurate,
            MethodArg::Fast => DetectionMethod::Fast,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        use pdf_enrich::StructuralParser;
        let doc = JsonDocumentParser
            .parse(&DocumentSource::Path(cli.input.clone()))
            .context("Failed to read document")?;
        println!("File:     {}", cli.input.display());
        println!("Pages:    {}", doc.page_count());
        for page in &doc.pages {
            println!(
                "  page {:>3}: {:>4} lines  {:>5} words  {:>6} chars  {:>2} images",
                page.index,
                page.lines.as_ref().map_or(0, Vec::len),
                page.words.as_ref().map_or(0, Vec::len),
                page.chars.as_ref().map_or(0, Vec::len),
                page.images.len(),
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = EnrichmentConfig::builder()
        .detect_language(!cli.no_language)
        .detection_method(cli.method.clone().into())
        .max_sample_chars(cli.max_sample_chars)
        .min_secondary_confidence(cli.min_secondary_confidence)
        .process_rtl(!cli.no_rtl)
        .extract_figures(!cli.no_figures)
        .deduplicate_figures(!cli.no_dedup)
        .detect_captions(!cli.no_captions);
    if let Some(ref dir) = cli.figures_dir {
        builder = builder.figure_output_dir(dir);
    }
    if !cli.no_language {
        // Model load is the slow part of startup; skipped entirely with
        // --no-language.
        let detector = LanguageDetector::new(cli.method.clone().into());
        builder = builder.detector(Arc::new(detector));
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run pipeline ─────────────────────────────────────────────────────
    let source = DocumentSource::Path(cli.input.clone());
    let output = enrich_document(source, Arc::new(JsonDocumentParser), config)
        .await
        .context("Enrichment failed")?;

    for warning in &output.warnings {
        eprintln!("warning: {warning}");
    }

    let value = if cli.raw {
        output.to_json().context("Failed to serialise output")?
    } else {
        JsonFormatAdapter
            .convert(&output.document, &output.figures)
            .context("Conversion failed")?
    };

    if let Some(ref path) = cli.output {
        write_json_to_file(&value, path).context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{} pages / {} figures in {}ms  →  {}",
                output.stats.page_count,
                output.stats.figure_count,
                output.stats.total_duration_ms,
                path.display(),
            );
        }
    } else {
        let rendered =
            serde_json::to_string_pretty(&value).context("Failed to serialise output")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
        if !cli.quiet {
            eprintln!(
                "{} pages / {} figures / language {}  —  {}ms total",
                output.stats.page_count,
                output.stats.figure_count,
                output.stats.language.as_deref().unwrap_or("unknown"),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}
