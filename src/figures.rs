//! Figure extraction: classifier-or-heuristic candidate discovery,
//! content-digest deduplication, caption linking, and persistence.
//!
//! Two discovery paths exist because deployments differ. With a trained
//! [`FigureClassifier`] injected, its candidates are taken as-is (one call
//! per document). Without one, or when it fails, a cheap heuristic takes
//! over: every raster image embedded in a page stream is a figure at
//! confidence 0.8, and a page with no embedded images becomes a single
//! whole-page candidate at confidence 0.5, rasterised through the injected
//! [`PageRasterizer`] when one is available.
//!
//! Deduplication is scoped to a single [`FigureExtractor::predict`] call:
//! scanned documents repeat the same letterhead on every page, but two
//! *different* documents sharing a logo must both report it.

use crate::config::EnrichmentConfig;
use crate::document::{BoundingBox, Granularity, NativeDocument, Page};
use crate::error::StepError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Confidence assigned to raster images embedded in the page stream.
const EMBEDDED_CONFIDENCE: f32 = 0.8;

/// Confidence assigned to the whole-page fallback candidate.
const PAGE_FALLBACK_CONFIDENCE: f32 = 0.5;

/// Lowercased prefixes that mark a text line as a caption.
const CAPTION_MARKERS: &[&str] = &["figure ", "fig.", "image "];

/// A caption line linked to a figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

/// A figure candidate before numbering, dedup, and caption linking.
#[derive(Debug, Clone)]
pub struct FigureCandidate {
    pub page_index: usize,
    pub bbox: BoundingBox,
    pub image_bytes: Option<Vec<u8>>,
    /// Encoding of `image_bytes`, e.g. "png" or "jpeg".
    pub image_format: String,
    pub confidence: f32,
    /// Classifier-assigned type ("chart", "photo", ...), when known.
    pub figure_type: Option<String>,
    /// Classifier-provided caption; heuristic linking only runs when this
    /// is absent.
    pub caption: Option<Caption>,
}

/// A trained figure detector covering the whole document in one call.
///
/// A failure here is recoverable: extraction logs it and falls back to
/// the embedded-image heuristic.
pub trait FigureClassifier: Send + Sync {
    fn classify(&self, document: &NativeDocument) -> Result<Vec<FigureCandidate>, StepError>;
}

/// Renders one page to an image, backing the whole-page fallback.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(
        &self,
        document: &NativeDocument,
        page_index: usize,
    ) -> Result<DynamicImage, StepError>;
}

/// One extracted figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureItem {
    /// 0-based page the figure was found on.
    pub page_index: usize,
    /// 0-based position among the kept figures of that page.
    pub figure_index: usize,
    pub bbox: BoundingBox,
    /// Encoded image bytes (base64 in JSON). Absent for whole-page
    /// fallback candidates when no rasterizer is available.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub image_bytes: Option<Vec<u8>>,
    pub image_format: String,
    pub confidence: f32,
    /// "unknown" unless a classifier said otherwise.
    pub figure_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Caption>,
    /// Side-channel facts: saved path, write errors.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl FigureItem {
    /// MD5 hex digest of the image bytes; `None` without bytes.
    pub fn digest(&self) -> Option<String> {
        self.image_bytes.as_ref().map(|b| md5_hex(b))
    }

    /// `data:image/...;base64,...` URI for inline embedding.
    pub fn data_uri(&self) -> Option<String> {
        self.image_bytes
            .as_ref()
            .map(|b| format!("data:image/{};base64,{}", self.image_format, STANDARD.encode(b)))
    }

    /// On-disk name: `figure_{page}_{index}.{format}` with 1-based,
    /// zero-padded numbers (`figure_001_001.png` for page 0, figure 0).
    pub fn file_name(&self) -> String {
        format!(
            "figure_{:03}_{:03}.{}",
            self.page_index + 1,
            self.figure_index + 1,
            self.image_format
        )
    }

    /// Write the image bytes into `dir`, creating it if needed.
    /// Returns `Ok(None)` when there are no bytes to write.
    pub fn save_to(&self, dir: &Path) -> Result<Option<PathBuf>, StepError> {
        let Some(bytes) = &self.image_bytes else {
            return Ok(None);
        };
        std::fs::create_dir_all(dir).map_err(|e| StepError::FigureWrite {
            path: dir.display().to_string(),
            detail: e.to_string(),
        })?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, bytes).map_err(|e| StepError::FigureWrite {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Ok(Some(path))
    }
}

/// Result of one extraction call.
#[derive(Debug, Default)]
pub struct FigurePrediction {
    /// Kept figures, page index ascending, detection order within a page.
    pub figures: Vec<FigureItem>,
    /// Recovered failures (classifier fallback, rasterisation, writes).
    pub warnings: Vec<StepError>,
}

/// Extracts figures from a parsed document.
pub struct FigureExtractor {
    classifier: Option<Arc<dyn FigureClassifier>>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    deduplicate: bool,
    detect_captions: bool,
    output_dir: Option<PathBuf>,
}

impl FigureExtractor {
    pub fn new(config: &EnrichmentConfig) -> Self {
        Self {
            classifier: config.classifier.clone(),
            rasterizer: config.rasterizer.clone(),
            deduplicate: config.deduplicate_figures,
            detect_captions: config.detect_captions,
            output_dir: config.figure_output_dir.clone(),
        }
    }

    /// Discover, dedup, caption, and (optionally) persist figures.
    ///
    /// Never fails as a whole: every failure mode degrades to a warning
    /// and the remaining figures are still returned.
    pub fn predict(&self, document: &NativeDocument) -> FigurePrediction {
        let mut warnings = Vec::new();

        let mut candidates = match self.classify(document, &mut warnings) {
            Some(candidates) => candidates,
            None => self.heuristic_candidates(document, &mut warnings),
        };
        // Stable sort keeps detection order within a page.
        candidates.sort_by_key(|c| c.page_index);

        let mut seen = HashSet::new();
        let mut per_page: HashMap<usize, usize> = HashMap::new();
        let mut figures = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self.deduplicate {
                if let Some(bytes) = &candidate.image_bytes {
                    if !seen.insert(md5_hex(bytes)) {
                        debug!(page = candidate.page_index, "duplicate figure skipped");
                        continue;
                    }
                }
            }

            let counter = per_page.entry(candidate.page_index).or_insert(0);
            let figure_index = *counter;
            *counter += 1;

            let caption = if self.detect_captions {
                candidate.caption.clone().or_else(|| {
                    page_by_index(document, candidate.page_index)
                        .and_then(|page| find_caption(page, &candidate.bbox))
                })
            } else {
                None
            };

            let mut item = FigureItem {
                page_index: candidate.page_index,
                figure_index,
                bbox: candidate.bbox,
                image_bytes: candidate.image_bytes,
                image_format: candidate.image_format,
                confidence: candidate.confidence,
                figure_type: candidate.figure_type.unwrap_or_else(|| "unknown".into()),
                caption,
                metadata: BTreeMap::new(),
            };

            if let Some(dir) = &self.output_dir {
                match item.save_to(dir) {
                    Ok(Some(path)) => {
                        item.metadata
                            .insert("saved_path".into(), path.display().to_string());
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "figure not persisted");
                        item.metadata.insert("write_error".into(), e.to_string());
                        warnings.push(e);
                    }
                }
            }
            figures.push(item);
        }

        debug!(
            figures = figures.len(),
            warnings = warnings.len(),
            "figure extraction complete"
        );
        FigurePrediction { figures, warnings }
    }

    /// Run the classifier when one is injected. `None` means "use the
    /// heuristic": either no classifier exists or it failed.
    fn classify(
        &self,
        document: &NativeDocument,
        warnings: &mut Vec<StepError>,
    ) -> Option<Vec<FigureCandidate>> {
        let classifier = self.classifier.as_ref()?;
        match classifier.classify(document) {
            Ok(candidates) => Some(candidates),
            Err(e) => {
                warn!(error = %e, "classifier failed, using heuristic");
                warnings.push(e);
                None
            }
        }
    }

    fn heuristic_candidates(
        &self,
        document: &NativeDocument,
        warnings: &mut Vec<StepError>,
    ) -> Vec<FigureCandidate> {
        let mut out = Vec::new();
        for page in &document.pages {
            if page.images.is_empty() {
                out.push(self.whole_page_candidate(document, page, warnings));
                continue;
            }
            for img in &page.images {
                out.push(FigureCandidate {
                    page_index: page.index,
                    bbox: img.bbox,
                    image_bytes: Some(img.data.clone()),
                    image_format: img.format.clone(),
                    confidence: EMBEDDED_CONFIDENCE,
                    figure_type: None,
                    caption: None,
                });
            }
        }
        out
    }

    fn whole_page_candidate(
        &self,
        document: &NativeDocument,
        page: &Page,
        warnings: &mut Vec<StepError>,
    ) -> FigureCandidate {
        let image_bytes = match &self.rasterizer {
            Some(r) => match r.rasterize(document, page.index) {
                Ok(img) => match encode_png(&img) {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        warn!(page = page.index, error = %e, "PNG encoding failed");
                        warnings.push(StepError::Rasterisation {
                            page: page.index,
                            detail: e.to_string(),
                        });
                        None
                    }
                },
                Err(e) => {
                    warn!(page = page.index, error = %e, "rasterizer failed");
                    warnings.push(e);
                    None
                }
            },
            None => None,
        };
        FigureCandidate {
            page_index: page.index,
            bbox: BoundingBox::new(0.0, 0.0, page.width, page.height),
            image_bytes,
            image_format: "png".into(),
            confidence: PAGE_FALLBACK_CONFIDENCE,
            figure_type: None,
            caption: None,
        }
    }
}

/// Find the caption line for a figure: a line-granularity cell starting
/// with a caption marker, strictly below the figure's bottom edge, whose
/// horizontal span overlaps the figure's. The smallest vertical gap wins.
fn find_caption(page: &Page, figure: &BoundingBox) -> Option<Caption> {
    let lines = page.cells(Granularity::Line)?;
    let mut best: Option<(f64, &crate::document::TextCell)> = None;
    for cell in lines {
        let trimmed = cell.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lower = trimmed.to_lowercase();
        if !CAPTION_MARKERS.iter().any(|m| lower.starts_with(m)) {
            continue;
        }
        if cell.bbox.y0 <= figure.y1 {
            continue;
        }
        if !cell.bbox.overlaps_horizontally(figure) {
            continue;
        }
        let gap = cell.bbox.y0 - figure.y1;
        if best.map_or(true, |(g, _)| gap < g) {
            best = Some((gap, cell));
        }
    }
    // The cell's text is attached verbatim; trimming and lowercasing are
    // for matching only.
    best.map(|(_, cell)| Caption {
        text: cell.text.clone(),
        bbox: Some(cell.bbox),
    })
}

fn page_by_index(document: &NativeDocument, index: usize) -> Option<&Page> {
    document.pages.iter().find(|p| p.index == index)
}

fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Serde adapter: `Option<Vec<u8>>` ⇄ base64 string in JSON.
mod base64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => ser.serialize_some(&STANDARD.encode(b)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(de)?;
        s.map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
