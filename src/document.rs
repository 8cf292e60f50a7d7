//! The native document model consumed and produced by the enrichment
//! pipeline.
//!
//! A [`NativeDocument`] is what a structural parser hands us: pages of text
//! cells at one or more granularities (lines, words, characters) plus any
//! raster images embedded in the page streams. Enrichment mutates exactly
//! two things: the [`Direction`] on each cell and the document
//! [`DocumentMetadata`]. Everything else is read-only from this crate's
//! point of view.
//!
//! All types serialize to JSON so a document can round-trip through the
//! reference [`crate::parser::JsonDocumentParser`] and so enriched output
//! is directly inspectable. Image bytes appear as base64 strings in JSON.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page coordinates, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// True when the horizontal spans of the two boxes intersect.
    /// Touching edges do not count as overlap.
    pub fn overlaps_horizontally(&self, other: &BoundingBox) -> bool {
        self.x0 < other.x1 && self.x1 > other.x0
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Resolved text direction of a cell.
///
/// Parsers emit `Unknown`; the RTL pass resolves each processed cell to
/// `Ltr` or `Rtl` exactly once per enrichment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
    #[default]
    Unknown,
}

/// Which cell collections a page carries.
///
/// Parsers differ: some produce line cells, some only word or character
/// cells. Absence of a granularity is an `Option::None` on [`Page`], never
/// an empty collection with ambiguous meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Line,
    Word,
    Char,
}

/// One unit of positioned text at some granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCell {
    pub text: String,
    pub bbox: BoundingBox,
    pub page_index: usize,
    #[serde(default)]
    pub direction: Direction,
}

impl TextCell {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, page_index: usize) -> Self {
        Self {
            text: text.into(),
            bbox,
            page_index,
            direction: Direction::Unknown,
        }
    }
}

/// A raster image embedded in the page content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub bbox: BoundingBox,
    /// Raw encoded image bytes (base64 in JSON).
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Encoding of `data`, e.g. "png" or "jpeg".
    pub format: String,
}

/// One parsed page: dimensions, cells at the granularities the parser
/// produced, and embedded images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<TextCell>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<TextCell>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chars: Option<Vec<TextCell>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<EmbeddedImage>,
}

impl Page {
    pub fn new(index: usize, width: f64, height: f64) -> Self {
        Self {
            index,
            width,
            height,
            lines: None,
            words: None,
            chars: None,
            images: Vec::new(),
        }
    }

    pub fn with_lines(mut self, cells: Vec<TextCell>) -> Self {
        self.lines = Some(cells);
        self
    }

    pub fn with_words(mut self, cells: Vec<TextCell>) -> Self {
        self.words = Some(cells);
        self
    }

    pub fn with_chars(mut self, cells: Vec<TextCell>) -> Self {
        self.chars = Some(cells);
        self
    }

    pub fn with_images(mut self, images: Vec<EmbeddedImage>) -> Self {
        self.images = images;
        self
    }

    /// The granularities present on this page, coarsest first.
    pub fn granularities(&self) -> Vec<Granularity> {
        let mut out = Vec::with_capacity(3);
        if self.lines.is_some() {
            out.push(Granularity::Line);
        }
        if self.words.is_some() {
            out.push(Granularity::Word);
        }
        if self.chars.is_some() {
            out.push(Granularity::Char);
        }
        out
    }

    /// The cells at one granularity, if the parser produced them.
    pub fn cells(&self, granularity: Granularity) -> Option<&[TextCell]> {
        match granularity {
            Granularity::Line => self.lines.as_deref(),
            Granularity::Word => self.words.as_deref(),
            Granularity::Char => self.chars.as_deref(),
        }
    }

    /// Mutable access for the RTL pass.
    pub fn cells_mut(&mut self, granularity: Granularity) -> Option<&mut Vec<TextCell>> {
        match granularity {
            Granularity::Line => self.lines.as_mut(),
            Granularity::Word => self.words.as_mut(),
            Granularity::Char => self.chars.as_mut(),
        }
    }

    /// The coarsest granularity with cells present. Coarser cells carry
    /// more context per unit, so samplers and adapters prefer them.
    pub fn best_granularity(&self) -> Option<Granularity> {
        self.granularities().into_iter().next()
    }
}

/// A secondary language candidate reported alongside the primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryLanguage {
    /// ISO 639 code, lowercase.
    pub code: String,
    /// Human-readable English name.
    pub name: String,
    pub confidence: f64,
}

/// Result of language detection over a document sample.
///
/// Immutable once produced. Detection never fails outright: an unusable
/// sample yields [`LanguageResult::unknown`] rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageResult {
    /// ISO 639 code of the primary language, or "unknown".
    pub code: String,
    /// Human-readable English name, or "Unknown".
    pub name: String,
    /// Confidence in `[0, 1]`; 0.0 for the unknown result.
    pub confidence: f64,
    /// Whether the primary language is written right-to-left.
    pub is_rtl: bool,
    /// Secondary candidates above the caller's confidence floor, sorted by
    /// confidence descending, ties broken by code ascending.
    pub additional: Vec<SecondaryLanguage>,
}

impl LanguageResult {
    /// The neutral result for empty or undetectable input.
    pub fn unknown() -> Self {
        Self {
            code: "unknown".into(),
            name: "Unknown".into(),
            confidence: 0.0,
            is_rtl: false,
            additional: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.code == "unknown"
    }
}

/// Document-level enrichment results.
///
/// Named fields rather than a string-keyed map: a typo in a key is a compile
/// error here, and consumers get real types instead of downcasts. JSON field
/// names match what downstream tooling already reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// ISO 639 code of the detected primary language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Human-readable name of the primary language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_name: Option<String>,
    /// Detector confidence for the primary language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_confidence: Option<f64>,
    /// Whether the primary language is an RTL language.
    #[serde(default)]
    pub is_rtl_language: bool,
    /// Secondary language candidates above the configured floor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_languages: Vec<SecondaryLanguage>,
    /// True when at least one page contains RTL text.
    #[serde(default)]
    pub has_rtl: bool,
    /// 0-based indices of pages containing RTL text, ascending, unique.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rtl_pages: Vec<usize>,
    /// Number of line-granularity cells that contained RTL text.
    /// Word cells are normalized too but never counted here.
    #[serde(default)]
    pub rtl_lines_count: usize,
}

impl DocumentMetadata {
    /// Record the outcome of language detection. The unknown result leaves
    /// the language fields unset so consumers can distinguish "not
    /// detected" from "detected nothing".
    pub fn apply_language(&mut self, result: &LanguageResult) {
        if result.is_unknown() {
            return;
        }
        self.language = Some(result.code.clone());
        self.language_name = Some(result.name.clone());
        self.language_confidence = Some(result.confidence);
        self.is_rtl_language = result.is_rtl;
        self.additional_languages = result.additional.clone();
    }
}

/// A parsed document: the unit the whole pipeline operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeDocument {
    /// Display name of the source, when known (file stem, upload name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl NativeDocument {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            source_name: None,
            pages,
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages with their indices, in document order.
    pub fn iter_pages(&self) -> impl Iterator<Item = (usize, &Page)> {
        self.pages.iter().map(|p| (p.index, p))
    }
}

/// Serde adapter: `Vec<u8>` ⇄ base64 string in JSON.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn granularities_report_what_is_present() {
        let page = Page::new(0, 612.0, 792.0)
            .with_lines(vec![TextCell::new("a line", bbox(), 0)])
            .with_chars(vec![TextCell::new("a", bbox(), 0)]);
        assert_eq!(
            page.granularities(),
            vec![Granularity::Line, Granularity::Char]
        );
        assert_eq!(page.best_granularity(), Some(Granularity::Line));
        assert!(page.cells(Granularity::Word).is_none());
        assert_eq!(page.cells(Granularity::Line).unwrap().len(), 1);
    }

    #[test]
    fn empty_page_has_no_granularity() {
        let page = Page::new(0, 612.0, 792.0);
        assert!(page.granularities().is_empty());
        assert!(page.best_granularity().is_none());
    }

    #[test]
    fn direction_defaults_to_unknown_in_json() {
        let json = r#"{"text":"hi","bbox":{"x0":0.0,"y0":0.0,"x1":1.0,"y1":1.0},"page_index":0}"#;
        let cell: TextCell = serde_json::from_str(json).unwrap();
        assert_eq!(cell.direction, Direction::Unknown);
    }

    #[test]
    fn horizontal_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 5.0);
        let b = BoundingBox::new(5.0, 20.0, 15.0, 25.0);
        let c = BoundingBox::new(10.0, 0.0, 20.0, 5.0);
        assert!(a.overlaps_horizontally(&b));
        assert!(!a.overlaps_horizontally(&c)); // touching edges don't overlap
    }

    #[test]
    fn embedded_image_bytes_round_trip_as_base64() {
        let img = EmbeddedImage {
            bbox: bbox(),
            data: vec![1, 2, 3, 250],
            format: "png".into(),
        };
        let json = serde_json::to_string(&img).unwrap();
        assert!(json.contains("AQID")); // base64 of [1,2,3,...]
        let back: EmbeddedImage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, vec![1, 2, 3, 250]);
    }

    #[test]
    fn apply_language_ignores_unknown() {
        let mut meta = DocumentMetadata::default();
        meta.apply_language(&LanguageResult::unknown());
        assert!(meta.language.is_none());

        let result = LanguageResult {
            code: "ar".into(),
            name: "Arabic".into(),
            confidence: 0.92,
            is_rtl: true,
            additional: vec![],
        };
        meta.apply_language(&result);
        assert_eq!(meta.language.as_deref(), Some("ar"));
        assert!(meta.is_rtl_language);
    }
}
