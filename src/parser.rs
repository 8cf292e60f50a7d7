//! The structural-parser seam: how parsed documents enter the pipeline.
//!
//! Byte-level PDF decoding is someone else's job. Deployments inject an
//! engine-backed [`StructuralParser`]; this crate ships
//! [`JsonDocumentParser`], which reads a [`NativeDocument`] serialized as
//! JSON. That is enough for the CLI, for fixtures, and for any upstream
//! tool that can dump its parse as JSON.

use crate::document::NativeDocument;
use crate::error::EnrichError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a document comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file on disk.
    Path(PathBuf),
    /// An in-memory buffer (uploads, pipes).
    Bytes(Vec<u8>),
}

impl DocumentSource {
    /// Display name derived from the source, when one exists.
    pub fn name(&self) -> Option<String> {
        match self {
            DocumentSource::Path(p) => p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned()),
            DocumentSource::Bytes(_) => None,
        }
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(p: PathBuf) -> Self {
        DocumentSource::Path(p)
    }
}

impl From<&Path> for DocumentSource {
    fn from(p: &Path) -> Self {
        DocumentSource::Path(p.to_path_buf())
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(b: Vec<u8>) -> Self {
        DocumentSource::Bytes(b)
    }
}

/// Turns a source into a [`NativeDocument`].
///
/// Implementations must be shareable across threads; the pipeline holds
/// them behind an `Arc` and never calls them concurrently for one
/// document.
pub trait StructuralParser: Send + Sync {
    /// Parse the source completely.
    ///
    /// Missing files map to [`EnrichError::NotFound`], unreadable files to
    /// [`EnrichError::PermissionDenied`], and content the engine cannot
    /// understand to [`EnrichError::Parse`].
    fn parse(&self, source: &DocumentSource) -> Result<NativeDocument, EnrichError>;
}

/// Reference parser: a `NativeDocument` stored as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentParser;

impl StructuralParser for JsonDocumentParser {
    fn parse(&self, source: &DocumentSource) -> Result<NativeDocument, EnrichError> {
        let bytes = match source {
            DocumentSource::Path(path) => read_file(path)?,
            DocumentSource::Bytes(b) => b.clone(),
        };
        let mut document: NativeDocument =
            serde_json::from_slice(&bytes).map_err(|e| EnrichError::Parse {
                detail: e.to_string(),
            })?;
        if document.source_name.is_none() {
            document.source_name = source.name();
        }
        debug!(pages = document.page_count(), "parsed JSON document");
        Ok(document)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, EnrichError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(EnrichError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(EnrichError::NotFound {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Page;

    #[test]
    fn missing_file_maps_to_not_found() {
        let parser = JsonDocumentParser;
        let err = parser
            .parse(&DocumentSource::Path(PathBuf::from(
                "/nonexistent/doc.json",
            )))
            .unwrap_err();
        assert!(matches!(err, EnrichError::NotFound { .. }));
    }

    #[test]
    fn malformed_json_maps_to_parse() {
        let parser = JsonDocumentParser;
        let err = parser
            .parse(&DocumentSource::Bytes(b"{not json".to_vec()))
            .unwrap_err();
        assert!(matches!(err, EnrichError::Parse { .. }));
    }

    #[test]
    fn bytes_round_trip() {
        let doc = NativeDocument::new(vec![Page::new(0, 612.0, 792.0)]);
        let bytes = serde_json::to_vec(&doc).unwrap();
        let parsed = JsonDocumentParser
            .parse(&DocumentSource::Bytes(bytes))
            .unwrap();
        assert_eq!(parsed.page_count(), 1);
        assert!(parsed.source_name.is_none());
    }

    #[test]
    fn source_name_comes_from_the_file_stem() {
        let src = DocumentSource::Path(PathBuf::from("/tmp/report_final.json"));
        assert_eq!(src.name().as_deref(), Some("report_final"));
        assert!(DocumentSource::Bytes(vec![]).name().is_none());
    }
}
