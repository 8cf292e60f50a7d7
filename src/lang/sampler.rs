//! Budgeted text sampling for language detection.
//!
//! Detection quality plateaus after a few thousand characters, so instead
//! of feeding the detector a whole book we take an even slice from every
//! page. The per-page budget is `min(max_chars / page_count, 1000)`: the
//! cap stops one dense page from dominating, the even split keeps a
//! document that switches language halfway represented on both sides.
//!
//! Pages are read at the coarsest granularity available (lines, then
//! words, then characters). Character cells carry no ordering guarantee,
//! so they are first assembled into synthetic lines by rounding their
//! y-origin and sorting left-to-right within each group.

use crate::document::{Granularity, NativeDocument, Page, TextCell};
use std::collections::BTreeMap;

/// Hard per-page cap, in characters.
const PER_PAGE_CAP: usize = 1000;

/// Build a detection sample of at most `max_chars` characters.
///
/// Returns an empty string for documents with no pages or no text.
/// Truncation is always on a character boundary, never mid-codepoint.
pub fn sample(document: &NativeDocument, max_chars: usize) -> String {
    if document.pages.is_empty() || max_chars == 0 {
        return String::new();
    }
    let per_page = (max_chars / document.page_count()).min(PER_PAGE_CAP);

    let mut parts: Vec<String> = Vec::new();
    let mut total = 0usize;
    for page in &document.pages {
        if total >= max_chars {
            break;
        }
        let Some(text) = page_text(page) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let part = truncate_chars(&text, per_page);
        if part.is_empty() {
            continue;
        }
        total += part.chars().count();
        parts.push(part.to_string());
    }
    parts.join(" ")
}

/// Reading text for one page at its coarsest available granularity.
fn page_text(page: &Page) -> Option<String> {
    match page.best_granularity()? {
        Granularity::Line => Some(join_cells(page.cells(Granularity::Line)?)),
        Granularity::Word => Some(join_cells(page.cells(Granularity::Word)?)),
        Granularity::Char => Some(assemble_char_lines(page.cells(Granularity::Char)?)),
    }
}

fn join_cells(cells: &[TextCell]) -> String {
    cells
        .iter()
        .map(|c| c.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group character cells into synthetic lines.
///
/// Cells whose y-origin rounds to the same integer belong to one line;
/// within a line they are concatenated left to right, and lines are joined
/// top to bottom.
fn assemble_char_lines(cells: &[TextCell]) -> String {
    let mut groups: BTreeMap<i64, Vec<&TextCell>> = BTreeMap::new();
    for cell in cells {
        groups
            .entry(cell.bbox.y0.round() as i64)
            .or_default()
            .push(cell);
    }
    let mut lines: Vec<String> = Vec::with_capacity(groups.len());
    for (_, mut group) in groups {
        group.sort_by(|a, b| {
            a.bbox
                .x0
                .partial_cmp(&b.bbox.x0)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        lines.push(group.iter().map(|c| c.text.as_str()).collect());
    }
    lines.join(" ")
}

/// Prefix of at most `limit` characters, on a char boundary.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
