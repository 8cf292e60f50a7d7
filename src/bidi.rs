//! Bidirectional text handling: RTL detection, run segmentation, and
//! isolate-based normalization.
//!
//! PDF content streams store text in visual or semi-logical order with no
//! reliable direction markup, so we classify by Unicode block membership.
//! Normalization wraps RTL runs in directional *isolates* (RLI U+2067 …
//! PDI U+2069) rather than the legacy embedding controls: isolates do not
//! leak directionality into surrounding text, which matters when cells are
//! later concatenated into blocks.
//!
//! ## Idempotence
//!
//! [`normalize`] strips every bidi control character it knows about before
//! inserting its own isolates. The strip set is a superset of the insert
//! set, so a second application reproduces the first byte for byte. Callers
//! may safely re-run the RTL pass over an already-processed document.

use crate::document::Direction;
use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum fraction of RTL characters among non-whitespace characters for
/// a string to count as RTL overall.
pub const RTL_THRESHOLD: f64 = 0.3;

/// Unicode block ranges whose characters are written right-to-left.
/// Hebrew, Arabic (+supplement, extended-A, presentation forms), Syriac,
/// Thaana, NKo, Samaritan, Mandaic, and the historic scripts in the
/// U+10800 plane (Phoenician, Imperial Aramaic, old Hebrew variants).
const RTL_RANGES: &[(u32, u32)] = &[
    (0x0590, 0x05FF),
    (0x0600, 0x06FF),
    (0x0700, 0x074F),
    (0x0750, 0x077F),
    (0x0780, 0x07BF),
    (0x07C0, 0x07FF),
    (0x0800, 0x083F),
    (0x0840, 0x085F),
    (0x08A0, 0x08FF),
    (0xFB1D, 0xFB4F),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
    (0x10800, 0x10FFF),
];

/// Fast prescan: bail out of the per-char count for the common all-LTR case.
static RTL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        "[\\u{0590}-\\u{08FF}\\u{FB1D}-\\u{FDFF}\\u{FE70}-\\u{FEFF}\\u{10800}-\\u{10FFF}]",
    )
    .expect("static RTL pattern must compile")
});

const LRM: char = '\u{200E}';
const RLM: char = '\u{200F}';
const ALM: char = '\u{061C}';
const LRI: char = '\u{2066}';
const RLI: char = '\u{2067}';
const FSI: char = '\u{2068}';
const PDI: char = '\u{2069}';

/// True for characters in an RTL Unicode block.
pub fn is_rtl_char(c: char) -> bool {
    let cp = c as u32;
    RTL_RANGES.iter().any(|&(lo, hi)| cp >= lo && cp <= hi)
}

/// Bidi control characters stripped by [`normalize`].
fn is_bidi_control(c: char) -> bool {
    matches!(c, LRM | RLM | ALM | LRI | RLI | FSI | PDI)
}

/// Whether a string is predominantly RTL.
///
/// Counts characters in RTL blocks against all non-whitespace characters
/// and compares the fraction to [`RTL_THRESHOLD`]. Bidi control characters
/// are excluded from the count: text [`normalize`] has already wrapped in
/// isolates classifies exactly like its unwrapped form, so a cell sitting
/// at the threshold cannot flip on a re-run. Empty and whitespace-only
/// strings are not RTL. The threshold keeps an LTR sentence quoting a short
/// Arabic phrase classified as LTR.
pub fn contains_rtl(text: &str) -> bool {
    if text.is_empty() || !RTL_PATTERN.is_match(text) {
        return false;
    }
    let mut rtl = 0usize;
    let mut counted = 0usize;
    for c in text.chars() {
        if c.is_whitespace() || is_bidi_control(c) {
            continue;
        }
        counted += 1;
        if is_rtl_char(c) {
            rtl += 1;
        }
    }
    if counted == 0 {
        return false;
    }
    rtl as f64 / counted as f64 >= RTL_THRESHOLD
}

/// Direction of a whole string, by the same rule as [`contains_rtl`].
pub fn direction_of(text: &str) -> Direction {
    if contains_rtl(text) {
        Direction::Rtl
    } else {
        Direction::Ltr
    }
}

/// A maximal run of same-direction characters, in storage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub direction: Direction,
}

/// Split a string into maximal same-direction runs.
///
/// Classification is per character: RTL-block characters form `Rtl` runs,
/// everything else (including whitespace and digits) forms `Ltr` runs.
/// Concatenating the run texts in order reproduces the input.
pub fn segment(text: &str) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for c in text.chars() {
        let dir = if is_rtl_char(c) {
            Direction::Rtl
        } else {
            Direction::Ltr
        };
        match runs.last_mut() {
            Some(run) if run.direction == dir => run.text.push(c),
            _ => runs.push(Run {
                text: c.to_string(),
                direction: dir,
            }),
        }
    }
    runs
}

/// Normalize bidi presentation: strip stale control characters and wrap
/// each RTL run in RLI…PDI isolates.
///
/// Strings that are not predominantly RTL are returned stripped but
/// otherwise untouched. Idempotent (see module docs).
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let stripped: String = text.chars().filter(|c| !is_bidi_control(*c)).collect();
    if !contains_rtl(&stripped) {
        return stripped;
    }
    let mut out = String::with_capacity(stripped.len() + 8);
    for run in segment(&stripped) {
        match run.direction {
            Direction::Rtl => {
                out.push(RLI);
                out.push_str(&run.text);
                out.push(PDI);
            }
            _ => out.push_str(&run.text),
        }
    }
    out
}
