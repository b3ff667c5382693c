//! Text cleanup and language heuristics for OCR output.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern should compile"));

/// Normalize OCR text onto one line: every whitespace run, line breaks
/// included, becomes a single space. Also fixes common OCR artifacts (`|`
/// read for `l`, `()0` read for `O`).
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RUN
        .replace_all(text, " ")
        .replace('|', "l")
        .replace("()0", "O")
        .trim()
        .to_string()
}

/// Rough signal that OCR picked up a script other than the hinted one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LanguageInfo {
    /// Share of non-ASCII characters, as a percentage of all characters.
    pub non_ascii_percentage: f64,
    /// More non-ASCII characters than 10% of the alphabetic ones.
    pub likely_mixed_language: bool,
}

pub fn detect_language(text: &str) -> LanguageInfo {
    let total = text.chars().count();
    let non_ascii = text.chars().filter(|c| !c.is_ascii()).count();
    let alphabetic = text.chars().filter(|c| c.is_alphabetic()).count();

    let non_ascii_percentage = if total == 0 {
        0.0
    } else {
        non_ascii as f64 / total as f64 * 100.0
    };

    LanguageInfo {
        non_ascii_percentage,
        likely_mixed_language: non_ascii as f64 > alphabetic as f64 * 0.1,
    }
}
