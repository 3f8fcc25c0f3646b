//! Text processing utilities.

use std::sync::LazyLock;

use regex::Regex;

static TRAILING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Tidy text produced by PDF extraction or OCR.
///
/// Normalises line endings, strips trailing spaces, and collapses runs of blank
/// lines to a single paragraph break.
pub fn tidy_extracted_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = TRAILING_SPACE.replace_all(&text, "\n");
    let text = EXCESS_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tidy_extracted_text() {
        let raw = "\r\n  Leaf Rust  \r\n\r\n\r\n\r\nSymptoms:   \norange pustules\n\n";
        assert_eq!(
            tidy_extracted_text(raw),
            "Leaf Rust\n\nSymptoms:\norange pustules"
        );
    }

    #[test]
    fn test_tidy_blank() {
        assert_eq!(tidy_extracted_text(" \n\t\n "), "");
    }
}
