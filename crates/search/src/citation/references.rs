//! Reference-section heuristics for extracted document text
//!
//! Works on plain text only; PDF decoding happens upstream. Used when
//! preparing citation metadata files, not while serving requests.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Lines shorter than this are treated as noise (page numbers, headers)
const MIN_REFERENCE_LEN: usize = 20;

fn heading() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*(references|bibliography)[ \t]*\r?$").expect("valid heading regex")
    })
}

/// Extract candidate reference lines from a document's text.
///
/// Looks for a line reading exactly "References" or "Bibliography"
/// (case-insensitive) and returns every trimmed line after it, up to the
/// next such heading, that is longer than 20 characters. Returns an empty
/// list when the text has no reference section.
pub fn extract_references(text: &str) -> Vec<String> {
    let mut headings = heading().find_iter(text);

    let Some(first) = headings.next() else {
        return Vec::new();
    };

    let end = headings.next().map(|m| m.start()).unwrap_or(text.len());
    let section = &text[first.end()..end];

    section
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_REFERENCE_LEN)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_lines_after_heading() {
        let text = "Introduction\nSome body text that is long enough to count.\n\
                    References\n\
                    [1] Vaswani et al. Attention is all you need. 2017\n\
                    12\n\
                    [2] Kipf and Welling. Semi-supervised classification with GCNs.\n";

        let refs = extract_references(text);
        assert_eq!(refs.len(), 2);
        assert!(refs[0].starts_with("[1] Vaswani"));
        assert!(refs[1].starts_with("[2] Kipf"));
    }

    #[test]
    fn test_heading_is_case_insensitive() {
        let text = "body\nBIBLIOGRAPHY\n  Hamilton, Ying, Leskovec. Inductive representation learning.  \n";
        let refs = extract_references(text);
        assert_eq!(refs, vec!["Hamilton, Ying, Leskovec. Inductive representation learning."]);
    }

    #[test]
    fn test_no_reference_section() {
        let text = "We discuss references to prior work inline.\nNothing else here at all.";
        assert!(extract_references(text).is_empty());
    }

    #[test]
    fn test_stops_at_second_heading() {
        let text = "References\nA first reference line with enough text\n\
                    Bibliography\nA second section line with enough text\n";
        let refs = extract_references(text);
        assert_eq!(refs, vec!["A first reference line with enough text"]);
    }
}
