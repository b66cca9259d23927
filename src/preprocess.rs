//! Filing text normalization and section splitting.

use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern compiles"))
}

fn section_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Filing-standard headings: "Item 1.", "Item 1A.", "ITEM 7." and so on.
    RE.get_or_init(|| Regex::new(r"(?i)Item\s+\d+[A-Za-z]?\.").expect("heading pattern compiles"))
}

/// Strips markup from filing HTML and collapses runs of whitespace into
/// single spaces.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);
    for piece in document.root_element().text() {
        text.push_str(piece);
        text.push(' ');
    }
    whitespace_re().replace_all(&text, " ").trim().to_string()
}

/// Splits normalized filing text into heading-delimited sections.
///
/// Each returned section starts with its `Item N.` heading and runs to the
/// next heading. Text before the first heading is dropped; text with no
/// headings yields no sections.
pub fn split_sections(text: &str) -> Vec<String> {
    let starts: Vec<usize> = section_heading_re()
        .find_iter(text)
        .map(|m| m.start())
        .collect();

    let mut sections = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        sections.push(text[start..end].to_string());
    }
    sections
}
