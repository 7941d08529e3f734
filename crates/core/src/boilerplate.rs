use regex::Regex;
use std::sync::LazyLock;

/// Page-break marker emitted between pages by the PDF text extractor.
pub const PAGE_BREAK: char = '\u{000c}';

static FOOTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Page \d+ / \d+|Fact sheet version: \d+\.\d+ as of \d+/\d+/\d{4}")
        .expect("footer regex is valid")
});

/// Removes a fact sheet's trailing legal page.
///
/// With page breaks present exactly the last page is dropped, blank or not,
/// provided at least two pages carry text. Without page breaks the text is
/// cut at the last of several repeated footer markers. Otherwise the input is
/// returned unchanged.
pub fn strip_trailing_page(text: &str) -> String {
    if text.contains(PAGE_BREAK) {
        let mut pages: Vec<&str> = text.split(PAGE_BREAK).collect();
        let with_text = pages.iter().filter(|page| !page.trim().is_empty()).count();
        if with_text < 2 {
            return text.to_string();
        }

        pages.pop();
        let separator = PAGE_BREAK.to_string();
        return pages.join(&separator).trim().to_string();
    }

    let markers: Vec<usize> = FOOTER_MARKER.find_iter(text).map(|m| m.start()).collect();
    match markers.as_slice() {
        [_, .., last] => text[..*last].trim().to_string(),
        _ => text.to_string(),
    }
}
