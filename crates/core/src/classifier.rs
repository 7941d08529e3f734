//! Lexical query classification: granularity, language, question-ness.

use crate::models::{Granularity, QueryClassification, QueryLanguage};
use regex::Regex;
use std::sync::LazyLock;

static GERMAN_INTERROGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:wie|was|wo|wann|warum|wer|welche|welcher|welches)\b")
        .expect("german interrogative regex is valid")
});
static LEADING_INTERROGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:how|what|where|when|why|who|which|can|is|are|do|does|wie|was|wo|wann|warum|wer|welche|welcher|welches|kann|ist|sind|hat|haben)\b",
    )
    .expect("leading interrogative regex is valid")
});

/// Phrases asking for a whole document rather than a passage.
const FULL_DOCUMENT_PHRASES: [&str; 6] = [
    "full details",
    "complete information",
    "syllabus",
    "vollständige details",
    "vollständige informationen",
    "lehrplan",
];

const GERMAN_DIACRITICS: [char; 7] = ['ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß'];

pub fn classify(query: &str) -> QueryClassification {
    QueryClassification {
        granularity: detect_granularity(query),
        language: detect_language(query),
        is_question: is_question(query),
    }
}

pub fn detect_granularity(query: &str) -> Granularity {
    let lowered = query.to_lowercase();
    if FULL_DOCUMENT_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
    {
        Granularity::Full
    } else {
        Granularity::Chunk
    }
}

pub fn detect_language(query: &str) -> QueryLanguage {
    if query.contains(GERMAN_DIACRITICS) || GERMAN_INTERROGATIVE.is_match(query) {
        QueryLanguage::De
    } else {
        QueryLanguage::En
    }
}

pub fn is_question(query: &str) -> bool {
    query.contains('?') || LEADING_INTERROGATIVE.is_match(query.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syllabus_request_is_full_english_question() {
        let classification = classify("Can I get the full syllabus for MBI?");
        assert_eq!(classification.granularity, Granularity::Full);
        assert_eq!(classification.language, QueryLanguage::En);
        assert!(classification.is_question);
    }

    #[test]
    fn defaults_to_chunk_lookup() {
        let classification = classify("Advanced Auditing lecturers");
        assert_eq!(classification, QueryClassification::default());
        assert!(!classification.is_question);
    }

    #[test]
    fn german_queries_are_detected() {
        assert_eq!(detect_language("Prüfungsabmeldung Frist"), QueryLanguage::De);
        assert_eq!(detect_language("welche Kurse gibt es im MGM"), QueryLanguage::De);
        assert_eq!(detect_language("Strasse"), QueryLanguage::En);
        assert_eq!(
            detect_granularity("Bitte den Lehrplan für MiMM"),
            Granularity::Full
        );
    }

    #[test]
    fn leading_interrogatives_mark_questions() {
        assert!(is_question("  how many ECTS does the thesis have"));
        assert!(is_question("Kann ich den Kurs wiederholen"));
        assert!(!is_question("Island economics course"));
        assert!(!is_question("List all MBI courses"));
    }
}
