/// Inserts a space wherever a lowercase ASCII letter is directly followed by an
/// uppercase one, undoing words that PDF text extraction glued together
/// (`"creditsThe"` becomes `"credits The"`).
///
/// The inserted space never creates a new lowercase/uppercase pair, so the
/// transform is idempotent.
pub fn normalize(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len() + raw.len() / 16);
    let mut previous: Option<char> = None;

    for current in raw.chars() {
        if let Some(prev) = previous {
            if prev.is_ascii_lowercase() && current.is_ascii_uppercase() {
                output.push(' ');
            }
        }
        output.push(current);
        previous = Some(current);
    }

    output
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalize_is_idempotent_for_arbitrary_text(raw in any::<String>()) {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_only_inserts_spaces(raw in "[a-zA-Z ÄäÖöß,:\n]{0,64}") {
            let normalized = normalize(&raw);
            prop_assert_eq!(normalized.replace(' ', ""), raw.replace(' ', ""));
        }
    }

    #[test]
    fn merged_words_are_split() {
        assert_eq!(normalize("creditsThe course"), "credits The course");
        assert_eq!(normalize("MeisterNicole,SchmidtPeter"), "Meister Nicole,Schmidt Peter");
    }

    #[test]
    fn acronyms_and_empty_input_are_untouched() {
        assert_eq!(normalize("ECTS MBI"), "ECTS MBI");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "",
            "aB",
            "aBcDeF",
            "creditsThe ECTS-Credits:6",
            "Prüfung\tGruppennoteIndividualnote",
            "8,126: AdvancedAuditing\u{c}Page 1 / 2",
            "xYz ÄbC äB",
        ];

        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample: {sample:?}");
        }
    }

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        assert_eq!(normalize_whitespace(input), "A lot of spacing");
    }
}
