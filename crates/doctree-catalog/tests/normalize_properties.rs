use doctree_catalog::normalize;
use proptest::prelude::*;

fn display_text() -> impl Strategy<Value = String> {
    // Mix of Latin letters with accents, punctuation and whitespace, as seen in labels.
    proptest::string::string_regex("[A-Za-z0-9 _().,$%/çãéíóúâêôàÇÃÉ-]{0,24}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn output_is_a_clean_identifier(text in display_text()) {
        let id = normalize(&text);
        prop_assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        prop_assert!(!id.starts_with('_'));
        prop_assert!(!id.ends_with('_'));
        prop_assert!(!id.contains("__"));
    }

    #[test]
    fn normalize_is_idempotent(text in any::<String>()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn words_join_with_single_underscores(
        words in proptest::collection::vec("[a-z][a-z0-9]{0,6}", 1..5),
        sep in "[ ._-]{1,3}",
    ) {
        let text = words.join(&sep);
        prop_assert_eq!(normalize(&text), words.join("_"));
    }

    #[test]
    fn accents_fold_to_base_letters(word in "[a-z]{1,6}") {
        let accented: String = word
            .chars()
            .map(|c| match c {
                'a' => 'á',
                'e' => 'ê',
                'o' => 'õ',
                'c' => 'ç',
                other => other,
            })
            .collect();
        prop_assert_eq!(normalize(&accented), word);
    }
}
