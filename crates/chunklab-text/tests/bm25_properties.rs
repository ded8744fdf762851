use chunklab_text::{bm25_scores, tokenize};
use proptest::prelude::*;

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

proptest! {
    #[test]
    fn scores_are_non_negative(docs in prop::collection::vec("[a-z ]{0,60}", 0..8), query in "[a-z ]{0,20}") {
        let scores = bm25_scores(&query, &docs);
        prop_assert_eq!(scores.len(), docs.len());
        prop_assert!(scores.iter().all(|s| *s >= 0.0 && s.is_finite()));
    }

    #[test]
    fn extra_occurrence_strictly_increases_score(
        base in prop::collection::vec(word(), 1..12),
        others in prop::collection::vec(prop::collection::vec(word(), 1..12), 0..5),
        term in word(),
    ) {
        // Identical documents except for one extra occurrence of the query term.
        let without = base.join(" ");
        let with = format!("{without} {term}");
        let mut docs = vec![without, with];
        docs.extend(others.iter().map(|w| w.join(" ")));

        let scores = bm25_scores(&term, &docs);
        prop_assert!(scores[1] > scores[0], "{:?}", scores);
    }

    #[test]
    fn tokens_are_lowercase_alphanumeric(text in "[a-zA-Z0-9 ,.;!?_-]{0,80}") {
        for t in tokenize(&text) {
            prop_assert!(!t.is_empty());
            prop_assert!(t.chars().all(char::is_alphanumeric));
            prop_assert_eq!(t.to_lowercase(), t.clone());
        }
    }
}
