pub mod cache;
pub mod matcher;
pub mod parser;

pub use cache::SpanCache;
pub use matcher::{find_original_tokens, MatchError, MatchOptions, MatchResult};
pub use parser::{parse_fragment, parse_reference, split_fragments, QuoteElement};

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_protocol::{QuoteReference, Token, TokenCorpus, TokenId, TokenKind, VerseRef};
    use proptest::prelude::*;

    fn corpus_of(words: &[String]) -> TokenCorpus {
        TokenCorpus {
            version: 1,
            book: "jhn".into(),
            tokens: words
                .iter()
                .enumerate()
                .map(|(i, w)| Token {
                    id: TokenId(i as u32 + 1),
                    text: w.clone(),
                    kind: TokenKind::Word,
                    align: vec![],
                    verse: VerseRef::new(1, 1),
                })
                .collect(),
        }
    }

    fn normalize(s: &str) -> String {
        s.trim().chars().flat_map(char::to_lowercase).collect()
    }

    proptest! {
        // Any contiguous word slice quoted verbatim resolves at occurrence 1,
        // and the returned span reads back as the quote (case-normalized).
        #[test]
        fn test_matched_span_reads_back_as_quote(
            words in prop::collection::vec("[αβγδε]{1,4}", 3..20),
            start in 0usize..16,
            len in 1usize..5,
        ) {
            prop_assume!(start + len <= words.len());

            let corpus = corpus_of(&words);
            let quote = words[start..start + len].join(" ");
            let range = QuoteReference::single("jhn", VerseRef::new(1, 1));

            let span = find_original_tokens(
                &corpus,
                &quote,
                1,
                &range,
                MatchOptions::word_links(),
            ).unwrap();

            let read_back = span
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            prop_assert_eq!(normalize(&read_back), normalize(&quote));
        }

        // Asking for one occurrence past the true count fails the same way
        // every time, with the true count reported.
        #[test]
        fn test_occurrence_beyond_count_fails_deterministically(
            words in prop::collection::vec("[αβ]{1,2}", 3..12),
        ) {
            let corpus = corpus_of(&words);
            let quote = words[0].clone();
            let range = QuoteReference::single("jhn", VerseRef::new(1, 1));
            let options = MatchOptions::word_links();

            // Count true matches by probing successive occurrences.
            let mut found = 0u32;
            while find_original_tokens(&corpus, &quote, found + 1, &range, options).is_ok() {
                found += 1;
            }
            prop_assert!(found >= 1);

            let first = find_original_tokens(&corpus, &quote, found + 1, &range, options);
            let second = find_original_tokens(&corpus, &quote, found + 1, &range, options);
            prop_assert_eq!(
                first.clone(),
                Err(MatchError::OccurrenceOutOfRange { requested: found + 1, found })
            );
            prop_assert_eq!(first, second);
        }
    }
}
