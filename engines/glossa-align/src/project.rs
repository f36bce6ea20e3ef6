use glossa_protocol::{Token, ELLIPSIS};
use std::collections::HashSet;

use crate::graph::AlignmentIndex;

/// Every target token aligned to any original token in `span`, deduplicated
/// by target id. Unordered: callers sort by id before rendering.
pub fn find_aligned_tokens(span: &[Token], index: &AlignmentIndex) -> Vec<Token> {
    let mut seen = HashSet::new();
    let mut aligned = Vec::new();

    for original in span {
        for target in index.aligned_to(original.id) {
            if seen.insert(target.id) {
                aligned.push(target.clone());
            }
        }
    }

    aligned
}

/// Reconstruct a readable target-language quotation from aligned tokens.
///
/// Sorted by id ascending. An id gap of 1 joins with a space; a wider gap is
/// bridged with the skipped tokens' literal text when they are all
/// punctuation, otherwise with exactly one ellipsis marker. The result is a
/// readability aid, not a word-level correspondence claim.
pub fn build_quote_with_ellipsis(aligned: &[Token], stream: &[Token]) -> String {
    let mut tokens: Vec<&Token> = aligned.iter().collect();
    tokens.sort_by_key(|t| t.id);

    let Some(first) = tokens.first() else {
        return String::new();
    };
    if tokens.len() == 1 {
        return first.text.trim().to_string();
    }

    let mut quote = String::from(first.text.trim());
    for pair in tokens.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        if next.id.0 - current.id.0 == 1 {
            quote.push(' ');
        } else {
            let skipped: Vec<&Token> = stream
                .iter()
                .filter(|t| current.id < t.id && t.id < next.id)
                .collect();
            if !skipped.is_empty() && skipped.iter().all(|t| t.is_punctuation()) {
                // Natural reading through e.g. a comma: splice it in verbatim.
                for punct in skipped {
                    quote.push_str(punct.text.trim());
                }
                quote.push(' ');
            } else {
                // One marker per gap, never doubled.
                quote.push(' ');
                quote.push_str(ELLIPSIS);
                quote.push(' ');
            }
        }
        quote.push_str(next.text.trim());
    }

    quote
}
