use glossa_protocol::{QuoteReference, Token, TokenCorpus};
use thiserror::Error;

use crate::parser::{parse_fragment, split_fragments, QuoteElement};

/// Per-caller matching policy.
///
/// The minimum quote length is a documented asymmetry: translation notes
/// require 2+ chars to avoid trivial false positives, word-links allow
/// single-char quotes so one-letter terms stay linkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub min_quote_chars: usize,
}

impl MatchOptions {
    pub fn notes() -> Self {
        Self { min_quote_chars: 2 }
    }

    pub fn word_links() -> Self {
        Self { min_quote_chars: 1 }
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::notes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no match found for quote in range")]
    NoMatchFound,
    #[error("occurrence {requested} out of range: found {found} match(es)")]
    OccurrenceOutOfRange { requested: u32, found: u32 },
    #[error("invalid verse reference")]
    InvalidReference,
    #[error("quote shorter than {min} character(s)")]
    QuoteTooShort { min: usize },
}

/// Resolved span or failure. Failures are non-fatal: callers render the
/// literal original-language quote with no highlight.
pub type MatchResult = Result<Vec<Token>, MatchError>;

fn normalize(text: &str) -> String {
    // Case-insensitive, script-preserving: lowercase only, no diacritic
    // stripping and no Unicode normalization form coercion.
    text.trim().chars().flat_map(char::to_lowercase).collect()
}

fn text_eq(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn element_matches(token: &Token, element: &QuoteElement) -> bool {
    match element {
        QuoteElement::Word(w) => token.is_word() && text_eq(&token.text, w),
        QuoteElement::Punct(p) => {
            token.is_punctuation() && text_eq(&token.text, &p.to_string())
        }
    }
}

/// Match one fragment starting exactly at `start`. Punctuation tokens are
/// skipped between word elements, but punctuation elements in the quote
/// itself must match the immediately following token.
fn match_at(window: &[&Token], start: usize, elements: &[QuoteElement]) -> Option<Vec<usize>> {
    let mut indices = Vec::with_capacity(elements.len());
    let mut i = start;

    for (k, element) in elements.iter().enumerate() {
        if k > 0 {
            if let QuoteElement::Word(_) = element {
                while i < window.len() && window[i].is_punctuation() {
                    i += 1;
                }
            }
        }
        if i >= window.len() || !element_matches(window[i], element) {
            return None;
        }
        indices.push(i);
        i += 1;
    }

    Some(indices)
}

/// Earliest match of `elements` at or after `from`.
/// Returns the matched indices and the resume position just past them.
fn find_fragment_from(
    window: &[&Token],
    from: usize,
    elements: &[QuoteElement],
) -> Option<(Vec<usize>, usize)> {
    let first = elements.first()?;
    for start in from..window.len() {
        if !element_matches(window[start], first) {
            continue;
        }
        if let Some(indices) = match_at(window, start, elements) {
            let resume = indices.last().copied().unwrap_or(start) + 1;
            return Some((indices, resume));
        }
    }
    None
}

/// Every whole-quote match inside the window, ordered by the position of the
/// first fragment. A match is a chain of fragment runs, each strictly after
/// the previous one; chains never overlap.
fn enumerate_matches(window: &[&Token], fragments: &[Vec<QuoteElement>]) -> Vec<Vec<usize>> {
    let mut matches = Vec::new();
    let mut search_from = 0;

    'outer: while search_from < window.len() {
        let Some((first_run, mut cursor)) = find_fragment_from(window, search_from, &fragments[0])
        else {
            break;
        };
        let first_start = first_run[0];

        let mut chain = first_run;
        for fragment in &fragments[1..] {
            match find_fragment_from(window, cursor, fragment) {
                Some((run, resume)) => {
                    chain.extend(run);
                    cursor = resume;
                }
                None => {
                    // This first-fragment anchor cannot complete a chain;
                    // any later anchor would search the same tail and fail too.
                    if fragments.len() > 1 {
                        break 'outer;
                    }
                    search_from = first_start + 1;
                    continue 'outer;
                }
            }
        }

        matches.push(chain);
        search_from = cursor;
    }

    matches
}

/// Resolve (quote text, occurrence, verse range) against a corpus to an
/// ordered original-language token span.
///
/// Pure function of its inputs: identical calls return identical results,
/// and it never panics on user data.
pub fn find_original_tokens(
    corpus: &TokenCorpus,
    quote: &str,
    occurrence: u32,
    range: &QuoteReference,
    options: MatchOptions,
) -> MatchResult {
    let trimmed = quote.trim();
    if trimmed.chars().count() < options.min_quote_chars {
        return Err(MatchError::QuoteTooShort { min: options.min_quote_chars });
    }
    if occurrence == 0 {
        return Err(MatchError::OccurrenceOutOfRange { requested: 0, found: 0 });
    }

    if !range.is_well_formed()
        || !range.book.eq_ignore_ascii_case(&corpus.book)
        || range.start.chapter > corpus.max_chapter()
    {
        return Err(MatchError::InvalidReference);
    }
    let window = corpus.tokens_in(range);
    if window.is_empty() {
        // Well-formed shape but the verses do not exist in this book.
        return Err(MatchError::InvalidReference);
    }

    let fragments: Vec<Vec<QuoteElement>> = split_fragments(trimmed)
        .iter()
        .map(|f| parse_fragment(f))
        .filter(|f| !f.is_empty())
        .collect();
    if fragments.is_empty() {
        return Err(MatchError::NoMatchFound);
    }

    let matches = enumerate_matches(&window, &fragments);
    let found = matches.len() as u32;
    if found == 0 {
        return Err(MatchError::NoMatchFound);
    }
    if occurrence > found {
        return Err(MatchError::OccurrenceOutOfRange { requested: occurrence, found });
    }

    let chain = &matches[(occurrence - 1) as usize];
    Ok(chain.iter().map(|&i| window[i].clone()).collect())
}
