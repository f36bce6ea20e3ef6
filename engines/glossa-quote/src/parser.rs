use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{map, map_res, opt},
    sequence::{pair, preceded, separated_pair},
    IResult,
};

use glossa_protocol::{VerseRef, ELLIPSIS};

/// Predicate for what constitutes a quotable "word" character.
/// Original-language quotes are Greek or Hebrew; the alphabetic fallback
/// keeps gateway-language quotes working too.
fn is_quote_word_char(c: char) -> bool {
    // Basic Greek block: U+0370 - U+03FF
    // Greek Extended (polytonic): U+1F00 - U+1FFF
    // Hebrew: U+0590 - U+05FF
    match c {
        '\u{0370}'..='\u{03FF}' => true,
        '\u{1F00}'..='\u{1FFF}' => true,
        '\u{0590}'..='\u{05FF}' => true,
        _ => c.is_alphabetic(),
    }
}

/// One element of a parsed quote fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteElement {
    Word(String),
    Punct(char),
}

/// Split a quote on the ellipsis marker into ordered fragments.
/// The ASCII "..." spelling is accepted as an input alias.
pub fn split_fragments(quote: &str) -> Vec<String> {
    let normalized = quote.replace("...", ELLIPSIS);
    normalized
        .split(ELLIPSIS)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// Tokenize one fragment into word/punctuation elements.
/// Resilient: anything unparseable is skipped one char at a time.
pub fn parse_fragment(fragment: &str) -> Vec<QuoteElement> {
    let mut input = fragment;
    let mut result = Vec::new();

    loop {
        let (next_input, _) = match multispace0::<&str, nom::error::Error<&str>>(input) {
            Ok(res) => res,
            Err(_) => break,
        };
        input = next_input;

        if input.is_empty() {
            break;
        }

        let parse_res: IResult<&str, QuoteElement> = alt((
            map(take_while1(is_quote_word_char), |s: &str| {
                QuoteElement::Word(String::from(s))
            }),
            map(
                satisfy(|c| !is_quote_word_char(c) && !c.is_whitespace()),
                QuoteElement::Punct,
            ),
        ))(input);

        match parse_res {
            Ok((next_input, element)) => {
                result.push(element);
                input = next_input;
            }
            Err(_) => {
                if let Some(c) = input.chars().next() {
                    input = &input[c.len_utf8()..];
                } else {
                    break;
                }
            }
        }
    }

    result
}

fn verse_number(input: &str) -> IResult<&str, u16> {
    map_res(digit1, str::parse)(input)
}

/// Parse an annotation reference: `"c:v"` or `"c:v-v"`.
///
/// Returns the start/end verse pair, or `None` for malformed input (callers
/// exclude such annotations, they never error). The verse-range end stays in
/// the start's chapter.
pub fn parse_reference(reference: &str) -> Option<(VerseRef, VerseRef)> {
    let parsed: IResult<&str, ((u16, u16), Option<u16>)> = pair(
        separated_pair(verse_number, char(':'), verse_number),
        opt(preceded(char('-'), verse_number)),
    )(reference.trim());

    match parsed {
        Ok((rest, ((chapter, verse), end_verse))) if rest.is_empty() => {
            let start = VerseRef::new(chapter, verse);
            let end = VerseRef::new(chapter, end_verse.unwrap_or(verse));
            if chapter == 0 || verse == 0 || end.verse < start.verse {
                return None;
            }
            Some((start, end))
        }
        _ => None,
    }
}
