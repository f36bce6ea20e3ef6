use rkyv::{Archive, Deserialize, Serialize};
use crate::ids::TokenId;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// The literal marker used to bridge non-contiguous quotes.
pub const ELLIPSIS: &str = "…";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
#[repr(u8)]
pub enum TokenKind {
    Word = 0,
    Punctuation = 1,
}

/// Chapter:verse coordinate within one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct VerseRef {
    pub chapter: u16,
    pub verse: u16,
}

impl VerseRef {
    pub const fn new(chapter: u16, verse: u16) -> Self {
        Self { chapter, verse }
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

/// An inclusive verse range anchoring a quote or a navigation window.
/// `end` defaults to `start` for single-verse references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct QuoteReference {
    pub book: String,
    pub start: VerseRef,
    pub end: VerseRef,
}

impl QuoteReference {
    pub fn new(book: impl Into<String>, start: VerseRef, end: VerseRef) -> Self {
        Self { book: book.into(), start, end }
    }

    pub fn single(book: impl Into<String>, verse: VerseRef) -> Self {
        Self { book: book.into(), start: verse, end: verse }
    }

    /// Structural validity: nonzero chapter/verse on both ends, start <= end.
    pub fn is_well_formed(&self) -> bool {
        self.start.chapter > 0
            && self.start.verse > 0
            && self.end.chapter > 0
            && self.end.verse > 0
            && self.start <= self.end
    }

    pub fn contains(&self, verse: VerseRef) -> bool {
        self.start <= verse && verse <= self.end
    }
}

impl fmt::Display for QuoteReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{} {}", self.book, self.start)
        } else {
            write!(f, "{} {}-{}", self.book, self.start, self.end)
        }
    }
}

/// Atomic unit of a tokenized scripture text.
///
/// `align` is populated only on target-language tokens: the original-language
/// token ids this token is declared to translate. It may be empty.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct Token {
    pub id: TokenId,
    pub text: String,
    pub kind: TokenKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub align: Vec<TokenId>,
    pub verse: VerseRef,
}

impl Token {
    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    pub fn is_punctuation(&self) -> bool {
        self.kind == TokenKind::Punctuation
    }
}

/// Per-book ordered token stream with a version used for cache invalidation.
/// Tokens are ordered by id, which follows reading position.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct TokenCorpus {
    pub version: u32,
    pub book: String,
    pub tokens: Vec<Token>,
}

impl TokenCorpus {
    /// Tokens whose verse falls inside `range`, in reading order.
    pub fn tokens_in(&self, range: &QuoteReference) -> Vec<&Token> {
        self.tokens
            .iter()
            .filter(|t| range.contains(t.verse))
            .collect()
    }

    pub fn max_chapter(&self) -> u16 {
        self.tokens.iter().map(|t| t.verse.chapter).max().unwrap_or(0)
    }
}
