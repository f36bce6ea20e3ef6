use crate::ids::{AnnotationId, TokenId};
use crate::model::Token;
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[repr(u8)]
pub enum AnnotationKind {
    /// Translation note: prose commentary anchored to a quotation.
    Note = 0,
    /// Word-link: a single-term link into a term dictionary.
    WordLink = 1,
}

bitflags! {
    /// Display mask: which annotation kinds a panel renders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
    pub struct AnnotationKinds: u8 {
        const NOTE = 1;
        const WORD_LINK = 2;
    }
}

impl AnnotationKinds {
    pub fn includes(&self, kind: AnnotationKind) -> bool {
        match kind {
            AnnotationKind::Note => self.contains(AnnotationKinds::NOTE),
            AnnotationKind::WordLink => self.contains(AnnotationKinds::WORD_LINK),
        }
    }
}

/// A translation note or word-link entry anchored to an original-language
/// quotation. Immutable: resolved spans are cached in a side table keyed by
/// `id`, never written back into this value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct Annotation {
    pub id: AnnotationId,
    pub kind: AnnotationKind,
    /// Raw `"chapter:verse"` or `"chapter:verse-verse"` text as authored.
    /// Malformed values are filtered out downstream, never an error.
    pub reference: String,
    /// Original-language quotation; may embed the ellipsis marker for
    /// non-contiguous quotes.
    pub quote: String,
    /// 1-based ordinal among repeated matches of `quote`. Absent on entries
    /// that carry no resolvable quotation.
    pub occurrence: Option<u32>,
}

impl Annotation {
    /// Whether this annotation can be resolved to a token span at all.
    pub fn is_matchable(&self) -> bool {
        !self.quote.trim().is_empty() && self.occurrence.is_some()
    }
}

/// The unit broadcast for highlighting: one annotation's resolved
/// original-language span plus its stable color.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct TokenGroup {
    pub annotation_id: AnnotationId,
    pub reference: String,
    pub quote: String,
    pub occurrence: u32,
    pub tokens: Vec<Token>,
    pub color_index: usize,
}

impl TokenGroup {
    pub fn token_ids(&self) -> Vec<TokenId> {
        self.tokens.iter().map(|t| t.id).collect()
    }
}
