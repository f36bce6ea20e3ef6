use crate::annotation::TokenGroup;
use crate::ids::{AnnotationId, TokenId};
use crate::model::{QuoteReference, Token, VerseRef};
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Sentinel `source` used on the superseding empty-state message a panel
/// must publish when it is torn down. Bypasses publish deduplication.
pub const TEARDOWN_SOURCE: &str = "teardown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Retained as "current value" for its key until superseded.
    State,
    /// Delivered only to live subscribers, never retained.
    Event,
}

/// Fixed keys identifying which "current value" a state message supersedes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    TokenGroups,
    ScriptureTokens,
}

/// Every payload the bus carries. Validated once, here, by exhaustive match;
/// consumers never shape-check.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "kebab-case"))]
pub enum Payload {
    /// State: the original-language spans an annotation panel wants
    /// highlighted, grouped per annotation.
    TokenGroups {
        groups: Vec<TokenGroup>,
        content_hash: u64,
    },
    /// State: the token stream a scripture panel currently renders for the
    /// active verse range.
    ScriptureTokens {
        range: QuoteReference,
        tokens: Vec<Token>,
    },
    /// Event: a token was clicked in a scripture panel.
    TokenClick { token: Token },
    /// Event: a verse label was clicked in a scripture panel.
    VerseClick { verse: VerseRef },
    /// Event: an annotation was selected or auto-activated.
    NoteSelected { annotation_id: AnnotationId },
}

impl Payload {
    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            Payload::TokenGroups { .. } | Payload::ScriptureTokens { .. } => Lifecycle::State,
            Payload::TokenClick { .. }
            | Payload::VerseClick { .. }
            | Payload::NoteSelected { .. } => Lifecycle::Event,
        }
    }

    pub fn state_key(&self) -> Option<StateKey> {
        match self {
            Payload::TokenGroups { .. } => Some(StateKey::TokenGroups),
            Payload::ScriptureTokens { .. } => Some(StateKey::ScriptureTokens),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::TokenGroups { .. } => "token-groups",
            Payload::ScriptureTokens { .. } => "scripture-tokens",
            Payload::TokenClick { .. } => "token-click",
            Payload::VerseClick { .. } => "verse-click",
            Payload::NoteSelected { .. } => "note-selected",
        }
    }
}

/// The in-process message envelope exchanged between panels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct Envelope {
    /// Resource id of the publishing panel. Panels ignore their own
    /// broadcasts (self-feedback guard).
    pub source: String,
    pub timestamp_ms: u64,
    pub payload: Payload,
}

impl Envelope {
    pub fn lifecycle(&self) -> Lifecycle {
        self.payload.lifecycle()
    }

    pub fn state_key(&self) -> Option<StateKey> {
        self.payload.state_key()
    }

    /// Token ids highlighted by a token-groups payload, flattened.
    pub fn highlighted_ids(&self) -> Vec<TokenId> {
        match &self.payload {
            Payload::TokenGroups { groups, .. } => {
                groups.iter().flat_map(|g| g.token_ids()).collect()
            }
            _ => Vec::new(),
        }
    }
}
