#![no_std] // Critical for WASM/Embedded compatibility

extern crate alloc;

// Enable std if the feature is active (for tests/tools)
#[cfg(feature = "std")]
extern crate std;

pub mod ids;
pub mod model;

// Re-export core types for convenience
pub use ids::{AnnotationId, TokenId};
pub use model::*;

pub mod annotation;
pub use annotation::*;

pub mod message;
pub use message::*;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;
    use rkyv::{from_bytes, to_bytes};

    fn word(id: u32, text: &str, chapter: u16, verse: u16) -> Token {
        Token {
            id: TokenId(id),
            text: text.to_string(),
            kind: TokenKind::Word,
            align: vec![],
            verse: VerseRef::new(chapter, verse),
        }
    }

    #[test]
    fn test_corpus_serialization() {
        // Round-trip the compiled artifact type
        let original = TokenCorpus {
            version: 3,
            book: "tit".to_string(),
            tokens: vec![word(1, "Παῦλος", 1, 1), word(2, "δοῦλος", 1, 1)],
        };

        let bytes = to_bytes::<_, 1024>(&original).expect("Failed to serialize TokenCorpus");
        let deserialized: TokenCorpus =
            from_bytes(&bytes).expect("Failed to deserialize TokenCorpus");

        assert_eq!(deserialized.version, 3);
        assert_eq!(deserialized.tokens.len(), 2);
        assert_eq!(deserialized.tokens[0].text, "Παῦλος");
    }

    #[test]
    fn test_id_layout() {
        // Verify Zero-Cost abstraction: TokenId(u32) should be exactly 4 bytes
        assert_eq!(core::mem::size_of::<TokenId>(), 4);
        assert_eq!(core::mem::size_of::<Option<TokenId>>(), 8); // u32 + tag (padding)
    }

    #[test]
    fn test_reference_containment() {
        let range = QuoteReference::new(
            "tit",
            VerseRef::new(1, 3),
            VerseRef::new(2, 2),
        );
        assert!(range.is_well_formed());
        assert!(range.contains(VerseRef::new(1, 3)));
        assert!(range.contains(VerseRef::new(1, 15)));
        assert!(range.contains(VerseRef::new(2, 2)));
        assert!(!range.contains(VerseRef::new(2, 3)));
        assert!(!range.contains(VerseRef::new(1, 2)));

        let inverted = QuoteReference::new("tit", VerseRef::new(2, 1), VerseRef::new(1, 1));
        assert!(!inverted.is_well_formed());
        let zeroed = QuoteReference::single("tit", VerseRef::new(0, 1));
        assert!(!zeroed.is_well_formed());
    }

    #[test]
    fn test_payload_lifecycles() {
        let state = Payload::TokenGroups { groups: vec![], content_hash: 0 };
        assert_eq!(state.lifecycle(), Lifecycle::State);
        assert_eq!(state.state_key(), Some(StateKey::TokenGroups));

        let event = Payload::VerseClick { verse: VerseRef::new(1, 1) };
        assert_eq!(event.lifecycle(), Lifecycle::Event);
        assert_eq!(event.state_key(), None);
    }

    #[test]
    fn test_kind_mask() {
        let mask = AnnotationKinds::NOTE;
        assert!(mask.includes(AnnotationKind::Note));
        assert!(!mask.includes(AnnotationKind::WordLink));
        assert!(AnnotationKinds::all().includes(AnnotationKind::WordLink));
    }
}
