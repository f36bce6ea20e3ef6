use glossa_protocol::{
    Annotation, AnnotationId, AnnotationKinds, QuoteReference, TokenId, VerseRef,
};
use glossa_quote::{parse_reference, SpanCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFilterKind {
    None,
    Token,
    Verse,
}

/// Stage-2 filter. Token and verse filters are mutually exclusive: setting
/// one clears the other.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SecondaryFilter {
    None,
    Token { id: TokenId, aligned: Vec<TokenId> },
    Verse(VerseRef),
}

/// Exposed to UI collaborators as the current filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    pub kind: ActiveFilterKind,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// What to render. On an over-constrained Stage-2 filter this is the
    /// full Stage-1 set (fallback), never an empty list.
    pub visible: Vec<Annotation>,
    /// True Stage-2 survivor count, reported even when the fallback renders
    /// more than this.
    pub secondary_count: usize,
    /// Annotation auto-activated by a first non-empty token-filter result,
    /// at most once per distinct (token, first-result) pair.
    pub activated: Option<AnnotationId>,
}

/// Stage 1: navigation-range filtering.
///
/// Keeps annotations of a displayed kind whose parsed reference start falls
/// inside `[range.start, range.end]` inclusive. Malformed references are
/// excluded, not errored.
pub fn stage1(
    annotations: &[Annotation],
    range: &QuoteReference,
    kinds: AnnotationKinds,
) -> Vec<Annotation> {
    annotations
        .iter()
        .filter(|a| kinds.includes(a.kind))
        .filter(|a| {
            parse_reference(&a.reference)
                .map(|(start, _)| range.contains(start))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[derive(Debug)]
pub struct AnnotationFilterEngine {
    secondary: SecondaryFilter,
    last_auto: Option<(TokenId, AnnotationId)>,
}

impl Default for AnnotationFilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationFilterEngine {
    pub fn new() -> Self {
        Self { secondary: SecondaryFilter::None, last_auto: None }
    }

    pub fn active_kind(&self) -> ActiveFilterKind {
        match self.secondary {
            SecondaryFilter::None => ActiveFilterKind::None,
            SecondaryFilter::Token { .. } => ActiveFilterKind::Token,
            SecondaryFilter::Verse(_) => ActiveFilterKind::Verse,
        }
    }

    /// Install a token filter from a clicked token. Clears any verse filter.
    pub fn set_token_filter(&mut self, id: TokenId, aligned: Vec<TokenId>) {
        self.secondary = SecondaryFilter::Token { id, aligned };
    }

    /// Install a verse filter from a clicked verse. Clears any token filter.
    pub fn set_verse_filter(&mut self, verse: VerseRef) {
        self.secondary = SecondaryFilter::Verse(verse);
    }

    pub fn clear(&mut self) {
        self.secondary = SecondaryFilter::None;
    }

    /// Run Stage 2 over a Stage-1 list, consulting resolved spans.
    pub fn apply(&mut self, stage1: &[Annotation], spans: &SpanCache) -> FilterOutcome {
        let survivors: Vec<Annotation> = match &self.secondary {
            SecondaryFilter::None => {
                return FilterOutcome {
                    visible: stage1.to_vec(),
                    secondary_count: stage1.len(),
                    activated: None,
                };
            }
            SecondaryFilter::Token { id, aligned } => stage1
                .iter()
                .filter(|a| span_intersects(spans, &a.id, *id, aligned))
                .cloned()
                .collect(),
            SecondaryFilter::Verse(verse) => stage1
                .iter()
                .filter(|a| {
                    parse_reference(&a.reference)
                        .map(|(start, end)| start == *verse && end == *verse)
                        .unwrap_or(false)
                })
                .cloned()
                .collect(),
        };

        let secondary_count = survivors.len();
        let activated = self.auto_activate(&survivors);

        if survivors.is_empty() {
            // Fallback-on-empty: an over-constrained filter must not blank
            // the list; the true zero count is still reported.
            return FilterOutcome {
                visible: stage1.to_vec(),
                secondary_count,
                activated,
            };
        }

        FilterOutcome { visible: survivors, secondary_count, activated }
    }

    fn auto_activate(&mut self, survivors: &[Annotation]) -> Option<AnnotationId> {
        let SecondaryFilter::Token { id, .. } = &self.secondary else {
            return None;
        };
        let first = survivors.first()?;
        let pair = (*id, first.id.clone());
        if self.last_auto.as_ref() == Some(&pair) {
            // Already activated for this click; re-renders must not re-fire.
            return None;
        }
        self.last_auto = Some(pair);
        Some(first.id.clone())
    }
}

fn span_intersects(
    spans: &SpanCache,
    annotation: &AnnotationId,
    clicked: TokenId,
    aligned: &[TokenId],
) -> bool {
    let Some(Ok(span)) = spans.get(annotation) else {
        return false;
    };
    span.iter()
        .any(|t| t.id == clicked || aligned.contains(&t.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_protocol::{AnnotationKind, Token, TokenKind};

    fn annotation(id: &str, reference: &str, quote: &str) -> Annotation {
        Annotation {
            id: AnnotationId::from(id),
            kind: AnnotationKind::Note,
            reference: reference.into(),
            quote: quote.into(),
            occurrence: Some(1),
        }
    }

    fn span_token(id: u32) -> Token {
        Token {
            id: TokenId(id),
            text: "λόγος".into(),
            kind: TokenKind::Word,
            align: vec![],
            verse: VerseRef::new(2, 3),
        }
    }

    fn range_2_1_to_2_5() -> QuoteReference {
        QuoteReference::new("tit", VerseRef::new(2, 1), VerseRef::new(2, 5))
    }

    #[test]
    fn test_stage1_keeps_in_range_and_drops_malformed() {
        let annotations = vec![
            annotation("in", "2:3", "λόγος"),
            annotation("range-start", "2:3-7", "λόγος"), // start governs
            annotation("out", "3:1", "λόγος"),
            annotation("bad", "front:intro", "λόγος"),
        ];
        let kept = stage1(&annotations, &range_2_1_to_2_5(), AnnotationKinds::all());
        let ids: Vec<&str> = kept.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["in", "range-start"]);
    }

    #[test]
    fn test_stage1_respects_kind_mask() {
        let mut wl = annotation("wl", "2:3", "ὁ");
        wl.kind = AnnotationKind::WordLink;
        let annotations = vec![annotation("note", "2:3", "λόγος"), wl];
        let kept = stage1(&annotations, &range_2_1_to_2_5(), AnnotationKinds::NOTE);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id.as_str(), "note");
    }

    #[test]
    fn test_token_filter_matches_span_or_aligned_ids() {
        let stage1_list = vec![annotation("a", "2:3", "λόγος"), annotation("b", "2:4", "θεός")];
        let mut spans = SpanCache::new(1);
        spans.insert(AnnotationId::from("a"), Ok(vec![span_token(5)]));
        spans.insert(AnnotationId::from("b"), Ok(vec![span_token(9)]));

        let mut engine = AnnotationFilterEngine::new();
        // Click on a target token aligned to original id 5
        engine.set_token_filter(TokenId(100), vec![TokenId(5)]);
        let outcome = engine.apply(&stage1_list, &spans);
        assert_eq!(outcome.secondary_count, 1);
        assert_eq!(outcome.visible[0].id.as_str(), "a");

        // Click directly on original id 9
        engine.set_token_filter(TokenId(9), vec![]);
        let outcome = engine.apply(&stage1_list, &spans);
        assert_eq!(outcome.secondary_count, 1);
        assert_eq!(outcome.visible[0].id.as_str(), "b");
    }

    #[test]
    fn test_verse_filter_requires_exact_reference() {
        let stage1_list = vec![
            annotation("single", "2:3", "λόγος"),
            annotation("ranged", "2:3-4", "θεός"),
        ];
        let spans = SpanCache::new(1);
        let mut engine = AnnotationFilterEngine::new();
        engine.set_verse_filter(VerseRef::new(2, 3));
        let outcome = engine.apply(&stage1_list, &spans);
        assert_eq!(outcome.secondary_count, 1);
        assert_eq!(outcome.visible[0].id.as_str(), "single");
    }

    #[test]
    fn test_fallback_renders_full_set_with_true_zero_count() {
        let stage1_list = vec![annotation("a", "2:3", "λόγος"), annotation("b", "2:4", "θεός")];
        let spans = SpanCache::new(1); // no resolved spans at all
        let mut engine = AnnotationFilterEngine::new();
        engine.set_token_filter(TokenId(42), vec![]);

        let outcome = engine.apply(&stage1_list, &spans);
        assert_eq!(outcome.visible.len(), 2, "fallback must render the Stage-1 set");
        assert_eq!(outcome.secondary_count, 0, "while reporting the true count");
    }

    #[test]
    fn test_filters_are_mutually_exclusive() {
        let mut engine = AnnotationFilterEngine::new();
        engine.set_verse_filter(VerseRef::new(2, 3));
        assert_eq!(engine.active_kind(), ActiveFilterKind::Verse);
        engine.set_token_filter(TokenId(1), vec![]);
        assert_eq!(engine.active_kind(), ActiveFilterKind::Token);
        engine.set_verse_filter(VerseRef::new(2, 3));
        assert_eq!(engine.active_kind(), ActiveFilterKind::Verse);
    }

    #[test]
    fn test_auto_activation_fires_once_per_pair() {
        let stage1_list = vec![annotation("a", "2:3", "λόγος")];
        let mut spans = SpanCache::new(1);
        spans.insert(AnnotationId::from("a"), Ok(vec![span_token(5)]));

        let mut engine = AnnotationFilterEngine::new();
        engine.set_token_filter(TokenId(5), vec![]);
        let first = engine.apply(&stage1_list, &spans);
        assert_eq!(first.activated, Some(AnnotationId::from("a")));

        // Re-render with the same click: no re-trigger
        let second = engine.apply(&stage1_list, &spans);
        assert_eq!(second.activated, None);

        // A different click re-arms the guard
        engine.set_token_filter(TokenId(5), vec![TokenId(5)]);
        let outcome = engine.apply(&stage1_list, &spans);
        assert_eq!(outcome.activated, None, "same (token, result) pair stays guarded");
    }
}
