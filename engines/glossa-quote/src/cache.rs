use std::collections::HashMap;

use glossa_protocol::AnnotationId;

use crate::matcher::MatchResult;

/// Side table memoizing resolved spans per annotation identity.
///
/// Annotations stay immutable; this table is the only place resolution
/// results live, and it empties itself whenever the corpus version moves.
/// In-memory and advisory only. Nothing here survives a restart.
#[derive(Debug, Default)]
pub struct SpanCache {
    corpus_version: u32,
    entries: HashMap<AnnotationId, MatchResult>,
}

impl SpanCache {
    pub fn new(corpus_version: u32) -> Self {
        Self { corpus_version, entries: HashMap::new() }
    }

    /// Align the cache with the active corpus. A version change drops every
    /// memoized result.
    pub fn sync_version(&mut self, corpus_version: u32) {
        if self.corpus_version != corpus_version {
            self.corpus_version = corpus_version;
            self.entries.clear();
        }
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&MatchResult> {
        self.entries.get(id)
    }

    pub fn insert(&mut self, id: AnnotationId, result: MatchResult) {
        self.entries.insert(id, result);
    }

    pub fn get_or_insert_with(
        &mut self,
        id: &AnnotationId,
        resolve: impl FnOnce() -> MatchResult,
    ) -> &MatchResult {
        self.entries.entry(id.clone()).or_insert_with(resolve)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
