use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use glossa_align::{build_quote_with_ellipsis, find_aligned_tokens, AlignmentIndex};
use glossa_bus::{Debouncer, MessageHub, Scheduler, Subscription};
use glossa_protocol::{
    Annotation, AnnotationId, AnnotationKind, AnnotationKinds, Envelope, Payload,
    QuoteReference, StateKey, Token, TokenCorpus, TokenGroup, TEARDOWN_SOURCE,
};
use glossa_quote::{find_original_tokens, parse_reference, MatchOptions, SpanCache};

use crate::color::{color_indices, DEFAULT_PALETTE_SIZE};
use crate::filter::{stage1, AnnotationFilterEngine, FilterState};

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct PanelOptions {
    pub palette_size: usize,
    pub debounce_ms: u64,
    pub kinds: AnnotationKinds,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            palette_size: DEFAULT_PALETTE_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            kinds: AnnotationKinds::all(),
        }
    }
}

/// Annotation-panel controller: resolves quotes against the active corpus,
/// broadcasts highlight groups, and maintains the two-stage filtered view.
///
/// Rendering-framework-free: a UI collaborator feeds it corpus, annotations
/// and navigation, and reads `visible`/`display_quote`/`filter_state` back.
pub struct AnnotationPanel {
    resource_id: String,
    hub: MessageHub,
    options: PanelOptions,
    debouncer: Debouncer,
    subscription: Option<Subscription>,
    self_weak: Weak<RefCell<AnnotationPanel>>,

    corpus: Option<Rc<TokenCorpus>>,
    annotations: Vec<Annotation>,
    range: Option<QuoteReference>,

    cache: SpanCache,
    filter: AnnotationFilterEngine,
    stage1_view: Vec<Annotation>,
    colors: HashMap<AnnotationId, usize>,
    groups: Vec<TokenGroup>,
    scripture: Option<Vec<Token>>,
    display_quotes: HashMap<AnnotationId, String>,
    secondary_count: usize,

    last_published_hash: Option<u64>,
    active: Option<AnnotationId>,
    disposed: bool,
}

impl AnnotationPanel {
    pub fn attach(
        hub: &MessageHub,
        scheduler: Rc<dyn Scheduler>,
        resource_id: &str,
        options: PanelOptions,
    ) -> Rc<RefCell<AnnotationPanel>> {
        let debounce_ms = options.debounce_ms;
        let panel = Rc::new(RefCell::new(AnnotationPanel {
            resource_id: resource_id.to_string(),
            hub: hub.clone(),
            options,
            debouncer: Debouncer::new(scheduler, debounce_ms),
            subscription: None,
            self_weak: Weak::new(),
            corpus: None,
            annotations: Vec::new(),
            range: None,
            cache: SpanCache::new(0),
            filter: AnnotationFilterEngine::new(),
            stage1_view: Vec::new(),
            colors: HashMap::new(),
            groups: Vec::new(),
            scripture: None,
            display_quotes: HashMap::new(),
            secondary_count: 0,
            last_published_hash: None,
            active: None,
            disposed: false,
        }));

        let weak = Rc::downgrade(&panel);
        panel.borrow_mut().self_weak = weak.clone();
        let subscription = hub.subscribe(resource_id, move |envelope| {
            if let Some(panel) = weak.upgrade() {
                // A delivery can arrive while the panel is borrowed by the
                // very call that triggered it; state is re-readable from the
                // hub's current-value table, so dropping is safe.
                match panel.try_borrow_mut() {
                    Ok(mut panel) => panel.on_message(envelope),
                    Err(_) => log::trace!(
                        "skipped {} delivery to busy panel",
                        envelope.payload.type_name()
                    ),
                }
            }
        });
        panel.borrow_mut().subscription = Some(subscription);

        // Late attach: read the current scripture stream instead of waiting
        // for the next broadcast.
        if let Some(envelope) = hub.current(StateKey::ScriptureTokens) {
            panel.borrow_mut().on_message(&envelope);
        }

        panel
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn set_corpus(&mut self, corpus: TokenCorpus) {
        self.cache.sync_version(corpus.version);
        self.corpus = Some(Rc::new(corpus));
        self.recompute();
    }

    /// Replace the annotation set. Annotations are immutable: an edited note
    /// arrives under a new id, so memoized spans for surviving ids stay valid.
    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
        self.recompute();
    }

    pub fn set_navigation(&mut self, range: QuoteReference) {
        self.range = Some(range);
        // A navigation change invalidates any click-scoped filter.
        self.filter.clear();
        self.active = None;
        self.recompute();
        // With no secondary filter the reported count is the Stage-1 size.
        self.secondary_count = self.stage1_view.len();
    }

    /// Stage-1 + Stage-2 view with fallback semantics applied.
    ///
    /// A token filter's first non-empty result can surface here instead of in
    /// the click handler (spans may resolve after the click), so activation
    /// fires from either path.
    pub fn visible(&mut self) -> Vec<Annotation> {
        let outcome = self.filter.apply(&self.stage1_view, &self.cache);
        self.secondary_count = outcome.secondary_count;
        if let Some(id) = outcome.activated {
            self.activate(id);
        }
        outcome.visible
    }

    pub fn filter_state(&self) -> FilterState {
        FilterState { kind: self.filter.active_kind(), count: self.secondary_count }
    }

    pub fn color_index(&self, id: &AnnotationId) -> Option<usize> {
        self.colors.get(id).copied()
    }

    /// Target-language display quote for an annotation, falling back to the
    /// literal original-language quote when matching or alignment failed.
    pub fn display_quote(&self, id: &AnnotationId) -> Option<String> {
        if let Some(quote) = self.display_quotes.get(id) {
            return Some(quote.clone());
        }
        self.stage1_view
            .iter()
            .find(|a| &a.id == id)
            .map(|a| a.quote.clone())
    }

    pub fn active_annotation(&self) -> Option<&AnnotationId> {
        self.active.as_ref()
    }

    /// Selection toggle exposed to the UI collaborator.
    pub fn toggle_selection(&mut self, id: &AnnotationId) {
        if self.active.as_ref() == Some(id) {
            self.active = None;
            return;
        }
        self.active = Some(id.clone());
        self.hub.publish(
            &self.resource_id,
            Payload::NoteSelected { annotation_id: id.clone() },
        );
    }

    fn on_message(&mut self, envelope: &Envelope) {
        if self.disposed {
            return;
        }
        if envelope.source == self.resource_id {
            // Defense in depth: the hub already guards self-feedback.
            log::trace!("{} ignoring own broadcast", self.resource_id);
            return;
        }

        match &envelope.payload {
            Payload::ScriptureTokens { tokens, .. } => {
                self.scripture = Some(tokens.clone());
                self.rebuild_display_quotes();
            }
            Payload::TokenClick { token } => {
                self.filter.set_token_filter(token.id, token.align.clone());
                let outcome = self.filter.apply(&self.stage1_view, &self.cache);
                self.secondary_count = outcome.secondary_count;
                if let Some(id) = outcome.activated {
                    self.activate(id);
                }
            }
            Payload::VerseClick { verse } => {
                self.filter.set_verse_filter(*verse);
                let outcome = self.filter.apply(&self.stage1_view, &self.cache);
                self.secondary_count = outcome.secondary_count;
            }
            // Another panel's groups or selection: nothing to do here.
            Payload::TokenGroups { .. } | Payload::NoteSelected { .. } => {}
        }
    }

    /// Recompute the derived view: Stage-1 list, colors, resolved spans,
    /// token groups, display quotes; then schedule a debounced publish.
    fn recompute(&mut self) {
        let (Some(corpus), Some(range)) = (self.corpus.clone(), self.range.clone()) else {
            self.stage1_view.clear();
            self.groups.clear();
            self.colors.clear();
            self.display_quotes.clear();
            return;
        };

        self.stage1_view = stage1(&self.annotations, &range, self.options.kinds);
        self.colors = color_indices(&self.stage1_view, self.options.palette_size);

        let mut groups = Vec::new();
        for annotation in &self.stage1_view {
            if !annotation.is_matchable() {
                continue;
            }
            let Some((start, end)) = parse_reference(&annotation.reference) else {
                continue;
            };
            let occurrence = annotation.occurrence.unwrap_or(1);
            let anchor = QuoteReference::new(corpus.book.clone(), start, end);
            let options = match annotation.kind {
                AnnotationKind::Note => MatchOptions::notes(),
                AnnotationKind::WordLink => MatchOptions::word_links(),
            };
            let quote = annotation.quote.clone();
            let result = self
                .cache
                .get_or_insert_with(&annotation.id, || {
                    find_original_tokens(&corpus, &quote, occurrence, &anchor, options)
                })
                .clone();

            match result {
                Ok(tokens) if !tokens.is_empty() => {
                    groups.push(TokenGroup {
                        annotation_id: annotation.id.clone(),
                        reference: annotation.reference.clone(),
                        quote: annotation.quote.clone(),
                        occurrence,
                        tokens,
                        color_index: self.colors.get(&annotation.id).copied().unwrap_or(0),
                    });
                }
                Ok(_) => {}
                Err(error) => {
                    // Non-fatal: this annotation renders its literal quote
                    // with no highlight.
                    log::debug!("{}: unresolved quote: {}", annotation.id.as_str(), error);
                }
            }
        }
        self.groups = groups;
        self.rebuild_display_quotes();
        self.schedule_publish();
    }

    fn rebuild_display_quotes(&mut self) {
        self.display_quotes.clear();
        let Some(stream) = &self.scripture else {
            return;
        };
        let index = AlignmentIndex::build(stream);
        for group in &self.groups {
            let aligned = find_aligned_tokens(&group.tokens, &index);
            if aligned.is_empty() {
                // Alignment gap: leave the original-language quote in place.
                continue;
            }
            self.display_quotes.insert(
                group.annotation_id.clone(),
                build_quote_with_ellipsis(&aligned, stream),
            );
        }
    }

    fn activate(&mut self, id: AnnotationId) {
        self.active = Some(id.clone());
        self.hub.publish(
            &self.resource_id,
            Payload::NoteSelected { annotation_id: id },
        );
    }

    fn schedule_publish(&mut self) {
        let weak = self.self_weak.clone();
        self.debouncer.call(move || {
            if let Some(panel) = weak.upgrade() {
                panel.borrow_mut().publish_groups();
            }
        });
    }

    fn publish_groups(&mut self) {
        if self.disposed {
            return;
        }
        let hash = self.content_hash();
        if self.last_published_hash == Some(hash) {
            // Unchanged content: skip to keep panels from oscillating on
            // each other's re-renders.
            return;
        }
        self.last_published_hash = Some(hash);
        self.hub.publish(
            &self.resource_id,
            Payload::TokenGroups { groups: self.groups.clone(), content_hash: hash },
        );
    }

    /// Hash over navigation reference plus matched-annotation identities.
    fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        if let Some(range) = &self.range {
            range.to_string().hash(&mut hasher);
        }
        self.groups.len().hash(&mut hasher);
        for group in &self.groups {
            group.annotation_id.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Mandatory teardown: supersede our state with an empty token-group
    /// message so no ghost highlight survives on the scripture panel.
    /// Bypasses deduplication by design.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.debouncer.cancel();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.hub.publish(
            TEARDOWN_SOURCE,
            Payload::TokenGroups { groups: Vec::new(), content_hash: 0 },
        );
    }
}
