use std::cell::RefCell;
use std::rc::Rc;

use rkyv::Deserialize as RkyvDeserialize;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use glossa_bus::{ManualScheduler, MessageHub};
use glossa_panel::{AnnotationPanel, PanelOptions, ScripturePanel};
use glossa_protocol::{Annotation, QuoteReference, Token, TokenCorpus, TokenId, VerseRef};
use glossa_quote::parse_reference;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// The structured views sent back to JavaScript/React
#[derive(Serialize)]
pub struct HighlightView {
    pub token_id: u32,
    pub color_index: usize,
}

#[derive(Serialize)]
pub struct AnnotationView {
    pub id: String,
    pub reference: String,
    pub quote: String,
    pub display_quote: String,
    pub color_index: Option<usize>,
}

#[derive(Serialize)]
pub struct FilterStateView {
    pub kind: String,
    pub count: usize,
}

/// The Engine Instance running in the Browser.
///
/// Owns the bus, both panel controllers, and a host-driven clock: the host
/// calls [`HighlightEngine::tick`] from its animation/idle loop so debounced
/// publishes fire without any browser timer plumbing in the core.
#[wasm_bindgen]
pub struct HighlightEngine {
    hub: MessageHub,
    scheduler: Rc<ManualScheduler>,
    notes: Rc<RefCell<AnnotationPanel>>,
    scripture: Rc<RefCell<ScripturePanel>>,
    book: String,
}

#[wasm_bindgen]
impl HighlightEngine {
    /// Boot from a compiled corpus artifact (loaded via fetch() in JS).
    #[wasm_bindgen(constructor)]
    pub fn new(corpus_bytes: Vec<u8>) -> Result<HighlightEngine, JsValue> {
        let archived = rkyv::check_archived_root::<TokenCorpus>(&corpus_bytes)
            .map_err(|e| JsValue::from_str(&format!("invalid corpus artifact: {e}")))?;
        let corpus: TokenCorpus = archived
            .deserialize(&mut rkyv::Infallible)
            .map_err(|_| JsValue::from_str("corpus deserialization failed"))?;

        let hub = MessageHub::new();
        let scheduler = Rc::new(ManualScheduler::new());
        let notes = AnnotationPanel::attach(
            &hub,
            scheduler.clone(),
            "notes-panel",
            PanelOptions::default(),
        );
        let scripture = ScripturePanel::attach(&hub, "scripture-panel");

        let book = corpus.book.clone();
        notes.borrow_mut().set_corpus(corpus);

        Ok(HighlightEngine { hub, scheduler, notes, scripture, book })
    }

    /// Replace the annotation set. `js` is an array of annotation objects.
    pub fn set_annotations(&self, js: JsValue) -> Result<(), JsValue> {
        let annotations: Vec<Annotation> = serde_wasm_bindgen::from_value(js)
            .map_err(|e| JsValue::from_str(&format!("bad annotations: {e}")))?;
        self.notes.borrow_mut().set_annotations(annotations);
        Ok(())
    }

    /// Navigate to a chapter:verse[-verse] reference within the loaded book.
    pub fn navigate(&self, reference: &str) -> Result<(), JsValue> {
        let (start, end) = self.parse_range(reference)?;
        self.notes
            .borrow_mut()
            .set_navigation(QuoteReference::new(self.book.clone(), start, end));
        Ok(())
    }

    /// Install the target-language token stream the scripture panel renders.
    pub fn set_scripture_tokens(&self, reference: &str, js: JsValue) -> Result<(), JsValue> {
        let tokens: Vec<Token> = serde_wasm_bindgen::from_value(js)
            .map_err(|e| JsValue::from_str(&format!("bad tokens: {e}")))?;
        let (start, end) = self.parse_range(reference)?;
        self.scripture
            .borrow_mut()
            .set_tokens(QuoteReference::new(self.book.clone(), start, end), tokens);
        Ok(())
    }

    /// Advance the engine clock; fires any debounced publish that comes due.
    pub fn tick(&self, ms: u32) {
        self.scheduler.advance(ms as u64);
    }

    /// The filtered annotation list with colors and display quotes resolved.
    pub fn visible_annotations(&self) -> Result<JsValue, JsValue> {
        let mut notes = self.notes.borrow_mut();
        let views: Vec<AnnotationView> = notes
            .visible()
            .into_iter()
            .map(|a| AnnotationView {
                display_quote: notes
                    .display_quote(&a.id)
                    .unwrap_or_else(|| a.quote.clone()),
                color_index: notes.color_index(&a.id),
                id: a.id.0,
                reference: a.reference,
                quote: a.quote,
            })
            .collect();
        serde_wasm_bindgen::to_value(&views)
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    /// Current per-token highlight colors on the scripture panel.
    pub fn highlights(&self) -> Result<JsValue, JsValue> {
        let scripture = self.scripture.borrow();
        let mut views: Vec<HighlightView> = scripture
            .highlights()
            .iter()
            .map(|(id, color)| HighlightView { token_id: id.0, color_index: *color })
            .collect();
        views.sort_by_key(|v| v.token_id);
        serde_wasm_bindgen::to_value(&views)
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    pub fn filter_state(&self) -> Result<JsValue, JsValue> {
        let state = self.notes.borrow().filter_state();
        let view = FilterStateView {
            kind: format!("{:?}", state.kind).to_lowercase(),
            count: state.count,
        };
        serde_wasm_bindgen::to_value(&view)
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    pub fn click_token(&self, token_id: u32) {
        self.scripture.borrow().click_token(TokenId(token_id));
    }

    pub fn click_verse(&self, chapter: u16, verse: u16) {
        self.scripture.borrow().click_verse(VerseRef::new(chapter, verse));
    }

    pub fn active_annotation(&self) -> Option<String> {
        self.notes
            .borrow()
            .active_annotation()
            .map(|id| id.as_str().to_string())
    }

    /// Tear down both panels and close the bus. Must be called before the
    /// host drops the engine so no ghost highlight survives in the UI layer.
    pub fn dispose(&mut self) {
        self.notes.borrow_mut().dispose();
        self.scripture.borrow_mut().dispose();
        self.hub.close();
    }

    fn parse_range(&self, reference: &str) -> Result<(VerseRef, VerseRef), JsValue> {
        parse_reference(reference)
            .ok_or_else(|| JsValue::from_str(&format!("unparseable reference: {reference}")))
    }
}
