use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glossa_bus::{MessageHub, Subscription};
use glossa_protocol::{
    Envelope, Payload, QuoteReference, StateKey, Token, TokenGroup, TokenId, VerseRef,
};

/// Scripture-panel controller: exposes its rendered token stream on the bus
/// and turns incoming token groups into a per-token highlight map.
pub struct ScripturePanel {
    resource_id: String,
    hub: MessageHub,
    subscription: Option<Subscription>,

    range: Option<QuoteReference>,
    tokens: Vec<Token>,
    /// Original-language token id -> color index, from the latest groups.
    highlights: HashMap<TokenId, usize>,
    disposed: bool,
}

impl ScripturePanel {
    pub fn attach(hub: &MessageHub, resource_id: &str) -> Rc<RefCell<ScripturePanel>> {
        let panel = Rc::new(RefCell::new(ScripturePanel {
            resource_id: resource_id.to_string(),
            hub: hub.clone(),
            subscription: None,
            range: None,
            tokens: Vec::new(),
            highlights: HashMap::new(),
            disposed: false,
        }));

        let weak = Rc::downgrade(&panel);
        let subscription = hub.subscribe(resource_id, move |envelope| {
            if let Some(panel) = weak.upgrade() {
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

        // Late attach: adopt whatever groups are already current.
        if let Some(envelope) = hub.current(StateKey::TokenGroups) {
            panel.borrow_mut().on_message(&envelope);
        }

        panel
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Install the token stream this panel currently renders and expose it
    /// to annotation panels under the fixed scripture-tokens key.
    pub fn set_tokens(&mut self, range: QuoteReference, tokens: Vec<Token>) {
        self.tokens = tokens;
        self.range = Some(range.clone());
        self.hub.publish(
            &self.resource_id,
            Payload::ScriptureTokens { range, tokens: self.tokens.clone() },
        );
    }

    /// Color for a rendered token: direct id hit for original-language
    /// streams, or any declared aligned id for target-language streams.
    pub fn highlight_for(&self, token: &Token) -> Option<usize> {
        if let Some(&color) = self.highlights.get(&token.id) {
            return Some(color);
        }
        token
            .align
            .iter()
            .find_map(|id| self.highlights.get(id).copied())
    }

    pub fn highlights(&self) -> &HashMap<TokenId, usize> {
        &self.highlights
    }

    /// Republish a user token click as a transient event.
    pub fn click_token(&self, token_id: TokenId) {
        let Some(token) = self.tokens.iter().find(|t| t.id == token_id) else {
            return;
        };
        self.hub.publish(
            &self.resource_id,
            Payload::TokenClick { token: token.clone() },
        );
    }

    pub fn click_verse(&self, verse: VerseRef) {
        self.hub.publish(&self.resource_id, Payload::VerseClick { verse });
    }

    fn on_message(&mut self, envelope: &Envelope) {
        if self.disposed {
            return;
        }
        if let Payload::TokenGroups { groups, .. } = &envelope.payload {
            self.apply_groups(groups);
        }
    }

    fn apply_groups(&mut self, groups: &[TokenGroup]) {
        self.highlights.clear();
        for group in groups {
            for token in &group.tokens {
                self.highlights.insert(token.id, group.color_index);
            }
        }
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
