use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use glossa_protocol::{Envelope, Payload, StateKey};

type Callback = Box<dyn FnMut(&Envelope)>;

struct Subscriber {
    id: u64,
    resource: String,
    callback: Callback,
}

struct HubState {
    subscribers: Vec<Subscriber>,
    current: HashMap<StateKey, Envelope>,
    queue: VecDeque<Envelope>,
    removed_during_delivery: HashSet<u64>,
    delivering: bool,
    closed: bool,
    next_id: u64,
}

/// Handle returned by [`MessageHub::subscribe`]. Unsubscribe is explicit;
/// nothing happens on drop.
pub struct Subscription {
    id: u64,
    hub: MessageHub,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.hub.unsubscribe(self.id);
    }
}

/// Typed, lifecycle-aware publish/subscribe bus connecting a scripture panel
/// and one or more annotation panels.
///
/// Single-threaded and cooperative: publishes made from inside a delivery
/// callback are queued and flushed in send-call order, so within one panel
/// broadcasts are ordered while no cross-panel ordering is promised.
#[derive(Clone)]
pub struct MessageHub {
    state: Rc<RefCell<HubState>>,
}

impl Default for MessageHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHub {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HubState {
                subscribers: Vec::new(),
                current: HashMap::new(),
                queue: VecDeque::new(),
                removed_during_delivery: HashSet::new(),
                delivering: false,
                closed: false,
                next_id: 0,
            })),
        }
    }

    /// Register a listener owned by `resource_id`. The hub never delivers a
    /// broadcast back to subscribers of its own source (self-feedback guard).
    pub fn subscribe(
        &self,
        resource_id: &str,
        callback: impl FnMut(&Envelope) + 'static,
    ) -> Subscription {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push(Subscriber {
            id,
            resource: resource_id.to_string(),
            callback: Box::new(callback),
        });
        Subscription { id, hub: self.clone() }
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.state.borrow_mut();
        state.subscribers.retain(|s| s.id != id);
        if state.delivering {
            // The live subscriber vec is temporarily swapped out; record the
            // removal so the delivery loop drops it on reinstall.
            state.removed_during_delivery.insert(id);
        }
    }

    /// Current value for a state key, independent of when it was published.
    /// Late subscribers read this instead of waiting for the next broadcast.
    pub fn current(&self, key: StateKey) -> Option<Envelope> {
        self.state.borrow().current.get(&key).cloned()
    }

    /// Publish a payload under `source`. State payloads supersede the
    /// previous value for their key (last-write-wins); event payloads are
    /// delivered to live subscribers only and never retained.
    pub fn publish(&self, source: &str, payload: Payload) {
        {
            let mut state = self.state.borrow_mut();
            if state.closed {
                // Teardown race: a panel published after channel disposal.
                log::debug!("dropped {} published after hub close", payload.type_name());
                return;
            }

            let envelope = Envelope {
                source: source.to_string(),
                timestamp_ms: now_ms(),
                payload,
            };
            if let Some(key) = envelope.state_key() {
                state.current.insert(key, envelope.clone());
            }
            state.queue.push_back(envelope);

            if state.delivering {
                // A callback is publishing; the active flush will pick it up.
                return;
            }
            state.delivering = true;
        }

        self.flush();
    }

    fn flush(&self) {
        loop {
            let envelope = {
                let mut state = self.state.borrow_mut();
                match state.queue.pop_front() {
                    Some(e) => e,
                    None => {
                        state.delivering = false;
                        return;
                    }
                }
            };

            // Swap the subscriber vec out so callbacks may re-enter the hub.
            let mut live = {
                let mut state = self.state.borrow_mut();
                std::mem::take(&mut state.subscribers)
            };

            for subscriber in live.iter_mut() {
                if subscriber.resource == envelope.source {
                    log::trace!(
                        "self-feedback guard: {} ignores own {}",
                        subscriber.resource,
                        envelope.payload.type_name()
                    );
                    continue;
                }
                (subscriber.callback)(&envelope);
            }

            let mut state = self.state.borrow_mut();
            // Subscriptions added during delivery landed in state.subscribers.
            let added = std::mem::take(&mut state.subscribers);
            live.extend(added);
            let removed = std::mem::take(&mut state.removed_during_delivery);
            live.retain(|s| !removed.contains(&s.id));
            state.subscribers = live;
        }
    }

    /// Dispose the channel. Later publishes are caught and ignored.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.closed = true;
        state.subscribers.clear();
        state.queue.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
