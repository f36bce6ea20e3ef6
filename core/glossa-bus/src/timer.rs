use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Cancellable one-shot timers. The host supplies the clock; no UI
/// lifecycle hooks.
pub trait Scheduler {
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> CancelToken;
}

struct TimerEntry {
    id: u64,
    due: u64,
    callback: Box<dyn FnOnce()>,
}

struct SchedulerState {
    now: u64,
    next_id: u64,
    entries: Vec<TimerEntry>,
}

/// Cancels the pending timer it was issued for. Cancelling an already-fired
/// or already-cancelled timer is a no-op.
pub struct CancelToken {
    id: u64,
    state: Weak<RefCell<SchedulerState>>,
}

impl CancelToken {
    pub fn cancel(&self) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().entries.retain(|e| e.id != self.id);
        }
    }
}

/// Host-driven clock: time only moves when `advance` is called, which is how
/// both tests and the cooperative wasm host drive pending debounces.
#[derive(Clone)]
pub struct ManualScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState {
                now: 0,
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Move the clock forward and fire every timer that comes due, in
    /// (due time, creation order). Callbacks may schedule further timers;
    /// those fire too if they fall inside the advanced window.
    pub fn advance(&self, ms: u64) {
        let target = self.state.borrow().now + ms;

        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due_idx = state
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(_, e)| (e.due, e.id))
                    .map(|(i, _)| i);
                match due_idx {
                    Some(i) => {
                        let entry = state.entries.remove(i);
                        state.now = entry.due.max(state.now);
                        Some(entry.callback)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().entries.len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> CancelToken {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay_ms;
        state.entries.push(TimerEntry { id, due, callback });
        CancelToken { id, state: Rc::downgrade(&self.state) }
    }
}

/// Quiescence-window coalescing for state publishes: each `call` supersedes
/// any pending one, so only the last recomputation in a burst publishes.
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    delay_ms: u64,
    pending: Option<CancelToken>,
}

impl Debouncer {
    pub fn new(scheduler: Rc<dyn Scheduler>, delay_ms: u64) -> Self {
        Self { scheduler, delay_ms, pending: None }
    }

    pub fn call(&mut self, callback: impl FnOnce() + 'static) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
        self.pending = Some(self.scheduler.schedule(self.delay_ms, Box::new(callback)));
    }

    /// Cancel any outstanding publish. Must run on panel teardown or input
    /// change so no stale publish escapes the window.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}
