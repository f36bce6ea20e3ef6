pub mod hub;
pub mod timer;

pub use hub::{MessageHub, Subscription};
pub use timer::{CancelToken, Debouncer, ManualScheduler, Scheduler};

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_protocol::{Payload, StateKey, VerseRef};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn groups_payload(hash: u64) -> Payload {
        Payload::TokenGroups { groups: vec![], content_hash: hash }
    }

    #[test]
    fn test_state_supersedes_and_serves_late_subscribers() {
        let hub = MessageHub::new();
        hub.publish("notes-1", groups_payload(1));
        hub.publish("notes-1", groups_payload(2));

        // Level-triggered: the latest value is readable with no subscription
        let current = hub.current(StateKey::TokenGroups).unwrap();
        match current.payload {
            Payload::TokenGroups { content_hash, .. } => assert_eq!(content_hash, 2),
            other => panic!("unexpected payload {:?}", other),
        }
        assert!(hub.current(StateKey::ScriptureTokens).is_none());
    }

    #[test]
    fn test_events_are_never_retained() {
        let hub = MessageHub::new();
        let seen = Rc::new(RefCell::new(0));

        hub.publish("scripture-1", Payload::VerseClick { verse: VerseRef::new(1, 1) });

        let seen_clone = seen.clone();
        let _sub = hub.subscribe("notes-1", move |_| *seen_clone.borrow_mut() += 1);
        // Nothing replayed to the late subscriber
        assert_eq!(*seen.borrow(), 0);

        hub.publish("scripture-1", Payload::VerseClick { verse: VerseRef::new(1, 2) });
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_self_feedback_guard() {
        let hub = MessageHub::new();
        let own = Rc::new(RefCell::new(0));
        let other = Rc::new(RefCell::new(0));

        let own_clone = own.clone();
        let _a = hub.subscribe("notes-1", move |_| *own_clone.borrow_mut() += 1);
        let other_clone = other.clone();
        let _b = hub.subscribe("scripture-1", move |_| *other_clone.borrow_mut() += 1);

        hub.publish("notes-1", groups_payload(1));

        assert_eq!(*own.borrow(), 0, "a panel must ignore its own broadcasts");
        assert_eq!(*other.borrow(), 1);
    }

    #[test]
    fn test_publish_after_close_is_ignored() {
        let hub = MessageHub::new();
        hub.close();
        hub.publish("notes-1", groups_payload(1));
        assert!(hub.current(StateKey::TokenGroups).is_none());
    }

    #[test]
    fn test_reentrant_publish_from_callback() {
        let hub = MessageHub::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let hub_clone = hub.clone();
        let log_clone = log.clone();
        let _a = hub.subscribe("notes-1", move |env| {
            log_clone.borrow_mut().push(format!("notes:{}", env.payload.type_name()));
            if matches!(env.payload, Payload::VerseClick { .. }) {
                hub_clone.publish("notes-1", groups_payload(9));
            }
        });

        let log_clone = log.clone();
        let _b = hub.subscribe("scripture-1", move |env| {
            log_clone.borrow_mut().push(format!("scripture:{}", env.payload.type_name()));
        });

        hub.publish("scripture-1", Payload::VerseClick { verse: VerseRef::new(1, 1) });

        // Queued and flushed in send order, no double-borrow panic
        assert_eq!(
            *log.borrow(),
            vec!["notes:verse-click".to_string(), "scripture:token-groups".to_string()]
        );
    }

    #[test]
    fn test_unsubscribe_during_delivery() {
        let hub = MessageHub::new();
        let sub_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let count = Rc::new(RefCell::new(0));

        let slot_clone = sub_slot.clone();
        let count_clone = count.clone();
        let sub = hub.subscribe("notes-1", move |_| {
            *count_clone.borrow_mut() += 1;
            if let Some(s) = slot_clone.borrow_mut().take() {
                s.unsubscribe();
            }
        });
        *sub_slot.borrow_mut() = Some(sub);

        hub.publish("scripture-1", groups_payload(1));
        hub.publish("scripture-1", groups_payload(2));

        assert_eq!(*count.borrow(), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_manual_scheduler_ordering_and_cancel() {
        let scheduler = ManualScheduler::new();
        let fired = Rc::new(RefCell::new(Vec::new()));

        let f = fired.clone();
        let _t1 = scheduler.schedule(200, Box::new(move || f.borrow_mut().push("late")));
        let f = fired.clone();
        let _t2 = scheduler.schedule(100, Box::new(move || f.borrow_mut().push("early")));
        let f = fired.clone();
        let t3 = scheduler.schedule(150, Box::new(move || f.borrow_mut().push("cancelled")));
        t3.cancel();

        scheduler.advance(300);
        assert_eq!(*fired.borrow(), vec!["early", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_debouncer_coalesces_bursts() {
        let scheduler = Rc::new(ManualScheduler::new());
        let mut debouncer = Debouncer::new(scheduler.clone(), 500);
        let fired = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let f = fired.clone();
            debouncer.call(move || f.borrow_mut().push(i));
            scheduler.advance(100); // within the quiescence window
        }
        scheduler.advance(500);

        // Only the last call of the burst fires
        assert_eq!(*fired.borrow(), vec![2]);
    }

    #[test]
    fn test_debouncer_cancel_blocks_stale_publish() {
        let scheduler = Rc::new(ManualScheduler::new());
        let mut debouncer = Debouncer::new(scheduler.clone(), 500);
        let fired = Rc::new(RefCell::new(false));

        let f = fired.clone();
        debouncer.call(move || *f.borrow_mut() = true);
        debouncer.cancel();
        scheduler.advance(1000);

        assert!(!*fired.borrow());
    }
}
