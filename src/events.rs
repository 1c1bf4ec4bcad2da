/// Outbound notifications: named topics carrying an untyped JSON payload

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Anything that can republish a chat event to the rest of the extension
pub trait EventPublisher {
    fn publish(&self, topic: &str, detail: &Value);
}

type Handler = Rc<dyn Fn(&Value)>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
}

/// In-process publish/subscribe bus for hosts without a DOM
#[derive(Default)]
pub struct EventBus {
    topics: RefCell<HashMap<String, Vec<(Subscription, Handler)>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + 'static,
    {
        let subscription = Subscription {
            id: self.next_id.get(),
        };
        self.next_id.set(subscription.id + 1);

        let handler: Handler = Rc::new(handler);
        self.topics
            .borrow_mut()
            .entry(topic.to_string())
            .or_default()
            .push((subscription, handler));
        subscription
    }

    /// Returns false if the subscription was not registered
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut topics = self.topics.borrow_mut();
        let mut removed = false;
        for handlers in topics.values_mut() {
            let before = handlers.len();
            handlers.retain(|(s, _)| *s != subscription);
            removed |= handlers.len() < before;
        }
        topics.retain(|_, handlers| !handlers.is_empty());
        removed
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.borrow().get(topic).map_or(0, |h| h.len())
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, topic: &str, detail: &Value) {
        // Snapshot so handlers may subscribe/unsubscribe while being called
        let handlers: Vec<Handler> = match self.topics.borrow().get(topic) {
            Some(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
            None => {
                log::debug!("No subscribers for {}", topic);
                return;
            }
        };

        for handler in handlers {
            handler(detail);
        }
    }
}
