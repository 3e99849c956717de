//! Explicit observer registration.
//!
//! An [`EventBus`] is owned by whatever emits the events (a list, a world).
//! Handlers are registered per event kind and removed with the returned
//! [`SubscriptionId`].

use std::fmt;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<P> = Box<dyn FnMut(&P)>;

struct Subscription<E, P> {
    id: SubscriptionId,
    event: E,
    handler: Handler<P>,
}

/// Publish/subscribe hub keyed by event kind `E`, carrying payload `P`.
pub struct EventBus<E, P> {
    next_id: u64,
    subscriptions: Vec<Subscription<E, P>>,
}

impl<E: Copy + PartialEq, P> EventBus<E, P> {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            subscriptions: Vec::new(),
        }
    }

    /// Register `handler` for `event`. Handlers run in registration order.
    pub fn subscribe<F>(&mut self, event: E, handler: F) -> SubscriptionId
    where
        F: FnMut(&P) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            event,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a subscription.
    ///
    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Invoke every handler registered for `event`.
    ///
    /// Returns the number of handlers that ran.
    pub fn trigger(&mut self, event: E, payload: &P) -> usize {
        let mut fired = 0;
        for subscription in &mut self.subscriptions {
            if subscription.event == event {
                (subscription.handler)(payload);
                fired += 1;
            }
        }
        fired
    }

    /// Number of live subscriptions across all event kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl<E: Copy + PartialEq, P> Default for EventBus<E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P> fmt::Debug for EventBus<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
