//! Named-event handler registry shared by every consumer of the event channel.
//!
//! Handlers are keyed by `Arc` identity. `on` hands back a [`Subscription`]
//! that owns the registration: cancelling it (explicitly or by dropping it)
//! removes exactly the handler that was added, so setup and teardown can
//! never disagree about which closure they are talking about.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

/// A named-event handler. Identity is the allocation behind the `Arc`.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

struct Entry {
    /// Distinguishes this registration from a later one of the same handler.
    key: u64,
    handler: Handler,
    /// Live subscriptions pointing at this entry.
    refs: usize,
}

#[derive(Default)]
struct Inner {
    next_key: u64,
    handlers: HashMap<String, Vec<Entry>>,
}

impl Inner {
    fn release(&mut self, event: &str, key: u64) {
        let Some(entries) = self.handlers.get_mut(event) else {
            return;
        };
        if let Some(pos) = entries.iter().position(|e| e.key == key) {
            entries[pos].refs -= 1;
            if entries[pos].refs == 0 {
                entries.remove(pos);
            }
        }
        if entries.is_empty() {
            self.handlers.remove(event);
        }
    }
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Registry of named-event handlers. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct EventRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a closure as a [`Handler`].
    pub fn handler(f: impl Fn(&Value) + Send + Sync + 'static) -> Handler {
        Arc::new(f)
    }

    /// Register `handler` for `event`.
    ///
    /// Registering a pair that is already present does not duplicate
    /// delivery; the pair stays registered until every returned
    /// subscription has been cancelled (or [`off`](Self::off) is called).
    pub fn on(&self, event: &str, handler: &Handler) -> Subscription {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let entries = inner.handlers.entry(event.to_string()).or_default();

        let key = match entries.iter().position(|e| same_handler(&e.handler, handler)) {
            Some(pos) => {
                entries[pos].refs += 1;
                entries[pos].key
            }
            None => {
                let key = inner.next_key;
                inner.next_key += 1;
                entries.push(Entry {
                    key,
                    handler: handler.clone(),
                    refs: 1,
                });
                key
            }
        };

        Subscription {
            registry: Arc::downgrade(&self.inner),
            event: event.to_string(),
            key: Some(key),
        }
    }

    /// Remove `handler` from `event` regardless of outstanding subscriptions.
    /// Returns whether anything was removed.
    pub fn off(&self, event: &str, handler: &Handler) -> bool {
        let mut inner = self.inner.lock();
        let Some(entries) = inner.handlers.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| !same_handler(&e.handler, handler));
        let removed = entries.len() != before;
        if entries.is_empty() {
            inner.handlers.remove(event);
        }
        removed
    }

    /// Deliver `payload` to every handler registered for `event`.
    ///
    /// Handlers run outside the registry lock, so a handler may register or
    /// cancel subscriptions while being called. Returns the number of
    /// handlers invoked.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let handlers: Vec<Handler> = {
            let inner = self.inner.lock();
            match inner.handlers.get(event) {
                Some(entries) => entries.iter().map(|e| e.handler.clone()).collect(),
                None => return 0,
            }
        };

        tracing::trace!(event, handlers = handlers.len(), "dispatching event");
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Number of distinct handlers registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner
            .lock()
            .handlers
            .get(event)
            .map_or(0, |entries| entries.len())
    }

    pub fn is_registered(&self, event: &str, handler: &Handler) -> bool {
        self.inner
            .lock()
            .handlers
            .get(event)
            .is_some_and(|entries| entries.iter().any(|e| same_handler(&e.handler, handler)))
    }
}

/// Scoped registration returned by [`EventRegistry::on`].
///
/// Dropping the subscription cancels it.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    registry: Weak<Mutex<Inner>>,
    event: String,
    key: Option<u64>,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn is_active(&self) -> bool {
        self.key.is_some()
    }

    /// Unregister this subscription's handler. Safe to call more than once.
    pub fn cancel(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        if let Some(inner) = self.registry.upgrade() {
            inner.lock().release(&self.event, key);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish()
    }
}
