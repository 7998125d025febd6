use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct BusInner<E> {
    next_id: AtomicU64,
    handlers: DashMap<u64, Handler<E>>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<E: 'static> Detach for BusInner<E> {
    fn detach(&self, id: u64) {
        self.handlers.remove(&id);
    }
}

/// Fan-out of events to any number of observers.
pub struct EventBus<E> {
    inner: Arc<BusInner<E>>,
}

impl<E: 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(0),
                handlers: DashMap::new(),
            }),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers.insert(id, Arc::new(handler));
        let inner: Arc<dyn Detach> = self.inner.clone();
        Subscription {
            id,
            bus: Arc::downgrade(&inner),
        }
    }

    pub fn emit(&self, event: &E) {
        // Collect first so handlers never run while a map shard is locked;
        // a handler may subscribe or unsubscribe.
        let handlers: Vec<Handler<E>> = self
            .inner
            .handlers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.handlers.len()
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`EventBus::subscribe`]. Dropping it leaves the
/// handler registered; call [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    bus: Weak<dyn Detach>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.detach(self.id);
        }
    }
}
