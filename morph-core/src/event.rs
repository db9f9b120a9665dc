//! Registry notifications and the fan-out emitter that delivers them.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};

use crate::ViewHandle;

/// Pairing readiness changed for an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEvent {
    /// Identifier whose registrations changed.
    pub identifier: String,
    /// Current handles for the identifier, oldest first.
    pub nodes: Vec<ViewHandle>,
}

impl RegistryEvent {
    /// Whether the identifier currently has a start/end pair.
    #[must_use]
    pub fn is_pair_ready(&self) -> bool {
        self.nodes.len() >= 2
    }
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listeners<E> {
    next_id: u64,
    entries: Vec<(u64, Listener<E>)>,
}

/// Observer list where each callback runs in isolation.
///
/// A panicking listener is logged and skipped; the remaining listeners still
/// receive the event. Listeners are invoked without any lock held, so they may
/// subscribe, unsubscribe or mutate the owner of the emitter.
pub struct Emitter<E> {
    inner: Arc<RwLock<Listeners<E>>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<E: 'static> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<E: 'static> Emitter<E> {
    /// Create an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. It stays registered until the returned guard is
    /// dropped or [`Subscription::unsubscribe`] is called.
    #[must_use = "dropping the subscription removes the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<RwLock<Listeners<E>>> = Arc::downgrade(&self.inner);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .entries
                        .retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Deliver `event` to every listener in subscription order.
    ///
    /// Returns the number of listeners that panicked.
    pub fn emit(&self, event: &E) -> usize {
        let listeners: Vec<Listener<E>> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        let mut failures = 0;
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                failures += 1;
                tracing::error!("Registry subscriber panicked; continuing with remaining subscribers");
            }
        }
        failures
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Guard that removes a listener when dropped.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_all_listeners() {
        let emitter: Emitter<u32> = Emitter::new();
        let total = Arc::new(AtomicUsize::new(0));

        let t1 = Arc::clone(&total);
        let _a = emitter.subscribe(move |v| {
            t1.fetch_add(*v as usize, Ordering::SeqCst);
        });
        let t2 = Arc::clone(&total);
        let _b = emitter.subscribe(move |v| {
            t2.fetch_add(*v as usize, Ordering::SeqCst);
        });

        assert_eq!(emitter.emit(&5), 0);
        assert_eq!(total.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let emitter: Emitter<u32> = Emitter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = emitter.subscribe(|_| panic!("listener failure"));
        let h = Arc::clone(&hits);
        let _good = emitter.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(emitter.emit(&1), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.len(), 2);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let emitter: Emitter<u32> = Emitter::new();
        let sub = emitter.subscribe(|_| {});
        let other = emitter.subscribe(|_| {});
        assert_eq!(emitter.len(), 2);

        drop(sub);
        assert_eq!(emitter.len(), 1);

        other.unsubscribe();
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_listener_may_subscribe_during_emit() {
        let emitter: Emitter<u32> = Emitter::new();
        let inner = emitter.clone();
        let held = Arc::new(std::sync::Mutex::new(Vec::new()));
        let held_clone = Arc::clone(&held);
        let _sub = emitter.subscribe(move |_| {
            let sub = inner.subscribe(|_| {});
            held_clone.lock().expect("lock").push(sub);
        });

        emitter.emit(&0);
        assert_eq!(emitter.len(), 2);
    }

    #[test]
    fn test_pair_ready() {
        let event = RegistryEvent {
            identifier: "hero".to_string(),
            nodes: vec![ViewHandle::new(1), ViewHandle::new(2)],
        };
        assert!(event.is_pair_ready());
    }
}
