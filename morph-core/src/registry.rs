//! Element registry: which view instances are mounted under which identifier.
//!
//! The registry is the only shared mutable table in the core. Every mounted
//! view registers under its logical identifier; when an identifier gains a
//! second registration the pair becomes ready and subscribers are notified.
//!
//! # Example
//!
//! ```
//! use morph_core::{Registry, ViewHandle};
//!
//! let registry = Registry::new();
//! let list = registry.register("photo-7", ViewHandle::new(1));
//! let detail = registry.register("photo-7", ViewHandle::new(2));
//!
//! let pair = registry.transition_pair("photo-7").unwrap();
//! assert_eq!(pair.start, ViewHandle::new(1));
//! assert_eq!(pair.end, ViewHandle::new(2));
//!
//! registry.unregister(&list);
//! assert!(registry.transition_pair("photo-7").is_none());
//! # drop(detail);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::event::{Emitter, RegistryEvent, Subscription};
use crate::{Frame, TransitionPair, ViewHandle};

/// One mounted view instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Logical identifier.
    pub identifier: String,
    /// View instance.
    pub handle: ViewHandle,
    /// Monotonic registration order.
    pub sequence: u64,
    /// Last known frame, if the host reported one.
    pub layout: Option<Frame>,
}

/// Proof of registration; pass it back to [`Registry::unregister`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationToken {
    identifier: String,
    sequence: u64,
}

impl RegistrationToken {
    /// Identifier this registration was made under.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Sequence number assigned at registration.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Default)]
struct Table {
    next_sequence: u64,
    /// Registrations per identifier, kept in ascending sequence order.
    entries: HashMap<String, Vec<Registration>>,
}

/// Registry of mounted view instances, keyed by identifier.
///
/// Cheap to clone; clones share the same table and subscribers.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    table: Arc<RwLock<Table>>,
    events: Emitter<RegistryEvent>,
}

impl Registry {
    /// Create an empty, isolated registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide default registry for the composition root.
    #[must_use]
    pub fn global() -> Self {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new).clone()
    }

    /// Register a mounted view. Never rejects.
    ///
    /// If this is the second or later registration for `identifier`, all
    /// subscribers are notified with the current handles before returning.
    pub fn register(&self, identifier: &str, handle: ViewHandle) -> RegistrationToken {
        let (token, nodes) = {
            let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
            let sequence = table.next_sequence;
            table.next_sequence += 1;

            let list = table.entries.entry(identifier.to_string()).or_default();
            list.push(Registration {
                identifier: identifier.to_string(),
                handle,
                sequence,
                layout: None,
            });

            let token = RegistrationToken {
                identifier: identifier.to_string(),
                sequence,
            };
            (token, handles(list))
        };

        tracing::debug!(
            identifier,
            %handle,
            sequence = token.sequence,
            count = nodes.len(),
            "Registered shared element"
        );

        if nodes.len() >= 2 {
            self.notify(identifier, nodes);
        }
        token
    }

    /// Remove a registration by identity.
    ///
    /// Returns `false` if the token was already removed. When the identifier
    /// drops to one or zero registrations, subscribers are notified with the
    /// reduced list.
    pub fn unregister(&self, token: &RegistrationToken) -> bool {
        let remaining = {
            let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
            let Some(list) = table.entries.get_mut(&token.identifier) else {
                return false;
            };
            let before = list.len();
            list.retain(|r| r.sequence != token.sequence);
            if list.len() == before {
                return false;
            }
            let remaining = handles(list);
            if list.is_empty() {
                table.entries.remove(&token.identifier);
            }
            remaining
        };

        tracing::debug!(
            identifier = %token.identifier,
            sequence = token.sequence,
            count = remaining.len(),
            "Unregistered shared element"
        );

        if remaining.len() <= 1 {
            self.notify(&token.identifier, remaining);
        }
        true
    }

    /// Record the last known frame of a registration.
    ///
    /// Returns `false` if the registration no longer exists.
    pub fn update_layout(&self, token: &RegistrationToken, frame: Frame) -> bool {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table
            .entries
            .get_mut(&token.identifier)
            .and_then(|list| list.iter_mut().find(|r| r.sequence == token.sequence))
            .map(|r| r.layout = Some(frame))
            .is_some()
    }

    /// Handles registered under `identifier`, oldest first.
    #[must_use]
    pub fn nodes(&self, identifier: &str) -> Vec<ViewHandle> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .entries
            .get(identifier)
            .map(|list| handles(list))
            .unwrap_or_default()
    }

    /// Full registration records for `identifier`, oldest first.
    #[must_use]
    pub fn registrations(&self, identifier: &str) -> Vec<Registration> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.entries.get(identifier).cloned().unwrap_or_default()
    }

    /// The oldest and newest registration of `identifier`.
    ///
    /// `None` with fewer than two registrations. With three or more, the
    /// intermediate registrations are ignored.
    #[must_use]
    pub fn transition_pair(&self, identifier: &str) -> Option<TransitionPair> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let list = table.entries.get(identifier)?;
        match (list.first(), list.last()) {
            (Some(first), Some(last)) if list.len() >= 2 => Some(TransitionPair {
                start: first.handle,
                end: last.handle,
            }),
            _ => None,
        }
    }

    /// Identifiers with at least one registration.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = table.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Total number of registrations across all identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.entries.values().map(Vec::len).sum()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive `(identifier, nodes)` whenever pairing readiness changes.
    ///
    /// A panicking callback is logged and does not affect other subscribers.
    #[must_use = "dropping the subscription removes the callback"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&str, &[ViewHandle]) + Send + Sync + 'static,
    {
        self.events
            .subscribe(move |event: &RegistryEvent| callback(&event.identifier, &event.nodes))
    }

    /// Drop every registration without notifying anyone.
    ///
    /// Teardown only: in-flight transitions are not cleaned up.
    pub fn clear(&self) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table.entries.clear();
    }

    fn notify(&self, identifier: &str, nodes: Vec<ViewHandle>) {
        let event = RegistryEvent {
            identifier: identifier.to_string(),
            nodes,
        };
        let failures = self.events.emit(&event);
        if failures > 0 {
            tracing::warn!(identifier, failures, "Some registry subscribers failed");
        }
    }
}

fn handles(list: &[Registration]) -> Vec<ViewHandle> {
    list.iter().map(|r| r.handle).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn h(raw: u64) -> ViewHandle {
        ViewHandle::new(raw)
    }

    #[test]
    fn test_pair_and_unregister() {
        let registry = Registry::new();
        let a = registry.register("x", h(1));
        let _b = registry.register("x", h(2));

        assert_eq!(
            registry.transition_pair("x"),
            Some(TransitionPair {
                start: h(1),
                end: h(2)
            })
        );

        assert!(registry.unregister(&a));
        assert!(registry.transition_pair("x").is_none());
        assert_eq!(registry.nodes("x"), vec![h(2)]);
    }

    #[test]
    fn test_three_instances_pick_oldest_and_newest() {
        let registry = Registry::new();
        let _a = registry.register("x", h(1));
        let _b = registry.register("x", h(2));
        let _c = registry.register("x", h(3));

        let pair = registry.transition_pair("x").expect("pair");
        assert_eq!(pair.start, h(1));
        assert_eq!(pair.end, h(3));
    }

    #[test]
    fn test_same_handle_twice_is_two_registrations() {
        let registry = Registry::new();
        let first = registry.register("x", h(9));
        let _second = registry.register("x", h(9));
        assert_eq!(registry.nodes("x").len(), 2);

        registry.unregister(&first);
        assert_eq!(registry.nodes("x"), vec![h(9)]);
        assert!(!registry.unregister(&first));
    }

    #[test]
    fn test_notifications_follow_readiness() {
        let registry = Registry::new();
        let seen: Arc<Mutex<Vec<(String, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _sub = registry.subscribe(move |id, nodes| {
            seen_clone
                .lock()
                .expect("lock")
                .push((id.to_string(), nodes.len()));
        });

        let a = registry.register("x", h(1));
        let b = registry.register("x", h(2));
        let c = registry.register("x", h(3));
        registry.unregister(&c);
        registry.unregister(&b);
        registry.unregister(&a);

        let seen = seen.lock().expect("lock").clone();
        assert_eq!(
            seen,
            vec![
                ("x".to_string(), 2),
                ("x".to_string(), 3),
                ("x".to_string(), 1),
                ("x".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_subscriber_panic_does_not_corrupt_state() {
        let registry = Registry::new();
        let _bad = registry.subscribe(|_, _| panic!("subscriber failure"));
        let count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&count);
        let _good = registry.subscribe(move |_, _| {
            *count_clone.lock().expect("lock") += 1;
        });

        let _a = registry.register("x", h(1));
        let _b = registry.register("x", h(2));

        assert_eq!(*count.lock().expect("lock"), 1);
        assert_eq!(registry.nodes("x"), vec![h(1), h(2)]);
        let _c = registry.register("y", h(3));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_subscriber_can_query_registry() {
        let registry = Registry::new();
        let inner = registry.clone();
        let pairs = Arc::new(Mutex::new(Vec::new()));
        let pairs_clone = Arc::clone(&pairs);
        let _sub = registry.subscribe(move |id, _| {
            pairs_clone
                .lock()
                .expect("lock")
                .push(inner.transition_pair(id));
        });

        let _a = registry.register("x", h(1));
        let _b = registry.register("x", h(2));

        assert_eq!(
            pairs.lock().expect("lock").as_slice(),
            &[Some(TransitionPair {
                start: h(1),
                end: h(2)
            })]
        );
    }

    #[test]
    fn test_update_layout() {
        let registry = Registry::new();
        let token = registry.register("x", h(1));
        let frame = Frame::new(1.0, 2.0, 3.0, 4.0);

        assert!(registry.update_layout(&token, frame));
        assert_eq!(registry.registrations("x")[0].layout, Some(frame));

        registry.unregister(&token);
        assert!(!registry.update_layout(&token, frame));
    }

    #[test]
    fn test_clear_is_silent() {
        let registry = Registry::new();
        let calls = Arc::new(Mutex::new(0));
        let calls_clone = Arc::clone(&calls);
        let _sub = registry.subscribe(move |_, _| {
            *calls_clone.lock().expect("lock") += 1;
        });
        let _a = registry.register("x", h(1));
        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.identifiers().is_empty());
        assert_eq!(*calls.lock().expect("lock"), 0);
    }

    #[test]
    fn test_isolated_instances() {
        let one = Registry::new();
        let two = Registry::new();
        let _a = one.register("x", h(1));
        assert!(two.nodes("x").is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Register(u8, u64),
        Unregister(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..3, 0u64..50).prop_map(|(id, handle)| Op::Register(id, handle)),
            (0usize..64).prop_map(Op::Unregister),
        ]
    }

    proptest! {
        #[test]
        fn prop_nodes_ordered_and_pair_consistent(ops in proptest::collection::vec(op(), 0..64)) {
            let registry = Registry::new();
            let mut tokens: Vec<RegistrationToken> = Vec::new();

            for op in ops {
                match op {
                    Op::Register(id, handle) => {
                        tokens.push(registry.register(&format!("id-{id}"), h(handle)));
                    }
                    Op::Unregister(index) if !tokens.is_empty() => {
                        let token = tokens.remove(index % tokens.len());
                        prop_assert!(registry.unregister(&token));
                    }
                    Op::Unregister(_) => {}
                }
            }

            for id in 0u8..3 {
                let identifier = format!("id-{id}");
                let records = registry.registrations(&identifier);
                prop_assert!(records.windows(2).all(|w| w[0].sequence < w[1].sequence));

                let nodes = registry.nodes(&identifier);
                match registry.transition_pair(&identifier) {
                    None => prop_assert!(nodes.len() < 2),
                    Some(pair) => {
                        prop_assert_eq!(pair.start, nodes[0]);
                        prop_assert_eq!(pair.end, nodes[nodes.len() - 1]);
                    }
                }
            }
        }

        #[test]
        fn prop_register_unregister_restores_state(existing in 0usize..4, handle in 0u64..100) {
            let registry = Registry::new();
            let _held: Vec<_> = (0..existing)
                .map(|i| registry.register("x", h(i as u64)))
                .collect();
            let before = registry.nodes("x");

            let token = registry.register("x", h(handle));
            prop_assert!(registry.unregister(&token));
            prop_assert_eq!(registry.nodes("x"), before);
        }
    }
}
