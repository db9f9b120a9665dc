//! Batched bridge backend.
//!
//! Reads both sides of a transition under a single surface access and
//! captures them together, so `prepare_transition` costs one round trip.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use morph_core::{
    BridgeAdapter, BridgeError, BridgeResult, Frame, PreparedTransition, Snapshot,
    SnapshotGeometry, ViewHandle,
};

use super::snapshot_node;
use crate::snapshot_cache::SnapshotCache;
use crate::surface::{ViewNode, ViewSurface};

/// Fast backend for surfaces that support batched access.
#[derive(Debug)]
pub struct BatchedBridge {
    surface: ViewSurface,
    cache: Arc<Mutex<SnapshotCache>>,
    round_trips: AtomicU64,
}

impl BatchedBridge {
    /// Create a backend over `surface` storing captures in `cache`.
    #[must_use]
    pub fn new(surface: ViewSurface, cache: Arc<Mutex<SnapshotCache>>) -> Self {
        Self {
            surface,
            cache,
            round_trips: AtomicU64::new(0),
        }
    }

    /// Surface accesses made so far.
    #[must_use]
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    fn cache(&self) -> MutexGuard<'_, SnapshotCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn trip(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }
}

fn require(node: Option<ViewNode>, handle: ViewHandle) -> BridgeResult<ViewNode> {
    let node = node.ok_or(BridgeError::ViewNotFound(handle))?;
    if node.frame.is_empty() {
        return Err(BridgeError::ZeroSize(handle));
    }
    Ok(node)
}

#[async_trait]
impl BridgeAdapter for BatchedBridge {
    fn name(&self) -> &'static str {
        "batched"
    }

    async fn measure(&self, handle: ViewHandle) -> BridgeResult<Frame> {
        self.trip();
        self.surface
            .node(handle)
            .map(|node| node.frame)
            .ok_or(BridgeError::ViewNotFound(handle))
    }

    async fn snapshot(&self, handle: ViewHandle) -> BridgeResult<Snapshot> {
        self.trip();
        let node = self
            .surface
            .node(handle)
            .ok_or(BridgeError::ViewNotFound(handle))?;
        snapshot_node(&mut self.cache(), handle, &node)
    }

    async fn set_hidden(&self, handle: ViewHandle, hidden: bool) -> BridgeResult<()> {
        self.trip();
        if !self.surface.set_hidden(handle, hidden) {
            tracing::debug!(%handle, hidden, "Visibility change for unmounted view ignored");
        }
        Ok(())
    }

    async fn prepare_transition(
        &self,
        start: ViewHandle,
        end: ViewHandle,
    ) -> BridgeResult<PreparedTransition> {
        self.trip();
        let (start_node, end_node) = self.surface.node_pair(start, end);
        let start_node = require(start_node, start)?;
        let end_node = require(end_node, end)?;

        let mut cache = self.cache();
        let start_snapshot = snapshot_node(&mut cache, start, &start_node)?;
        let end_snapshot = match snapshot_node(&mut cache, end, &end_node) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                cache.release(&start_snapshot);
                return Err(e);
            }
        };

        tracing::debug!(%start, %end, "Prepared transition in one batch");
        Ok(PreparedTransition {
            start: SnapshotGeometry {
                frame: start_node.frame,
                snapshot: start_snapshot,
            },
            end: SnapshotGeometry {
                frame: end_node.frame,
                snapshot: end_snapshot,
            },
        })
    }

    async fn cleanup(&self, snapshots: Vec<Snapshot>) -> BridgeResult<()> {
        let mut cache = self.cache();
        let released = snapshots.iter().filter(|s| cache.release(s)).count();
        tracing::debug!(released, held = cache.len(), "Released transition snapshots");
        Ok(())
    }
}
