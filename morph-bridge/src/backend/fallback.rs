//! Per-call bridge backend.
//!
//! Issues one surface access per operation and relies on the default
//! `prepare_transition`, which measures and snapshots each side in turn.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use morph_core::{BridgeAdapter, BridgeError, BridgeResult, Frame, Snapshot, ViewHandle};

use super::snapshot_node;
use crate::snapshot_cache::SnapshotCache;
use crate::surface::ViewSurface;

/// Fallback backend used when batched access is unavailable.
#[derive(Debug)]
pub struct FallbackBridge {
    surface: ViewSurface,
    cache: Arc<Mutex<SnapshotCache>>,
    round_trips: AtomicU64,
}

impl FallbackBridge {
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

#[async_trait]
impl BridgeAdapter for FallbackBridge {
    fn name(&self) -> &'static str {
        "fallback"
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

    async fn cleanup(&self, snapshots: Vec<Snapshot>) -> BridgeResult<()> {
        let mut cache = self.cache();
        let released = snapshots.iter().filter(|s| cache.release(s)).count();
        tracing::debug!(released, held = cache.len(), "Released transition snapshots");
        Ok(())
    }
}
