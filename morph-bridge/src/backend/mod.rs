//! Bridge backend implementations.
//!
//! Both backends read the same [`ViewSurface`] and store captures in a
//! [`SnapshotCache`]; they differ only in how many surface round trips a
//! `prepare_transition` costs.

pub mod batched;
pub mod fallback;

use std::sync::Arc;

use morph_core::{
    BridgeAdapter, BridgeError, BridgeProvider, BridgeResult, ContentKind, ContentRef, Snapshot,
    ViewHandle,
};

use crate::snapshot_cache::SnapshotCache;
use crate::surface::{ViewContent, ViewNode, ViewSurface};

pub use batched::BatchedBridge;
pub use fallback::FallbackBridge;

/// Snapshot a view node: image sources are reused, live views are passed
/// through, everything else is captured.
pub(crate) fn snapshot_node(
    cache: &mut SnapshotCache,
    handle: ViewHandle,
    node: &ViewNode,
) -> BridgeResult<Snapshot> {
    match &node.content {
        ViewContent::Image { uri, width, height } => Ok(Snapshot {
            content: ContentRef::Bitmap {
                uri: uri.clone(),
                width: *width,
                height: *height,
            },
            kind: ContentKind::Image,
        }),
        ViewContent::Live => Ok(Snapshot {
            content: ContentRef::Live,
            kind: ContentKind::Snapshot,
        }),
        ViewContent::Generic => cache.capture(handle, &node.frame),
    }
}

/// Provider for the batched backend; available when the surface supports
/// batched access.
#[derive(Debug, Clone)]
pub struct BatchedProvider {
    surface: ViewSurface,
    cache: Arc<std::sync::Mutex<SnapshotCache>>,
}

impl BatchedProvider {
    /// Create a provider over `surface` sharing `cache`.
    #[must_use]
    pub fn new(surface: ViewSurface, cache: Arc<std::sync::Mutex<SnapshotCache>>) -> Self {
        Self { surface, cache }
    }
}

impl BridgeProvider for BatchedProvider {
    fn name(&self) -> &'static str {
        "batched"
    }

    fn probe(&self) -> BridgeResult<Arc<dyn BridgeAdapter>> {
        if !self.surface.supports_batching() {
            return Err(BridgeError::Unavailable(
                "surface does not support batched access".to_string(),
            ));
        }
        Ok(Arc::new(BatchedBridge::new(
            self.surface.clone(),
            Arc::clone(&self.cache),
        )))
    }
}

/// Provider for the per-call backend; always available.
#[derive(Debug, Clone)]
pub struct FallbackProvider {
    surface: ViewSurface,
    cache: Arc<std::sync::Mutex<SnapshotCache>>,
}

impl FallbackProvider {
    /// Create a provider over `surface` sharing `cache`.
    #[must_use]
    pub fn new(surface: ViewSurface, cache: Arc<std::sync::Mutex<SnapshotCache>>) -> Self {
        Self { surface, cache }
    }
}

impl BridgeProvider for FallbackProvider {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn probe(&self) -> BridgeResult<Arc<dyn BridgeAdapter>> {
        Ok(Arc::new(FallbackBridge::new(
            self.surface.clone(),
            Arc::clone(&self.cache),
        )))
    }
}
