//! Headless view surface.
//!
//! Stands in for the host's native view tree: views are mounted with a
//! screen-relative frame and a content description, and can be hidden,
//! moved and unmounted. Both bridge backends operate on a shared surface.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use morph_core::{Frame, ViewHandle};

/// What a mounted view displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewContent {
    /// An image with a known source; snapshots reuse the source.
    Image {
        /// Image source URI.
        uri: String,
        /// Intrinsic width in pixels.
        width: u32,
        /// Intrinsic height in pixels.
        height: u32,
    },
    /// Arbitrary content that must be captured.
    Generic,
    /// Content that should be rendered live rather than captured.
    Live,
}

/// A mounted view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    /// Screen-relative frame.
    pub frame: Frame,
    /// Displayed content.
    pub content: ViewContent,
    /// Whether the view is currently hidden.
    pub hidden: bool,
}

#[derive(Debug)]
struct SurfaceState {
    next_tag: u64,
    nodes: HashMap<ViewHandle, ViewNode>,
    batching: bool,
}

/// Thread-safe in-memory view tree.
#[derive(Debug, Clone)]
pub struct ViewSurface {
    inner: Arc<RwLock<SurfaceState>>,
}

impl Default for ViewSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewSurface {
    /// Create an empty surface that supports batched access.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SurfaceState {
                next_tag: 1,
                nodes: HashMap::new(),
                batching: true,
            })),
        }
    }

    /// Create an empty surface without batched access, forcing the
    /// per-call backend.
    #[must_use]
    pub fn without_batching() -> Self {
        let surface = Self::new();
        surface.write().batching = false;
        surface
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SurfaceState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SurfaceState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether batched access is available.
    #[must_use]
    pub fn supports_batching(&self) -> bool {
        self.read().batching
    }

    /// Mount a view and return its handle.
    pub fn mount(&self, frame: Frame, content: ViewContent) -> ViewHandle {
        let mut state = self.write();
        let handle = ViewHandle::new(state.next_tag);
        state.next_tag += 1;
        state.nodes.insert(
            handle,
            ViewNode {
                frame,
                content,
                hidden: false,
            },
        );
        tracing::trace!(%handle, "Mounted view at ({}, {}) size {}x{}", frame.x, frame.y, frame.width, frame.height);
        handle
    }

    /// Unmount a view. Returns `false` if it was not mounted.
    pub fn unmount(&self, handle: ViewHandle) -> bool {
        let removed = self.write().nodes.remove(&handle).is_some();
        if removed {
            tracing::trace!(%handle, "Unmounted view");
        }
        removed
    }

    /// Move or resize a view. Returns `false` if it is not mounted.
    pub fn set_frame(&self, handle: ViewHandle, frame: Frame) -> bool {
        self.write()
            .nodes
            .get_mut(&handle)
            .map(|node| node.frame = frame)
            .is_some()
    }

    /// Show or hide a view. Returns `false` if it is not mounted.
    pub fn set_hidden(&self, handle: ViewHandle, hidden: bool) -> bool {
        self.write()
            .nodes
            .get_mut(&handle)
            .map(|node| node.hidden = hidden)
            .is_some()
    }

    /// A copy of a mounted view.
    #[must_use]
    pub fn node(&self, handle: ViewHandle) -> Option<ViewNode> {
        self.read().nodes.get(&handle).cloned()
    }

    /// Copies of two views read under a single lock.
    #[must_use]
    pub fn node_pair(
        &self,
        start: ViewHandle,
        end: ViewHandle,
    ) -> (Option<ViewNode>, Option<ViewNode>) {
        let state = self.read();
        (
            state.nodes.get(&start).cloned(),
            state.nodes.get(&end).cloned(),
        )
    }

    /// Whether a view is hidden; `None` if it is not mounted.
    #[must_use]
    pub fn is_hidden(&self, handle: ViewHandle) -> Option<bool> {
        self.read().nodes.get(&handle).map(|node| node.hidden)
    }

    /// Handles of all hidden views, sorted.
    #[must_use]
    pub fn hidden_views(&self) -> Vec<ViewHandle> {
        let mut hidden: Vec<ViewHandle> = self
            .read()
            .nodes
            .iter()
            .filter(|(_, node)| node.hidden)
            .map(|(handle, _)| *handle)
            .collect();
        hidden.sort();
        hidden
    }

    /// Number of mounted views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().nodes.len()
    }

    /// Whether no views are mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_and_unmount() {
        let surface = ViewSurface::new();
        let handle = surface.mount(Frame::new(0.0, 0.0, 10.0, 10.0), ViewContent::Generic);
        assert_eq!(surface.len(), 1);
        assert_eq!(surface.is_hidden(handle), Some(false));

        assert!(surface.unmount(handle));
        assert!(!surface.unmount(handle));
        assert!(surface.is_empty());
        assert_eq!(surface.is_hidden(handle), None);
    }

    #[test]
    fn test_handles_are_unique() {
        let surface = ViewSurface::new();
        let a = surface.mount(Frame::default(), ViewContent::Live);
        let b = surface.mount(Frame::default(), ViewContent::Live);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hidden_views() {
        let surface = ViewSurface::new();
        let a = surface.mount(Frame::default(), ViewContent::Generic);
        let b = surface.mount(Frame::default(), ViewContent::Generic);
        assert!(surface.set_hidden(b, true));
        assert_eq!(surface.hidden_views(), vec![b]);
        assert!(surface.set_hidden(a, true));
        assert_eq!(surface.hidden_views(), vec![a, b]);
    }

    #[test]
    fn test_set_frame() {
        let surface = ViewSurface::new();
        let handle = surface.mount(Frame::default(), ViewContent::Generic);
        let frame = Frame::new(5.0, 6.0, 7.0, 8.0);
        assert!(surface.set_frame(handle, frame));
        assert_eq!(surface.node(handle).map(|n| n.frame), Some(frame));
    }

    #[test]
    fn test_batching_flag() {
        assert!(ViewSurface::new().supports_batching());
        assert!(!ViewSurface::without_batching().supports_batching());
    }
}
