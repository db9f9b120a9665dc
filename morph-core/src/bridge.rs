//! Bridge to the host's native views: measurement, snapshots, visibility.
//!
//! ## Backend selection
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │               BridgeHost                  │
//! │   probes providers once, in order          │
//! ├─────────────────────┬─────────────────────┤
//! │ batched (fast path) │ per-call (fallback) │
//! └─────────────────────┴─────────────────────┘
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::{
    BridgeError, BridgeResult, Frame, PreparedTransition, Snapshot, SnapshotGeometry, ViewHandle,
};

/// Native capabilities the transition controller consumes.
///
/// Every call may fail with [`BridgeError::ViewNotFound`] once the view is
/// gone, except [`set_hidden`](Self::set_hidden) which must be a no-op for
/// unmounted views.
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Screen-relative frame of the view.
    ///
    /// # Errors
    ///
    /// Returns an error if the view no longer exists.
    async fn measure(&self, handle: ViewHandle) -> BridgeResult<Frame>;

    /// Capture the view's current appearance.
    ///
    /// # Errors
    ///
    /// Returns an error if the view no longer exists or capture fails.
    async fn snapshot(&self, handle: ViewHandle) -> BridgeResult<Snapshot>;

    /// Show or hide the view. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend itself is unusable.
    async fn set_hidden(&self, handle: ViewHandle, hidden: bool) -> BridgeResult<()>;

    /// Measure and snapshot both sides.
    ///
    /// The default issues the four calls one by one; backends that can batch
    /// them should override this. Snapshots captured before a failure are
    /// released before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if either view is gone, measures with zero size, or
    /// cannot be captured.
    async fn prepare_transition(
        &self,
        start: ViewHandle,
        end: ViewHandle,
    ) -> BridgeResult<PreparedTransition> {
        let start_geometry = capture(self, start).await?;
        match capture(self, end).await {
            Ok(end_geometry) => Ok(PreparedTransition {
                start: start_geometry,
                end: end_geometry,
            }),
            Err(e) => {
                if let Err(cleanup_err) = self.cleanup(vec![start_geometry.snapshot]).await {
                    tracing::warn!("Failed to release partial snapshot: {cleanup_err}");
                }
                Err(e)
            }
        }
    }

    /// Release snapshot resources. Each snapshot is passed here exactly once.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot release the resources.
    async fn cleanup(&self, snapshots: Vec<Snapshot>) -> BridgeResult<()>;
}

async fn capture<B: BridgeAdapter + ?Sized>(
    bridge: &B,
    handle: ViewHandle,
) -> BridgeResult<SnapshotGeometry> {
    let frame = bridge.measure(handle).await?;
    if frame.is_empty() {
        return Err(BridgeError::ZeroSize(handle));
    }
    let snapshot = bridge.snapshot(handle).await?;
    Ok(SnapshotGeometry { frame, snapshot })
}

/// A candidate backend that can check whether it works in this process.
pub trait BridgeProvider: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Check availability and build the adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot run here.
    fn probe(&self) -> BridgeResult<Arc<dyn BridgeAdapter>>;
}

/// Binds one bridge backend for the lifetime of the host.
///
/// Providers are probed in order on first use; the first success wins and
/// later calls reuse it without probing again. If every provider fails the
/// failure is remembered as well.
pub struct BridgeHost {
    providers: Vec<Box<dyn BridgeProvider>>,
    selected: OnceLock<BridgeResult<Arc<dyn BridgeAdapter>>>,
}

impl BridgeHost {
    /// Create a host over providers in preference order.
    #[must_use]
    pub fn new(providers: Vec<Box<dyn BridgeProvider>>) -> Self {
        Self {
            providers,
            selected: OnceLock::new(),
        }
    }

    /// Create a host already bound to `adapter`.
    #[must_use]
    pub fn with_adapter(adapter: Arc<dyn BridgeAdapter>) -> Self {
        let selected = OnceLock::new();
        let _ = selected.set(Ok(adapter));
        Self {
            providers: Vec::new(),
            selected,
        }
    }

    /// The bound adapter, probing on first call.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Unavailable`] if no provider could be bound.
    pub fn adapter(&self) -> BridgeResult<Arc<dyn BridgeAdapter>> {
        self.selected.get_or_init(|| self.select()).clone()
    }

    /// Whether selection has already happened.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self.selected.get(), Some(Ok(_)))
    }

    fn select(&self) -> BridgeResult<Arc<dyn BridgeAdapter>> {
        let mut reasons = Vec::new();
        for provider in &self.providers {
            match provider.probe() {
                Ok(adapter) => {
                    tracing::info!("Bridge backend selected: {}", provider.name());
                    return Ok(adapter);
                }
                Err(e) => {
                    tracing::warn!("Bridge backend {} unavailable, falling back: {e}", provider.name());
                    reasons.push(format!("{}: {e}", provider.name()));
                }
            }
        }
        if reasons.is_empty() {
            reasons.push("no providers configured".to_string());
        }
        Err(BridgeError::Unavailable(reasons.join("; ")))
    }
}

impl fmt::Debug for BridgeHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("BridgeHost")
            .field("providers", &providers)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContentKind, ContentRef};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StaticBridge {
        released: Mutex<Vec<Snapshot>>,
    }

    #[async_trait]
    impl BridgeAdapter for StaticBridge {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn measure(&self, handle: ViewHandle) -> BridgeResult<Frame> {
            match handle.raw() {
                0 => Err(BridgeError::ViewNotFound(handle)),
                1 => Ok(Frame::new(0.0, 0.0, 0.0, 10.0)),
                raw => Ok(Frame::new(0.0, 0.0, raw as f32, raw as f32)),
            }
        }

        async fn snapshot(&self, handle: ViewHandle) -> BridgeResult<Snapshot> {
            Ok(Snapshot {
                content: ContentRef::Bitmap {
                    uri: format!("snapshot://{}", handle.raw()),
                    width: 10,
                    height: 10,
                },
                kind: ContentKind::Snapshot,
            })
        }

        async fn set_hidden(&self, _handle: ViewHandle, _hidden: bool) -> BridgeResult<()> {
            Ok(())
        }

        async fn cleanup(&self, snapshots: Vec<Snapshot>) -> BridgeResult<()> {
            self.released.lock().expect("lock").extend(snapshots);
            Ok(())
        }
    }

    struct Provider {
        name: &'static str,
        available: bool,
        probes: Arc<AtomicUsize>,
    }

    impl BridgeProvider for Provider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn probe(&self) -> BridgeResult<Arc<dyn BridgeAdapter>> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.available {
                Ok(Arc::new(StaticBridge {
                    released: Mutex::new(Vec::new()),
                }))
            } else {
                Err(BridgeError::Unavailable(format!("{} missing", self.name)))
            }
        }
    }

    #[tokio::test]
    async fn test_default_prepare_measures_both_sides() {
        let bridge = StaticBridge {
            released: Mutex::new(Vec::new()),
        };
        let prepared = bridge
            .prepare_transition(ViewHandle::new(20), ViewHandle::new(40))
            .await
            .expect("prepared");
        assert_eq!(prepared.start.frame.width, 20.0);
        assert_eq!(prepared.end.frame.width, 40.0);
    }

    #[tokio::test]
    async fn test_default_prepare_releases_partial_capture() {
        let bridge = StaticBridge {
            released: Mutex::new(Vec::new()),
        };
        let result = bridge
            .prepare_transition(ViewHandle::new(20), ViewHandle::new(0))
            .await;
        assert_eq!(result, Err(BridgeError::ViewNotFound(ViewHandle::new(0))));
        assert_eq!(bridge.released.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn test_zero_size_is_a_fault() {
        let bridge = StaticBridge {
            released: Mutex::new(Vec::new()),
        };
        let result = bridge
            .prepare_transition(ViewHandle::new(1), ViewHandle::new(40))
            .await;
        assert_eq!(result, Err(BridgeError::ZeroSize(ViewHandle::new(1))));
        assert!(bridge.released.lock().expect("lock").is_empty());
    }

    #[test]
    fn test_host_falls_back_and_probes_once() {
        let fast_probes = Arc::new(AtomicUsize::new(0));
        let slow_probes = Arc::new(AtomicUsize::new(0));
        let host = BridgeHost::new(vec![
            Box::new(Provider {
                name: "fast",
                available: false,
                probes: Arc::clone(&fast_probes),
            }),
            Box::new(Provider {
                name: "slow",
                available: true,
                probes: Arc::clone(&slow_probes),
            }),
        ]);

        assert!(!host.is_bound());
        for _ in 0..3 {
            let adapter = host.adapter().expect("bound");
            assert_eq!(adapter.name(), "static");
        }
        assert!(host.is_bound());
        assert_eq!(fast_probes.load(Ordering::SeqCst), 1);
        assert_eq!(slow_probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_host_remembers_failure() {
        let probes = Arc::new(AtomicUsize::new(0));
        let host = BridgeHost::new(vec![Box::new(Provider {
            name: "fast",
            available: false,
            probes: Arc::clone(&probes),
        })]);

        assert!(matches!(host.adapter(), Err(BridgeError::Unavailable(_))));
        assert!(matches!(host.adapter(), Err(BridgeError::Unavailable(_))));
        assert_eq!(probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_host_is_unavailable() {
        let host = BridgeHost::new(Vec::new());
        assert!(matches!(host.adapter(), Err(BridgeError::Unavailable(_))));
    }
}
