//! Integration tests for transitions over the headless surface.
//!
//! These drive a real controller through both bridge backends, checking
//! that views are restored and every captured snapshot is released.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use morph_bridge::{
    bridge_host, BackendType, BatchedBridge, BridgeConfig, FallbackBridge, SnapshotCache,
    ViewContent, ViewSurface,
};
use morph_core::{
    BridgeError, Frame, Registry, TransitionConfig, TransitionController, TransitionError,
    TransitionState,
};

const THUMBNAIL: Frame = Frame {
    x: 16.0,
    y: 120.0,
    width: 64.0,
    height: 64.0,
};

const DETAIL: Frame = Frame {
    x: 0.0,
    y: 0.0,
    width: 390.0,
    height: 390.0,
};

fn config() -> TransitionConfig {
    TransitionConfig::default().with_duration(Duration::from_millis(300))
}

// ============================================================================
// Integration Tests: Registry -> Controller -> Bridge -> Surface
// ============================================================================

#[tokio::test(start_paused = true)]
async fn integration_hero_transition_completes() {
    let surface = ViewSurface::new();
    let bridge = bridge_host(&surface, &BridgeConfig::default());
    let registry = Registry::new();
    let controller = TransitionController::with_host("hero", &registry, &bridge.host, config())
        .expect("bridge available");

    let thumbnail = surface.mount(THUMBNAIL, ViewContent::Generic);
    let detail = surface.mount(DETAIL, ViewContent::Generic);
    let _start = registry.register("hero", thumbnail);
    let _end = registry.register("hero", detail);

    assert_eq!(controller.settled().await, TransitionState::Completed);
    assert_eq!(controller.progress(), 1.0);
    assert!(controller.overlay().is_none());
    assert!(surface.hidden_views().is_empty());

    let cache = bridge.cache.lock().expect("lock");
    assert!(cache.is_empty());
    assert_eq!(cache.stats().captures, 2);
    assert_eq!(cache.stats().releases, 2);
}

#[tokio::test(start_paused = true)]
async fn integration_views_hidden_while_running() {
    let surface = ViewSurface::new();
    let bridge = bridge_host(&surface, &BridgeConfig::default());
    let registry = Registry::new();
    let controller = TransitionController::with_host("hero", &registry, &bridge.host, config())
        .expect("bridge available");

    let thumbnail = surface.mount(THUMBNAIL, ViewContent::Generic);
    let detail = surface.mount(DETAIL, ViewContent::Generic);
    let _start = registry.register("hero", thumbnail);
    let _end = registry.register("hero", detail);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(controller.state(), TransitionState::Running);
    assert_eq!(surface.hidden_views(), vec![thumbnail, detail]);

    let overlay = controller.overlay().expect("overlay while running");
    assert!(overlay.visual.frame.width > THUMBNAIL.width);
    assert!(overlay.visual.frame.width < DETAIL.width);

    controller.settled().await;
    assert!(surface.hidden_views().is_empty());
}

#[tokio::test(start_paused = true)]
async fn integration_round_trips_per_backend() {
    let surface = ViewSurface::new();
    let cache = Arc::new(Mutex::new(SnapshotCache::new()));
    let batched = Arc::new(BatchedBridge::new(surface.clone(), Arc::clone(&cache)));
    let fallback = Arc::new(FallbackBridge::new(surface.clone(), Arc::clone(&cache)));

    let registry = Registry::new();
    let fast = TransitionController::new("fast", &registry, batched.clone(), config());
    let slow = TransitionController::new("slow", &registry, fallback.clone(), config());

    for identifier in ["fast", "slow"] {
        registry.register(identifier, surface.mount(THUMBNAIL, ViewContent::Generic));
        registry.register(identifier, surface.mount(DETAIL, ViewContent::Generic));
    }

    assert_eq!(fast.settled().await, TransitionState::Completed);
    assert_eq!(slow.settled().await, TransitionState::Completed);

    // prepare + hide both + show both
    assert_eq!(batched.round_trips(), 1 + 2 + 2);
    assert_eq!(fallback.round_trips(), 4 + 2 + 2);
    assert!(cache.lock().expect("lock").is_empty());
}

#[tokio::test(start_paused = true)]
async fn integration_fallback_when_batching_unsupported() {
    let surface = ViewSurface::without_batching();
    let bridge = bridge_host(
        &surface,
        &BridgeConfig {
            preferred: BackendType::Batched,
            ..BridgeConfig::default()
        },
    );
    assert_eq!(bridge.host.adapter().expect("adapter").name(), "fallback");

    let registry = Registry::new();
    let controller = TransitionController::with_host("hero", &registry, &bridge.host, config())
        .expect("bridge available");
    registry.register("hero", surface.mount(THUMBNAIL, ViewContent::Generic));
    registry.register("hero", surface.mount(DETAIL, ViewContent::Generic));

    assert_eq!(controller.settled().await, TransitionState::Completed);
    assert!(bridge.cache.lock().expect("lock").is_empty());
}

#[tokio::test(start_paused = true)]
async fn integration_unmount_mid_flight_completes_early() {
    let surface = ViewSurface::new();
    let bridge = bridge_host(&surface, &BridgeConfig::default());
    let registry = Registry::new();
    let controller = TransitionController::with_host("hero", &registry, &bridge.host, config())
        .expect("bridge available");

    let thumbnail = surface.mount(THUMBNAIL, ViewContent::Generic);
    let detail = surface.mount(DETAIL, ViewContent::Generic);
    let _start = registry.register("hero", thumbnail);
    let end = registry.register("hero", detail);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.state(), TransitionState::Running);

    assert!(registry.unregister(&end));
    surface.unmount(detail);
    assert_eq!(controller.state(), TransitionState::Completed);
    assert_eq!(controller.progress(), 1.0);

    // Let the detached release run.
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(surface.is_hidden(thumbnail), Some(false));
    assert!(surface.hidden_views().is_empty());
    assert!(bridge.cache.lock().expect("lock").is_empty());
}

#[tokio::test(start_paused = true)]
async fn integration_zero_size_view_fails() {
    let surface = ViewSurface::new();
    let bridge = bridge_host(&surface, &BridgeConfig::default());
    let registry = Registry::new();
    let controller = TransitionController::with_host(
        "hero",
        &registry,
        &bridge.host,
        config().with_auto_detect(false),
    )
    .expect("bridge available");

    let collapsed = surface.mount(Frame::new(16.0, 120.0, 0.0, 64.0), ViewContent::Generic);
    registry.register("hero", collapsed);
    registry.register("hero", surface.mount(DETAIL, ViewContent::Generic));

    let result = controller.start().await;
    assert_eq!(
        result,
        Err(TransitionError::Bridge(BridgeError::ZeroSize(collapsed)))
    );
    assert_eq!(controller.state(), TransitionState::Error);
    assert!(surface.hidden_views().is_empty());
    assert!(bridge.cache.lock().expect("lock").is_empty());

    controller.reset().await;
    assert_eq!(controller.state(), TransitionState::Idle);
}
