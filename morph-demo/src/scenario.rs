//! List-to-detail transition scenario.

use std::future::Future;

use morph_bridge::{bridge_host, BridgeConfig, ViewContent, ViewSurface};
use morph_core::{Frame, Registry, TransitionController, TransitionResult, TransitionState};
use serde::Serialize;

use crate::DemoConfig;

/// List thumbnail the transition starts from.
const THUMBNAIL: Frame = Frame {
    x: 16.0,
    y: 120.0,
    width: 64.0,
    height: 64.0,
};

/// Detail header the transition ends at.
const DETAIL: Frame = Frame {
    x: 0.0,
    y: 0.0,
    width: 390.0,
    height: 390.0,
};

/// One observed overlay frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    /// Progress the frame was computed for.
    pub progress: f32,
    /// Overlay frame.
    pub frame: Frame,
    /// Start layer opacity; `None` when not rendered.
    pub start_opacity: Option<f32>,
    /// End layer opacity; `None` when not rendered.
    pub end_opacity: Option<f32>,
}

/// Outcome of a demo run.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    /// Shared element identifier.
    pub identifier: String,
    /// Bridge backend that was bound.
    pub backend: String,
    /// Final controller state.
    pub state: TransitionState,
    /// Final progress.
    pub progress: f32,
    /// Overlay frames observed while running.
    pub frames: Vec<FrameRecord>,
    /// Error message if the transition failed.
    pub error: Option<String>,
    /// Snapshots captured during the run.
    pub snapshots_captured: u64,
    /// Snapshots still held after the run.
    pub snapshots_held: usize,
}

/// Run the demo against the process-wide registry.
///
/// # Errors
///
/// Returns an error if no bridge backend can be bound.
pub async fn run_demo(config: &DemoConfig) -> anyhow::Result<DemoReport> {
    run_demo_with(&Registry::global(), config).await
}

/// Run the demo against `registry`.
///
/// # Errors
///
/// Returns an error if no bridge backend can be bound.
pub async fn run_demo_with(registry: &Registry, config: &DemoConfig) -> anyhow::Result<DemoReport> {
    let surface = if config.batching {
        ViewSurface::new()
    } else {
        ViewSurface::without_batching()
    };
    let bridge = bridge_host(
        &surface,
        &BridgeConfig {
            preferred: config.backend,
            ..BridgeConfig::default()
        },
    );
    let adapter = bridge.host.adapter()?;
    let backend = adapter.name().to_string();

    let controller = TransitionController::new(
        config.identifier.as_str(),
        registry,
        adapter,
        config.transition.clone(),
    );
    tracing::info!(
        identifier = %config.identifier,
        %backend,
        duration_ms = config.transition.duration_ms,
        "Demo controller ready"
    );

    // List screen, then the detail screen pushed on top of it.
    let thumbnail = surface.mount(
        THUMBNAIL,
        ViewContent::Image {
            uri: "https://cdn.example/photos/7-thumb.jpg".to_string(),
            width: 128,
            height: 128,
        },
    );
    let list_token = registry.register(&config.identifier, thumbnail);
    registry.update_layout(&list_token, THUMBNAIL);

    let detail = surface.mount(DETAIL, ViewContent::Generic);
    let detail_token = registry.register(&config.identifier, detail);
    registry.update_layout(&detail_token, DETAIL);

    let (frames, result) = if config.transition.disabled {
        tracing::info!("Transitions disabled; detail shown without animation");
        (Vec::new(), Ok(()))
    } else if config.transition.auto_detect {
        (observe(&controller, std::future::ready(Ok(()))).await, Ok(()))
    } else {
        let frames = observe(&controller, controller.start()).await;
        (frames, controller.error().map_or(Ok(()), Err))
    };
    if let Err(e) = &result {
        tracing::warn!("Transition failed: {e}");
    }

    let report = {
        let state = controller.state();
        let progress = controller.progress();
        let error = controller.error().map(|e| e.to_string());
        drop(controller);
        registry.unregister(&detail_token);
        registry.unregister(&list_token);
        surface.unmount(detail);
        surface.unmount(thumbnail);

        let cache = bridge.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        DemoReport {
            identifier: config.identifier.clone(),
            backend,
            state,
            progress,
            frames,
            error,
            snapshots_captured: cache.stats().captures,
            snapshots_held: cache.len(),
        }
    };

    tracing::info!(
        state = %report.state,
        frames = report.frames.len(),
        "Demo finished"
    );
    Ok(report)
}

/// Record overlay frames while `driver` runs, until the controller settles.
async fn observe<F>(controller: &TransitionController, driver: F) -> Vec<FrameRecord>
where
    F: Future<Output = TransitionResult<()>>,
{
    let mut progress = controller.subscribe_progress();
    let mut frames = Vec::new();
    let settled = controller.settled();
    tokio::pin!(settled);
    tokio::pin!(driver);
    let mut driving = true;

    loop {
        tokio::select! {
            biased;
            state = &mut settled => {
                tracing::debug!(%state, "Transition settled");
                break;
            }
            _ = &mut driver, if driving => {
                driving = false;
            }
            changed = progress.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(overlay) = controller.overlay() {
                    let visual = overlay.visual;
                    tracing::debug!(
                        progress = visual.progress,
                        x = visual.frame.x,
                        y = visual.frame.y,
                        width = visual.frame.width,
                        height = visual.frame.height,
                        "Overlay frame"
                    );
                    frames.push(FrameRecord {
                        progress: visual.progress,
                        frame: visual.frame,
                        start_opacity: visual.opacity.start,
                        end_opacity: visual.opacity.end,
                    });
                }
            }
        }
    }
    frames
}
