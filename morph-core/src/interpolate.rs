//! Progress-to-visual-state mapping.
//!
//! Everything here is pure: the same progress, geometry and mode always
//! produce the same [`VisualState`]. Easing is applied to progress upstream
//! by the timeline; geometry is always interpolated linearly.
//!
//! | mode       | start layer      | end layer      |
//! |------------|------------------|----------------|
//! | `move`     | `1`              | not rendered   |
//! | `fade`     | `1 - progress`   | `progress`     |
//! | `fade-in`  | not rendered     | `progress`     |
//! | `fade-out` | `1 - progress`   | not rendered   |

use serde::{Deserialize, Serialize};

use crate::{Frame, MorphMode};

/// Clamp progress into `[0, 1]`. NaN is treated as 0.
#[must_use]
pub fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Split a multi-step index value into the step index and its progress.
///
/// `2.35` means 35% through the transition starting at step 2.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn split_step_progress(value: f32) -> (usize, f32) {
    if !value.is_finite() || value <= 0.0 {
        return (0, 0.0);
    }
    let index = value.floor();
    (index as usize, clamp_progress(value - index))
}

/// Per-layer opacity; `None` means the layer is not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerOpacity {
    /// Start content, drawn beneath the end content.
    pub start: Option<f32>,
    /// End content.
    pub end: Option<f32>,
}

impl LayerOpacity {
    /// Effective start opacity (0 when not rendered).
    #[must_use]
    pub fn start_value(&self) -> f32 {
        self.start.unwrap_or(0.0)
    }

    /// Effective end opacity (0 when not rendered).
    #[must_use]
    pub fn end_value(&self) -> f32 {
        self.end.unwrap_or(0.0)
    }
}

/// Opacity of each layer at `progress` for `mode`.
#[must_use]
pub fn layer_opacity(mode: MorphMode, progress: f32) -> LayerOpacity {
    let p = clamp_progress(progress);
    match mode {
        MorphMode::Move => LayerOpacity {
            start: Some(1.0),
            end: None,
        },
        MorphMode::Fade => LayerOpacity {
            start: Some(1.0 - p),
            end: Some(p),
        },
        MorphMode::FadeIn => LayerOpacity {
            start: None,
            end: Some(p),
        },
        MorphMode::FadeOut => LayerOpacity {
            start: Some(1.0 - p),
            end: None,
        },
    }
}

/// Render contract for the overlay at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    /// Clamped progress the state was computed for.
    pub progress: f32,
    /// Bounding frame of the overlay.
    pub frame: Frame,
    /// Opacity of each content layer.
    pub opacity: LayerOpacity,
}

/// Compute the overlay's visual state.
///
/// Returns `None` when either geometry is missing; the caller must not render.
#[must_use]
pub fn interpolate(
    progress: f32,
    start: Option<&Frame>,
    end: Option<&Frame>,
    mode: MorphMode,
) -> Option<VisualState> {
    let (start, end) = (start?, end?);
    let progress = clamp_progress(progress);

    Some(VisualState {
        progress,
        frame: start.lerp(end, progress),
        opacity: layer_opacity(mode, progress),
    })
}
