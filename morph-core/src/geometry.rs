//! View handles, frames and captured snapshot geometry.

use serde::{Deserialize, Serialize};

/// Opaque reference to one mounted view instance.
///
/// Handles are minted by the host that owns the views; the core never
/// interprets them beyond equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewHandle(u64);

impl ViewHandle {
    /// Wrap a raw host tag.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw host tag.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Screen-relative rectangle of a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Frame {
    /// Create a frame from position and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the frame has no usable area: zero, negative or NaN size.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width.is_nan() || self.height.is_nan() || self.width <= 0.0 || self.height <= 0.0
    }

    /// Linear interpolation towards `other`; `t` is used as given.
    ///
    /// Exact at both ends: `t == 0` yields `self`, `t == 1` yields `other`.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            x: lerp(self.x, other.x, t),
            y: lerp(self.y, other.y, t),
            width: lerp(self.width, other.width, t),
            height: lerp(self.height, other.height, t),
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// What a snapshot's content reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentRef {
    /// A still bitmap.
    Bitmap {
        /// Bitmap URI.
        uri: String,
        /// Intrinsic width in pixels.
        width: u32,
        /// Intrinsic height in pixels.
        height: u32,
    },
    /// Render the live view instead of a capture.
    Live,
}

/// Content-type hint for the overlay renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// The view is an image; the bitmap is its source.
    Image,
    /// A generic captured snapshot.
    Snapshot,
}

/// A captured appearance of one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Content reference.
    pub content: ContentRef,
    /// Content-type hint.
    pub kind: ContentKind,
}

/// Measured frame plus snapshot for one side of a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotGeometry {
    /// Screen-relative frame.
    pub frame: Frame,
    /// Captured appearance.
    pub snapshot: Snapshot,
}

/// Both sides of a transition, as returned by `prepare_transition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedTransition {
    /// Geometry of the oldest registration.
    pub start: SnapshotGeometry,
    /// Geometry of the newest registration.
    pub end: SnapshotGeometry,
}

impl PreparedTransition {
    /// Give up the snapshots so they can be released.
    #[must_use]
    pub fn into_snapshots(self) -> Vec<Snapshot> {
        vec![self.start.snapshot, self.end.snapshot]
    }
}

/// Start and end view of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPair {
    /// Lowest-sequence registration.
    pub start: ViewHandle,
    /// Highest-sequence registration.
    pub end: ViewHandle,
}
