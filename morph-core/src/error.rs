//! Error types for transition coordination.

use thiserror::Error;

use crate::ViewHandle;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type for transition operations.
pub type TransitionResult<T> = Result<T, TransitionError>;

/// Errors reported by a bridge backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The view instance behind the handle no longer exists.
    #[error("View not found: {0}")]
    ViewNotFound(ViewHandle),

    /// The view measured with zero width or height.
    #[error("View has zero size: {0}")]
    ZeroSize(ViewHandle),

    /// No backend could be bound.
    #[error("Bridge backend unavailable: {0}")]
    Unavailable(String),

    /// Capturing the view's appearance failed.
    #[error("Snapshot failed: {0}")]
    Snapshot(String),
}

/// Errors surfaced by a transition controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// A transition was requested but fewer than two registrations exist.
    #[error("No transition pair found for element: {0}")]
    NoPair(String),

    /// The bridge failed while preparing or hiding the pair.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// No async runtime was available to drive the animation.
    #[error("No async runtime available to drive the transition")]
    NoRuntime,
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Easing name is not recognized.
    #[error("Unknown easing curve: {0}")]
    UnknownEasing(String),

    /// Animation mode name is not recognized.
    #[error("Unknown animation mode: {0}")]
    UnknownMode(String),

    /// Cubic bezier control points are out of range.
    #[error("Invalid cubic-bezier: {0}")]
    InvalidBezier(String),

    /// Configuration serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
