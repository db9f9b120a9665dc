//! # Saorsa Morph Core
//!
//! Coordination engine for shared element transitions: when two views with
//! the same identifier are mounted on different screens, the pair is
//! detected, measured and captured, and a single progress value drives an
//! overlay that morphs from the first view to the second.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 morph-core                  │
//! ├──────────────────────┬──────────────────────┤
//! │  Registry            │  Transition          │
//! │  - Registrations     │  Controller          │
//! │  - Pair selection    │  - State machine     │
//! │  - Notifications     │  - Progress timeline │
//! ├──────────────────────┼──────────────────────┤
//! │  Interpolation       │  Bridge Adapter      │
//! │  - Frame lerp        │  - measure/snapshot  │
//! │  - Layer opacity     │  - one-time probing  │
//! └──────────────────────┴──────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod config;
pub mod controller;
pub mod easing;
pub mod error;
pub mod event;
pub mod geometry;
pub mod interpolate;
pub mod registry;
pub mod scheduler;

pub use bridge::{BridgeAdapter, BridgeHost, BridgeProvider};
pub use config::{MorphMode, TransitionConfig};
pub use controller::{Overlay, TransitionController, TransitionState};
pub use easing::{Bezier, Easing};
pub use error::{BridgeError, BridgeResult, ConfigError, TransitionError, TransitionResult};
pub use event::{Emitter, RegistryEvent, Subscription};
pub use geometry::{
    ContentKind, ContentRef, Frame, PreparedTransition, Snapshot, SnapshotGeometry,
    TransitionPair, ViewHandle,
};
pub use interpolate::{
    clamp_progress, interpolate, layer_opacity, split_step_progress, LayerOpacity, VisualState,
};
pub use registry::{Registration, RegistrationToken, Registry};
pub use scheduler::{RunOutcome, Sample, Scheduler, Timeline};

/// Morph core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
