//! # Saorsa Morph Bridge
//!
//! Native-side backends for the transition engine, running over a headless
//! [`ViewSurface`].
//!
//! ## Backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            BridgeAdapter Trait              │
//! ├──────────────────────┬──────────────────────┤
//! │ Batched              │ Fallback             │
//! │ (one round trip per  │ (one round trip per  │
//! │  prepare)            │  call)               │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! The host probes the preferred backend once and falls back if it is
//! unavailable; the choice holds for the life of the host.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod error;
pub mod snapshot_cache;
pub mod surface;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub use backend::{BatchedBridge, BatchedProvider, FallbackBridge, FallbackProvider};
pub use error::SetupError;
pub use snapshot_cache::{CacheStats, SnapshotCache, SnapshotCacheConfig};
pub use surface::{ViewContent, ViewNode, ViewSurface};

use morph_core::{BridgeHost, BridgeProvider};

/// Available bridge backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendType {
    /// Batched surface access (falls back if unsupported).
    #[default]
    Batched,
    /// Per-call surface access.
    Fallback,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Batched => "batched",
            Self::Fallback => "fallback",
        })
    }
}

impl FromStr for BackendType {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batched" => Ok(Self::Batched),
            "fallback" => Ok(Self::Fallback),
            other => Err(SetupError::UnknownBackend(other.to_string())),
        }
    }
}

/// Configuration for the bridge host.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Preferred backend (will fall back if unavailable).
    pub preferred: BackendType,
    /// Snapshot cache budget in bytes.
    pub snapshot_budget_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            preferred: BackendType::Batched,
            snapshot_budget_bytes: SnapshotCacheConfig::default().max_size_bytes,
        }
    }
}

/// A bridge host over `surface` together with its snapshot cache.
#[derive(Debug)]
pub struct Bridge {
    /// Host that binds one backend on first use.
    pub host: BridgeHost,
    /// Cache shared by every backend of the host.
    pub cache: Arc<Mutex<SnapshotCache>>,
}

/// Build a bridge host for `surface`.
///
/// Providers are ordered by preference: preferring the batched backend
/// registers the fallback behind it.
#[must_use]
pub fn bridge_host(surface: &ViewSurface, config: &BridgeConfig) -> Bridge {
    let cache = Arc::new(Mutex::new(SnapshotCache::with_config(SnapshotCacheConfig {
        max_size_bytes: config.snapshot_budget_bytes,
    })));

    let fallback: Box<dyn BridgeProvider> =
        Box::new(FallbackProvider::new(surface.clone(), Arc::clone(&cache)));
    let providers = match config.preferred {
        BackendType::Batched => vec![
            Box::new(BatchedProvider::new(surface.clone(), Arc::clone(&cache)))
                as Box<dyn BridgeProvider>,
            fallback,
        ],
        BackendType::Fallback => vec![fallback],
    };

    tracing::debug!(preferred = %config.preferred, "Bridge host created");
    Bridge {
        host: BridgeHost::new(providers),
        cache,
    }
}

/// Morph bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parse() {
        assert_eq!("batched".parse::<BackendType>(), Ok(BackendType::Batched));
        assert_eq!(" Fallback ".parse::<BackendType>(), Ok(BackendType::Fallback));
        assert_eq!(
            "metal".parse::<BackendType>(),
            Err(SetupError::UnknownBackend("metal".to_string()))
        );
        assert_eq!(BackendType::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_batched_surface_selects_batched() {
        let bridge = bridge_host(&ViewSurface::new(), &BridgeConfig::default());
        let adapter = bridge.host.adapter().expect("adapter");
        assert_eq!(adapter.name(), "batched");
    }

    #[test]
    fn test_unbatched_surface_falls_back() {
        let bridge = bridge_host(&ViewSurface::without_batching(), &BridgeConfig::default());
        let adapter = bridge.host.adapter().expect("adapter");
        assert_eq!(adapter.name(), "fallback");
        assert!(bridge.host.is_bound());
    }

    #[test]
    fn test_fallback_preference_skips_batched() {
        let config = BridgeConfig {
            preferred: BackendType::Fallback,
            ..BridgeConfig::default()
        };
        let bridge = bridge_host(&ViewSurface::new(), &config);
        assert_eq!(bridge.host.adapter().expect("adapter").name(), "fallback");
    }
}
