//! # Saorsa Morph Demo
//!
//! Headless host for Saorsa Morph: mounts a list thumbnail and a detail
//! view under one identifier, lets the registry pair them and logs the
//! overlay frames of the resulting shared element transition.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p morph-demo
//! ```
//!
//! ## With a slower cross-fade on the per-call backend:
//!
//! ```bash
//! cargo run -p morph-demo -- --duration-ms 600 --mode fade --backend fallback
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `DemoConfig` - Transition options, bridge backend and identifier
//! - `run_demo` - Wires the registry, bridge host and controller together

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod scenario;

pub use scenario::{run_demo, run_demo_with, DemoReport, FrameRecord};

use std::path::PathBuf;

use clap::Parser;
use morph_bridge::{BackendType, SetupError};
use morph_core::{ConfigError, Easing, MorphMode, TransitionConfig};
use thiserror::Error;

/// Command-line arguments for morph-demo.
#[derive(Debug, Clone, Parser)]
#[command(name = "morph-demo")]
#[command(about = "Run a shared element transition on a headless surface")]
#[command(version)]
pub struct CliArgs {
    /// JSON file with transition options; flags override its values
    #[arg(long, env = "MORPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Transition length in milliseconds
    #[arg(long, env = "MORPH_DURATION_MS")]
    pub duration_ms: Option<u64>,

    /// Easing curve (e.g. "ease-out", "cubic-bezier(0.2, 0, 0, 1)")
    #[arg(long, env = "MORPH_EASING")]
    pub easing: Option<String>,

    /// Overlay mode: move, fade, fade-in or fade-out
    #[arg(long, env = "MORPH_MODE")]
    pub mode: Option<String>,

    /// Disable transitions
    #[arg(long, env = "MORPH_DISABLED")]
    pub disabled: bool,

    /// Log every animation frame
    #[arg(long, env = "MORPH_DEBUG")]
    pub debug: bool,

    /// Preferred bridge backend: batched or fallback
    #[arg(long, env = "MORPH_BACKEND", default_value = "batched")]
    pub backend: String,

    /// Simulate a surface without batched access
    #[arg(long)]
    pub no_batching: bool,

    /// Shared element identifier
    #[arg(long, default_value = "hero")]
    pub identifier: String,
}

/// Errors building a [`DemoConfig`].
#[derive(Debug, Error)]
pub enum DemoError {
    /// Config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    ConfigFile {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Transition options were invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bridge options were invalid.
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Demo configuration.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Options for the transition controller.
    pub transition: TransitionConfig,
    /// Preferred bridge backend.
    pub backend: BackendType,
    /// Whether the surface offers batched access.
    pub batching: bool,
    /// Shared element identifier.
    pub identifier: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoConfig {
    /// Create a demo configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transition: TransitionConfig::default(),
            backend: BackendType::default(),
            batching: true,
            identifier: "hero".to_string(),
        }
    }
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = DemoError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let mut transition = match &args.config {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|source| {
                    DemoError::ConfigFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                TransitionConfig::from_json(&json)?
            }
            None => TransitionConfig::default(),
        };

        if let Some(duration_ms) = args.duration_ms {
            transition.duration_ms = duration_ms;
        }
        if let Some(easing) = &args.easing {
            transition.easing = easing.parse::<Easing>()?;
        }
        if let Some(mode) = &args.mode {
            transition.mode = mode.parse::<MorphMode>()?;
        }
        transition.disabled |= args.disabled;
        transition.debug |= args.debug;

        Ok(Self {
            transition,
            backend: args.backend.parse()?,
            batching: !args.no_batching,
            identifier: args.identifier,
        })
    }
}
