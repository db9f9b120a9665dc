//! Bridge crate error types.

use thiserror::Error;

/// Errors raised while configuring the bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SetupError {
    /// Backend name not recognised.
    #[error("Unknown bridge backend: {0} (expected \"batched\" or \"fallback\")")]
    UnknownBackend(String),
}
