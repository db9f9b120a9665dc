//! Transition configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Easing};

/// Default transition duration in milliseconds.
pub const DEFAULT_DURATION_MS: u64 = 300;

/// Default animation tick interval in milliseconds (~60 fps).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// How the overlay composites start and end content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MorphMode {
    /// Only the start content is shown while the frame animates.
    #[default]
    Move,
    /// Cross-fade from start content to end content.
    Fade,
    /// End content fades in; start content is not shown.
    FadeIn,
    /// Start content fades out; end content is not shown.
    FadeOut,
}

impl fmt::Display for MorphMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Move => "move",
            Self::Fade => "fade",
            Self::FadeIn => "fade-in",
            Self::FadeOut => "fade-out",
        })
    }
}

impl FromStr for MorphMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(Self::Move),
            "fade" => Ok(Self::Fade),
            "fade-in" | "fadein" => Ok(Self::FadeIn),
            "fade-out" | "fadeout" => Ok(Self::FadeOut),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Options for one transition controller.
///
/// # Example
///
/// ```
/// use morph_core::{Easing, MorphMode, TransitionConfig};
///
/// let config = TransitionConfig::from_json(r#"{"duration_ms": 450, "mode": "fade"}"#).unwrap();
/// assert_eq!(config.duration_ms, 450);
/// assert_eq!(config.mode, MorphMode::Fade);
/// assert_eq!(config.easing, Easing::EaseInOut);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Animation length in milliseconds.
    pub duration_ms: u64,
    /// Curve applied to the time fraction.
    pub easing: Easing,
    /// Log every published frame.
    pub debug: bool,
    /// Suppress transitions entirely.
    pub disabled: bool,
    /// Start automatically when the registry reports a ready pair.
    pub auto_detect: bool,
    /// Compositing mode for the overlay.
    pub mode: MorphMode,
    /// Scheduler tick interval in milliseconds.
    pub frame_interval_ms: u64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            easing: Easing::default(),
            debug: false,
            disabled: false,
            auto_detect: true,
            mode: MorphMode::default(),
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl TransitionConfig {
    /// Parse a configuration from JSON; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or names an unknown curve or mode.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Serialization)
    }

    /// Set the duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the easing curve.
    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Set the compositing mode.
    #[must_use]
    pub fn with_mode(mut self, mode: MorphMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable automatic start on pair detection.
    #[must_use]
    pub fn with_auto_detect(mut self, auto_detect: bool) -> Self {
        self.auto_detect = auto_detect;
        self
    }

    /// Disable transitions.
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Enable per-frame logging.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Animation length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Scheduler tick interval, never shorter than one millisecond.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransitionConfig::default();
        assert_eq!(config.duration(), Duration::from_millis(300));
        assert_eq!(config.easing, Easing::EaseInOut);
        assert!(!config.disabled);
        assert!(!config.debug);
        assert!(config.auto_detect);
        assert_eq!(config.mode, MorphMode::Move);
    }

    #[test]
    fn test_from_json_partial() {
        let config = TransitionConfig::from_json(r#"{"disabled": true, "easing": "linear"}"#)
            .expect("valid config");
        assert!(config.disabled);
        assert_eq!(config.easing, Easing::Linear);
        assert_eq!(config.duration_ms, DEFAULT_DURATION_MS);
    }

    #[test]
    fn test_from_json_rejects_unknown_easing() {
        let result = TransitionConfig::from_json(r#"{"easing": "wobble"}"#);
        assert!(matches!(result, Err(ConfigError::Serialization(_))));
    }

    #[test]
    fn test_mode_names() {
        assert_eq!("fade-in".parse::<MorphMode>().ok(), Some(MorphMode::FadeIn));
        assert_eq!("FadeOut".parse::<MorphMode>().ok(), Some(MorphMode::FadeOut));
        assert_eq!(MorphMode::FadeOut.to_string(), "fade-out");
        assert!("zoom".parse::<MorphMode>().is_err());

        let json = serde_json::to_string(&MorphMode::FadeIn).expect("serialize");
        assert_eq!(json, "\"fade-in\"");
    }

    #[test]
    fn test_builder() {
        let config = TransitionConfig::default()
            .with_duration(Duration::from_millis(120))
            .with_mode(MorphMode::Fade)
            .with_auto_detect(false);
        assert_eq!(config.duration_ms, 120);
        assert_eq!(config.mode, MorphMode::Fade);
        assert!(!config.auto_detect);
    }

    #[test]
    fn test_frame_interval_floor() {
        let config = TransitionConfig {
            frame_interval_ms: 0,
            ..TransitionConfig::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(1));
    }
}
