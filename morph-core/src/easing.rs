//! Named easing curves for the progress timeline.
//!
//! Curves follow CSS timing-function semantics and are referenced by their
//! CSS names in configuration:
//!
//! ```
//! use morph_core::Easing;
//!
//! let ease: Easing = "ease-in-out".parse().unwrap();
//! assert!((ease.evaluate(0.5) - 0.5).abs() < 1e-3);
//!
//! let custom: Easing = "cubic-bezier(0.4, 0, 0.2, 1)".parse().unwrap();
//! assert_eq!(custom.to_string(), "cubic-bezier(0.4, 0, 0.2, 1)");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Easing curve applied to the time fraction before progress is published.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    /// No easing.
    Linear,
    /// CSS `ease`, `cubic-bezier(0.25, 0.1, 0.25, 1)`.
    Ease,
    /// CSS `ease-in`, `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,
    /// CSS `ease-out`, `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,
    /// CSS `ease-in-out`, `cubic-bezier(0.42, 0, 0.58, 1)`.
    #[default]
    EaseInOut,
    /// Custom curve, built with [`Easing::cubic_bezier`].
    CubicBezier(Bezier),
}

/// Control points of a custom curve. `x1` and `x2` always lie in `[0, 1]`,
/// which keeps the curve's x monotonic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Bezier {
    /// Control points as `[x1, y1, x2, y2]`.
    #[must_use]
    pub const fn points(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl Easing {
    /// Build a custom curve.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBezier`] if `x1` or `x2` is outside `[0, 1]`.
    pub fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self, ConfigError> {
        let valid = (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2);
        if !valid || !y1.is_finite() || !y2.is_finite() {
            return Err(ConfigError::InvalidBezier(format!(
                "({x1}, {y1}, {x2}, {y2})"
            )));
        }
        Ok(Self::CubicBezier(Bezier { x1, y1, x2, y2 }))
    }

    /// Map a time fraction to eased progress. Input is clamped to `[0, 1]`;
    /// the ends always map exactly to 0 and 1.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        match *self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::CubicBezier(Bezier { x1, y1, x2, y2 }) => cubic_bezier(x1, y1, x2, y2, t),
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::Ease => f.write_str("ease"),
            Self::EaseIn => f.write_str("ease-in"),
            Self::EaseOut => f.write_str("ease-out"),
            Self::EaseInOut => f.write_str("ease-in-out"),
            Self::CubicBezier(Bezier { x1, y1, x2, y2 }) => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
        }
    }
}

impl FromStr for Easing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "linear" => Ok(Self::Linear),
            "ease" => Ok(Self::Ease),
            "ease-in" | "easein" => Ok(Self::EaseIn),
            "ease-out" | "easeout" => Ok(Self::EaseOut),
            "ease-in-out" | "easeinout" => Ok(Self::EaseInOut),
            _ => parse_bezier(&name).ok_or_else(|| ConfigError::UnknownEasing(s.to_string()))?,
        }
    }
}

fn parse_bezier(name: &str) -> Option<Result<Easing, ConfigError>> {
    let args = name.strip_prefix("cubic-bezier(")?.strip_suffix(')')?;
    let values: Vec<f32> = args
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .ok()?;
    match values.as_slice() {
        &[x1, y1, x2, y2] => Some(Easing::cubic_bezier(x1, y1, x2, y2)),
        _ => None,
    }
}

impl TryFrom<String> for Easing {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Easing> for String {
    fn from(value: Easing) -> Self {
        value.to_string()
    }
}

/// Evaluate a cubic bezier timing curve at time fraction `progress`.
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, progress: f32) -> f32 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_component(y1, y2, t)
}

/// Find the curve parameter whose x equals `target_x`.
///
/// Newton-Raphson first; bisection when the slope flattens out.
fn solve_bezier_x(x1: f32, x2: f32, target_x: f32) -> f32 {
    let mut t = target_x;
    for _ in 0..8 {
        let x = bezier_component(x1, x2, t) - target_x;
        if x.abs() < 1e-6 {
            return t;
        }
        let dx = bezier_derivative(x1, x2, t);
        if dx.abs() < 1e-6 {
            break;
        }
        t = (t - x / dx).clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    t = target_x;
    for _ in 0..32 {
        let x = bezier_component(x1, x2, t);
        if (x - target_x).abs() < 1e-6 {
            break;
        }
        if x < target_x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) * 0.5;
    }
    t
}

/// One axis of the curve: 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³.
#[inline]
fn bezier_component(p1: f32, p2: f32, t: f32) -> f32 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
}

#[inline]
fn bezier_derivative(p1: f32, p2: f32, t: f32) -> f32 {
    let mt = 1.0 - t;
    3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}
