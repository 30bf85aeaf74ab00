//! Immutable keyframe curves for height response and falloff shaping.
//!
//! [`Curve`] is a sorted table of `(time, value)` keys with a pure evaluation
//! function. Evaluating never mutates the curve, so a single instance can be
//! shared by every generation thread without cloning.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

// ---------------------------------------------------------------------------
// Keyframe
// ---------------------------------------------------------------------------

/// A single curve key.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

impl Keyframe {
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// How values between two keys are blended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Straight line between keys.
    #[default]
    Linear,
    /// Smoothstep between keys (zero slope at every key).
    Smooth,
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ---------------------------------------------------------------------------
// Curve
// ---------------------------------------------------------------------------

/// Keyframe curve, clamped outside its key domain.
///
/// Keys are sorted by time on construction and must have distinct, finite
/// times. Sampling before the first key returns the first value, after the
/// last key the last value.
#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    keys: Vec<Keyframe>,
    interpolation: Interpolation,
}

impl Curve {
    /// Create a linear curve from unsorted keys.
    pub fn new(keys: Vec<Keyframe>) -> Result<Self> {
        Self::with_interpolation(keys, Interpolation::Linear)
    }

    /// Create a curve from unsorted keys with the given interpolation.
    pub fn with_interpolation(mut keys: Vec<Keyframe>, interpolation: Interpolation) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::Config("curve must have at least one key".into()));
        }
        if let Some(bad) = keys.iter().find(|k| !k.time.is_finite() || !k.value.is_finite()) {
            return Err(Error::Config(format!(
                "curve key ({}, {}) is not finite",
                bad.time, bad.value
            )));
        }

        keys.sort_by(|a, b| a.time.total_cmp(&b.time));

        if let Some(pair) = keys.windows(2).find(|w| w[0].time == w[1].time) {
            return Err(Error::Config(format!(
                "curve has two keys at time {}",
                pair[0].time
            )));
        }

        Ok(Self { keys, interpolation })
    }

    /// Straight line from `(0, 0)` to `(1, 1)`.
    pub fn identity() -> Self {
        Self {
            keys: vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)],
            interpolation: Interpolation::Linear,
        }
    }

    /// Curve that always returns `value`.
    pub fn constant(value: f32) -> Self {
        Self {
            keys: vec![Keyframe::new(0.0, value)],
            interpolation: Interpolation::Linear,
        }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// True if values never decrease as time increases.
    pub fn is_monotonic(&self) -> bool {
        self.keys.windows(2).all(|w| w[1].value >= w[0].value)
    }

    /// Sample the curve at `t`.
    pub fn evaluate(&self, t: f32) -> f32 {
        let first = self.keys[0];
        let last = self.keys[self.keys.len() - 1];

        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First key strictly after t; exists and is > 0 because of the clamps above.
        let upper = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];

        let mut frac = (t - a.time) / (b.time - a.time);
        if self.interpolation == Interpolation::Smooth {
            frac = frac * frac * (3.0 - 2.0 * frac);
        }
        lerp(a.value, b.value, frac)
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::identity()
    }
}

// ---------------------------------------------------------------------------
// Serde support
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct CurveRepr {
    keys: Vec<(f32, f32)>,
    #[serde(default)]
    interpolation: Interpolation,
}

impl Serialize for Curve {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        CurveRepr {
            keys: self.keys.iter().map(|k| (k.time, k.value)).collect(),
            interpolation: self.interpolation,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Curve {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = CurveRepr::deserialize(deserializer)?;
        let keys = repr.keys.into_iter().map(|(t, v)| Keyframe::new(t, v)).collect();
        Self::with_interpolation(keys, repr.interpolation).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
