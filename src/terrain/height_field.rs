//! Row-major 2D height samples with tracked bounds

use crate::core::{Error, Result};

/// A `width × height` grid of height samples.
///
/// `min_value` and `max_value` are recorded while the field is generated and
/// always bound every sample.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    values: Vec<f32>,
    min_value: f32,
    max_value: f32,
}

impl HeightField {
    /// Build a field from raw samples, computing the bounds.
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != width * height {
            return Err(Error::Config(format!(
                "height field {}x{} needs {} samples, got {}",
                width,
                height,
                width * height,
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Config("height field samples must be finite".into()));
        }
        let (min_value, max_value) = bounds_of(&values);
        Ok(Self::with_bounds(width, height, values, min_value, max_value))
    }

    /// Build a field whose bounds were tracked by the caller.
    pub(crate) fn with_bounds(
        width: usize,
        height: usize,
        values: Vec<f32>,
        min_value: f32,
        max_value: f32,
    ) -> Self {
        debug_assert_eq!(values.len(), width * height);
        Self {
            width,
            height,
            values,
            min_value,
            max_value,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    /// All samples, row by row.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Sample at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// One row of samples.
    pub fn row(&self, y: usize) -> &[f32] {
        &self.values[y * self.width..(y + 1) * self.width]
    }
}

/// Min and max of a slice; `(0, 0)` when empty.
pub(crate) fn bounds_of(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
