//! Square falloff masks for island-style terrain

use super::curve::Curve;
use super::height_field::{bounds_of, HeightField};

/// Generate a `size × size` falloff mask.
///
/// Each cell is mapped to `[-1, 1]` on both axes; the Chebyshev distance from
/// the centre, `max(|x|, |y|)`, is fed through `curve`. The result is a square
/// mask that is `curve(0)` in the middle and `curve(1)` along the border.
pub fn generate_falloff_map(size: usize, curve: &Curve) -> HeightField {
    generate_falloff_mask(size, size, curve)
}

/// Rectangular variant of [`generate_falloff_map`]; each axis is normalized
/// over its own extent.
pub fn generate_falloff_mask(width: usize, height: usize, curve: &Curve) -> HeightField {
    let mut values = Vec::with_capacity(width * height);
    for j in 0..height {
        let y = normalized_coord(j, height);
        for i in 0..width {
            let x = normalized_coord(i, width);
            values.push(curve.evaluate(x.abs().max(y.abs())));
        }
    }
    let (min_value, max_value) = bounds_of(&values);
    HeightField::with_bounds(width, height, values, min_value, max_value)
}

#[inline]
fn normalized_coord(i: usize, size: usize) -> f32 {
    if size < 2 {
        return 0.0;
    }
    i as f32 / (size - 1) as f32 * 2.0 - 1.0
}
