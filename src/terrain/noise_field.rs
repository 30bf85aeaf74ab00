//! Seeded multi-octave Perlin noise fields

use glam::Vec2;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::height_field::{bounds_of, HeightField};
use super::settings::{NoiseSettings, NormalizeMode};

/// Octave offsets are drawn uniformly from `[-RANGE, RANGE)` on each axis.
pub const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Fixed permutation for the Perlin primitive; variety comes from the octave offsets.
const PERLIN_SEED: u32 = 0;

/// Fractal Brownian noise sampled over a window centred on `sample_center`.
///
/// All randomness is drawn up front from `seed`, so two fields built from the
/// same settings and centre produce bit-identical samples.
pub struct NoiseField {
    settings: NoiseSettings,
    perlin: Perlin,
    octave_offsets: Vec<[f64; 2]>,
}

impl NoiseField {
    /// Create a noise field. Degenerate settings are sanitized first.
    pub fn new(settings: &NoiseSettings, sample_center: Vec2) -> Self {
        let settings = settings.sanitized();
        let octave_offsets = octave_offsets(&settings, sample_center);
        Self {
            settings,
            perlin: Perlin::new(PERLIN_SEED),
            octave_offsets,
        }
    }

    /// Settings after sanitizing.
    pub fn settings(&self) -> &NoiseSettings {
        &self.settings
    }

    pub fn octave_offsets(&self) -> &[[f64; 2]] {
        &self.octave_offsets
    }

    /// Raw octave sum at `(x, y)` relative to the window half extents.
    ///
    /// The result lies in `[-max_possible_height, max_possible_height]`.
    #[inline]
    pub fn raw_sample(&self, x: f64, y: f64, half_width: f64, half_height: f64) -> f64 {
        let scale = self.settings.scale as f64;
        let persistence = self.settings.persistence as f64;
        let lacunarity = self.settings.lacunarity as f64;

        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut noise_height = 0.0;

        for offset in &self.octave_offsets {
            let sample_x = (x - half_width + offset[0]) / scale * frequency;
            let sample_y = (y - half_height + offset[1]) / scale * frequency;

            noise_height += (perlin01(&self.perlin, sample_x, sample_y) * 2.0 - 1.0) * amplitude;

            amplitude *= persistence;
            frequency *= lacunarity;
        }
        noise_height
    }

    /// Generate a normalized `width × height` field.
    pub fn generate(&self, width: usize, height: usize) -> HeightField {
        if width == 0 || height == 0 {
            return HeightField::with_bounds(width, height, Vec::new(), 0.0, 0.0);
        }

        let half_width = width as f64 / 2.0;
        let half_height = height as f64 / 2.0;

        let mut values = vec![0.0f32; width * height];
        values.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = self.raw_sample(x as f64, y as f64, half_width, half_height) as f32;
            }
        });

        match self.settings.normalize_mode {
            NormalizeMode::Local => normalize_local(&mut values),
            NormalizeMode::Global => self.normalize_global(&mut values),
        }

        let (min_value, max_value) = bounds_of(&values);
        HeightField::with_bounds(width, height, values, min_value, max_value)
    }

    fn normalize_global(&self, values: &mut [f32]) {
        let denominator = 2.0 * self.settings.max_possible_height() / self.settings.estimator;
        values.par_iter_mut().for_each(|v| {
            *v = ((*v + 1.0) / denominator).max(0.0);
        });

        let saturated = values.iter().filter(|&&v| v > 1.0).count();
        if saturated > 0 {
            let peak = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            log::warn!(
                "Global noise normalization left {} of {} samples above 1.0 (peak {:.3}); estimator {} is too high for {} octaves",
                saturated,
                values.len(),
                peak,
                self.settings.estimator,
                self.settings.octaves
            );
        }
    }
}

/// Generate a seeded noise field (see [`NoiseField`]).
pub fn generate_noise_map(
    width: usize,
    height: usize,
    settings: &NoiseSettings,
    sample_center: Vec2,
) -> HeightField {
    NoiseField::new(settings, sample_center).generate(width, height)
}

/// Per-octave sample offsets.
///
/// Y is subtracted because mesh rows advance toward -Z: noise Y is world -Z.
fn octave_offsets(settings: &NoiseSettings, sample_center: Vec2) -> Vec<[f64; 2]> {
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed as i64 as u64);
    (0..settings.octaves)
        .map(|_| {
            let draw_x = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f64;
            let draw_y = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f64;
            [
                draw_x + settings.offset.x as f64 + sample_center.x as f64,
                draw_y - settings.offset.y as f64 - sample_center.y as f64,
            ]
        })
        .collect()
}

/// Perlin noise remapped from `[-1, 1]` to `[0, 1]`.
#[inline]
fn perlin01(perlin: &Perlin, x: f64, y: f64) -> f64 {
    ((perlin.get([x, y]) + 1.0) * 0.5).clamp(0.0, 1.0)
}

/// Stretch the observed range to `[0, 1]`; a flat field becomes all zeros.
fn normalize_local(values: &mut [f32]) {
    let (min, max) = bounds_of(values);
    let range = max - min;
    values.par_iter_mut().for_each(|v| {
        *v = if range > 0.0 { (*v - min) / range } else { 0.0 };
    });
}
