//! Shaped height maps: noise, falloff, height curve and multiplier

use glam::Vec2;

use super::falloff::generate_falloff_mask;
use super::height_field::HeightField;
use super::noise_field::generate_noise_map;
use super::settings::HeightMapSettings;

/// Generate the height map for one window of terrain.
///
/// 1. Sample the noise field around `sample_center`.
/// 2. With falloff enabled, subtract the falloff mask and clamp to `[0, 1]`.
/// 3. Shape through the height curve and scale by the multiplier.
///
/// Pure: the same arguments always produce the same field.
pub fn generate_height_map(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    sample_center: Vec2,
) -> HeightField {
    let noise = generate_noise_map(width, height, &settings.noise, sample_center);
    let falloff = settings
        .use_falloff
        .then(|| generate_falloff_mask(width, height, &settings.falloff_curve));

    let mut min_value = f32::INFINITY;
    let mut max_value = f32::NEG_INFINITY;

    let mut values = Vec::with_capacity(width * height);
    for (i, &sample) in noise.values().iter().enumerate() {
        let mut h = sample;
        if let Some(mask) = &falloff {
            h = (h - mask.values()[i]).clamp(0.0, 1.0);
        }
        h = settings.height_curve.evaluate(h) * settings.height_multiplier;

        min_value = min_value.min(h);
        max_value = max_value.max(h);
        values.push(h);
    }

    if values.is_empty() {
        min_value = 0.0;
        max_value = 0.0;
    }

    HeightField::with_bounds(width, height, values, min_value, max_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::curve::{Curve, Keyframe};
    use crate::terrain::settings::{NoiseSettings, NormalizeMode};

    fn settings(use_falloff: bool) -> HeightMapSettings {
        HeightMapSettings {
            noise: NoiseSettings {
                normalize_mode: NormalizeMode::Local,
                seed: 7,
                scale: 30.0,
                octaves: 5,
                persistence: 0.5,
                lacunarity: 2.0,
                ..Default::default()
            },
            height_multiplier: 25.0,
            height_curve: Curve::identity(),
            use_falloff,
            falloff_curve: Curve::identity(),
        }
    }

    #[test]
    fn test_deterministic() {
        let s = settings(true);
        let a = generate_height_map(53, 53, &s, Vec2::new(50.0, 0.0));
        let b = generate_height_map(53, 53, &s, Vec2::new(50.0, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_bounds_hold() {
        let field = generate_height_map(40, 40, &settings(false), Vec2::ZERO);
        for &v in field.values() {
            assert!(v >= field.min_value() && v <= field.max_value());
        }
    }

    #[test]
    fn test_falloff_only_lowers() {
        let plain = generate_height_map(41, 41, &settings(false), Vec2::ZERO);
        let island = generate_height_map(41, 41, &settings(true), Vec2::ZERO);
        for (with, without) in island.values().iter().zip(plain.values()) {
            assert!(with <= without, "{} > {}", with, without);
        }
        // Identity falloff curve is 1 along the border, carving it to zero.
        assert_eq!(island.get(0, 20), 0.0);
        assert_eq!(island.get(40, 40), 0.0);
    }

    #[test]
    fn test_multiplier_and_curve() {
        let base = generate_height_map(20, 20, &settings(false), Vec2::ZERO);
        let doubled = generate_height_map(
            20,
            20,
            &HeightMapSettings {
                height_multiplier: 50.0,
                ..settings(false)
            },
            Vec2::ZERO,
        );
        for (a, b) in base.values().iter().zip(doubled.values()) {
            assert!((a * 2.0 - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_analytic_bounds_match_empirical() {
        let s = HeightMapSettings {
            height_curve: Curve::new(vec![
                Keyframe::new(0.0, 0.1),
                Keyframe::new(0.5, 0.2),
                Keyframe::new(1.0, 1.0),
            ])
            .unwrap(),
            ..settings(false)
        };
        // Local normalization spans exactly [0, 1], so the curve endpoints are hit.
        let field = generate_height_map(32, 32, &s, Vec2::ZERO);
        assert!((field.min_value() - s.min_height()).abs() < 1e-4);
        assert!((field.max_value() - s.max_height()).abs() < 1e-4);
    }

    #[test]
    fn test_empty() {
        let field = generate_height_map(0, 0, &settings(true), Vec2::ZERO);
        assert_eq!(field.min_value(), 0.0);
        assert_eq!(field.max_value(), 0.0);
    }
}
