//! Noise, height map and mesh settings

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::curve::{Curve, Interpolation, Keyframe};
use crate::core::{Error, Result};

/// Chunk sizes (quads per side before padding) the mesher supports.
///
/// Every size is divisible by 24, so each LOD skip increment (1, 2, 4, 6, 8)
/// lands a main vertex exactly on both interior edges.
pub const SUPPORTED_CHUNK_SIZES: [usize; 9] = [48, 72, 96, 120, 144, 168, 192, 216, 240];

/// Flat shading triples the vertex count, so only the smallest sizes are allowed.
pub const NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES: usize = 3;

/// Padding vertices added to a chunk size: 2 out-of-mesh, 2 mesh-edge, 1 for the
/// shared last line.
pub const CHUNK_PADDING: usize = 5;

/// Smallest scale used when a non-positive scale is configured.
pub const MIN_NOISE_SCALE: f32 = 0.0001;

/// Most octaves a noise field sums.
pub const MAX_OCTAVES: u32 = 32;

/// Largest frequency per world unit the last octave may reach
/// (`lacunarity^(octaves - 1) / scale`). Beyond this, Perlin lattice
/// coordinates for far-away chunks no longer fit in an `isize`.
pub const MAX_OCTAVE_FREQUENCY: f64 = 1.0e9;

/// How accumulated octave noise is mapped into `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// Stretch the observed min/max of this window to `[0, 1]`.
    ///
    /// Only consistent within a single window; adjacent chunks will not line up.
    #[default]
    Local,
    /// Divide by a fixed, content-independent estimate of the maximum height.
    ///
    /// Seamless across chunks.
    Global,
}

/// Parameters for the fractal noise field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub normalize_mode: NormalizeMode,
    /// Divisor applied to the theoretical maximum height in Global mode.
    pub estimator: f32,
    pub scale: f32,        // Horizontal scale (larger = smoother)
    pub octaves: u32,      // Detail levels
    pub persistence: f32,  // Amplitude falloff per octave
    pub lacunarity: f32,   // Frequency growth per octave
    pub seed: i32,
    pub offset: Vec2,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            normalize_mode: NormalizeMode::Global,
            estimator: 0.9,
            scale: 50.0,
            octaves: 6,
            persistence: 0.6,
            lacunarity: 2.0,
            seed: 0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseSettings {
    /// Copy with recoverable degenerate values normalized.
    ///
    /// Non-positive scale becomes [`MIN_NOISE_SCALE`], lacunarity is raised to
    /// at least 1 and persistence clamped to `[0, 1]`. Octaves are kept in
    /// `1..=MAX_OCTAVES` and dropped from the top until the last one stays
    /// under [`MAX_OCTAVE_FREQUENCY`].
    pub fn sanitized(&self) -> Self {
        let scale = if self.scale > 0.0 { self.scale } else { MIN_NOISE_SCALE };
        let lacunarity = self.lacunarity.max(1.0);
        let mut octaves = self.octaves.clamp(1, MAX_OCTAVES);
        while octaves > 1 && last_octave_frequency(scale, lacunarity, octaves) > MAX_OCTAVE_FREQUENCY {
            octaves -= 1;
        }
        Self {
            scale,
            octaves,
            persistence: self.persistence.clamp(0.0, 1.0),
            lacunarity,
            ..self.clone()
        }
    }

    /// Reject values that cannot be normalized away.
    pub fn validate(&self) -> Result<()> {
        if !self.estimator.is_finite() || self.estimator <= 0.0 {
            return Err(Error::Config(format!(
                "noise estimator must be a positive number, got {}",
                self.estimator
            )));
        }
        if !self.scale.is_finite() || !self.persistence.is_finite() || !self.lacunarity.is_finite() {
            return Err(Error::Config("noise scale, persistence and lacunarity must be finite".into()));
        }
        if !self.offset.is_finite() {
            return Err(Error::Config(format!("noise offset {} is not finite", self.offset)));
        }
        if self.octaves > MAX_OCTAVES {
            return Err(Error::Config(format!(
                "noise octaves {} exceed the maximum of {}",
                self.octaves, MAX_OCTAVES
            )));
        }

        let scale = if self.scale > 0.0 { self.scale } else { MIN_NOISE_SCALE };
        let frequency = last_octave_frequency(scale, self.lacunarity.max(1.0), self.octaves.max(1));
        if frequency > MAX_OCTAVE_FREQUENCY {
            return Err(Error::Config(format!(
                "last noise octave reaches frequency {:e} per unit (maximum {:e}); lower octaves or lacunarity, or raise scale",
                frequency, MAX_OCTAVE_FREQUENCY
            )));
        }
        Ok(())
    }

    /// Sum of octave amplitudes, the largest magnitude the raw noise can reach.
    pub fn max_possible_height(&self) -> f32 {
        let mut amplitude = 1.0;
        let mut total = 0.0;
        for _ in 0..self.octaves.max(1) {
            total += amplitude;
            amplitude *= self.persistence;
        }
        total
    }
}

fn last_octave_frequency(scale: f32, lacunarity: f32, octaves: u32) -> f64 {
    (lacunarity as f64).powi(octaves as i32 - 1) / scale as f64
}

/// Parameters turning a noise field into terrain heights
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapSettings {
    pub noise: NoiseSettings,
    pub height_multiplier: f32,
    pub height_curve: Curve,
    pub use_falloff: bool,
    pub falloff_curve: Curve,
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            height_multiplier: 40.0,
            height_curve: default_height_curve(),
            use_falloff: false,
            falloff_curve: default_falloff_curve(),
        }
    }
}

impl HeightMapSettings {
    /// Lowest height the curve can produce.
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(0.0)
    }

    /// Highest height the curve can produce.
    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(1.0)
    }

    pub fn validate(&self) -> Result<()> {
        self.noise.validate()?;
        if !self.height_multiplier.is_finite() {
            return Err(Error::Config(format!(
                "height multiplier {} is not finite",
                self.height_multiplier
            )));
        }
        if !self.height_curve.is_monotonic() {
            return Err(Error::Config("height curve must be non-decreasing".into()));
        }
        if !self.falloff_curve.is_monotonic() {
            return Err(Error::Config("falloff curve must be non-decreasing".into()));
        }
        Ok(())
    }
}

/// Flat lowlands, steeper toward the peaks.
fn default_height_curve() -> Curve {
    Curve::with_interpolation(
        vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(0.3, 0.05),
            Keyframe::new(0.6, 0.3),
            Keyframe::new(1.0, 1.0),
        ],
        Interpolation::Smooth,
    )
    .unwrap_or_default()
}

/// No suppression in the middle, full suppression at the edge.
fn default_falloff_curve() -> Curve {
    Curve::with_interpolation(
        vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(0.6, 0.05),
            Keyframe::new(1.0, 1.0),
        ],
        Interpolation::Smooth,
    )
    .unwrap_or_default()
}

/// Mesh resolution and world scale for one chunk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    pub terrain_scale: f32,
    pub use_flat_shading: bool,
    /// Index into [`SUPPORTED_CHUNK_SIZES`].
    pub chunk_size_index: usize,
    /// Index into the first [`NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES`] sizes.
    pub flat_shaded_chunk_size_index: usize,
    pub water_level: f32,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            terrain_scale: 1.0,
            use_flat_shading: false,
            chunk_size_index: SUPPORTED_CHUNK_SIZES.len() - 1,
            flat_shaded_chunk_size_index: NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES - 1,
            water_level: 2.0,
        }
    }
}

impl MeshSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_index >= SUPPORTED_CHUNK_SIZES.len() {
            return Err(Error::Config(format!(
                "chunk size index {} out of range (0..{})",
                self.chunk_size_index,
                SUPPORTED_CHUNK_SIZES.len()
            )));
        }
        if self.flat_shaded_chunk_size_index >= NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES {
            return Err(Error::Config(format!(
                "flat shaded chunk size index {} out of range (0..{})",
                self.flat_shaded_chunk_size_index, NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES
            )));
        }
        if !self.terrain_scale.is_finite() || self.terrain_scale <= 0.0 {
            return Err(Error::Config(format!(
                "terrain scale must be positive, got {}",
                self.terrain_scale
            )));
        }
        Ok(())
    }

    /// Chunk size in quads, before padding.
    ///
    /// Out-of-range indices read as the largest size; [`validate`](Self::validate)
    /// rejects them.
    pub fn chunk_size(&self) -> usize {
        let index = if self.use_flat_shading {
            self.flat_shaded_chunk_size_index.min(NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES - 1)
        } else {
            self.chunk_size_index.min(SUPPORTED_CHUNK_SIZES.len() - 1)
        };
        SUPPORTED_CHUNK_SIZES[index]
    }

    /// Samples per side of the height field a chunk needs, padding included.
    pub fn num_verts_per_line(&self) -> usize {
        self.chunk_size() + CHUNK_PADDING
    }

    /// Side length of the rendered chunk in world units.
    pub fn mesh_world_size(&self) -> f32 {
        (self.num_verts_per_line() - 3) as f32 * self.terrain_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MAX_LOD;

    #[test]
    fn test_sanitized_clamps_degenerate_values() {
        let settings = NoiseSettings {
            scale: -3.0,
            octaves: 0,
            persistence: 1.7,
            lacunarity: 0.2,
            ..Default::default()
        };
        let clean = settings.sanitized();
        assert_eq!(clean.scale, MIN_NOISE_SCALE);
        assert_eq!(clean.octaves, 1);
        assert_eq!(clean.persistence, 1.0);
        assert_eq!(clean.lacunarity, 1.0);
        assert_eq!(clean.seed, settings.seed);
    }

    #[test]
    fn test_octave_frequency_bounded() {
        let settings = NoiseSettings {
            octaves: 64,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        // Within the octave limit but 2^31 / 0.01 is past the frequency limit.
        let settings = NoiseSettings {
            octaves: 32,
            lacunarity: 2.0,
            scale: 0.01,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let clean = settings.sanitized();
        assert!(clean.octaves >= 1 && clean.octaves < 32);
        assert!(last_octave_frequency(clean.scale, clean.lacunarity, clean.octaves) <= MAX_OCTAVE_FREQUENCY);
        assert!(last_octave_frequency(clean.scale, clean.lacunarity, clean.octaves + 1) > MAX_OCTAVE_FREQUENCY);

        // Lacunarity 1 never raises the frequency, so only the octave cap applies.
        let flat = NoiseSettings {
            octaves: 1000,
            lacunarity: 1.0,
            ..Default::default()
        };
        assert_eq!(flat.sanitized().octaves, MAX_OCTAVES);
    }

    #[test]
    fn test_estimator_must_be_positive() {
        let mut settings = NoiseSettings::default();
        assert!(settings.validate().is_ok());
        settings.estimator = 0.0;
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
        settings.estimator = f32::INFINITY;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_max_possible_height() {
        let settings = NoiseSettings {
            octaves: 3,
            persistence: 0.5,
            ..Default::default()
        };
        assert!((settings.max_possible_height() - 1.75).abs() < 1e-6);
    }

    #[test]
    fn test_min_max_height() {
        let settings = HeightMapSettings {
            height_multiplier: 10.0,
            height_curve: Curve::new(vec![Keyframe::new(0.0, 0.1), Keyframe::new(1.0, 0.9)]).unwrap(),
            ..Default::default()
        };
        assert!((settings.min_height() - 1.0).abs() < 1e-5);
        assert!((settings.max_height() - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_non_monotonic_height_curve_rejected() {
        let settings = HeightMapSettings {
            height_curve: Curve::new(vec![
                Keyframe::new(0.0, 0.0),
                Keyframe::new(0.5, 1.0),
                Keyframe::new(1.0, 0.5),
            ])
            .unwrap(),
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_default_curves_are_valid() {
        let settings = HeightMapSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.height_curve.keys().len(), 4);
        assert_eq!(settings.falloff_curve.keys().len(), 3);
    }

    #[test]
    fn test_num_verts_per_line() {
        let mut settings = MeshSettings {
            chunk_size_index: 0,
            ..Default::default()
        };
        assert_eq!(settings.num_verts_per_line(), 53);
        assert_eq!(settings.mesh_world_size(), 50.0);

        settings.chunk_size_index = 8;
        assert_eq!(settings.num_verts_per_line(), 245);

        settings.use_flat_shading = true;
        settings.flat_shaded_chunk_size_index = 1;
        assert_eq!(settings.num_verts_per_line(), 77);

        settings.terrain_scale = 2.0;
        assert_eq!(settings.mesh_world_size(), 148.0);
    }

    #[test]
    fn test_mesh_settings_validation() {
        assert!(MeshSettings::default().validate().is_ok());

        let bad_index = MeshSettings {
            chunk_size_index: 9,
            ..Default::default()
        };
        assert!(bad_index.validate().is_err());

        let bad_flat = MeshSettings {
            flat_shaded_chunk_size_index: 3,
            ..Default::default()
        };
        assert!(bad_flat.validate().is_err());

        let bad_scale = MeshSettings {
            terrain_scale: 0.0,
            ..Default::default()
        };
        assert!(bad_scale.validate().is_err());
    }

    #[test]
    fn test_every_size_fits_every_lod() {
        for size in SUPPORTED_CHUNK_SIZES {
            for lod in 0..=MAX_LOD {
                let skip = if lod == 0 { 1 } else { lod as usize * 2 };
                assert_eq!(size % skip, 0, "size {} lod {}", size, lod);
            }
        }
    }
}
