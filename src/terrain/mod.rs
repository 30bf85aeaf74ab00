//! Procedural terrain height maps

pub mod curve;
pub use curve::{Curve, Interpolation, Keyframe};

pub mod settings;
pub use settings::{
    HeightMapSettings, MeshSettings, NoiseSettings, NormalizeMode,
    NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES, SUPPORTED_CHUNK_SIZES,
};

pub mod height_field;
pub use height_field::HeightField;

pub mod noise_field;
pub use noise_field::{generate_noise_map, NoiseField};

pub mod falloff;
pub use falloff::{generate_falloff_map, generate_falloff_mask};

pub mod height_map;
pub use height_map::generate_height_map;

pub mod survey;
pub use survey::TerrainSurvey;

pub mod config;
pub use config::TerrainConfig;
