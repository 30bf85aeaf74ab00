//! JSON configuration for a streamed terrain

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::settings::{HeightMapSettings, MeshSettings};
use crate::core::{Error, Result};
use crate::streaming::lod::{
    default_detail_levels, max_view_distance, validate_detail_levels, LodInfo,
};

/// Everything needed to generate and stream a terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub height_map: HeightMapSettings,
    pub mesh: MeshSettings,
    /// Detail table, thresholds strictly increasing.
    pub detail_levels: Vec<LodInfo>,
    /// Row of `detail_levels` whose mesh doubles as the collision mesh.
    pub collider_lod_index: usize,
    /// Worker threads for background generation (0 = one per core).
    pub worker_threads: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_map: HeightMapSettings::default(),
            mesh: MeshSettings::default(),
            detail_levels: default_detail_levels(),
            collider_lod_index: 0,
            worker_threads: 0,
        }
    }
}

impl TerrainConfig {
    /// Load and validate a config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded terrain config from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.height_map.validate()?;
        self.mesh.validate()?;
        validate_detail_levels(&self.detail_levels, self.collider_lod_index)?;

        let view_distance = self.max_view_distance();
        if view_distance <= 0.0 {
            return Err(Error::Config(format!(
                "maximum view distance must be positive, got {}",
                view_distance
            )));
        }
        Ok(())
    }

    pub fn max_view_distance(&self) -> f32 {
        max_view_distance(&self.detail_levels)
    }

    /// Chunks visible in each direction from the viewer's chunk.
    pub fn chunks_visible_in_view_dst(&self) -> i32 {
        (self.max_view_distance() / self.mesh.mesh_world_size()).round() as i32
    }
}
