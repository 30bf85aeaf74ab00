//! Navigability statistics over a finished chunk mesh
//!
//! Summarises how walkable and how wet a generated chunk is. Parameter search
//! over the noise settings scores candidate terrain with these numbers.

use glam::Vec3;

use crate::mesh::MeshData;

/// Default steepest walkable slope in degrees.
pub const DEFAULT_MAX_WALKABLE_SLOPE: f32 = 45.0;

/// Per-chunk terrain statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerrainSurvey {
    /// Average of the vertex normals (not renormalized).
    pub mean_normal: Vec3,
    /// Fraction of vertices whose slope is at most the walkable limit.
    pub walkable_fraction: f32,
    /// Fraction of vertices below the water level.
    pub water_fraction: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub vertex_count: usize,
}

impl TerrainSurvey {
    /// Survey `mesh` against a water level and walkable slope (degrees).
    pub fn from_mesh(mesh: &MeshData, water_level: f32, max_walkable_slope: f32) -> Self {
        let count = mesh.vertex_count();
        if count == 0 {
            return Self::default();
        }

        // A normal's angle from vertical is the surface slope.
        let min_up = max_walkable_slope.to_radians().cos();

        let mut normal_sum = Vec3::ZERO;
        let mut walkable = 0usize;
        for normal in mesh.normals() {
            normal_sum += *normal;
            if normal.y >= min_up {
                walkable += 1;
            }
        }

        let mut underwater = 0usize;
        let mut min_height = f32::INFINITY;
        let mut max_height = f32::NEG_INFINITY;
        for vertex in mesh.vertices() {
            if vertex.y < water_level {
                underwater += 1;
            }
            min_height = min_height.min(vertex.y);
            max_height = max_height.max(vertex.y);
        }

        Self {
            mean_normal: normal_sum / count as f32,
            walkable_fraction: walkable as f32 / count as f32,
            water_fraction: underwater as f32 / count as f32,
            min_height,
            max_height,
            vertex_count: count,
        }
    }

    /// Average several chunk surveys, weighting each by its vertex count.
    pub fn combine(surveys: &[TerrainSurvey]) -> Self {
        let total: usize = surveys.iter().map(|s| s.vertex_count).sum();
        if total == 0 {
            return Self::default();
        }

        let mut combined = Self {
            min_height: f32::INFINITY,
            max_height: f32::NEG_INFINITY,
            vertex_count: total,
            ..Default::default()
        };
        for survey in surveys.iter().filter(|s| s.vertex_count > 0) {
            let weight = survey.vertex_count as f32 / total as f32;
            combined.mean_normal += survey.mean_normal * weight;
            combined.walkable_fraction += survey.walkable_fraction * weight;
            combined.water_fraction += survey.water_fraction * weight;
            combined.min_height = combined.min_height.min(survey.min_height);
            combined.max_height = combined.max_height.max(survey.max_height);
        }
        combined
    }
}
