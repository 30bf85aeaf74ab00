//! Height field to LOD terrain mesh

use glam::{Vec2, Vec3};

use super::data::{MeshBuilder, MeshData, VertexRef};
use super::layout::{MeshLayout, VertexKind};
use crate::core::{Error, Result};
use crate::terrain::height_field::HeightField;
use crate::terrain::settings::MeshSettings;

/// Generate the mesh for a chunk height field at a level of detail.
///
/// The field must be `num_verts_per_line` square for `settings`, and the
/// settings must pass [`MeshSettings::validate`].
pub fn generate_terrain_mesh(
    height_field: &HeightField,
    level_of_detail: u32,
    settings: &MeshSettings,
) -> Result<MeshData> {
    settings.validate()?;
    let layout = MeshLayout::new(settings.num_verts_per_line(), level_of_detail)?;
    TerrainMesher::new(layout, settings.mesh_world_size(), settings.use_flat_shading).build(height_field)
}

/// Triangulates height fields for one layout.
#[derive(Clone, Copy, Debug)]
pub struct TerrainMesher {
    layout: MeshLayout,
    mesh_world_size: f32,
    use_flat_shading: bool,
}

impl TerrainMesher {
    pub fn new(layout: MeshLayout, mesh_world_size: f32, use_flat_shading: bool) -> Self {
        Self {
            layout,
            mesh_world_size,
            use_flat_shading,
        }
    }

    pub fn layout(&self) -> &MeshLayout {
        &self.layout
    }

    pub fn build(&self, height_field: &HeightField) -> Result<MeshData> {
        let n = self.layout.num_verts_per_line();
        if height_field.width() != n || height_field.height() != n {
            return Err(Error::ShapeMismatch {
                expected: n,
                width: height_field.width(),
                height: height_field.height(),
            });
        }

        let index_map = self.index_map();
        let mut builder = MeshBuilder::new(&self.layout, self.use_flat_shading);
        let top_left = Vec2::new(-1.0, 1.0) * self.mesh_world_size / 2.0;

        for y in 0..n {
            for x in 0..n {
                let kind = self.layout.kind(x, y);
                let Some(index) = index_map[y * n + x] else {
                    continue;
                };

                let uv = self.layout.uv(x, y);
                let position_2d = top_left + Vec2::new(uv.x, -uv.y) * self.mesh_world_size;
                let height = if kind == VertexKind::EdgeConnection {
                    self.connection_height(height_field, x, y)
                } else {
                    height_field.get(x, y)
                };

                builder.add_vertex(Vec3::new(position_2d.x, height, position_2d.y), uv, index);

                if self.layout.emits_quad(x, y, kind) {
                    let step = self.layout.active_increment(x, y, kind);
                    let corners = [
                        index_map[y * n + x],
                        index_map[y * n + x + step],
                        index_map[(y + step) * n + x],
                        index_map[(y + step) * n + x + step],
                    ];
                    if let [Some(a), Some(b), Some(c), Some(d)] = corners {
                        builder.add_triangle(a, d, c);
                        builder.add_triangle(d, a, b);
                    } else {
                        debug_assert!(false, "quad at ({}, {}) touches a skipped cell", x, y);
                    }
                }
            }
        }

        Ok(builder.finish())
    }

    /// Index every non-skipped cell in row-major order.
    ///
    /// Rendered vertices and out-of-mesh vertices are numbered separately.
    fn index_map(&self) -> Vec<Option<VertexRef>> {
        let n = self.layout.num_verts_per_line();
        let mut map = Vec::with_capacity(n * n);
        let mut mesh_index = 0;
        let mut out_of_mesh_index = 0;

        for y in 0..n {
            for x in 0..n {
                let entry = match self.layout.kind(x, y) {
                    VertexKind::Skipped => None,
                    VertexKind::OutOfMesh => {
                        out_of_mesh_index += 1;
                        Some(VertexRef::OutOfMesh(out_of_mesh_index - 1))
                    }
                    _ => {
                        mesh_index += 1;
                        Some(VertexRef::Mesh(mesh_index - 1))
                    }
                };
                map.push(entry);
            }
        }
        map
    }

    /// Height of an edge-connection vertex, interpolated between the main
    /// vertices either side along its ring so it lies on the coarse edge.
    fn connection_height(&self, height_field: &HeightField, x: usize, y: usize) -> f32 {
        let n = self.layout.num_verts_per_line();
        let skip = self.layout.skip_increment();
        let vertical = x == 2 || x == n - 3;

        let along = if vertical { y - 2 } else { x - 2 };
        let to_a = along % skip;
        let to_b = skip - to_a;
        let t = to_a as f32 / skip as f32;

        let (height_a, height_b) = if vertical {
            (height_field.get(x, y - to_a), height_field.get(x, y + to_b))
        } else {
            (height_field.get(x - to_a, y), height_field.get(x + to_b, y))
        };
        height_a * (1.0 - t) + height_b * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MAX_LOD;
    use crate::terrain::height_map::generate_height_map;
    use crate::terrain::settings::{HeightMapSettings, NoiseSettings, NormalizeMode};

    fn small_settings(flat: bool) -> MeshSettings {
        MeshSettings {
            chunk_size_index: 0,
            flat_shaded_chunk_size_index: 0,
            use_flat_shading: flat,
            ..Default::default()
        }
    }

    fn field_from(n: usize, f: impl Fn(usize, usize) -> f32) -> HeightField {
        let mut values = Vec::with_capacity(n * n);
        for y in 0..n {
            for x in 0..n {
                values.push(f(x, y));
            }
        }
        HeightField::from_values(n, n, values).unwrap()
    }

    fn noisy_field(n: usize, center: Vec2) -> HeightField {
        let settings = HeightMapSettings {
            noise: NoiseSettings {
                normalize_mode: NormalizeMode::Global,
                seed: 3,
                scale: 25.0,
                ..Default::default()
            },
            height_multiplier: 12.0,
            ..Default::default()
        };
        generate_height_map(n, n, &settings, center)
    }

    fn find_vertex(mesh: &MeshData, x: f32, z: f32) -> Option<Vec3> {
        mesh.vertices()
            .iter()
            .copied()
            .find(|v| (v.x - x).abs() < 1e-3 && (v.z - z).abs() < 1e-3)
    }

    #[test]
    fn test_vertex_and_triangle_counts() {
        let settings = small_settings(false);
        let field = noisy_field(53, Vec2::ZERO);
        for lod in 0..=MAX_LOD {
            let mesh = generate_terrain_mesh(&field, lod, &settings).unwrap();
            let layout = MeshLayout::new(53, lod).unwrap();
            assert_eq!(mesh.vertex_count(), layout.num_mesh_vertices(), "lod {}", lod);
            assert_eq!(mesh.triangle_count(), layout.num_mesh_triangles(), "lod {}", lod);
            assert_eq!(mesh.normals().len(), mesh.vertex_count());
            assert_eq!(mesh.uvs().len(), mesh.vertex_count());
        }
    }

    #[test]
    fn test_flat_shaded_counts() {
        let settings = small_settings(true);
        let field = noisy_field(53, Vec2::ZERO);
        for lod in [0, 2, 4] {
            let mesh = generate_terrain_mesh(&field, lod, &settings).unwrap();
            assert!(mesh.is_flat_shaded());
            assert_eq!(mesh.vertex_count(), 3 * (mesh.triangles().len() / 3));
            assert!(mesh.triangles().iter().enumerate().all(|(i, &t)| t as usize == i));
        }
    }

    #[test]
    fn test_normals_are_unit_length() {
        let field = noisy_field(53, Vec2::ZERO);
        for flat in [false, true] {
            let mesh = generate_terrain_mesh(&field, 1, &small_settings(flat)).unwrap();
            for normal in mesh.normals() {
                assert!((normal.length() - 1.0).abs() < 1e-4, "{:?}", normal);
            }
        }
    }

    #[test]
    fn test_flat_field_faces_up() {
        let field = field_from(53, |_, _| 3.0);
        let mesh = generate_terrain_mesh(&field, 2, &small_settings(false)).unwrap();
        for normal in mesh.normals() {
            assert!((*normal - Vec3::Y).length() < 1e-5);
        }
        assert!(mesh.vertices().iter().all(|v| v.y == 3.0));
    }

    #[test]
    fn test_mesh_is_centered() {
        let field = field_from(53, |_, _| 0.0);
        let mesh = generate_terrain_mesh(&field, 0, &small_settings(false)).unwrap();
        let (lo, hi) = mesh.bounds().unwrap();
        assert!((lo.x + 25.0).abs() < 1e-4 && (hi.x - 25.0).abs() < 1e-4);
        assert!((lo.z + 25.0).abs() < 1e-4 && (hi.z - 25.0).abs() < 1e-4);
        assert!(mesh.uvs().iter().all(|uv| uv.x >= 0.0 && uv.x <= 1.0 && uv.y >= 0.0 && uv.y <= 1.0));
    }

    #[test]
    fn test_lod_zero_samples_every_cell() {
        let field = field_from(53, |x, y| (x * 7 + y * 3) as f32 * 0.1);
        let mesh = generate_terrain_mesh(&field, 0, &small_settings(false)).unwrap();
        assert_eq!(mesh.vertex_count(), 51 * 51);

        // Row-major over the rendered cells (1..=51), heights are the raw samples.
        for (i, vertex) in mesh.vertices().iter().enumerate() {
            let x = i % 51 + 1;
            let y = i / 51 + 1;
            assert_eq!(vertex.y, field.get(x, y));
            assert!((vertex.x - (x as f32 - 26.0)).abs() < 1e-4);
            assert!((vertex.z - (26.0 - y as f32)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_edge_connection_heights_are_interpolated() {
        // Quadratic in x so interpolation differs from the raw sample.
        let field = field_from(53, |x, _| (x * x) as f32);
        let mesh = generate_terrain_mesh(&field, 2, &small_settings(false)).unwrap();

        // Cell (3, 2) sits a quarter of the way from main (2, 2) to main (6, 2).
        let vertex = find_vertex(&mesh, 3.0 - 26.0, 26.0 - 2.0).unwrap();
        let expected = 4.0 * 0.75 + 36.0 * 0.25;
        assert!((vertex.y - expected).abs() < 1e-4);
        assert_ne!(vertex.y, field.get(3, 2));

        // Mesh-edge cells keep raw samples.
        let edge = find_vertex(&mesh, 3.0 - 26.0, 26.0 - 1.0).unwrap();
        assert_eq!(edge.y, field.get(3, 1));
    }

    #[test]
    fn test_vertical_connection_heights() {
        let field = field_from(53, |_, y| (y * y) as f32);
        let mesh = generate_terrain_mesh(&field, 1, &small_settings(false)).unwrap();

        // Cell (50, 3) on the right connection column, halfway between rows 2 and 4.
        let vertex = find_vertex(&mesh, 50.0 - 26.0, 26.0 - 3.0).unwrap();
        assert!((vertex.y - (4.0 + 16.0) / 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_lod_edges_share_positions() {
        let field = noisy_field(53, Vec2::ZERO);
        let fine = generate_terrain_mesh(&field, 0, &small_settings(false)).unwrap();
        let coarse = generate_terrain_mesh(&field, 4, &small_settings(false)).unwrap();

        let edge = |v: &&Vec3| (v.x.abs() - 25.0).abs() < 1e-4 || (v.z.abs() - 25.0).abs() < 1e-4;
        let mut fine_edge: Vec<Vec3> = fine.vertices().iter().filter(edge).copied().collect();
        let mut coarse_edge: Vec<Vec3> = coarse.vertices().iter().filter(edge).copied().collect();
        let key = |v: &Vec3| (v.x.to_bits(), v.z.to_bits());
        fine_edge.sort_by_key(key);
        coarse_edge.sort_by_key(key);
        assert_eq!(fine_edge, coarse_edge);
    }

    #[test]
    fn test_adjacent_chunks_meet() {
        let settings = small_settings(false);
        let n = settings.num_verts_per_line();
        let size = settings.mesh_world_size();

        let left_field = noisy_field(n, Vec2::ZERO);
        let right_field = noisy_field(n, Vec2::new(size / settings.terrain_scale, 0.0));

        for y in 0..n {
            assert!((left_field.get(n - 2, y) - right_field.get(1, y)).abs() < 1e-4);
        }

        let left = generate_terrain_mesh(&left_field, 0, &settings).unwrap();
        let right = generate_terrain_mesh(&right_field, 3, &settings).unwrap();

        let mut matched = 0;
        for v in left.vertices().iter().filter(|v| (v.x - size / 2.0).abs() < 1e-4) {
            // The right chunk sits one mesh width along +X.
            let other = find_vertex(&right, v.x - size, v.z).unwrap();
            assert!((other.y - v.y).abs() < 1e-4, "seam at z={}", v.z);
            matched += 1;
        }
        assert_eq!(matched, n - 2);
    }

    #[test]
    fn test_adjacent_chunks_meet_along_z() {
        let settings = small_settings(false);
        let n = settings.num_verts_per_line();
        let size = settings.mesh_world_size();

        // Chunk (0, 1) lies along +Z; its bottom border is the origin chunk's top border.
        let near_field = noisy_field(n, Vec2::ZERO);
        let far_field = noisy_field(n, Vec2::new(0.0, size / settings.terrain_scale));

        for x in 0..n {
            assert!((near_field.get(x, 1) - far_field.get(x, n - 2)).abs() < 1e-4);
        }

        let near = generate_terrain_mesh(&near_field, 2, &settings).unwrap();
        let far = generate_terrain_mesh(&far_field, 0, &settings).unwrap();

        let mut matched = 0;
        for v in near.vertices().iter().filter(|v| (v.z - size / 2.0).abs() < 1e-4) {
            let other = find_vertex(&far, v.x, v.z - size).unwrap();
            assert!((other.y - v.y).abs() < 1e-4, "seam at x={}", v.x);
            matched += 1;
        }
        assert_eq!(matched, n - 2);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let field = field_from(245, |_, _| 0.0);
        // Would otherwise read as the largest size, which this field matches.
        let settings = MeshSettings {
            chunk_size_index: 12,
            ..small_settings(false)
        };
        assert!(matches!(
            generate_terrain_mesh(&field, 0, &settings),
            Err(Error::Config(_))
        ));

        let settings = MeshSettings {
            terrain_scale: -1.0,
            ..small_settings(false)
        };
        let field = field_from(53, |_, _| 0.0);
        assert!(matches!(
            generate_terrain_mesh(&field, 0, &settings),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let field = field_from(40, |_, _| 0.0);
        let err = generate_terrain_mesh(&field, 0, &small_settings(false)).unwrap_err();
        match err {
            Error::ShapeMismatch { expected, width, height } => {
                assert_eq!(expected, 53);
                assert_eq!(width, 40);
                assert_eq!(height, 40);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_invalid_lod() {
        let field = field_from(53, |_, _| 0.0);
        assert!(matches!(
            generate_terrain_mesh(&field, MAX_LOD + 1, &small_settings(false)),
            Err(Error::InvalidLevelOfDetail(_))
        ));
    }

    #[test]
    fn test_custom_layout() {
        let layout = MeshLayout::new(12, 0).unwrap();
        let mesher = TerrainMesher::new(layout, 9.0, false);
        let field = field_from(12, |x, y| (x + y) as f32);
        let mesh = mesher.build(&field).unwrap();
        assert_eq!(mesh.vertex_count(), 100);
        assert_eq!(mesh.triangle_count(), layout.num_mesh_triangles());
    }
}
