//! Mesh buffers and the builder that bakes their normals

use glam::{Vec2, Vec3};

use super::layout::MeshLayout;

/// Address of a vertex in one of the two construction buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexRef {
    /// Rendered vertex, index into the mesh buffers.
    Mesh(usize),
    /// Skirt vertex, only used to light the mesh edge.
    OutOfMesh(usize),
}

/// Final renderable mesh for one chunk at one LOD.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    normals: Vec<Vec3>,
    flat_shaded: bool,
}

impl MeshData {
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Triangle list, three indices per triangle.
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn is_flat_shaded(&self) -> bool {
        self.flat_shaded
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Min and max corner of the vertex positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    /// Raw position bytes for a vertex buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn uv_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }
}

/// Accumulates vertices and triangles while a mesh is generated.
///
/// Triangles that touch an out-of-mesh vertex go into the skirt list; they
/// feed smooth normals and are dropped afterwards.
pub(crate) struct MeshBuilder {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    out_of_mesh_vertices: Vec<Vec3>,
    out_of_mesh_triangles: Vec<[VertexRef; 3]>,
    use_flat_shading: bool,
}

impl MeshBuilder {
    pub(crate) fn new(layout: &MeshLayout, use_flat_shading: bool) -> Self {
        let mesh_vertices = layout.num_mesh_vertices();
        Self {
            vertices: vec![Vec3::ZERO; mesh_vertices],
            uvs: vec![Vec2::ZERO; mesh_vertices],
            triangles: Vec::with_capacity(layout.num_mesh_triangles() * 3),
            out_of_mesh_vertices: vec![Vec3::ZERO; layout.num_out_of_mesh_vertices()],
            out_of_mesh_triangles: Vec::with_capacity(layout.num_out_of_mesh_triangles()),
            use_flat_shading,
        }
    }

    pub(crate) fn add_vertex(&mut self, position: Vec3, uv: Vec2, index: VertexRef) {
        match index {
            VertexRef::Mesh(i) => {
                self.vertices[i] = position;
                self.uvs[i] = uv;
            }
            VertexRef::OutOfMesh(i) => self.out_of_mesh_vertices[i] = position,
        }
    }

    pub(crate) fn add_triangle(&mut self, a: VertexRef, b: VertexRef, c: VertexRef) {
        match (a, b, c) {
            (VertexRef::Mesh(a), VertexRef::Mesh(b), VertexRef::Mesh(c)) => {
                self.triangles.extend([a as u32, b as u32, c as u32]);
            }
            _ => self.out_of_mesh_triangles.push([a, b, c]),
        }
    }

    #[inline]
    fn position(&self, index: VertexRef) -> Vec3 {
        match index {
            VertexRef::Mesh(i) => self.vertices[i],
            VertexRef::OutOfMesh(i) => self.out_of_mesh_vertices[i],
        }
    }

    /// Unnormalized face normal; its length is twice the triangle area.
    #[inline]
    fn face_normal(&self, a: VertexRef, b: VertexRef, c: VertexRef) -> Vec3 {
        let pa = self.position(a);
        (self.position(b) - pa).cross(self.position(c) - pa)
    }

    /// Bake normals (or flat shade) and drop the skirt.
    pub(crate) fn finish(self) -> MeshData {
        if self.use_flat_shading {
            self.flat_shade()
        } else {
            self.bake_normals()
        }
    }

    fn bake_normals(self) -> MeshData {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.triangles.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| VertexRef::Mesh(i as usize));
            let normal = self.face_normal(a, b, c);
            for i in tri {
                normals[*i as usize] += normal;
            }
        }

        for &[a, b, c] in &self.out_of_mesh_triangles {
            let normal = self.face_normal(a, b, c);
            for corner in [a, b, c] {
                if let VertexRef::Mesh(i) = corner {
                    normals[i] += normal;
                }
            }
        }

        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }

        MeshData {
            vertices: self.vertices,
            uvs: self.uvs,
            triangles: self.triangles,
            normals,
            flat_shaded: false,
        }
    }

    /// Give every triangle corner its own vertex so faces light independently.
    fn flat_shade(self) -> MeshData {
        let corner_count = self.triangles.len();
        let mut vertices = Vec::with_capacity(corner_count);
        let mut uvs = Vec::with_capacity(corner_count);
        let mut normals = Vec::with_capacity(corner_count);

        for tri in self.triangles.chunks_exact(3) {
            let corners = [tri[0], tri[1], tri[2]].map(|i| i as usize);
            let [a, b, c] = corners.map(|i| self.vertices[i]);
            let normal = (b - a).cross(c - a).normalize_or_zero();
            for i in corners {
                vertices.push(self.vertices[i]);
                uvs.push(self.uvs[i]);
                normals.push(normal);
            }
        }

        MeshData {
            vertices,
            uvs,
            triangles: (0..corner_count as u32).collect(),
            normals,
            flat_shaded: true,
        }
    }
}
