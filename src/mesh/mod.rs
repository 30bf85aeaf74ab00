//! LOD terrain meshes with seam stitching and baked normals

pub mod layout;
pub use layout::{skip_increment, MeshLayout, VertexKind};

pub mod data;
pub use data::{MeshData, VertexRef};

pub mod generator;
pub use generator::{generate_terrain_mesh, TerrainMesher};

/// Highest level of detail the mesher accepts (skip increment 8).
pub const MAX_LOD: u32 = 4;
