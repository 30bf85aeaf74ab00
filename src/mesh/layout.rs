//! Vertex zones and closed-form counts for one chunk size and LOD
//!
//! A chunk's height field has `n = num_verts_per_line` samples per side,
//! split into rings from the outside in:
//!
//! - ring 0: out-of-mesh vertices, only used to light the edge correctly
//! - ring 1: mesh-edge vertices, always full resolution so neighbours at any
//!   LOD meet without cracks
//! - ring 2: edge-connection vertices, full resolution but with heights
//!   interpolated between the main vertices either side
//! - interior: main vertices every `skip_increment` cells; everything in
//!   between is skipped

use glam::Vec2;

use super::MAX_LOD;
use crate::core::{Error, Result};
use crate::terrain::settings::CHUNK_PADDING;

/// Grid step between main vertices at a level of detail.
pub fn skip_increment(level_of_detail: u32) -> usize {
    if level_of_detail == 0 {
        1
    } else {
        level_of_detail as usize * 2
    }
}

/// What a height-field cell turns into at a given LOD.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexKind {
    OutOfMesh,
    MeshEdge,
    EdgeConnection,
    Main,
    Skipped,
}

/// Derived layout for `(num_verts_per_line, skip_increment)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshLayout {
    num_verts_per_line: usize,
    skip_increment: usize,
}

impl MeshLayout {
    pub fn new(num_verts_per_line: usize, level_of_detail: u32) -> Result<Self> {
        if level_of_detail > MAX_LOD {
            return Err(Error::InvalidLevelOfDetail(level_of_detail));
        }
        let skip = skip_increment(level_of_detail);

        if num_verts_per_line <= CHUNK_PADDING {
            return Err(Error::Config(format!(
                "{} vertices per line cannot hold border, edge and connection rings (need more than {})",
                num_verts_per_line, CHUNK_PADDING
            )));
        }
        if (num_verts_per_line - CHUNK_PADDING) % skip != 0 {
            return Err(Error::Config(format!(
                "{} vertices per line is not compatible with LOD {} (interior span {} is not a multiple of {})",
                num_verts_per_line,
                level_of_detail,
                num_verts_per_line - CHUNK_PADDING,
                skip
            )));
        }

        Ok(Self {
            num_verts_per_line,
            skip_increment: skip,
        })
    }

    pub fn num_verts_per_line(&self) -> usize {
        self.num_verts_per_line
    }

    pub fn skip_increment(&self) -> usize {
        self.skip_increment
    }

    /// Classify cell `(x, y)`.
    pub fn kind(&self, x: usize, y: usize) -> VertexKind {
        let n = self.num_verts_per_line;
        let s = self.skip_increment;

        if x == 0 || y == 0 || x == n - 1 || y == n - 1 {
            return VertexKind::OutOfMesh;
        }
        if x == 1 || y == 1 || x == n - 2 || y == n - 2 {
            return VertexKind::MeshEdge;
        }
        // x and y are >= 2 from here on.
        if (x - 2) % s == 0 && (y - 2) % s == 0 {
            return VertexKind::Main;
        }
        if x == 2 || y == 2 || x == n - 3 || y == n - 3 {
            return VertexKind::EdgeConnection;
        }
        VertexKind::Skipped
    }

    /// UV of a cell: its fraction of the rendered span (rings 1 to n-2).
    pub fn uv(&self, x: usize, y: usize) -> Vec2 {
        let span = (self.num_verts_per_line - 3) as f32;
        Vec2::new((x as f32 - 1.0) / span, (y as f32 - 1.0) / span)
    }

    /// Whether the quad whose top-left corner is `(x, y)` is emitted from this cell.
    ///
    /// Edge-connection cells on the first interior row and column are covered by
    /// the main quads to their right and below, so they emit nothing.
    pub fn emits_quad(&self, x: usize, y: usize, kind: VertexKind) -> bool {
        let n = self.num_verts_per_line;
        if kind == VertexKind::Skipped || x >= n - 1 || y >= n - 1 {
            return false;
        }
        kind != VertexKind::EdgeConnection || (x != 2 && y != 2)
    }

    /// Quad size for the quad anchored at `(x, y)`.
    ///
    /// Main vertices tile the interior at LOD resolution; everything else,
    /// including main vertices on the last interior line, tiles at one cell.
    pub fn active_increment(&self, x: usize, y: usize, kind: VertexKind) -> usize {
        let n = self.num_verts_per_line;
        if kind == VertexKind::Main && x != n - 3 && y != n - 3 {
            self.skip_increment
        } else {
            1
        }
    }

    pub fn num_out_of_mesh_vertices(&self) -> usize {
        self.num_verts_per_line * 4 - 4
    }

    pub fn num_mesh_edge_vertices(&self) -> usize {
        (self.num_verts_per_line - 2) * 4 - 4
    }

    pub fn num_edge_connection_vertices(&self) -> usize {
        (self.skip_increment - 1) * (self.num_verts_per_line - 5) / self.skip_increment * 4
    }

    pub fn num_main_vertices_per_line(&self) -> usize {
        (self.num_verts_per_line - 5) / self.skip_increment + 1
    }

    pub fn num_main_vertices(&self) -> usize {
        let per_line = self.num_main_vertices_per_line();
        per_line * per_line
    }

    /// Rendered vertices before flat shading.
    pub fn num_mesh_vertices(&self) -> usize {
        self.num_mesh_edge_vertices() + self.num_edge_connection_vertices() + self.num_main_vertices()
    }

    /// Rendered triangles.
    pub fn num_mesh_triangles(&self) -> usize {
        let edge_triangles = 8 * (self.num_verts_per_line - 4);
        let main_quads = self.num_main_vertices_per_line() - 1;
        edge_triangles + main_quads * main_quads * 2
    }

    /// Skirt triangles touching at least one out-of-mesh vertex.
    pub fn num_out_of_mesh_triangles(&self) -> usize {
        8 * (self.num_verts_per_line - 2)
    }
}
