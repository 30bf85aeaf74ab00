//! Per-chunk streaming state: height map, LOD meshes, visibility

use std::fmt;
use std::sync::Arc;

use glam::Vec2;

use super::lod::{max_view_distance, select_lod_index, LodInfo};
use crate::mesh::MeshData;
use crate::terrain::{HeightField, MeshSettings};

/// Integer chunk coordinate on the XZ plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk whose center is nearest to a world XZ position.
    pub fn containing(position: Vec2, mesh_world_size: f32) -> Self {
        Self {
            x: (position.x / mesh_world_size).round() as i32,
            y: (position.y / mesh_world_size).round() as i32,
        }
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Generation state of one resource.
#[derive(Clone, Debug)]
pub enum Slot<T> {
    Empty,
    /// Requested; only the result carrying this ticket is accepted.
    Requested(u64),
    Ready(Arc<T>),
}

impl<T> Slot<T> {
    pub fn ready(&self) -> Option<&Arc<T>> {
        match self {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    /// Store `value` if it answers the outstanding request.
    fn fill(&mut self, ticket: u64, value: T) -> bool {
        match self {
            Slot::Requested(expected) if *expected == ticket => {
                *self = Slot::Ready(Arc::new(value));
                true
            }
            _ => false,
        }
    }

    /// Forget the outstanding request so the resource is asked for again.
    fn release(&mut self, ticket: u64) -> bool {
        match self {
            Slot::Requested(expected) if *expected == ticket => {
                *self = Slot::Empty;
                true
            }
            _ => false,
        }
    }
}

/// One streamed terrain chunk.
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    /// World XZ position of the chunk center.
    position: Vec2,
    /// Noise-space center the height map is sampled around.
    sample_center: Vec2,
    mesh_world_size: f32,
    height_map: Slot<HeightField>,
    /// One slot per row of the detail table.
    lod_meshes: Vec<Slot<MeshData>>,
    displayed_lod_index: Option<usize>,
    collider_set: bool,
    visible: bool,
}

impl TerrainChunk {
    pub fn new(coord: ChunkCoord, mesh_settings: &MeshSettings, num_detail_levels: usize) -> Self {
        let mesh_world_size = mesh_settings.mesh_world_size();
        Self {
            coord,
            position: coord.as_vec2() * mesh_world_size,
            sample_center: coord.as_vec2() * mesh_world_size / mesh_settings.terrain_scale,
            mesh_world_size,
            height_map: Slot::Empty,
            lod_meshes: vec![Slot::Empty; num_detail_levels],
            displayed_lod_index: None,
            collider_set: false,
            visible: false,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn sample_center(&self) -> Vec2 {
        self.sample_center
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn height_map(&self) -> Option<&Arc<HeightField>> {
        self.height_map.ready()
    }

    pub fn displayed_lod_index(&self) -> Option<usize> {
        self.displayed_lod_index
    }

    /// Mesh currently shown for this chunk.
    pub fn displayed_mesh(&self) -> Option<&Arc<MeshData>> {
        self.displayed_lod_index
            .and_then(|i| self.lod_meshes.get(i))
            .and_then(Slot::ready)
    }

    pub fn lod_mesh(&self, index: usize) -> Option<&Arc<MeshData>> {
        self.lod_meshes.get(index).and_then(Slot::ready)
    }

    /// Whether the collision mesh has been assigned.
    pub fn has_collider(&self) -> bool {
        self.collider_set
    }

    /// Squared distance from `viewer` to the nearest point of the chunk square.
    pub fn sqr_distance_to(&self, viewer: Vec2) -> f32 {
        let half = Vec2::splat(self.mesh_world_size * 0.5);
        let delta = ((viewer - self.position).abs() - half).max(Vec2::ZERO);
        delta.length_squared()
    }

    /// No height map is built or on its way.
    pub(crate) fn needs_height_map(&self) -> bool {
        self.height_map.is_empty()
    }

    pub(crate) fn height_map_requested(&mut self, ticket: u64) {
        self.height_map = Slot::Requested(ticket);
    }

    pub(crate) fn mesh_requested(&mut self, index: usize, ticket: u64) {
        if let Some(slot) = self.lod_meshes.get_mut(index) {
            *slot = Slot::Requested(ticket);
        }
    }

    /// Accept a finished height map. `false` if the ticket is stale.
    pub(crate) fn receive_height_map(&mut self, ticket: u64, field: HeightField) -> bool {
        self.height_map.fill(ticket, field)
    }

    /// Accept a finished LOD mesh. `false` if the ticket is stale.
    pub(crate) fn receive_mesh(&mut self, index: usize, ticket: u64, mesh: MeshData) -> bool {
        self.lod_meshes
            .get_mut(index)
            .is_some_and(|slot| slot.fill(ticket, mesh))
    }

    /// Reset whichever slot is waiting on `ticket` after its job failed.
    ///
    /// The next [`update`](Self::update) requests it again. `false` if no slot
    /// was waiting on the ticket.
    pub(crate) fn request_failed(&mut self, ticket: u64) -> bool {
        if self.height_map.release(ticket) {
            return true;
        }
        self.lod_meshes.iter_mut().any(|slot| slot.release(ticket))
    }

    /// Re-evaluate visibility and the wanted LOD for `viewer`.
    ///
    /// Swaps in the wanted LOD mesh if it is already built and returns the LOD
    /// indices that still need a mesh request. Nothing happens before the
    /// height map has arrived.
    pub(crate) fn update(
        &mut self,
        viewer: Vec2,
        detail_levels: &[LodInfo],
        collider_lod_index: usize,
    ) -> Vec<usize> {
        let mut wanted = Vec::new();
        if self.height_map.ready().is_none() {
            return wanted;
        }

        let sqr_dst = self.sqr_distance_to(viewer);
        let dst = sqr_dst.sqrt();
        self.visible = dst <= max_view_distance(detail_levels);

        if self.visible {
            let lod_index = select_lod_index(detail_levels, dst);
            if self.displayed_lod_index != Some(lod_index) {
                match &self.lod_meshes[lod_index] {
                    Slot::Ready(_) => self.displayed_lod_index = Some(lod_index),
                    Slot::Empty => wanted.push(lod_index),
                    Slot::Requested(_) => {}
                }
            }
        }

        if !self.collider_set {
            if let Some(collider_level) = detail_levels.get(collider_lod_index) {
                if sqr_dst < collider_level.sqr_visible_dst_threshold() {
                    match &self.lod_meshes[collider_lod_index] {
                        Slot::Ready(_) => self.collider_set = true,
                        Slot::Empty if !wanted.contains(&collider_lod_index) => {
                            wanted.push(collider_lod_index)
                        }
                        _ => {}
                    }
                }
            }
        }

        wanted
    }

    /// Collision mesh, once assigned.
    pub fn collision_mesh(&self, collider_lod_index: usize) -> Option<&Arc<MeshData>> {
        if self.collider_set {
            self.lod_mesh(collider_lod_index)
        } else {
            None
        }
    }
}
