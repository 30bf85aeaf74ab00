//! Endless terrain: decides which chunks and LODs to generate around a viewer
//!
//! The owner calls [`TerrainStreamer::update`] with the viewer position and
//! [`TerrainStreamer::poll`] once per tick. Height maps and meshes are built on
//! the worker pool; completions are applied on the owner's thread, and any
//! result that no longer matches what its chunk asked for is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::Vec2;

use super::chunk::{ChunkCoord, TerrainChunk};
use super::requester::GenerationRequester;
use crate::core::Result;
use crate::mesh::{generate_terrain_mesh, MeshData};
use crate::terrain::survey::{TerrainSurvey, DEFAULT_MAX_WALKABLE_SLOPE};
use crate::terrain::{generate_height_map, HeightField, TerrainConfig};

/// Distance the viewer must move before the visible chunk set is rebuilt.
pub const VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE: f32 = 25.0;
const SQR_VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE: f32 =
    VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE * VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE;

/// Identifies who asked for a job and under which config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobKey {
    pub coord: ChunkCoord,
    pub revision: u64,
}

/// Output of a background job.
#[derive(Debug)]
pub enum JobOutput {
    HeightMap(HeightField),
    Mesh { lod_index: usize, mesh: MeshData },
}

pub struct TerrainStreamer {
    config: Arc<TerrainConfig>,
    /// Bumped on every config change; older jobs are discarded.
    revision: u64,
    requester: GenerationRequester<JobKey, JobOutput>,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible: HashSet<ChunkCoord>,
    viewer: Option<Vec2>,
    last_update_viewer: Option<Vec2>,
    chunks_visible_in_view_dst: i32,
}

impl TerrainStreamer {
    pub fn new(config: TerrainConfig) -> Result<Self> {
        config.validate()?;
        let requester = GenerationRequester::new(config.worker_threads)?;
        let chunks_visible_in_view_dst = config.chunks_visible_in_view_dst();

        log::info!(
            "Terrain streamer: chunk {}m, view distance {}m ({} chunks each way), {} detail levels",
            config.mesh.mesh_world_size(),
            config.max_view_distance(),
            chunks_visible_in_view_dst,
            config.detail_levels.len()
        );

        Ok(Self {
            config: Arc::new(config),
            revision: 0,
            requester,
            chunks: HashMap::new(),
            visible: HashSet::new(),
            viewer: None,
            last_update_viewer: None,
            chunks_visible_in_view_dst,
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Move the viewer (world XZ). Returns `true` if the visible set was rebuilt.
    ///
    /// Chunks already visible are re-evaluated on every move; new chunks are
    /// only considered once the viewer has moved past the update threshold.
    pub fn update(&mut self, viewer: Vec2) -> bool {
        let moved = self.viewer != Some(viewer);
        self.viewer = Some(viewer);

        let due = self
            .last_update_viewer
            .is_none_or(|last| last.distance_squared(viewer) > SQR_VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE);

        if due {
            self.update_visible_chunks(viewer);
        } else if moved {
            for coord in self.visible_chunks() {
                self.refresh_chunk(coord, viewer);
            }
        }
        due
    }

    /// Apply finished jobs. Returns how many were accepted.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;

        for done in self.requester.poll_completed() {
            if done.key.revision != self.revision {
                log::trace!(
                    "Dropping result for chunk {} from config revision {}",
                    done.key.coord,
                    done.key.revision
                );
                continue;
            }
            let coord = done.key.coord;
            let Some(chunk) = self.chunks.get_mut(&coord) else {
                continue;
            };

            let accepted = match done.output {
                Ok(JobOutput::HeightMap(field)) => chunk.receive_height_map(done.ticket, field),
                Ok(JobOutput::Mesh { lod_index, mesh }) => {
                    chunk.receive_mesh(lod_index, done.ticket, mesh)
                }
                Err(e) => {
                    log::error!("Generation failed for chunk {} (ticket {}): {}", coord, done.ticket, e);
                    // Asked for again on the next update.
                    chunk.request_failed(done.ticket);
                    continue;
                }
            };

            if accepted {
                applied += 1;
                if let Some(viewer) = self.viewer {
                    self.refresh_chunk(coord, viewer);
                }
            } else {
                log::trace!("Dropping stale result for chunk {} (ticket {})", coord, done.ticket);
            }
        }

        applied
    }

    /// Replace the configuration. Every chunk is regenerated and results of
    /// jobs started under the old config are discarded when they arrive.
    pub fn apply_config(&mut self, config: TerrainConfig) -> Result<()> {
        config.validate()?;

        if config.worker_threads != self.config.worker_threads {
            self.requester = GenerationRequester::new(config.worker_threads)?;
        } else {
            self.requester.clear_completed();
        }

        self.revision += 1;
        self.chunks.clear();
        self.visible.clear();
        self.chunks_visible_in_view_dst = config.chunks_visible_in_view_dst();
        self.config = Arc::new(config);
        self.last_update_viewer = None;

        log::info!("Terrain config changed, regenerating (revision {})", self.revision);

        if let Some(viewer) = self.viewer {
            self.update_visible_chunks(viewer);
        }
        Ok(())
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    /// Number of chunks created so far, visible or not.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn displayed_mesh(&self, coord: ChunkCoord) -> Option<Arc<MeshData>> {
        self.chunks.get(&coord)?.displayed_mesh().cloned()
    }

    pub fn collision_mesh(&self, coord: ChunkCoord) -> Option<Arc<MeshData>> {
        self.chunks
            .get(&coord)?
            .collision_mesh(self.config.collider_lod_index)
            .cloned()
    }

    /// Visible chunk coordinates, sorted.
    pub fn visible_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.visible.iter().copied().collect();
        coords.sort();
        coords
    }

    /// Jobs still running on the worker pool.
    pub fn pending_jobs(&self) -> usize {
        self.requester.in_flight()
    }

    /// Navigability of everything currently displayed.
    pub fn survey_visible(&self) -> TerrainSurvey {
        let surveys: Vec<_> = self
            .visible
            .iter()
            .filter_map(|coord| self.chunks.get(coord)?.displayed_mesh().cloned())
            .map(|mesh| {
                TerrainSurvey::from_mesh(&mesh, self.config.mesh.water_level, DEFAULT_MAX_WALKABLE_SLOPE)
            })
            .collect();
        TerrainSurvey::combine(&surveys)
    }

    fn update_visible_chunks(&mut self, viewer: Vec2) {
        self.last_update_viewer = Some(viewer);

        let already_updated = self.visible_chunks();
        for &coord in &already_updated {
            self.refresh_chunk(coord, viewer);
        }

        let current = ChunkCoord::containing(viewer, self.config.mesh.mesh_world_size());
        let range = self.chunks_visible_in_view_dst;
        for y_offset in -range..=range {
            for x_offset in -range..=range {
                let coord = ChunkCoord::new(current.x + x_offset, current.y + y_offset);
                if already_updated.contains(&coord) {
                    continue;
                }
                if self.chunks.contains_key(&coord) {
                    self.refresh_chunk(coord, viewer);
                } else {
                    self.load_chunk(coord);
                }
            }
        }
    }

    /// Create a chunk and request its height map.
    fn load_chunk(&mut self, coord: ChunkCoord) {
        let mut chunk = TerrainChunk::new(coord, &self.config.mesh, self.config.detail_levels.len());
        Self::request_height_map(&mut self.requester, &self.config, self.revision, &mut chunk);
        self.chunks.insert(coord, chunk);
    }

    fn request_height_map(
        requester: &mut GenerationRequester<JobKey, JobOutput>,
        config: &Arc<TerrainConfig>,
        revision: u64,
        chunk: &mut TerrainChunk,
    ) {
        let config = Arc::clone(config);
        let sample_center = chunk.sample_center();
        let key = JobKey {
            coord: chunk.coord(),
            revision,
        };
        let ticket = requester.request(key, move || {
            let n = config.mesh.num_verts_per_line();
            Ok(JobOutput::HeightMap(generate_height_map(n, n, &config.height_map, sample_center)))
        });
        chunk.height_map_requested(ticket);
        log::debug!("Requested height map for chunk {}", chunk.coord());
    }

    /// Re-evaluate one chunk and request whatever it now needs.
    fn refresh_chunk(&mut self, coord: ChunkCoord, viewer: Vec2) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        if chunk.needs_height_map() {
            Self::request_height_map(&mut self.requester, &self.config, self.revision, chunk);
        }

        let was_visible = chunk.is_visible();
        let requests = chunk.update(viewer, &self.config.detail_levels, self.config.collider_lod_index);

        if let Some(height_map) = chunk.height_map().cloned() {
            for lod_index in requests {
                let config = Arc::clone(&self.config);
                let height_map = Arc::clone(&height_map);
                let lod = config.detail_levels[lod_index].lod;
                let key = JobKey {
                    coord,
                    revision: self.revision,
                };
                let ticket = self.requester.request(key, move || {
                    let mesh = generate_terrain_mesh(&height_map, lod, &config.mesh)?;
                    Ok(JobOutput::Mesh { lod_index, mesh })
                });
                chunk.mesh_requested(lod_index, ticket);
                log::debug!("Requested LOD {} mesh for chunk {}", lod, coord);
            }
        }

        let visible = chunk.is_visible();
        if visible != was_visible {
            if visible {
                self.visible.insert(coord);
            } else {
                self.visible.remove(&coord);
            }
        }
    }
}
