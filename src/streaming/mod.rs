//! Background chunk generation and distance-based LOD streaming

pub mod requester;
pub mod lod;
pub mod chunk;
pub mod streamer;

pub use requester::{Completed, GenerationRequester};
pub use lod::{
    LodInfo, default_detail_levels, max_view_distance, select_lod_index, validate_detail_levels,
};
pub use chunk::{ChunkCoord, Slot, TerrainChunk};
pub use streamer::{JobKey, JobOutput, TerrainStreamer, VIEWER_MOVE_THRESHOLD_FOR_CHUNK_UPDATE};
