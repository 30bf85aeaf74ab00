//! Lodscape - seeded terrain chunks with LOD meshes and seam stitching
//!
//! Height maps come from fractal Perlin noise shaped by a height curve and an
//! optional island falloff. Meshes are built per chunk and level of detail,
//! with full-resolution edge rings so neighbouring chunks meet without cracks.

pub mod core;
pub mod terrain;
pub mod mesh;
pub mod streaming;
