//! Height map preview - renders one chunk's maps to a grayscale PNG.
//!
//! Usage: cargo run --release --bin preview_heightmap -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Terrain config JSON (default: built-in defaults)
//!   --mode <MODE>     noise | falloff | height | mesh (default: height)
//!   --out <PATH>      Output PNG (default: "preview.png")
//!   --seed <SEED>     Override the noise seed
//!   --chunk-x <X>     Chunk coordinate to preview (default: 0)
//!   --chunk-y <Y>     Chunk coordinate to preview (default: 0)
//!   --lod <N>         Level of detail for mesh mode (default: 0)
//!
//! Mesh mode writes the height map and also logs mesh and survey stats.

use std::path::PathBuf;
use std::time::Instant;

use glam::Vec2;
use image::{GrayImage, Luma};

use lodscape::core::Result;
use lodscape::mesh::generate_terrain_mesh;
use lodscape::streaming::ChunkCoord;
use lodscape::terrain::survey::DEFAULT_MAX_WALKABLE_SLOPE;
use lodscape::terrain::{
    generate_falloff_map, generate_height_map, generate_noise_map, HeightField, TerrainConfig,
    TerrainSurvey,
};

fn main() {
    lodscape::core::logging::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mode = parse_str_arg(&args, "--mode").unwrap_or_else(|| "height".to_string());
    let out = PathBuf::from(parse_str_arg(&args, "--out").unwrap_or_else(|| "preview.png".to_string()));
    let chunk = ChunkCoord::new(
        parse_i32_arg(&args, "--chunk-x").unwrap_or(0),
        parse_i32_arg(&args, "--chunk-y").unwrap_or(0),
    );
    let lod = parse_u32_arg(&args, "--lod").unwrap_or(0);

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => TerrainConfig::load(path)?,
        None => TerrainConfig::default(),
    };
    if let Some(seed) = parse_i32_arg(&args, "--seed") {
        config.height_map.noise.seed = seed;
    }
    config.validate()?;

    let n = config.mesh.num_verts_per_line();
    let sample_center = sample_center_for(chunk, &config);

    log::info!(
        "Previewing {} for chunk {} ({}x{} samples, seed {})",
        mode,
        chunk,
        n,
        n,
        config.height_map.noise.seed
    );

    let start = Instant::now();
    let field = match mode.as_str() {
        "noise" => generate_noise_map(n, n, &config.height_map.noise, sample_center),
        "falloff" => generate_falloff_map(n, &config.height_map.falloff_curve),
        "height" => generate_height_map(n, n, &config.height_map, sample_center),
        "mesh" => {
            let field = generate_height_map(n, n, &config.height_map, sample_center);
            report_mesh(&config, &field, lod)?;
            field
        }
        other => {
            return Err(lodscape::core::Error::Config(format!(
                "unknown mode '{}' (expected noise, falloff, height or mesh)",
                other
            )));
        }
    };
    log::info!(
        "Generated in {:.1}ms, range [{:.3}, {:.3}]",
        start.elapsed().as_secs_f64() * 1000.0,
        field.min_value(),
        field.max_value()
    );

    to_image(&field).save(&out)?;
    log::info!("Wrote {}", out.display());
    Ok(())
}

fn report_mesh(config: &TerrainConfig, field: &HeightField, lod: u32) -> Result<()> {
    let start = Instant::now();
    let mesh = generate_terrain_mesh(field, lod, &config.mesh)?;
    let survey = TerrainSurvey::from_mesh(&mesh, config.mesh.water_level, DEFAULT_MAX_WALKABLE_SLOPE);

    log::info!(
        "LOD {} mesh: {} vertices, {} triangles in {:.1}ms",
        lod,
        mesh.vertex_count(),
        mesh.triangle_count(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    log::info!(
        "Survey: {:.1}% walkable, {:.1}% under water, heights [{:.2}, {:.2}], mean normal {:?}",
        survey.walkable_fraction * 100.0,
        survey.water_fraction * 100.0,
        survey.min_height,
        survey.max_height,
        survey.mean_normal
    );
    Ok(())
}

/// Map the field's own range to 0..255, rows top to bottom.
fn to_image(field: &HeightField) -> GrayImage {
    let range = field.max_value() - field.min_value();
    let (w, h) = (field.width() as u32, field.height() as u32);
    GrayImage::from_fn(w, h, |x, y| {
        let v = field.get(x as usize, y as usize);
        let t = if range > 0.0 { (v - field.min_value()) / range } else { 0.0 };
        Luma([(t.clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

fn parse_i32_arg(args: &[String], flag: &str) -> Option<i32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Noise-space center of a chunk, as the streamer samples it.
fn sample_center_for(coord: ChunkCoord, config: &TerrainConfig) -> Vec2 {
    coord.as_vec2() * config.mesh.mesh_world_size() / config.mesh.terrain_scale
}
