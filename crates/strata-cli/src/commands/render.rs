//! Headless terrain-to-PNG render command

use anyhow::{Context, Result};
use std::path::Path;
use strata_render::{HeadlessContext, OrbitCamera, TerrainDrawData, TerrainPipeline, WgpuBackend};
use strata_terrain::{Terrain, TerrainSettings, TerrainStream};

use super::load_settings;

pub struct RenderArgs {
    pub file: String,
    pub output: String,
    pub width: u32,
    pub height: u32,
    pub distance: Option<f32>,
    pub yaw: Option<f32>,
    pub pitch: Option<f32>,
    pub lod: Option<u8>,
    pub config: Option<String>,
}

pub fn run(args: RenderArgs) -> Result<()> {
    let path = Path::new(&args.file);
    let mut settings = load_settings(args.config.as_deref())?;
    // A single frame: fill the whole window in one update
    settings.max_loads_per_update = settings.pool_size();

    // Frame the camera from the tile index before touching the GPU
    let mut camera = {
        let probe_settings = TerrainSettings {
            max_cells: 1,
            ..settings.clone()
        };
        let probe = TerrainStream::open(path, &probe_settings)
            .with_context(|| format!("Failed to open tile stream {}", args.file))?;
        let header = probe.header();
        let world = settings.tile_world_size();
        let mean_height = probe
            .meta()
            .iter()
            .map(|m| m.average_height as f64)
            .sum::<f64>()
            / probe.meta().len() as f64;
        OrbitCamera::framing(
            header.tiles_x as f32 * world,
            header.tiles_y as f32 * world,
            mean_height as f32 * settings.y_scale(),
        )
    };

    let ctx = pollster::block_on(HeadlessContext::new(args.width, args.height))
        .context("Failed to create headless render context")?;

    camera.aspect = ctx.aspect_ratio();
    if let Some(d) = args.distance {
        camera.distance = d;
    }
    if let Some(y) = args.yaw {
        camera.yaw = y.to_radians();
    }
    if let Some(p) = args.pitch {
        camera.pitch = p.to_radians();
    }

    let pipeline = TerrainPipeline::new(&ctx.device, ctx.format);
    let mut backend = WgpuBackend::new(&ctx.device, &ctx.queue);

    let mut terrain = Terrain::new(settings)?;
    terrain.set_lod_override(args.lod);
    terrain.initialize(&mut backend);
    terrain
        .open_stream(path, &mut backend)
        .with_context(|| format!("Failed to open tile stream {}", args.file))?;

    let view = camera.view();
    let loaded = terrain.update(&view, &mut backend)?;
    backend.begin_frame();
    let stats = terrain.render(&view, &mut backend);

    pipeline.update_uniforms(&ctx.queue, view.view_projection(), &TerrainDrawData::default());
    ctx.render_terrain(&pipeline, &backend);

    let pixels = pollster::block_on(ctx.read_pixels()).context("Failed to read rendered pixels")?;
    terrain.shutdown(&mut backend);

    let img = image::RgbaImage::from_raw(args.width, args.height, pixels)
        .context("Failed to create image from pixel data")?;
    img.save(&args.output)
        .with_context(|| format!("Failed to save image to {}", args.output))?;

    println!("Loaded {} tiles", loaded);
    println!(
        "Drew {} of {} cells ({} culled, {} empty), {} triangles",
        stats.drawn, stats.considered, stats.culled, stats.unpopulated, stats.triangles_submitted
    );
    println!(
        "Rendered {}x{} image to {}",
        args.width, args.height, args.output
    );

    Ok(())
}
