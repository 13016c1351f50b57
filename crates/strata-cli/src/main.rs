//! Strata CLI - import, inspect and render streamed heightmap terrain

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{import, info, render};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Heightmap terrain streaming and LOD tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a 16-bit heightmap image into a tile stream file
    Import {
        /// Source heightmap (16-bit PNG or TIFF)
        heightmap: String,

        /// Destination tile stream file
        output: String,

        /// Terrain settings TOML
        #[arg(long)]
        config: Option<String>,
    },

    /// Print the header and tile index of a tile stream file
    Info {
        /// Tile stream file
        file: String,

        /// Terrain settings TOML
        #[arg(long)]
        config: Option<String>,

        /// List every tile
        #[arg(long)]
        tiles: bool,
    },

    /// Stream tiles around a camera and render one frame to PNG (headless)
    Render {
        /// Tile stream file
        file: String,

        /// Output image path
        #[arg(short, long, default_value = "terrain.png")]
        output: String,

        /// Image width in pixels
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Image height in pixels
        #[arg(long, default_value = "720")]
        height: u32,

        /// Camera orbit distance
        #[arg(long)]
        distance: Option<f32>,

        /// Camera horizontal angle in degrees
        #[arg(long)]
        yaw: Option<f32>,

        /// Camera vertical angle in degrees
        #[arg(long)]
        pitch: Option<f32>,

        /// Force every cell to this LOD level
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=7))]
        lod: Option<u8>,

        /// Terrain settings TOML
        #[arg(long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            heightmap,
            output,
            config,
        } => import::run(&heightmap, &output, config.as_deref()),
        Commands::Info {
            file,
            config,
            tiles,
        } => info::run(&file, config.as_deref(), tiles),
        Commands::Render {
            file,
            output,
            width,
            height,
            distance,
            yaw,
            pitch,
            lod,
            config,
        } => render::run(render::RenderArgs {
            file,
            output,
            width,
            height,
            distance,
            yaw,
            pitch,
            lod,
            config,
        }),
    }
}
