//! Strata Terrain: tiled heightmap streaming with LOD rendering
//!
//! A heightmap image is imported once into a tile stream file of fixed-size
//! records. At runtime a [`Terrain`] opens the stream, keeps a fixed pool of
//! cells filled with the tiles around the camera, and draws each visible cell
//! with one of eight shared LOD index strips through a [`RenderBackend`].

pub mod backend;
pub mod cell;
pub mod config;
pub mod format;
pub mod frustum;
pub mod heightmap;
pub mod import;
pub mod lod;
pub mod select;
pub mod stream;
pub mod terrain;

pub use backend::{BufferHandle, RenderBackend};
pub use cell::{Cell, TileCoord, Vertex};
pub use config::{LodSettings, TerrainSettings};
pub use format::TileHeader;
pub use frustum::{Aabb, CameraView, Frustum};
pub use heightmap::{HeightBlock, Heightmap};
pub use import::{import, import_heightmap, ImportSummary};
pub use lod::{generate_lod_indices, lod_for_distance, LOD_LEVELS, MAX_LOD};
pub use select::RenderStats;
pub use stream::{MetaCell, TerrainStream};
pub use terrain::Terrain;
