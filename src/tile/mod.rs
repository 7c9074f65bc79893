//! Tile service layer.
//!
//! This module turns a decoded snapshot raster into slippy-map PNG tiles and
//! TileJSON metadata.
//!
//! # Components
//!
//! - [`TileService`]: Main entry point, orchestrates validate, acquire, render, encode
//! - [`TileAddress`], [`ZoomRange`], [`TileSize`]: Tile addressing and validation
//! - [`render`]: Resamples a raster into an RGBA tile in Web Mercator
//! - [`PngTileEncoder`]: Encodes rendered tiles as PNG
//! - [`build_tilejson`]: Derives zoom range, center and bounds from a raster's extent
//! - [`TileRequest`]: Parameters for a tile request
//! - [`TileResponse`]: Response containing tile data

mod address;
mod encoder;
mod rasterizer;
mod service;
mod tilejson;

pub use address::{
    parse_tile_filename, parse_tile_index, TileAddress, TileSize, ZoomRange, MAX_ZOOM, MIN_ZOOM,
};
pub use encoder::{is_png, PngTileEncoder, PNG_SIGNATURE};
pub use rasterizer::{render, RgbaTile};
pub use service::{TileRequest, TileResponse, TileService};
pub use tilejson::{
    build_tilejson, snapshot_layer_name, snapshot_tile_url_template, TileJson, TILEJSON_VERSION,
};
