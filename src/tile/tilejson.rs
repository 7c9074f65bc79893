//! TileJSON 2.0.0 documents derived from a raster's geographic extent.

use serde::{Deserialize, Serialize};

use super::address::{TileSize, ZoomRange};
use crate::geo::{bbox_to_smallest_tile, BoundingBox};

/// TileJSON spec version emitted.
pub const TILEJSON_VERSION: &str = "2.0.0";

/// Zoom offsets from the smallest tile containing the snapshot.
const MINZOOM_OFFSET: u32 = 2;
const CENTER_ZOOM_OFFSET: u32 = 4;
const MAXZOOM_OFFSET: u32 = 9;

/// A TileJSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileJson {
    pub name: String,
    pub minzoom: u32,
    pub maxzoom: u32,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bounds: [f64; 4],
    /// `[lon, lat, zoom]`
    pub center: (f64, f64, u32),
    pub tiles: Vec<String>,
    #[serde(rename = "tileSize")]
    pub tile_size: u32,
    pub format: String,
    pub tilejson: String,
}

impl TileJson {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Clamp every advertised zoom into the zooms the server answers.
    pub fn clamp_zooms(mut self, range: ZoomRange) -> Self {
        let clamp = |zoom: u32| zoom.clamp(range.min, range.max);
        self.minzoom = clamp(self.minzoom);
        self.maxzoom = clamp(self.maxzoom);
        self.center.2 = clamp(self.center.2);
        self
    }
}

/// Derive a TileJSON document from a geographic bounding box.
///
/// With `z` the zoom of the smallest tile containing `bbox`, the document
/// advertises zooms `z+2` to `z+9` and centers on the box at zoom `z+4`, each
/// capped at `max_zoom`.
pub fn build_tilejson(
    bbox: &BoundingBox,
    tile_url_template: &str,
    tile_size: TileSize,
    max_zoom: u32,
) -> TileJson {
    let z = bbox_to_smallest_tile(bbox);
    let center = bbox.center();

    TileJson {
        name: String::new(),
        minzoom: (z + MINZOOM_OFFSET).min(max_zoom),
        maxzoom: (z + MAXZOOM_OFFSET).min(max_zoom),
        bounds: bbox.to_array(),
        center: (center.x, center.y, (z + CENTER_ZOOM_OFFSET).min(max_zoom)),
        tiles: vec![tile_url_template.to_string()],
        tile_size: tile_size.pixels(),
        format: "png".to_string(),
        tilejson: TILEJSON_VERSION.to_string(),
    }
}

/// Tile URL template for a snapshot, e.g.
/// `https://tiles.example.org/snapshots/abc/{z}/{x}/{y}@2x.png`.
pub fn snapshot_tile_url_template(base_url: &str, snapshot_id: &str, tile_size: TileSize) -> String {
    format!(
        "{}/snapshots/{}/{{z}}/{{x}}/{{y}}{}.png",
        base_url.trim_end_matches('/'),
        urlencoding::encode(snapshot_id),
        tile_size.url_suffix()
    )
}

/// Layer name advertised for a snapshot.
pub fn snapshot_layer_name(snapshot_id: &str) -> String {
    format!("fp-snapshot-{}", snapshot_id)
}
