//! Tile addressing: zoom range, tile size and `(zoom, x, y)` validation.

use crate::error::TileError;
use crate::geo::{tile_to_bbox, tile_to_mercator_bbox, BoundingBox};

/// Lowest zoom level served.
pub const MIN_ZOOM: u32 = 0;

/// Highest zoom level served.
pub const MAX_ZOOM: u32 = 24;

/// Inclusive range of servable zoom levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    pub min: u32,
    pub max: u32,
}

impl ZoomRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, zoom: u32) -> bool {
        zoom >= self.min && zoom <= self.max
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::new(MIN_ZOOM, MAX_ZOOM)
    }
}

/// Output tile edge length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileSize {
    /// 256 px
    Standard,
    /// 512 px, the `@2x` variant
    Retina,
}

impl TileSize {
    pub fn pixels(self) -> u32 {
        match self {
            TileSize::Standard => 256,
            TileSize::Retina => 512,
        }
    }

    pub fn from_pixels(pixels: u32) -> Option<Self> {
        match pixels {
            256 => Some(TileSize::Standard),
            512 => Some(TileSize::Retina),
            _ => None,
        }
    }

    /// File name suffix used in tile URLs, without the extension.
    pub fn url_suffix(self) -> &'static str {
        match self {
            TileSize::Standard => "",
            TileSize::Retina => "@2x",
        }
    }
}

/// A slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub zoom: u32,
    pub x: u32,
    pub y: u32,
}

impl TileAddress {
    pub fn new(zoom: u32, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Check the zoom against `range`, then both indices against `2^zoom`.
    pub fn validate(&self, range: ZoomRange) -> Result<(), TileError> {
        if !range.contains(self.zoom) {
            return Err(TileError::InvalidZoom {
                zoom: self.zoom,
                min_zoom: range.min,
                max_zoom: range.max,
            });
        }

        let tiles_per_axis = 1u64 << self.zoom.min(63);
        if u64::from(self.x) >= tiles_per_axis || u64::from(self.y) >= tiles_per_axis {
            return Err(TileError::InvalidTileCoordinate {
                zoom: self.zoom,
                x: self.x,
                y: self.y,
            });
        }

        Ok(())
    }

    /// Geographic bounds of the tile.
    pub fn geographic_bounds(&self) -> BoundingBox {
        tile_to_bbox(self.zoom, self.x, self.y)
    }

    /// Web Mercator bounds of the tile.
    pub fn mercator_bounds(&self) -> BoundingBox {
        tile_to_mercator_bbox(self.zoom, self.x, self.y)
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Parse a zoom, column or row path segment.
///
/// Only plain ASCII digits are accepted, so `+3` or ` 3` never alias `3`.
pub fn parse_tile_index(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Split the last path segment of a tile URL into row and size.
///
/// Accepts `{y}.png`, `{y}@2x.png` and a bare `{y}` (standard size).
pub fn parse_tile_filename(filename: &str) -> Result<(u32, TileSize), TileError> {
    let stem = filename.strip_suffix(".png").unwrap_or(filename);
    let (row, size) = match stem.strip_suffix("@2x") {
        Some(row) => (row, TileSize::Retina),
        None => (stem, TileSize::Standard),
    };

    let y = parse_tile_index(row).ok_or_else(|| TileError::MalformedAddress {
        message: format!("invalid tile row '{}'", filename),
    })?;

    Ok((y, size))
}
