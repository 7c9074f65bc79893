//! Slippy-map tile pyramid math.

use std::f64::consts::PI;

use super::projection::{MAX_MERCATOR_LATITUDE, MERCATOR_HALF_EXTENT};
use super::BoundingBox;

/// Deepest zoom considered by [`bbox_to_smallest_tile`].
pub const MAX_TILE_SEARCH_ZOOM: u32 = 28;

/// Geographic bounds of tile `(zoom, x, y)`.
pub fn tile_to_bbox(zoom: u32, x: u32, y: u32) -> BoundingBox {
    let n = 2f64.powi(zoom as i32);

    let min_lon = x as f64 / n * 360.0 - 180.0;
    let max_lon = (x as f64 + 1.0) / n * 360.0 - 180.0;
    let max_lat = row_to_latitude(y as f64, n);
    let min_lat = row_to_latitude(y as f64 + 1.0, n);

    BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
}

/// Web Mercator bounds of tile `(zoom, x, y)`.
pub fn tile_to_mercator_bbox(zoom: u32, x: u32, y: u32) -> BoundingBox {
    let n = 2f64.powi(zoom as i32);
    let span = 2.0 * MERCATOR_HALF_EXTENT / n;

    let min_x = -MERCATOR_HALF_EXTENT + x as f64 * span;
    let max_y = MERCATOR_HALF_EXTENT - y as f64 * span;

    BoundingBox::new(min_x, max_y - span, min_x + span, max_y)
}

fn row_to_latitude(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan().to_degrees()
}

/// Zoom of the smallest tile that fully contains `bbox`.
///
/// Both corners are located at 32-bit tile precision and compared bit by bit
/// from the most significant end; the first zoom at which they land in
/// different tiles is the answer. Identical corners resolve to
/// [`MAX_TILE_SEARCH_ZOOM`].
pub fn bbox_to_smallest_tile(bbox: &BoundingBox) -> u32 {
    let (min_x, min_y) = point_to_tile_32(bbox.min_x, bbox.min_y);
    let (max_x, max_y) = point_to_tile_32(bbox.max_x, bbox.max_y);

    for zoom in 0..MAX_TILE_SEARCH_ZOOM {
        let mask = 1u32 << (31 - zoom);
        if (min_x & mask) != (max_x & mask) || (min_y & mask) != (max_y & mask) {
            return zoom;
        }
    }

    MAX_TILE_SEARCH_ZOOM
}

/// Tile containing a point at zoom 32.
fn point_to_tile_32(lon: f64, lat: f64) -> (u32, u32) {
    let world = 2f64.powi(32);
    let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    let sin = lat.to_radians().sin();

    let x = (world * (lon / 360.0 + 0.5)).rem_euclid(world);
    let y = world * (0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI);

    (
        x.floor().clamp(0.0, u32::MAX as f64) as u32,
        y.floor().clamp(0.0, u32::MAX as f64) as u32,
    )
}
