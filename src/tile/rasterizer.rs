//! Tile rasterization.
//!
//! Output pixels are laid out linearly in Web Mercator, the tile grid's own
//! projection. Each pixel center is reprojected into the raster's native CRS,
//! mapped through the inverse affine transform and sampled nearest-neighbour.
//!
//! A pixel stays transparent (`[0, 0, 0, 0]`) when it falls outside the
//! raster, when any color band equals the no-data sentinel, or when the
//! source alpha band is zero. Every other pixel is opaque.

use crate::error::TileError;
use crate::geo::Crs;
use crate::snapshot::{BandLayout, RasterHandle};

use super::address::{TileAddress, TileSize, ZoomRange};

/// A rendered tile: `size x size` RGBA pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaTile {
    size: u32,
    pixels: Vec<u8>,
}

impl RgbaTile {
    fn transparent(size: u32) -> Self {
        Self {
            size,
            pixels: vec![0; size as usize * size as usize * 4],
        }
    }

    /// Edge length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size || y >= self.size {
            return None;
        }
        let start = (y as usize * self.size as usize + x as usize) * 4;
        let px = self.pixels.get(start..start + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }
}

/// Render tile `address` from `raster`.
///
/// Fails when the address is outside `zoom_range` or the `2^zoom` grid, or
/// when the raster's projection is not supported.
pub fn render(
    raster: &RasterHandle,
    address: TileAddress,
    size: TileSize,
    zoom_range: ZoomRange,
) -> Result<RgbaTile, TileError> {
    address.validate(zoom_range)?;
    let native = raster.crs()?;

    let edge = size.pixels();
    let bounds = address.mercator_bounds();
    let step_x = bounds.width() / edge as f64;
    let step_y = bounds.height() / edge as f64;

    // Both projections are separable, so native coordinates are computed per
    // column and per row rather than per pixel
    let native_x: Vec<f64> = (0..edge)
        .map(|col| {
            let x = bounds.min_x + (col as f64 + 0.5) * step_x;
            Crs::WebMercator.transform_x(native, x)
        })
        .collect();
    let native_y: Vec<f64> = (0..edge)
        .map(|row| {
            let y = bounds.max_y - (row as f64 + 0.5) * step_y;
            Crs::WebMercator.transform_y(native, y)
        })
        .collect();

    let mut tile = RgbaTile::transparent(edge);
    let transform = raster.transform();

    if transform.is_axis_aligned() {
        let cols: Vec<Option<u32>> = native_x
            .iter()
            .map(|&x| {
                sample_index(
                    (x - transform.origin_x) / transform.pixel_width,
                    raster.width(),
                )
            })
            .collect();
        let rows: Vec<Option<u32>> = native_y
            .iter()
            .map(|&y| {
                sample_index(
                    (y - transform.origin_y) / transform.pixel_height,
                    raster.height(),
                )
            })
            .collect();

        for (out_row, out) in tile.pixels.chunks_exact_mut(edge as usize * 4).enumerate() {
            let Some(src_row) = rows[out_row] else {
                continue;
            };
            for (out_col, dst) in out.chunks_exact_mut(4).enumerate() {
                let Some(src_col) = cols[out_col] else {
                    continue;
                };
                if let Some(samples) = raster.pixel(src_col, src_row) {
                    composite(samples, raster.layout(), raster.nodata(), dst);
                }
            }
        }
    } else {
        for (out_row, out) in tile.pixels.chunks_exact_mut(edge as usize * 4).enumerate() {
            let y = native_y[out_row];
            for (out_col, dst) in out.chunks_exact_mut(4).enumerate() {
                let Some((col, row)) = transform.world_to_pixel(native_x[out_col], y) else {
                    continue;
                };
                let (Some(col), Some(row)) = (
                    sample_index(col, raster.width()),
                    sample_index(row, raster.height()),
                ) else {
                    continue;
                };
                if let Some(samples) = raster.pixel(col, row) {
                    composite(samples, raster.layout(), raster.nodata(), dst);
                }
            }
        }
    }

    Ok(tile)
}

/// Nearest source index for a fractional pixel coordinate.
#[inline]
fn sample_index(coord: f64, extent: u32) -> Option<u32> {
    let index = coord.floor();
    (index >= 0.0 && index < extent as f64).then_some(index as u32)
}

/// Write one source pixel into an RGBA destination, leaving it transparent
/// when masked.
#[inline]
fn composite(samples: &[u8], layout: BandLayout, nodata: Option<u8>, dst: &mut [u8]) {
    if layout.has_alpha() && samples[layout.band_count() - 1] == 0 {
        return;
    }

    let color = &samples[..layout.color_bands()];
    if let Some(sentinel) = nodata {
        if color.contains(&sentinel) {
            return;
        }
    }

    match color {
        [gray] => dst[..3].fill(*gray),
        [r, g, b] => dst[..3].copy_from_slice(&[*r, *g, *b]),
        _ => return,
    }
    dst[3] = 255;
}
