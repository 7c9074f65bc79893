//! Affine pixel-to-world georeferencing.

use super::{BoundingBox, Point};

/// Six-parameter affine transform from pixel space to a raster's native CRS.
///
/// ```text
/// world_x = origin_x + col * pixel_width  + row * row_rotation
/// world_y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Pixel coordinates address pixel corners: `(0, 0)` is the top-left corner
/// of the first pixel and `(width, height)` the bottom-right corner of the
/// last one. For north-up rasters `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform without rotation.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Build from a GeoTIFF tiepoint `(i, j, k, x, y, z)` and pixel scale
    /// `(sx, sy, sz)`.
    ///
    /// The scale's y component is positive for north-up images, so it is
    /// negated here.
    pub fn from_tiepoint_and_scale(tiepoint: &[f64; 6], scale: &[f64; 3]) -> Self {
        let [i, j, _, x, y, _] = *tiepoint;
        let [sx, sy, _] = *scale;
        Self::new(x - i * sx, y + j * sy, sx, -sy)
    }

    /// Build from a row-major 4x4 ModelTransformation matrix.
    pub fn from_model_transformation(matrix: &[f64; 16]) -> Self {
        Self {
            origin_x: matrix[3],
            origin_y: matrix[7],
            pixel_width: matrix[0],
            pixel_height: matrix[5],
            row_rotation: matrix[1],
            col_rotation: matrix[4],
        }
    }

    pub fn pixel_to_world(&self, col: f64, row: f64) -> Point {
        Point::new(
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det.is_finite() && det != 0.0
    }

    /// Fractional pixel coordinates `(col, row)` of a world point.
    ///
    /// Returns `None` for a singular transform.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !self.is_invertible() {
            return None;
        }
        let det = self.determinant();
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (self.pixel_width * dy - self.col_rotation * dx) / det;
        Some((col, row))
    }

    pub(crate) fn is_axis_aligned(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }
}

/// Native-CRS bounding box of a `width` x `height` raster.
///
/// All four corners are transformed so rotated rasters get their full
/// envelope.
pub fn native_bounding_box(width: u32, height: u32, transform: &GeoTransform) -> BoundingBox {
    let (w, h) = (width as f64, height as f64);
    let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
        .map(|(col, row)| transform.pixel_to_world(col, row));
    // Four corners are always present
    BoundingBox::from_points(corners).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
}
