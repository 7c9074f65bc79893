//! Geography: bounding boxes, the two supported projections, affine
//! georeferencing and slippy-map tile math.
//!
//! Everything in here is a pure function of its inputs. Only two coordinate
//! reference systems exist for this service:
//!
//! - EPSG:4326, geographic longitude/latitude in degrees
//! - EPSG:3857, spherical ("Web") Mercator in meters
//!
//! Both directions between them are closed-form, so no projection engine is
//! involved.

mod projection;
mod tiles;
mod transform;

pub use projection::{
    lon_lat_to_mercator, mercator_to_lon_lat, reproject, Crs, EARTH_RADIUS, EPSG_GEOGRAPHIC,
    EPSG_WEB_MERCATOR, MAX_MERCATOR_LATITUDE, MERCATOR_HALF_EXTENT,
};
pub use tiles::{bbox_to_smallest_tile, tile_to_bbox, tile_to_mercator_bbox, MAX_TILE_SEARCH_ZOOM};
pub use transform::{native_bounding_box, GeoTransform};

/// A point in some coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle.
///
/// For geographic boxes `x` is longitude and `y` is latitude, so the field
/// order matches `[min_lon, min_lat, max_lon, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points.fold(init, |bbox, p| {
            Self::new(
                bbox.min_x.min(p.x),
                bbox.min_y.min(p.y),
                bbox.max_x.max(p.x),
                bbox.max_y.max(p.y),
            )
        }))
    }

    /// The four corners, counter-clockwise from the south-west one.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}
