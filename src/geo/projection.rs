//! Closed-form transforms between EPSG:4326 and EPSG:3857.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use super::Point;
use crate::error::GeoError;

/// EPSG code of geographic WGS84 longitude/latitude.
pub const EPSG_GEOGRAPHIC: u32 = 4326;

/// EPSG code of spherical Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// Legacy codes that denote the same spherical Mercator definition.
const WEB_MERCATOR_ALIASES: [u32; 3] = [900_913, 3785, 102_100];

/// Sphere radius used by spherical Mercator, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width of the Mercator square, in meters.
pub const MERCATOR_HALF_EXTENT: f64 = PI * EARTH_RADIUS;

/// Latitude at which the Mercator square ends.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// One of the two coordinate reference systems the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// EPSG:4326
    Geographic,
    /// EPSG:3857
    WebMercator,
}

impl Crs {
    /// Resolve an EPSG code, failing for anything but the two supported systems.
    pub fn from_epsg(epsg: u32) -> Result<Self, GeoError> {
        match epsg {
            EPSG_GEOGRAPHIC => Ok(Crs::Geographic),
            EPSG_WEB_MERCATOR => Ok(Crs::WebMercator),
            code if WEB_MERCATOR_ALIASES.contains(&code) => Ok(Crs::WebMercator),
            _ => Err(GeoError::UnsupportedProjection { epsg }),
        }
    }

    /// Canonical EPSG code.
    pub fn epsg(self) -> u32 {
        match self {
            Crs::Geographic => EPSG_GEOGRAPHIC,
            Crs::WebMercator => EPSG_WEB_MERCATOR,
        }
    }

    /// Move `point` from this system into `target`.
    #[inline]
    pub fn transform(self, target: Crs, point: Point) -> Point {
        match (self, target) {
            (Crs::Geographic, Crs::WebMercator) => {
                let (x, y) = lon_lat_to_mercator(point.x, point.y);
                Point::new(x, y)
            }
            (Crs::WebMercator, Crs::Geographic) => {
                let (lon, lat) = mercator_to_lon_lat(point.x, point.y);
                Point::new(lon, lat)
            }
            _ => point,
        }
    }

    /// Transform only the x coordinate.
    ///
    /// Both projections are separable: x depends only on longitude and y only
    /// on latitude.
    #[inline]
    pub(crate) fn transform_x(self, target: Crs, x: f64) -> f64 {
        match (self, target) {
            (Crs::Geographic, Crs::WebMercator) => EARTH_RADIUS * x.to_radians(),
            (Crs::WebMercator, Crs::Geographic) => (x / EARTH_RADIUS).to_degrees(),
            _ => x,
        }
    }

    /// Transform only the y coordinate. See [`Crs::transform_x`].
    #[inline]
    pub(crate) fn transform_y(self, target: Crs, y: f64) -> f64 {
        match (self, target) {
            (Crs::Geographic, Crs::WebMercator) => latitude_to_mercator_y(y),
            (Crs::WebMercator, Crs::Geographic) => mercator_y_to_latitude(y),
            _ => y,
        }
    }
}

/// Longitude/latitude in degrees to Web Mercator meters.
///
/// Latitude is clamped to the Mercator-valid range so the poles stay finite.
#[inline]
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    (EARTH_RADIUS * lon.to_radians(), latitude_to_mercator_y(lat))
}

/// Web Mercator meters to longitude/latitude in degrees.
#[inline]
pub fn mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    ((x / EARTH_RADIUS).to_degrees(), mercator_y_to_latitude(y))
}

#[inline]
fn latitude_to_mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln()
}

#[inline]
fn mercator_y_to_latitude(y: f64) -> f64 {
    (2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees()
}

/// Reproject a point between two EPSG codes.
///
/// Fails with [`GeoError::UnsupportedProjection`] when either code is not
/// EPSG:4326 or EPSG:3857 (or a Mercator alias).
pub fn reproject(point: Point, from_epsg: u32, to_epsg: u32) -> Result<Point, GeoError> {
    let from = Crs::from_epsg(from_epsg)?;
    let to = Crs::from_epsg(to_epsg)?;
    Ok(from.transform(to, point))
}
