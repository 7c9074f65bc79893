//! Test utilities for integration tests.
//!
//! This module provides in-memory GeoTIFF fixtures, counting fakes for every
//! seam of the snapshot pipeline, and helpers for driving the router.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tower::ServiceExt;

use snapshot_tiler::error::{FetchError, IoError};
use snapshot_tiler::geo::{lon_lat_to_mercator, BoundingBox};
use snapshot_tiler::io::{ObjectLocation, ObjectReader};
use snapshot_tiler::snapshot::{decode_geotiff, MetadataLookup, RasterFetcher, RasterHandle};

// =============================================================================
// GeoTIFF Fixtures
// =============================================================================

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

/// Central Berlin, roughly 0.2 x 0.1 degrees.
pub fn berlin_bounds() -> BoundingBox {
    BoundingBox::new(13.3, 52.45, 13.5, 52.55)
}

/// Symmetric box around the origin; smallest containing tile is 0/0/0.
pub fn equator_bounds() -> BoundingBox {
    BoundingBox::new(-10.0, -10.0, 10.0, 10.0)
}

/// Describes an RGB GeoTIFF covering a lon/lat box.
#[derive(Debug, Clone)]
pub struct GeoTiffFixture {
    pub width: u32,
    pub height: u32,
    /// Extent in degrees
    pub bounds: BoundingBox,
    /// 3857 or 4326
    pub epsg: u16,
    pub nodata: Option<u8>,
}

impl GeoTiffFixture {
    pub fn mercator(bounds: BoundingBox) -> Self {
        Self {
            width: 64,
            height: 64,
            bounds,
            epsg: 3857,
            nodata: None,
        }
    }

    pub fn geographic(bounds: BoundingBox) -> Self {
        Self {
            epsg: 4326,
            ..Self::mercator(bounds)
        }
    }

    pub fn with_nodata(mut self, nodata: u8) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Encode with every pixel produced by `fill(col, row)`.
    pub fn rgb(&self, fill: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
        let mut samples = Vec::with_capacity((self.width * self.height * 3) as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                samples.extend_from_slice(&fill(col, row));
            }
        }

        let (min_x, min_y, max_x, max_y) = if self.epsg == 4326 {
            (
                self.bounds.min_x,
                self.bounds.min_y,
                self.bounds.max_x,
                self.bounds.max_y,
            )
        } else {
            let (min_x, min_y) = lon_lat_to_mercator(self.bounds.min_x, self.bounds.min_y);
            let (max_x, max_y) = lon_lat_to_mercator(self.bounds.max_x, self.bounds.max_y);
            (min_x, min_y, max_x, max_y)
        };

        let scale = [
            (max_x - min_x) / self.width as f64,
            (max_y - min_y) / self.height as f64,
            0.0,
        ];
        let tiepoint = [0.0, 0.0, 0.0, min_x, max_y, 0.0];
        let key = if self.epsg == 4326 { 2048 } else { 3072 };
        let geo_keys: [u16; 8] = [1, 1, 0, 1, key, 0, 1, self.epsg];

        let mut buf = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buf).unwrap();
            let mut image = encoder
                .new_image::<colortype::RGB8>(self.width, self.height)
                .unwrap();
            let dir = image.encoder();
            dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), &scale[..])
                .unwrap();
            dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), &tiepoint[..])
                .unwrap();
            dir.write_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY), &geo_keys[..])
                .unwrap();
            if let Some(nodata) = self.nodata {
                dir.write_tag(
                    Tag::from_u16_exhaustive(TAG_GDAL_NODATA),
                    nodata.to_string().as_str(),
                )
                .unwrap();
            }
            image.write_data(&samples).unwrap();
        }
        buf.into_inner()
    }

    /// Encode as a single solid color.
    pub fn solid(&self, color: [u8; 3]) -> Vec<u8> {
        self.rgb(|_, _| color)
    }
}

// =============================================================================
// Counting Raster Fetcher
// =============================================================================

/// A raster fetcher backed by in-memory GeoTIFF bytes.
///
/// Counts fetches per snapshot, can be slowed down, and can be told to fail a
/// number of upcoming fetches with a transfer error. Clones share state, so a
/// test can keep a handle after moving one into the service.
#[derive(Clone, Default)]
pub struct CountingFetcher {
    snapshots: Arc<HashMap<String, Bytes>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
    delay: Duration,
    failures_remaining: Arc<AtomicUsize>,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot_id: &str, geotiff: Vec<u8>) -> Self {
        Arc::make_mut(&mut self.snapshots).insert(snapshot_id.to_string(), Bytes::from(geotiff));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self, snapshot_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(snapshot_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl RasterFetcher for CountingFetcher {
    async fn fetch(&self, snapshot_id: &str) -> Result<RasterHandle, FetchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(snapshot_id.to_string())
            .or_insert(0) += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(IoError::Connection("connection reset".to_string()).into());
        }

        let bytes = self
            .snapshots
            .get(snapshot_id)
            .ok_or_else(|| FetchError::NotFound {
                snapshot_id: snapshot_id.to_string(),
            })?;
        Ok(decode_geotiff(bytes)?)
    }
}

// =============================================================================
// Metadata Lookup and Object Store Fakes
// =============================================================================

/// Metadata lookup backed by a map from snapshot id to object location.
#[derive(Clone, Default)]
pub struct MemoryLookup {
    locations: Arc<HashMap<String, ObjectLocation>>,
    resolve_count: Arc<AtomicUsize>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot_id: &str, location: ObjectLocation) -> Self {
        Arc::make_mut(&mut self.locations).insert(snapshot_id.to_string(), location);
        self
    }

    pub fn resolve_count(&self) -> usize {
        self.resolve_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataLookup for MemoryLookup {
    async fn resolve(&self, snapshot_id: &str) -> Result<ObjectLocation, FetchError> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        self.locations
            .get(snapshot_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                snapshot_id: snapshot_id.to_string(),
            })
    }
}

/// Object store backed by a map from location to bytes.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<HashMap<ObjectLocation, Bytes>>,
    read_count: Arc<AtomicUsize>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, location: ObjectLocation, data: Vec<u8>) -> Self {
        Arc::make_mut(&mut self.objects).insert(location, Bytes::from(data));
        self
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectReader for MemoryObjectStore {
    async fn read_object(&self, location: &ObjectLocation) -> Result<Bytes, IoError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(location)
            .cloned()
            .ok_or_else(|| IoError::NotFound(location.to_string()))
    }
}

// =============================================================================
// HTTP Helpers
// =============================================================================

/// A collected HTTP response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as an RGBA image.
    pub fn image(&self) -> image::RgbaImage {
        image::load_from_memory_with_format(&self.body, image::ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }
}

/// Issue a GET request with optional extra headers.
pub async fn get_with_headers(router: &Router, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    get_with_headers(router, uri, &[]).await
}

/// Assert the JSON error shape and return the message.
pub fn assert_error_body(response: &TestResponse, status: StatusCode) -> String {
    assert_eq!(response.status, status);
    assert_eq!(response.header("content-type"), Some("application/json"));
    let json = response.json();
    assert_eq!(json["error"]["status"], status.as_u16());
    json["error"]["message"]
        .as_str()
        .expect("error message should be a string")
        .to_string()
}

/// Whether every pixel of the image is fully transparent.
pub fn is_fully_transparent(image: &image::RgbaImage) -> bool {
    image.pixels().all(|p| p.0[3] == 0)
}
