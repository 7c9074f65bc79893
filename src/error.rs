use std::time::Duration;

use thiserror::Error;

/// I/O errors that can occur when talking to remote services
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Remote HTTP service answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Source location could not be turned into a bucket and key
    #[error("Invalid source location: {0}")]
    InvalidLocation(String),
}

/// Errors raised while turning GeoTIFF bytes into a raster handle
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The TIFF container itself is malformed or uses an unsupported feature
    #[error("TIFF error: {0}")]
    Tiff(String),

    /// Sample format or band count is not one the rasterizer understands
    #[error("Unsupported band layout: {color_type} (expected 8-bit gray, gray+alpha, RGB or RGBA)")]
    UnsupportedLayout { color_type: String },

    /// Decoded sample buffer does not match the declared dimensions
    #[error("Sample count mismatch: expected {expected}, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    /// Image has a zero width or height
    #[error("Image has zero size ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Decoded samples would exceed the configured buffer limit
    #[error("Image too large to decode ({width}x{height}, limit {limit} bytes)")]
    TooLarge { width: u32, height: u32, limit: usize },

    /// Neither ModelPixelScale+ModelTiepoint nor ModelTransformation is present
    #[error("Missing georeferencing tags")]
    MissingGeoreference,

    /// The pixel-to-world affine transform cannot be inverted
    #[error("Affine transform is not invertible")]
    DegenerateTransform,

    /// The blocking decode task died before producing a result
    #[error("Decode worker failed: {0}")]
    Worker(String),
}

/// Errors produced by the raster fetcher
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The metadata service does not know this snapshot
    #[error("Snapshot not found: {snapshot_id}")]
    NotFound { snapshot_id: String },

    /// The metadata document exists but does not point at a usable raster
    #[error("Metadata lookup failed for snapshot {snapshot_id}: {message}")]
    Lookup {
        snapshot_id: String,
        message: String,
    },

    /// Network or object storage failure
    #[error("Transfer error: {0}")]
    Transfer(#[from] IoError),

    /// Bytes were retrieved but are not a usable raster
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors returned by the raster source cache
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Fetching or decoding the source raster failed
    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[from] FetchError),

    /// The cache is full and configured to reject new snapshots
    #[error("Raster cache is full ({capacity} snapshots)")]
    CapacityExceeded { capacity: usize },

    /// The caller gave up waiting; the acquisition itself keeps running
    #[error("Timed out after {waited:?} waiting for snapshot {snapshot_id}")]
    Timeout {
        snapshot_id: String,
        waited: Duration,
    },

    /// The acquisition task terminated without publishing a result
    #[error("Acquisition of snapshot {snapshot_id} was aborted")]
    Aborted { snapshot_id: String },
}

/// Errors from the geography module
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("Unsupported projection: EPSG:{epsg} (only EPSG:4326 and EPSG:3857 are supported)")]
    UnsupportedProjection { epsg: u32 },
}

/// Errors that can occur while serving a tile or TileJSON document
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Zoom outside the configured range
    #[error("Zoom {zoom} is invalid (valid range: {min_zoom}-{max_zoom})")]
    InvalidZoom {
        zoom: u32,
        min_zoom: u32,
        max_zoom: u32,
    },

    /// Column or row outside `[0, 2^zoom)`
    #[error("Tile coordinates {x},{y} are invalid for zoom {zoom}")]
    InvalidTileCoordinate { zoom: u32, x: u32, y: u32 },

    /// Path segments could not be parsed into a tile address
    #[error("Invalid tile address: {message}")]
    MalformedAddress { message: String },

    /// Raster acquisition failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Raster is in a projection we cannot handle
    #[error(transparent)]
    Projection(#[from] GeoError),

    /// PNG encoding failed
    #[error("Failed to encode tile: {message}")]
    EncodeError { message: String },

    /// The blocking render task panicked or was cancelled
    #[error("Render worker failed: {message}")]
    Worker { message: String },
}
