//! # Snapshot Tiler
//!
//! A map tile server for georeferenced snapshots (scanned, rectified paper
//! maps) stored as GeoTIFFs in S3-compatible object storage.
//!
//! Each snapshot is fetched and decoded once, kept in memory, and then
//! resampled on demand into Web Mercator XYZ tiles. A TileJSON document per
//! snapshot advertises its bounds, center and useful zoom range.
//!
//! ## Features
//!
//! - **On-demand rendering**: 256 px and `@2x` 512 px PNG tiles with transparency outside the map
//! - **Shared acquisition**: concurrent requests for a cold snapshot trigger a single fetch
//! - **Bounded memory**: an LRU of decoded rasters, evicting or rejecting when full
//! - **TileJSON**: zoom range and center derived from the snapshot's extent
//!
//! ## Architecture
//!
//! - [`geo`] - Projections, affine geotransforms and slippy-map tile math
//! - [`io`] - Object storage access
//! - [`snapshot`] - Metadata lookup, GeoTIFF decoding and the raster cache
//! - [`tile`] - Rasterizer, PNG encoding, TileJSON and the tile service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,ignore
//! use snapshot_tiler::{
//!     create_router, create_s3_client, HttpMetadataLookup, RasterCache, RemoteRasterFetcher,
//!     RouterConfig, S3ObjectReader, TileService,
//! };
//!
//! let fetcher = RemoteRasterFetcher::new(
//!     HttpMetadataLookup::new("https://fieldpapers.org".parse()?),
//!     S3ObjectReader::new(create_s3_client(None, "us-east-1").await),
//! );
//! let router = create_router(TileService::new(RasterCache::new(fetcher)), RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod io;
pub mod server;
pub mod snapshot;
pub mod tile;

// Re-export commonly used types
pub use config::Config;
pub use error::{CacheError, DecodeError, FetchError, GeoError, IoError, TileError};
pub use geo::{bbox_to_smallest_tile, reproject, tile_to_bbox, BoundingBox, Crs, GeoTransform};
pub use io::{create_s3_client, ObjectLocation, ObjectReader, S3ObjectReader};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use snapshot::{
    decode_geotiff, BandLayout, CacheConfig, EvictionPolicy, HttpMetadataLookup, MetadataLookup,
    RasterCache, RasterFetcher, RasterHandle, RemoteRasterFetcher,
};
pub use tile::{
    build_tilejson, render, PngTileEncoder, TileAddress, TileJson, TileRequest, TileResponse,
    TileService, TileSize, ZoomRange,
};
