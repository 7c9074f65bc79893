//! Snapshot raster layer.
//!
//! This module turns a snapshot identifier into a decoded, georeferenced
//! raster held in memory and shared by every render that needs it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! └────────────────────┬────────────────────┘
//!                      │ acquire(id)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             RasterCache                 │
//! │  (LRU of decoded rasters, singleflight) │
//! └────────────────────┬────────────────────┘
//!                      │ on miss
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        RasterFetcher Trait              │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┼────────────────┐
//!          ▼           ▼                ▼
//! ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//! │MetadataLookup│ │ ObjectReader │ │decode_geotiff│
//! │ (snapshot    │ │ (S3 GET)     │ │ (tiff crate) │
//! │  API)        │ │              │ │              │
//! └──────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use snapshot_tiler::io::{create_s3_client, S3ObjectReader};
//! use snapshot_tiler::snapshot::{HttpMetadataLookup, RasterCache, RemoteRasterFetcher};
//!
//! let lookup = HttpMetadataLookup::new("https://fieldpapers.org".parse()?);
//! let reader = S3ObjectReader::new(create_s3_client(None, "us-east-1").await);
//! let cache = RasterCache::new(RemoteRasterFetcher::new(lookup, reader));
//!
//! let raster = cache.acquire("abc123").await?;
//! println!("{}x{} in EPSG:{}", raster.width(), raster.height(), raster.epsg());
//! ```

mod cache;
mod decode;
mod fetcher;
mod lookup;
mod raster;
mod singleflight;

pub use cache::{
    CacheConfig, EvictionPolicy, RasterCache, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_CACHE_CAPACITY,
};
pub use decode::{decode_geotiff, decode_geotiff_with_limit, MAX_DECODED_BYTES};
pub use fetcher::{RasterFetcher, RemoteRasterFetcher};
pub use lookup::{parse_metadata, HttpMetadataLookup, MetadataLookup};
pub use raster::{BandLayout, RasterHandle};
pub use singleflight::{Call, Singleflight};
