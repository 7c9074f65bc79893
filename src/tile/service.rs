//! Tile Service for orchestrating tile generation.
//!
//! The TileService is the main entry point for tile and TileJSON requests. It
//! orchestrates:
//! - Address validation, before any raster is touched
//! - Raster acquisition through the shared cache
//! - Rendering and PNG encoding on a blocking worker thread
//! - TileJSON assembly from the raster's geographic extent
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Validate address   3. Render (spawn_blocking)       │    │
//! │  │  2. Acquire raster     4. Encode PNG                    │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌─────────────┐     ┌──────────────┐    ┌────────────────┐   │
//! │    │ RasterCache │     │  rasterizer  │    │ PngTileEncoder │   │
//! │    └─────────────┘     └──────────────┘    └────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::debug;

use crate::error::TileError;
use crate::snapshot::{RasterCache, RasterFetcher};

use super::address::{TileAddress, TileSize, ZoomRange};
use super::encoder::PngTileEncoder;
use super::rasterizer::render;
use super::tilejson::{build_tilejson, snapshot_layer_name, snapshot_tile_url_template, TileJson};

// =============================================================================
// Tile Request
// =============================================================================

/// A request for a tile.
#[derive(Debug, Clone)]
pub struct TileRequest {
    /// Snapshot identifier
    pub snapshot_id: String,

    pub address: TileAddress,

    /// Output size (256 px, or 512 px for `@2x`)
    pub tile_size: TileSize,
}

impl TileRequest {
    /// Create a request for a standard 256 px tile.
    pub fn new(snapshot_id: impl Into<String>, zoom: u32, x: u32, y: u32) -> Self {
        Self::with_size(snapshot_id, zoom, x, y, TileSize::Standard)
    }

    pub fn with_size(
        snapshot_id: impl Into<String>,
        zoom: u32,
        x: u32,
        y: u32,
        tile_size: TileSize,
    ) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            address: TileAddress::new(zoom, x, y),
            tile_size,
        }
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded PNG tile data
    pub data: Bytes,

    pub tile_size: TileSize,
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service for rendering tiles and TileJSON documents.
///
/// # Type Parameters
///
/// * `F` - The raster fetcher used by the cache on a miss
///
/// # Example
///
/// ```ignore
/// use snapshot_tiler::snapshot::RasterCache;
/// use snapshot_tiler::tile::{TileRequest, TileService, TileSize};
///
/// let service = TileService::new(RasterCache::new(fetcher)).with_tile_size(TileSize::Retina);
///
/// let response = service.get_tile(TileRequest::new("abc123", 12, 2200, 1343)).await?;
/// println!("Tile size: {} bytes", response.data.len());
/// ```
pub struct TileService<F: RasterFetcher> {
    /// Shared cache of decoded rasters
    cache: Arc<RasterCache<F>>,

    encoder: PngTileEncoder,

    /// Zoom levels served
    zoom_range: ZoomRange,

    /// Tile size advertised in TileJSON
    tile_size: TileSize,
}

impl<F: RasterFetcher> TileService<F> {
    /// Create a tile service with the default zoom range and 512 px tiles.
    pub fn new(cache: RasterCache<F>) -> Self {
        Self::with_shared_cache(Arc::new(cache))
    }

    /// Create a tile service over a cache shared with other components.
    pub fn with_shared_cache(cache: Arc<RasterCache<F>>) -> Self {
        Self {
            cache,
            encoder: PngTileEncoder::new(),
            zoom_range: ZoomRange::default(),
            tile_size: TileSize::Retina,
        }
    }

    pub fn with_zoom_range(mut self, zoom_range: ZoomRange) -> Self {
        self.zoom_range = zoom_range;
        self
    }

    pub fn with_tile_size(mut self, tile_size: TileSize) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_encoder(mut self, encoder: PngTileEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn zoom_range(&self) -> ZoomRange {
        self.zoom_range
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn cache(&self) -> &Arc<RasterCache<F>> {
        &self.cache
    }

    /// Render and encode a tile.
    ///
    /// The address is validated first, so a malformed request never reaches
    /// the cache or the fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The zoom or tile coordinates are out of range
    /// - The raster cannot be acquired
    /// - The raster's projection is not supported
    /// - Rendering or encoding fails
    pub async fn get_tile(&self, request: TileRequest) -> Result<TileResponse, TileError> {
        request.address.validate(self.zoom_range)?;

        let raster = self.cache.acquire(&request.snapshot_id).await?;

        let started = Instant::now();
        let address = request.address;
        let tile_size = request.tile_size;
        let zoom_range = self.zoom_range;
        let encoder = self.encoder;

        // Rendering and encoding are CPU-bound
        let data = tokio::task::spawn_blocking(move || {
            let tile = render(&raster, address, tile_size, zoom_range)?;
            encoder.encode(&tile)
        })
        .await
        .map_err(|e| TileError::Worker {
            message: e.to_string(),
        })??;

        debug!(
            snapshot_id = %request.snapshot_id,
            tile = %address,
            size = tile_size.pixels(),
            bytes = data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered tile"
        );

        Ok(TileResponse { data, tile_size })
    }

    /// Build the TileJSON document for a snapshot.
    ///
    /// `base_url` is the externally visible root of this service; tile URLs
    /// are formed beneath it.
    pub async fn tilejson(&self, snapshot_id: &str, base_url: &str) -> Result<TileJson, TileError> {
        let raster = self.cache.acquire(snapshot_id).await?;
        let bounds = raster.geographic_bounds()?;
        let template = snapshot_tile_url_template(base_url, snapshot_id, self.tile_size);

        Ok(
            build_tilejson(&bounds, &template, self.tile_size, self.zoom_range.max)
                .clamp_zooms(self.zoom_range)
                .with_name(snapshot_layer_name(snapshot_id)),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
