use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use super::decode::decode_geotiff;
use super::lookup::MetadataLookup;
use super::raster::RasterHandle;
use crate::error::{DecodeError, FetchError};
use crate::io::ObjectReader;

/// Produces decoded rasters for snapshot identifiers.
///
/// Used by the raster cache on a miss. Implementations do no caching of their
/// own.
#[async_trait]
pub trait RasterFetcher: Send + Sync + 'static {
    async fn fetch(&self, snapshot_id: &str) -> Result<RasterHandle, FetchError>;
}

/// Fetcher that resolves the snapshot through a [`MetadataLookup`], reads the
/// whole object through an [`ObjectReader`] and decodes it as a GeoTIFF.
pub struct RemoteRasterFetcher<L, R> {
    lookup: L,
    reader: R,
}

impl<L, R> RemoteRasterFetcher<L, R>
where
    L: MetadataLookup + 'static,
    R: ObjectReader + 'static,
{
    pub fn new(lookup: L, reader: R) -> Self {
        Self { lookup, reader }
    }
}

#[async_trait]
impl<L, R> RasterFetcher for RemoteRasterFetcher<L, R>
where
    L: MetadataLookup + 'static,
    R: ObjectReader + 'static,
{
    async fn fetch(&self, snapshot_id: &str) -> Result<RasterHandle, FetchError> {
        let started = Instant::now();

        let location = self.lookup.resolve(snapshot_id).await?;
        let bytes = self.reader.read_object(&location).await?;
        let size = bytes.len();

        // Decoding is CPU-bound
        let handle = tokio::task::spawn_blocking(move || decode_geotiff(&bytes))
            .await
            .map_err(|e| DecodeError::Worker(e.to_string()))??;

        info!(
            snapshot_id,
            %location,
            bytes = size,
            width = handle.width(),
            height = handle.height(),
            epsg = handle.epsg(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched snapshot raster"
        );

        Ok(handle)
    }
}
