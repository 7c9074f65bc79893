//! End-to-end tests of the remote fetch pipeline.
//!
//! Snapshots are resolved through a metadata lookup, read from an object
//! store and decoded as GeoTIFFs, with in-memory fakes at both seams.

use axum::http::StatusCode;
use axum::Router;

use snapshot_tiler::io::ObjectLocation;
use snapshot_tiler::snapshot::{RasterCache, RemoteRasterFetcher};
use snapshot_tiler::tile::TileService;
use snapshot_tiler::{create_router, RouterConfig};

use super::test_utils::{
    assert_error_body, berlin_bounds, get, GeoTiffFixture, MemoryLookup, MemoryObjectStore,
};

struct Pipeline {
    router: Router,
    lookup: MemoryLookup,
    store: MemoryObjectStore,
}

fn pipeline(lookup: MemoryLookup, store: MemoryObjectStore) -> Pipeline {
    let fetcher = RemoteRasterFetcher::new(lookup.clone(), store.clone());
    let router = create_router(
        TileService::new(RasterCache::new(fetcher)),
        RouterConfig::new().with_tracing(false),
    );
    Pipeline {
        router,
        lookup,
        store,
    }
}

fn location(key: &str) -> ObjectLocation {
    ObjectLocation::new("snapshots.example", key)
}

#[tokio::test]
async fn test_resolve_read_decode_render() {
    let p = pipeline(
        MemoryLookup::new().with_snapshot("abc", location("abc/walking-paper.tif")),
        MemoryObjectStore::new().with_object(
            location("abc/walking-paper.tif"),
            GeoTiffFixture::mercator(berlin_bounds()).solid([1, 2, 3]),
        ),
    );

    let response = get(&p.router, "/snapshots/abc/12/2200/1343.png").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.image().get_pixel(128, 128).0, [1, 2, 3, 255]);

    let response = get(&p.router, "/snapshots/abc/index.json").await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(p.lookup.resolve_count(), 1);
    assert_eq!(p.store.read_count(), 1);
}

#[tokio::test]
async fn test_geographic_source() {
    let p = pipeline(
        MemoryLookup::new().with_snapshot("geo", location("geo.tif")),
        MemoryObjectStore::new().with_object(
            location("geo.tif"),
            GeoTiffFixture::geographic(berlin_bounds()).solid([9, 9, 9]),
        ),
    );

    let response = get(&p.router, "/snapshots/geo/12/2200/1343@2x.png").await;
    assert_eq!(response.status, StatusCode::OK);

    let image = response.image();
    assert_eq!(image.dimensions(), (512, 512));
    assert_eq!(image.get_pixel(256, 256).0, [9, 9, 9, 255]);
}

#[tokio::test]
async fn test_nodata_pixels_are_transparent() {
    let fixture = GeoTiffFixture::mercator(berlin_bounds()).with_nodata(0);
    // West half of the raster has no-data in its red band
    let geotiff = fixture.rgb(|col, _| if col < 32 { [0, 80, 90] } else { [50, 60, 70] });
    let p = pipeline(
        MemoryLookup::new().with_snapshot("nd", location("nd.tif")),
        MemoryObjectStore::new().with_object(location("nd.tif"), geotiff),
    );

    // Tile 10/550/335 holds the raster's eastern part, split at 13.4 degrees
    let response = get(&p.router, "/snapshots/nd/10/550/335.png").await;
    assert_eq!(response.status, StatusCode::OK);

    let image = response.image();
    assert_eq!(image.get_pixel(10, 230).0[3], 0);
    assert_eq!(image.get_pixel(66, 230).0, [50, 60, 70, 255]);
    assert!(image
        .pixels()
        .all(|p| p.0[3] == 0 || p.0 == [50, 60, 70, 255]));
}

#[tokio::test]
async fn test_unknown_snapshot_skips_storage() {
    let p = pipeline(MemoryLookup::new(), MemoryObjectStore::new());

    let response = get(&p.router, "/snapshots/ghost/index.json").await;
    assert_error_body(&response, StatusCode::NOT_FOUND);
    assert_eq!(p.lookup.resolve_count(), 1);
    assert_eq!(p.store.read_count(), 0);
}

#[tokio::test]
async fn test_missing_object() {
    let p = pipeline(
        MemoryLookup::new().with_snapshot("gone", location("gone.tif")),
        MemoryObjectStore::new(),
    );

    let response = get(&p.router, "/snapshots/gone/1/0/0.png").await;
    let message = assert_error_body(&response, StatusCode::NOT_FOUND);
    assert!(message.contains("gone.tif"), "{}", message);
}

#[tokio::test]
async fn test_corrupt_object() {
    let p = pipeline(
        MemoryLookup::new().with_snapshot("bad", location("bad.tif")),
        MemoryObjectStore::new().with_object(location("bad.tif"), b"not a tiff at all".to_vec()),
    );

    let response = get(&p.router, "/snapshots/bad/1/0/0.png").await;
    assert_error_body(&response, StatusCode::BAD_GATEWAY);
    assert!(response.status.is_server_error());

    // Decode failures are not cached
    get(&p.router, "/snapshots/bad/1/0/0.png").await;
    assert_eq!(p.store.read_count(), 2);
}
