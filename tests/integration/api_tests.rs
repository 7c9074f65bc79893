//! API integration tests for tile and TileJSON retrieval.
//!
//! Tests verify:
//! - PNG tiles at 256 and 512 px with the right headers and pixels
//! - Address validation and the JSON error shape
//! - TileJSON values and base URL resolution
//! - Path prefix and CORS handling

use axum::http::StatusCode;
use axum::Router;

use snapshot_tiler::snapshot::RasterCache;
use snapshot_tiler::tile::{TileService, TileSize, ZoomRange};
use snapshot_tiler::{create_router, RouterConfig};

use super::test_utils::{
    assert_error_body, berlin_bounds, equator_bounds, get, get_with_headers, is_fully_transparent,
    CountingFetcher, GeoTiffFixture,
};

const RED: [u8; 3] = [200, 30, 30];

fn fetcher() -> CountingFetcher {
    CountingFetcher::new()
        .with_snapshot("berlin", GeoTiffFixture::mercator(berlin_bounds()).solid(RED))
        .with_snapshot(
            "equator",
            GeoTiffFixture::geographic(equator_bounds()).solid([0, 0, 255]),
        )
}

fn router_with(fetcher: CountingFetcher, config: RouterConfig) -> Router {
    let tile_service = TileService::new(RasterCache::new(fetcher));
    create_router(tile_service, config.with_tracing(false))
}

fn router(fetcher: CountingFetcher) -> Router {
    router_with(fetcher, RouterConfig::new())
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let response = get(&router(fetcher()), "/health").await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_tile_inside_snapshot() {
    let response = get(&router(fetcher()), "/snapshots/berlin/12/2200/1343.png").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(
        response.header("cache-control"),
        Some("public, max-age=31536000, immutable")
    );

    let image = response.image();
    assert_eq!(image.dimensions(), (256, 256));
    assert!(image.pixels().all(|p| p.0 == [RED[0], RED[1], RED[2], 255]));
}

#[tokio::test]
async fn test_retina_tile() {
    let response = get(&router(fetcher()), "/snapshots/berlin/12/2200/1343@2x.png").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.image().dimensions(), (512, 512));
}

#[tokio::test]
async fn test_tile_without_extension() {
    let response = get(&router(fetcher()), "/snapshots/berlin/12/2200/1343").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.image().dimensions(), (256, 256));
}

#[tokio::test]
async fn test_tile_on_snapshot_edge() {
    // Tile 10/550/335 holds the snapshot's north-east corner in its lower left
    let response = get(&router(fetcher()), "/snapshots/berlin/10/550/335.png").await;
    assert_eq!(response.status, StatusCode::OK);

    let image = response.image();
    assert_eq!(image.get_pixel(10, 230).0, [RED[0], RED[1], RED[2], 255]);
    assert_eq!(image.get_pixel(250, 230).0[3], 0);
    assert_eq!(image.get_pixel(10, 50).0[3], 0);
}

#[tokio::test]
async fn test_tile_outside_snapshot_is_transparent() {
    let response = get(&router(fetcher()), "/snapshots/berlin/12/0/0.png").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(is_fully_transparent(&response.image()));
}

#[tokio::test]
async fn test_geographic_snapshot_tile() {
    let response = get(&router(fetcher()), "/snapshots/equator/3/4/4.png").await;
    assert_eq!(response.status, StatusCode::OK);

    // Top-left of the tile at (0, 0) is inside [-10, -10, 10, 10]
    let image = response.image();
    assert_eq!(image.get_pixel(5, 5).0, [0, 0, 255, 255]);
}

#[tokio::test]
async fn test_custom_cache_max_age() {
    let router = router_with(fetcher(), RouterConfig::new().with_cache_max_age(60));
    let response = get(&router, "/snapshots/berlin/12/2200/1343.png").await;
    assert_eq!(
        response.header("cache-control"),
        Some("public, max-age=60, immutable")
    );
}

// =============================================================================
// Address Validation
// =============================================================================

#[tokio::test]
async fn test_invalid_zoom_does_not_fetch() {
    let fetcher = fetcher();
    let router = router(fetcher.clone());

    let response = get(&router, "/snapshots/berlin/25/0/0.png").await;
    let message = assert_error_body(&response, StatusCode::BAD_REQUEST);
    assert!(message.contains("25"), "{}", message);

    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_out_of_range_coordinates() {
    let fetcher = fetcher();
    let router = router(fetcher.clone());

    for uri in [
        "/snapshots/berlin/2/4/0.png",
        "/snapshots/berlin/2/0/4.png",
        "/snapshots/berlin/0/1/0@2x.png",
    ] {
        let response = get(&router, uri).await;
        assert_error_body(&response, StatusCode::BAD_REQUEST);
    }
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_malformed_address() {
    let fetcher = fetcher();
    let router = router(fetcher.clone());

    for uri in [
        "/snapshots/berlin/abc/0/0.png",
        "/snapshots/berlin/1/-1/0.png",
        "/snapshots/berlin/1/0/zero.png",
        "/snapshots/berlin/1/0/0.jpg",
        "/snapshots/berlin/1/0/0@3x.png",
        "/snapshots/berlin/+12/2200/1343.png",
        "/snapshots/berlin/12/+2200/+1343.png",
    ] {
        let response = get(&router, uri).await;
        assert_error_body(&response, StatusCode::BAD_REQUEST);
    }
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_configured_zoom_range() {
    let fetcher = fetcher();
    let tile_service = TileService::new(RasterCache::new(fetcher.clone()))
        .with_zoom_range(ZoomRange::new(5, 15));
    let router = create_router(tile_service, RouterConfig::new().with_tracing(false));

    let response = get(&router, "/snapshots/berlin/4/8/5.png").await;
    assert_error_body(&response, StatusCode::BAD_REQUEST);
    let response = get(&router, "/snapshots/berlin/16/0/0.png").await;
    assert_error_body(&response, StatusCode::BAD_REQUEST);
    assert_eq!(fetcher.total_calls(), 0);

    // A world-scale snapshot would start at zoom 2; the range floor wins
    let json = get(&router, "/snapshots/equator/index.json").await.json();
    assert_eq!(json["minzoom"], 5);
    assert_eq!(json["center"][2], 5);
    assert_eq!(json["maxzoom"], 9);
}

#[tokio::test]
async fn test_unknown_snapshot() {
    let response = get(&router(fetcher()), "/snapshots/nope/1/0/0.png").await;
    let message = assert_error_body(&response, StatusCode::NOT_FOUND);
    assert!(message.contains("nope"));

    let response = get(&router(fetcher()), "/snapshots/nope/index.json").await;
    assert_error_body(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route() {
    let response = get(&router(fetcher()), "/tiles/berlin/1/0/0.png").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// TileJSON
// =============================================================================

#[tokio::test]
async fn test_tilejson_values() {
    let router = router(fetcher());
    let response = get_with_headers(
        &router,
        "/snapshots/equator/index.json",
        &[("host", "tiles.example.org")],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["tilejson"], "2.0.0");
    assert_eq!(json["name"], "fp-snapshot-equator");
    assert_eq!(json["format"], "png");
    assert_eq!(json["minzoom"], 2);
    assert_eq!(json["maxzoom"], 9);
    assert_eq!(json["tileSize"], 512);
    assert_eq!(
        json["tiles"][0],
        "http://tiles.example.org/snapshots/equator/{z}/{x}/{y}@2x.png"
    );

    let center = json["center"].as_array().unwrap();
    assert!(center[0].as_f64().unwrap().abs() < 1e-9);
    assert!(center[1].as_f64().unwrap().abs() < 1e-9);
    assert_eq!(center[2], 4);

    let bounds: Vec<f64> = json["bounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    for (actual, expected) in bounds.iter().zip([-10.0, -10.0, 10.0, 10.0]) {
        assert!((actual - expected).abs() < 1e-9, "{:?}", bounds);
    }
}

#[tokio::test]
async fn test_tilejson_mercator_snapshot() {
    let response = get(&router(fetcher()), "/snapshots/berlin/index.json").await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    let minzoom = json["minzoom"].as_u64().unwrap();
    let maxzoom = json["maxzoom"].as_u64().unwrap();
    assert_eq!(maxzoom - minzoom, 7);
    assert_eq!(json["center"][2].as_u64().unwrap(), minzoom + 2);

    // Bounds round-trip through Web Mercator
    let bounds = json["bounds"].as_array().unwrap();
    assert!((bounds[0].as_f64().unwrap() - 13.3).abs() < 1e-6);
    assert!((bounds[1].as_f64().unwrap() - 52.45).abs() < 1e-6);
    assert!((bounds[2].as_f64().unwrap() - 13.5).abs() < 1e-6);
    assert!((bounds[3].as_f64().unwrap() - 52.55).abs() < 1e-6);
    assert!((json["center"][0].as_f64().unwrap() - 13.4).abs() < 1e-6);
}

#[tokio::test]
async fn test_tilejson_forwarded_proto() {
    let response = get_with_headers(
        &router(fetcher()),
        "/snapshots/berlin/index.json",
        &[("host", "tiles.example.org"), ("x-forwarded-proto", "https")],
    )
    .await;
    assert_eq!(
        response.json()["tiles"][0],
        "https://tiles.example.org/snapshots/berlin/{z}/{x}/{y}@2x.png"
    );
}

#[tokio::test]
async fn test_tilejson_public_url() {
    let router = router_with(
        fetcher(),
        RouterConfig::new().with_public_url("https://cdn.example.org/fp/"),
    );
    let response = get_with_headers(
        &router,
        "/snapshots/berlin/index.json",
        &[("host", "internal:8080")],
    )
    .await;
    assert_eq!(
        response.json()["tiles"][0],
        "https://cdn.example.org/fp/snapshots/berlin/{z}/{x}/{y}@2x.png"
    );
}

#[tokio::test]
async fn test_tilejson_standard_tile_size() {
    let tile_service =
        TileService::new(RasterCache::new(fetcher())).with_tile_size(TileSize::Standard);
    let router = create_router(tile_service, RouterConfig::new().with_tracing(false));

    let json = get(&router, "/snapshots/berlin/index.json").await.json();
    assert_eq!(json["tileSize"], 256);
    assert!(json["tiles"][0].as_str().unwrap().ends_with("/{z}/{x}/{y}.png"));
}

// =============================================================================
// Path Prefix and CORS
// =============================================================================

#[tokio::test]
async fn test_path_prefix() {
    let router = router_with(fetcher(), RouterConfig::new().with_path_prefix("/fp/"));

    assert_eq!(get(&router, "/fp/health").await.status, StatusCode::OK);
    assert_eq!(get(&router, "/health").await.status, StatusCode::NOT_FOUND);

    let tile = get(&router, "/fp/snapshots/berlin/12/2200/1343.png").await;
    assert_eq!(tile.status, StatusCode::OK);

    let json = get_with_headers(
        &router,
        "/fp/snapshots/berlin/index.json",
        &[("host", "example.org")],
    )
    .await
    .json();
    assert_eq!(
        json["tiles"][0],
        "http://example.org/fp/snapshots/berlin/{z}/{x}/{y}@2x.png"
    );
}

#[tokio::test]
async fn test_cors_any_origin() {
    let response = get_with_headers(
        &router(fetcher()),
        "/health",
        &[("origin", "https://fieldpapers.org")],
    )
    .await;
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let router = router_with(
        fetcher(),
        RouterConfig::new().with_cors_origins(vec!["https://fieldpapers.org".to_string()]),
    );

    let allowed =
        get_with_headers(&router, "/health", &[("origin", "https://fieldpapers.org")]).await;
    assert_eq!(
        allowed.header("access-control-allow-origin"),
        Some("https://fieldpapers.org")
    );

    let denied = get_with_headers(&router, "/health", &[("origin", "https://evil.example")]).await;
    assert!(denied.header("access-control-allow-origin").is_none());
}
