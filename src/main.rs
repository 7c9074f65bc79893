//! Snapshot Tiler - XYZ tiles and TileJSON from georeferenced snapshots.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapshot_tiler::{
    config::Config,
    io::{create_s3_client, S3ObjectReader},
    server::create_router,
    snapshot::{HttpMetadataLookup, RasterCache, RemoteRasterFetcher},
    tile::TileService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let api_base = match config.api_base_url() {
        Ok(url) => url,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Snapshot Tiler v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Metadata API: {}", api_base);
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.s3_region);
    info!(
        "  Cache: {} snapshots ({}), {}s acquire timeout",
        config.cache_snapshots,
        if config.reject_when_full {
            "reject when full"
        } else {
            "evict least recently used"
        },
        config.acquire_timeout_secs
    );
    info!(
        "  Tiles: {} px, zoom {}-{}",
        config.tile_size, config.min_zoom, config.max_zoom
    );
    if let Some(ref url) = config.public_url {
        info!("  Public URL: {}", url);
    }
    if let Some(prefix) = config.path_prefix() {
        info!("  Path prefix: {}", prefix);
    }

    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    let fetcher = RemoteRasterFetcher::new(
        HttpMetadataLookup::new(api_base),
        S3ObjectReader::new(s3_client),
    );
    let cache = RasterCache::with_config(fetcher, config.cache_config());

    let tile_service = TileService::new(cache)
        .with_zoom_range(config.zoom_range())
        .with_tile_size(config.tile_size());

    let router = create_router(tile_service, config.router_config());

    let addr = config.bind_address();
    let prefix = config.path_prefix().unwrap_or_default();

    info!("Server listening on: http://{}{}", addr, prefix);
    info!("  curl http://{}{}/health", addr, prefix);
    info!("  curl http://{}{}/snapshots/<id>/index.json", addr, prefix);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "snapshot_tiler=debug,tower_http=debug"
    } else {
        "snapshot_tiler=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
