//! Router configuration for the snapshot tiler.
//!
//! # Route Structure
//!
//! ```text
//! /health                                         - Health check
//! /snapshots/{snapshot_id}/index.json             - TileJSON
//! /snapshots/{snapshot_id}/{z}/{x}/{y}[@2x].png   - Tile endpoint
//! ```
//!
//! All routes are mounted beneath the configured path prefix, if any.
//!
//! # Example
//!
//! ```ignore
//! use snapshot_tiler::server::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://fieldpapers.org".to_string()])
//!     .with_path_prefix("/tiles");
//!
//! let router = create_router(tile_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_handler, tile_handler, tilejson_handler, AppState, DEFAULT_CACHE_MAX_AGE,
};
use crate::snapshot::RasterFetcher;
use crate::tile::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age for tiles, in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Externally visible base URL used in TileJSON
    pub public_url: Option<String>,

    /// Normalized mount point (`/a/b`), or None for the root
    pub path_prefix: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is one year
    /// - Tracing is enabled
    /// - Routes are mounted at the root
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            enable_tracing: true,
            public_url: None,
            path_prefix: None,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Mount all routes beneath `prefix`.
    ///
    /// Leading and trailing slashes are normalized; an empty prefix or `/`
    /// mounts at the root.
    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = normalize_path_prefix(prefix);
        self
    }
}

/// Normalize a mount point to `/segment/...` with no trailing slash.
pub fn normalize_path_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Health, TileJSON and tile routes
/// - Optional path prefix
/// - CORS configuration
/// - Request tracing (optional)
pub fn create_router<F: RasterFetcher>(tile_service: TileService<F>, config: RouterConfig) -> Router {
    let app_state = AppState::new(tile_service)
        .with_cache_max_age(config.cache_max_age)
        .with_public_url(config.public_url.clone())
        .with_path_prefix(config.path_prefix.clone().unwrap_or_default());

    let cors = build_cors_layer(&config);

    // {filename} captures "{y}", "{y}.png" and "{y}@2x.png"
    let routes = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/snapshots/{snapshot_id}/index.json",
            get(tilejson_handler::<F>),
        )
        .route(
            "/snapshots/{snapshot_id}/{z}/{x}/{filename}",
            get(tile_handler::<F>),
        )
        .with_state(app_state);

    let router = match &config.path_prefix {
        Some(prefix) => Router::new().nest(prefix, routes),
        None => routes,
    }
    .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
