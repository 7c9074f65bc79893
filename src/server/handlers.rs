//! HTTP request handlers for the snapshot tile API.
//!
//! # Endpoints
//!
//! - `GET /snapshots/{snapshot_id}/{z}/{x}/{y}.png` - Serve a 256 px tile
//! - `GET /snapshots/{snapshot_id}/{z}/{x}/{y}@2x.png` - Serve a 512 px tile
//! - `GET /snapshots/{snapshot_id}/index.json` - TileJSON for a snapshot
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{CacheError, DecodeError, FetchError, IoError, TileError};
use crate::snapshot::RasterFetcher;
use crate::tile::{parse_tile_filename, parse_tile_index, TileJson, TileRequest, TileService};

/// One year, the default for immutable snapshot tiles
pub const DEFAULT_CACHE_MAX_AGE: u32 = 31_536_000;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F: RasterFetcher> {
    /// The tile service for processing tile and TileJSON requests
    pub tile_service: Arc<TileService<F>>,

    /// Cache-Control max-age for tiles, in seconds
    pub cache_max_age: u32,

    /// Externally visible base URL; derived from request headers when unset
    pub public_url: Option<String>,

    /// Prefix the router is mounted under, e.g. `/tiles`
    pub path_prefix: String,
}

impl<F: RasterFetcher> AppState<F> {
    pub fn new(tile_service: TileService<F>) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            public_url: None,
            path_prefix: String::new(),
        }
    }

    pub fn with_cache_max_age(mut self, cache_max_age: u32) -> Self {
        self.cache_max_age = cache_max_age;
        self
    }

    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url;
        self
    }

    pub fn with_path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.path_prefix = path_prefix.into();
        self
    }

    /// Base URL that TileJSON tile templates are formed under.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        request_base_url(self.public_url.as_deref(), &self.path_prefix, headers)
    }
}

impl<F: RasterFetcher> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            cache_max_age: self.cache_max_age,
            public_url: self.public_url.clone(),
            path_prefix: self.path_prefix.clone(),
        }
    }
}

/// Resolve the externally visible base URL.
///
/// Uses `public_url` when configured, or else `{proto}://{host}{path_prefix}`
/// where `proto` comes from `X-Forwarded-Proto` (default `http`).
pub fn request_base_url(public_url: Option<&str>, path_prefix: &str, headers: &HeaderMap) -> String {
    if let Some(url) = public_url {
        return url.trim_end_matches('/').to_string();
    }

    let proto = header_str(headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = header_str(headers, header::HOST.as_str()).unwrap_or("localhost");

    format!("{}://{}{}", proto, host, path_prefix)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/snapshots/{snapshot_id}/{z}/{x}/{filename}`
/// where filename is `{y}.png`, `{y}@2x.png` or a bare `{y}`.
///
/// Zoom and column are kept as strings so that malformed values produce the
/// JSON error body instead of the extractor's plain-text rejection.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub snapshot_id: String,
    pub z: String,
    pub x: String,
    pub filename: String,
}

impl TilePathParams {
    /// Parse the path segments into a tile request.
    pub fn to_request(&self) -> Result<TileRequest, TileError> {
        let zoom = parse_segment("zoom", &self.z)?;
        let x = parse_segment("x", &self.x)?;
        let (y, tile_size) = parse_tile_filename(&self.filename)?;

        Ok(TileRequest::with_size(
            self.snapshot_id.clone(),
            zoom,
            x,
            y,
            tile_size,
        ))
    }
}

fn parse_segment(name: &str, value: &str) -> Result<u32, TileError> {
    parse_tile_index(value).ok_or_else(|| TileError::MalformedAddress {
        message: format!("{} must be a non-negative integer, got {:?}", name, value),
    })
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
///
/// Serialized as `{"error": {"message": "...", "status": 404}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
                status: status.as_u16(),
            },
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// HTTP status for a tile error.
pub fn error_status(err: &TileError) -> StatusCode {
    match err {
        TileError::InvalidZoom { .. }
        | TileError::InvalidTileCoordinate { .. }
        | TileError::MalformedAddress { .. } => StatusCode::BAD_REQUEST,

        TileError::Cache(cache_err) => match cache_err {
            CacheError::SourceUnavailable(fetch_err) => match fetch_err {
                FetchError::NotFound { .. } | FetchError::Transfer(IoError::NotFound(_)) => {
                    StatusCode::NOT_FOUND
                }
                FetchError::Decode(DecodeError::Worker(_)) => StatusCode::INTERNAL_SERVER_ERROR,
                FetchError::Lookup { .. } | FetchError::Transfer(_) | FetchError::Decode(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            CacheError::CapacityExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Aborted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },

        TileError::Projection(_) | TileError::EncodeError { .. } | TileError::Worker { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Convert TileError to HTTP response.
///
/// Errors are logged by severity:
/// - 404s at DEBUG level (common and expected)
/// - other 4xx errors at WARN level
/// - 5xx errors at ERROR level
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), "Server error: {}", message);
        } else if status == StatusCode::NOT_FOUND {
            debug!(status = status.as_u16(), "Resource not found: {}", message);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", message);
        }

        (status, Json(ErrorResponse::new(message, status))).into_response()
    }
}

/// Wrapper for handler errors to implement IntoResponse.
pub struct HandlerError(pub TileError);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl From<TileError> for HandlerError {
    fn from(err: TileError) -> Self {
        HandlerError(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /snapshots/{snapshot_id}/{z}/{x}/{y}.png` (or `{y}@2x.png`)
///
/// # Response
///
/// - `200 OK`: PNG tile with `Content-Type: image/png`
/// - `400 Bad Request`: Malformed or out-of-range tile address
/// - `404 Not Found`: Unknown snapshot or missing source object
/// - `502 Bad Gateway`: Metadata, storage or GeoTIFF decode failure
/// - `503 Service Unavailable`: Cache full in reject mode
/// - `504 Gateway Timeout`: Acquisition did not finish in time
///
/// # Headers
///
/// - `Content-Type: image/png`
/// - `Cache-Control: public, max-age={cache_max_age}, immutable`
pub async fn tile_handler<F: RasterFetcher>(
    State(state): State<AppState<F>>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, HandlerError> {
    let request = params.to_request()?;
    let response = state.tile_service.get_tile(request).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}, immutable", state.cache_max_age),
            ),
        ],
        response.data,
    )
        .into_response())
}

/// Handle TileJSON requests.
///
/// # Endpoint
///
/// `GET /snapshots/{snapshot_id}/index.json`
pub async fn tilejson_handler<F: RasterFetcher>(
    State(state): State<AppState<F>>,
    Path(snapshot_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TileJson>, HandlerError> {
    let base_url = state.base_url(&headers);
    let doc = state
        .tile_service
        .tilejson(&snapshot_id, &base_url)
        .await?;
    Ok(Json(doc))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
