//! HTTP server layer for the snapshot tiler.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /snapshots/{id}/index.json   GET /snapshots/{id}/z/x/y    │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │          routes             │  │
//! │  │ (requests, error bodies) │  │ (prefix, CORS, tracing)     │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    error_status, health_handler, request_base_url, tile_handler, tilejson_handler, AppState,
    ErrorBody, ErrorResponse, HandlerError, HealthResponse, TilePathParams, DEFAULT_CACHE_MAX_AGE,
};
pub use routes::{create_router, normalize_path_prefix, RouterConfig};
