//! Configuration management for the snapshot tiler.
//!
//! Settings come from command-line arguments or environment variables with
//! the `TILER_` prefix, with defaults for everything.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use snapshot_tiler::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `TILER_HOST` - Server bind address (default: 0.0.0.0)
//! - `TILER_PORT` - Server port (default: 8080)
//! - `TILER_API_BASE_URL` - Snapshot metadata service (default: https://fieldpapers.org)
//! - `TILER_PUBLIC_URL` - Base URL advertised in TileJSON (default: from request)
//! - `TILER_PATH_PREFIX` - Mount point for all routes (default: none)
//! - `TILER_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `TILER_S3_REGION` - AWS region (default: us-east-1)
//! - `TILER_CACHE_SNAPSHOTS` - Max decoded snapshots to cache (default: 50)
//! - `TILER_REJECT_WHEN_FULL` - Refuse new snapshots instead of evicting (default: false)
//! - `TILER_TILE_SIZE` - Tile size advertised in TileJSON, 256 or 512 (default: 512)
//! - `TILER_MIN_ZOOM` / `TILER_MAX_ZOOM` - Served zoom range (default: 0-24)
//! - `TILER_ACQUIRE_TIMEOUT_SECS` - Per-request wait for a snapshot (default: 30)
//! - `TILER_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: one year)
//! - `TILER_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::server::{normalize_path_prefix, RouterConfig, DEFAULT_CACHE_MAX_AGE};
use crate::snapshot::{CacheConfig, EvictionPolicy, DEFAULT_CACHE_CAPACITY};
use crate::tile::{TileSize, ZoomRange, MAX_ZOOM, MIN_ZOOM};

// =============================================================================
// Default Values
// =============================================================================

pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 8080;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Default snapshot metadata service.
pub const DEFAULT_API_BASE_URL: &str = "https://fieldpapers.org";

pub const DEFAULT_TILE_SIZE: u32 = 512;

pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Snapshot Tiler - XYZ tiles and TileJSON from georeferenced snapshots.
///
/// Fetches snapshot GeoTIFFs from S3 on first use, keeps them decoded in
/// memory, and renders Web Mercator PNG tiles on demand.
#[derive(Parser, Debug, Clone)]
#[command(name = "snapshot-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "TILER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "TILER_PORT")]
    pub port: u16,

    /// Base URL advertised in TileJSON tile templates.
    ///
    /// If not specified, derived from the request's Host and
    /// X-Forwarded-Proto headers.
    #[arg(long, env = "TILER_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Path prefix to mount all routes under (e.g. /tiles).
    #[arg(long, env = "TILER_PATH_PREFIX")]
    pub path_prefix: Option<String>,

    // =========================================================================
    // Source Configuration
    // =========================================================================
    /// Base URL of the snapshot metadata service.
    #[arg(long, default_value = DEFAULT_API_BASE_URL, env = "TILER_API_BASE_URL")]
    pub api_base_url: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "TILER_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "TILER_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Maximum number of decoded snapshots to keep in memory.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY, env = "TILER_CACHE_SNAPSHOTS")]
    pub cache_snapshots: usize,

    /// Refuse new snapshots when the cache is full instead of evicting.
    #[arg(long, default_value_t = false, env = "TILER_REJECT_WHEN_FULL")]
    pub reject_when_full: bool,

    /// Seconds a request waits for a snapshot to be fetched and decoded.
    #[arg(long, default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS, env = "TILER_ACQUIRE_TIMEOUT_SECS")]
    pub acquire_timeout_secs: u64,

    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Tile size advertised in TileJSON (256 or 512).
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "TILER_TILE_SIZE")]
    pub tile_size: u32,

    /// Lowest zoom level served.
    #[arg(long, default_value_t = MIN_ZOOM, env = "TILER_MIN_ZOOM")]
    pub min_zoom: u32,

    /// Highest zoom level served.
    #[arg(long, default_value_t = MAX_ZOOM, env = "TILER_MAX_ZOOM")]
    pub max_zoom: u32,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "TILER_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "TILER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_snapshots == 0 {
            return Err("cache_snapshots must be greater than 0".to_string());
        }

        if TileSize::from_pixels(self.tile_size).is_none() {
            return Err(format!(
                "tile_size must be 256 or 512, got {}",
                self.tile_size
            ));
        }

        if self.max_zoom > MAX_ZOOM {
            return Err(format!("max_zoom must be at most {}", MAX_ZOOM));
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must not exceed max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }

        if self.acquire_timeout_secs == 0 {
            return Err("acquire_timeout_secs must be greater than 0".to_string());
        }

        parse_http_url("api_base_url", &self.api_base_url)?;
        if let Some(public_url) = &self.public_url {
            parse_http_url("public_url", public_url)?;
        }
        if let Some(endpoint) = &self.s3_endpoint {
            parse_http_url("s3_endpoint", endpoint)?;
        }

        if let Some(prefix) = &self.path_prefix {
            if prefix
                .chars()
                .any(|c| matches!(c, '{' | '}' | '?' | '#' | '*'))
            {
                return Err(format!("path_prefix contains invalid characters: {}", prefix));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn cache_config(&self) -> CacheConfig {
        let policy = if self.reject_when_full {
            EvictionPolicy::Reject
        } else {
            EvictionPolicy::Evict
        };
        CacheConfig::new()
            .capacity(self.cache_snapshots)
            .policy(policy)
            .acquire_timeout(self.acquire_timeout())
    }

    pub fn zoom_range(&self) -> ZoomRange {
        ZoomRange::new(self.min_zoom, self.max_zoom)
    }

    /// Advertised tile size; falls back to 512 px (call validate() first).
    pub fn tile_size(&self) -> TileSize {
        TileSize::from_pixels(self.tile_size).unwrap_or(TileSize::Retina)
    }

    /// Parsed metadata service URL (call validate() first).
    pub fn api_base_url(&self) -> Result<Url, String> {
        parse_http_url("api_base_url", &self.api_base_url)
    }

    /// Normalized path prefix, if any.
    pub fn path_prefix(&self) -> Option<String> {
        self.path_prefix.as_deref().and_then(normalize_path_prefix)
    }

    pub fn router_config(&self) -> RouterConfig {
        let mut config = RouterConfig::new()
            .with_cache_max_age(self.cache_max_age)
            .with_tracing(!self.no_tracing);

        if let Some(origins) = &self.cors_origins {
            config = config.with_cors_origins(origins.clone());
        }
        if let Some(url) = &self.public_url {
            config = config.with_public_url(url.clone());
        }
        if let Some(prefix) = &self.path_prefix {
            config = config.with_path_prefix(prefix);
        }
        config
    }
}

fn parse_http_url(name: &str, raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("{} is not a valid URL ({}): {}", name, e, raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("{} must use http or https, got {}", name, other)),
    }
}

// =============================================================================
// Tests
// =============================================================================
