//! Capacity-bounded cache of decoded snapshot rasters.
//!
//! The cache provides:
//! - LRU eviction over completed entries
//! - Singleflight: concurrent acquisitions of one snapshot share a single
//!   fetch and decode
//! - No poisoning: a failed acquisition leaves nothing behind, the next call
//!   starts afresh
//! - A per-caller wait limit that never cancels the shared acquisition
//!
//! # Example
//!
//! ```ignore
//! use snapshot_tiler::snapshot::{CacheConfig, RasterCache};
//!
//! let cache = RasterCache::with_config(fetcher, CacheConfig::new().capacity(50));
//! let raster = cache.acquire("abc123").await?;
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::fetcher::RasterFetcher;
use super::raster::RasterHandle;
use super::singleflight::Singleflight;
use crate::error::CacheError;

// =============================================================================
// Configuration
// =============================================================================

/// Default number of decoded snapshots kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Default time a caller waits for an acquisition.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// What happens when a new snapshot arrives at a full cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Drop the least recently used snapshot.
    #[default]
    Evict,
    /// Refuse the new snapshot with [`CacheError::CapacityExceeded`].
    Reject,
}

/// Raster cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
    pub policy: EvictionPolicy,
    pub acquire_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            policy: EvictionPolicy::default(),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

// =============================================================================
// RasterCache
// =============================================================================

type Acquisition = Result<Arc<RasterHandle>, CacheError>;

/// Keyed store from snapshot identifier to decoded raster.
///
/// Handles are shared as `Arc`s: eviction only removes the cache's own
/// reference, so a render holding a handle keeps it alive.
pub struct RasterCache<F: RasterFetcher> {
    inner: Arc<Inner<F>>,
}

struct Inner<F> {
    fetcher: F,
    entries: Mutex<LruCache<String, Arc<RasterHandle>>>,
    flights: Singleflight<String, Acquisition>,
    capacity: usize,
    policy: EvictionPolicy,
    acquire_timeout: Duration,
}

impl<F: RasterFetcher> RasterCache<F> {
    /// Create a cache with default settings.
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, CacheConfig::default())
    }

    /// Create a cache with custom settings.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_config(fetcher: F, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                entries: Mutex::new(LruCache::new(capacity)),
                flights: Singleflight::new(),
                capacity: capacity.get(),
                policy: config.policy,
                acquire_timeout: config.acquire_timeout,
            }),
        }
    }

    /// Get the raster for `snapshot_id`, fetching it on a miss.
    ///
    /// A hit returns immediately and refreshes recency. Otherwise the caller
    /// attaches to the running acquisition for this snapshot, or starts one.
    /// The hit/attach/start decision is made under the entry lock, so at most
    /// one fetch per snapshot is ever outstanding.
    ///
    /// Waiting is bounded by the configured acquire timeout. Timing out only
    /// abandons this caller's wait; the acquisition runs to completion and
    /// installs its result for later callers.
    pub async fn acquire(&self, snapshot_id: &str) -> Result<Arc<RasterHandle>, CacheError> {
        let call = {
            let mut entries = self.inner.entries.lock().await;

            if let Some(handle) = entries.get(snapshot_id) {
                debug!(snapshot_id, "Raster cache hit");
                return Ok(Arc::clone(handle));
            }

            let key = snapshot_id.to_string();

            if self.inner.policy == EvictionPolicy::Reject
                && entries.len() >= self.inner.capacity
                && !self.inner.flights.contains(&key).await
            {
                warn!(snapshot_id, capacity = self.inner.capacity, "Raster cache full");
                return Err(CacheError::CapacityExceeded {
                    capacity: self.inner.capacity,
                });
            }

            let inner = Arc::clone(&self.inner);
            let work_key = key.clone();
            self.inner
                .flights
                .join_or_start(key, async move { inner.load(work_key).await })
                .await
        };

        if call.is_leader() {
            debug!(snapshot_id, "Raster cache miss, fetching");
        } else {
            debug!(snapshot_id, "Joining in-flight acquisition");
        }

        match tokio::time::timeout(self.inner.acquire_timeout, call.wait()).await {
            Ok(Some(result)) => result,
            Ok(None) => Err(CacheError::Aborted {
                snapshot_id: snapshot_id.to_string(),
            }),
            Err(_) => {
                warn!(
                    snapshot_id,
                    timeout_ms = self.inner.acquire_timeout.as_millis() as u64,
                    "Gave up waiting for raster"
                );
                Err(CacheError::Timeout {
                    snapshot_id: snapshot_id.to_string(),
                    waited: self.inner.acquire_timeout,
                })
            }
        }
    }

    /// Remove a snapshot from the cache.
    ///
    /// Readers holding the handle keep it. An acquisition already in flight
    /// is unaffected and will install its result.
    pub async fn invalidate(&self, snapshot_id: &str) -> bool {
        self.inner.entries.lock().await.pop(snapshot_id).is_some()
    }

    /// Remove every cached snapshot.
    pub async fn clear(&self) {
        self.inner.entries.lock().await.clear();
    }

    /// Number of completed entries.
    pub async fn cached_count(&self) -> usize {
        self.inner.entries.lock().await.len()
    }

    /// Number of acquisitions in progress.
    pub async fn in_flight_count(&self) -> usize {
        self.inner.flights.in_flight().await
    }

    /// Whether `snapshot_id` is cached. Does not affect recency.
    pub async fn contains(&self, snapshot_id: &str) -> bool {
        self.inner.entries.lock().await.contains(snapshot_id)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.inner.policy
    }

    pub fn fetcher(&self) -> &F {
        &self.inner.fetcher
    }
}

impl<F: RasterFetcher> Inner<F> {
    /// Fetch, decode and install. Runs on the singleflight task.
    async fn load(self: Arc<Self>, snapshot_id: String) -> Acquisition {
        let started = Instant::now();

        let handle = match self.fetcher.fetch(&snapshot_id).await {
            Ok(handle) => Arc::new(handle),
            Err(err) => {
                warn!(snapshot_id, error = %err, "Raster acquisition failed");
                return Err(err.into());
            }
        };

        let mut entries = self.entries.lock().await;

        if self.policy == EvictionPolicy::Reject
            && entries.len() >= self.capacity
            && !entries.contains(&snapshot_id)
        {
            warn!(snapshot_id, capacity = self.capacity, "Raster cache filled during fetch");
            return Err(CacheError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        if let Some((evicted, _)) = entries.push(snapshot_id.clone(), Arc::clone(&handle)) {
            if evicted != snapshot_id {
                debug!(snapshot_id = %evicted, "Evicted raster");
            }
        }

        info!(
            snapshot_id,
            cached = entries.len(),
            bytes = handle.byte_size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cached snapshot raster"
        );

        Ok(handle)
    }
}

// =============================================================================
// Tests
// =============================================================================
