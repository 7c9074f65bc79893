//! Deduplication of concurrent work by key.
//!
//! The first caller for a key starts the work on its own task; every caller
//! that arrives while it runs attaches to the same completion. Results are
//! published through a `watch` channel, so a waiter that attaches late still
//! sees a value that was sent before it subscribed.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

type Flights<K, V> = Arc<Mutex<HashMap<K, watch::Receiver<Option<V>>>>>;

/// Map from key to one shared, awaitable completion.
pub struct Singleflight<K, V> {
    flights: Flights<K, V>,
}

impl<K, V> Singleflight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Attach to the flight for `key`, starting `work` if none is running.
    ///
    /// `work` is only polled when this call becomes the leader. It runs on a
    /// spawned task, so dropping every [`Call`] does not cancel it. The key is
    /// released once `work` has completed (or panicked) and before its value
    /// is published.
    pub async fn join_or_start<F>(&self, key: K, work: F) -> Call<V>
    where
        F: Future<Output = V> + Send + 'static,
    {
        let mut flights = self.flights.lock().await;

        if let Some(rx) = flights.get(&key) {
            return Call {
                rx: rx.clone(),
                leader: false,
            };
        }

        let (tx, rx) = watch::channel(None);
        flights.insert(key.clone(), rx.clone());
        drop(flights);

        let registry = Arc::clone(&self.flights);
        let published = rx.clone();
        tokio::spawn(async move {
            let outcome = tokio::spawn(work).await;
            {
                let mut flights = registry.lock().await;
                if flights
                    .get(&key)
                    .is_some_and(|current| current.same_channel(&published))
                {
                    flights.remove(&key);
                }
            }
            // A panicked run publishes nothing; dropping `tx` wakes waiters
            if let Ok(value) = outcome {
                // Nobody may be listening any more
                let _ = tx.send(Some(value));
            }
        });

        Call { rx, leader: true }
    }

    /// Number of keys with work in progress.
    pub async fn in_flight(&self) -> usize {
        self.flights.lock().await.len()
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.flights.lock().await.contains_key(key)
    }
}

impl<K, V> Default for Singleflight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A caller's attachment to a flight.
pub struct Call<V> {
    rx: watch::Receiver<Option<V>>,
    leader: bool,
}

impl<V: Clone> Call<V> {
    /// Whether this call started the work.
    pub fn is_leader(&self) -> bool {
        self.leader
    }

    /// Wait for the shared result.
    ///
    /// Returns `None` if the work task ended without publishing, which only
    /// happens when it panicked or the runtime shut down.
    pub async fn wait(mut self) -> Option<V> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        }
    }
}
