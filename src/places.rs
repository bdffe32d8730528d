//! Resolving stop ids into [`Stop`]s through the place-detail service.
//!
//! Lookups go through a [`PlaceCache`] owned by the resolver. Entries expire
//! after a fixed time-to-live, checked whenever they are read.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::Stop;
use crate::traits::PlaceDetailsProvider;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceError {
    #[error("place {id} not found")]
    NotFound { id: String },
    #[error("place {id} has no location")]
    MissingLocation { id: String },
    #[error("place lookup failed for {id}: {reason}")]
    Lookup { id: String, reason: String },
    #[error("none of the {requested} requested places could be resolved")]
    NoneResolved { requested: usize },
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    /// Ids fetched in parallel per batch.
    pub batch_size: usize,
    /// Pause between batches.
    pub batch_pause: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            batch_size: 10,
            batch_pause: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
struct CachedPlace {
    stop: Stop,
    fetched_at: Instant,
}

/// Time-bounded cache of resolved places, keyed by id.
#[derive(Debug, Clone)]
pub struct PlaceCache {
    ttl: Duration,
    entries: HashMap<String, CachedPlace>,
}

impl PlaceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// The cached stop, unless missing or expired at `now`.
    pub fn get(&self, id: &str, now: Instant) -> Option<&Stop> {
        self.entries
            .get(id)
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < self.ttl)
            .map(|entry| &entry.stop)
    }

    pub fn insert(&mut self, stop: Stop, now: Instant) {
        self.entries.insert(
            stop.id.clone(),
            CachedPlace {
                stop,
                fetched_at: now,
            },
        );
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn clear_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.fetched_at) < ttl);
        before - self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            ttl: self.ttl,
        }
    }
}

impl Default for PlaceCache {
    fn default() -> Self {
        Self::new(CacheConfig::default().ttl)
    }
}

/// Resolves ids through a provider, consulting its cache first.
#[derive(Debug)]
pub struct StopResolver<P> {
    provider: P,
    cache: PlaceCache,
    config: CacheConfig,
}

impl<P: PlaceDetailsProvider + Sync> StopResolver<P> {
    pub fn new(provider: P, config: CacheConfig) -> Self {
        let cache = PlaceCache::new(config.ttl);
        Self::with_cache(provider, cache, config)
    }

    pub fn with_cache(provider: P, cache: PlaceCache, config: CacheConfig) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &PlaceCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut PlaceCache {
        &mut self.cache
    }

    /// Resolve `ids` in the requested order.
    ///
    /// Ids that fail to resolve are logged and skipped. Fails only when
    /// nothing at all could be resolved.
    pub fn resolve(&mut self, ids: &[String]) -> Result<Vec<Stop>, PlaceError> {
        self.resolve_at(ids, Instant::now())
    }

    pub fn resolve_at(&mut self, ids: &[String], now: Instant) -> Result<Vec<Stop>, PlaceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut missing: Vec<&String> = Vec::new();
        for id in ids {
            if self.cache.get(id, now).is_none() && !missing.contains(&id) {
                missing.push(id);
            }
        }
        debug!(
            requested = ids.len(),
            cached = ids.len() - missing.len(),
            "resolving places"
        );

        let batch_size = self.config.batch_size.max(1);
        let batches = missing.chunks(batch_size).count();
        for (batch_index, batch) in missing.chunks(batch_size).enumerate() {
            let provider = &self.provider;
            let results: Vec<_> = batch
                .par_iter()
                .map(|id| (*id, provider.place_details(id)))
                .collect();

            for (id, result) in results {
                match result {
                    Ok(stop) => self.cache.insert(stop, now),
                    Err(err) => warn!(id = %id, error = %err, "skipping unresolved place"),
                }
            }

            if batch_index + 1 < batches && !self.config.batch_pause.is_zero() {
                std::thread::sleep(self.config.batch_pause);
            }
        }

        let stops: Vec<Stop> = ids
            .iter()
            .filter_map(|id| self.cache.get(id, now).cloned())
            .collect();

        if stops.is_empty() {
            return Err(PlaceError::NoneResolved {
                requested: ids.len(),
            });
        }
        if stops.len() < ids.len() {
            warn!(resolved = stops.len(), requested = ids.len(), "some places could not be resolved");
        } else {
            info!(resolved = stops.len(), "resolved all places");
        }

        Ok(stops)
    }
}
