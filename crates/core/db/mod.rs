//! The engine facade.
//!
//! `Engine` ties the shared [`SpatialIndex`] to the query services and the
//! optional result cache. It is cheap to clone; clones share everything.

pub mod cache;
pub mod index;

pub use cache::{CacheKey, ResultCache};
pub use index::{IndexStats, SpatialIndex};

use crate::cancel::CancelToken;
use crate::compute::bucket::GeoBucketer;
use crate::compute::cluster::ClusterAggregator;
use crate::config::Config;
use crate::error::{PitchmapError, Result};
use crate::service::{NearbySearch, ViewportQueryService};
use pitchmap_types::cluster::SportCounts;
use pitchmap_types::entity::{Entity, EntityFilter, Sport};
use pitchmap_types::query::{NearbyQuery, NearbyResponse, ViewportQuery, ViewportResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters exposed by the stats endpoints.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EngineStats {
    pub entities: usize,
    pub shards: usize,
    pub largest_shard: usize,
    pub generation: u64,
    pub ready: bool,
    pub viewport_queries: u64,
    pub nearby_queries: u64,
    pub cancelled_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_entries: usize,
}

/// Outcome of a bulk upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UpsertReport {
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Default)]
struct Counters {
    viewport_queries: AtomicU64,
    nearby_queries: AtomicU64,
    cancelled_queries: AtomicU64,
}

/// Viewport clustering engine.
///
/// Thread-safe; queries run in parallel with each other and with writes.
#[derive(Clone)]
pub struct Engine {
    pub(crate) index: Arc<SpatialIndex>,
    pub(crate) viewport: Arc<ViewportQueryService>,
    pub(crate) nearby: Arc<NearbySearch>,
    pub(crate) cache: Option<Arc<ResultCache>>,
    counters: Arc<Counters>,
    config: Arc<Config>,
}

impl Engine {
    /// Create an empty, ready engine with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn builder() -> crate::builder::EngineBuilder {
        crate::builder::EngineBuilder::new()
    }

    /// Create an empty, ready engine.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().map_err(PitchmapError::InvalidConfig)?;
        let index = Arc::new(SpatialIndex::new(config.shard_count));
        Ok(Self::assemble(config, index))
    }

    /// Wire an engine around an existing index. `config` must be valid.
    pub(crate) fn assemble(config: Config, index: Arc<SpatialIndex>) -> Self {
        let aggregator = ClusterAggregator::new(GeoBucketer::new(config.base_cell_degrees))
            .with_cancel_check_interval(config.cancel_check_interval);
        let viewport = ViewportQueryService::new(
            Arc::clone(&index),
            aggregator,
            config.min_cluster_size,
            config.min_zoom,
            config.max_zoom,
        );
        let nearby = NearbySearch::new(Arc::clone(&index), config.nearby.clone());
        let cache = config.cache.enabled.then(|| {
            Arc::new(ResultCache::new(
                Duration::from_millis(config.cache.ttl_ms),
                config.cache.capacity,
            ))
        });

        Self {
            index,
            viewport: Arc::new(viewport),
            nearby: Arc::new(nearby),
            cache,
            counters: Arc::new(Counters::default()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &Arc<SpatialIndex> {
        &self.index
    }

    /// Insert or replace an entity. Returns the previous record.
    pub fn upsert(&self, entity: Entity) -> Result<Option<Arc<Entity>>> {
        self.index.upsert(entity)
    }

    /// Upsert every entity, skipping (and counting) invalid ones.
    pub fn upsert_many(&self, entities: impl IntoIterator<Item = Entity>) -> UpsertReport {
        let mut report = UpsertReport::default();
        for entity in entities {
            match self.index.upsert(entity) {
                Ok(_) => report.accepted += 1,
                Err(_) => report.rejected += 1,
            }
        }
        log::debug!(
            "Bulk upsert: {} accepted, {} rejected",
            report.accepted,
            report.rejected
        );
        report
    }

    /// Remove by id; absent ids are a no-op.
    pub fn remove(&self, id: &str) -> Option<Arc<Entity>> {
        self.index.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Entity>> {
        self.index.get(id)
    }

    /// Clusters and individual markers for one viewport.
    pub fn viewport(&self, query: &ViewportQuery) -> Result<ViewportResponse> {
        self.viewport_cancellable(query, &CancelToken::new())
    }

    pub fn viewport_cancellable(
        &self,
        query: &ViewportQuery,
        cancel: &CancelToken,
    ) -> Result<ViewportResponse> {
        self.counters.viewport_queries.fetch_add(1, Ordering::Relaxed);

        let Some(cache) = &self.cache else {
            return self.track(self.viewport.handle_cancellable(query, cancel));
        };

        if !self.index.is_ready() {
            return Err(PitchmapError::IndexUnavailable(
                "spatial index is loading".to_string(),
            ));
        }

        let key = CacheKey::new(query, self.viewport.min_cluster_size());
        // Read before the scan: a racing write leaves the entry unservable.
        let generation = self.index.generation();
        if let Some(hit) = cache.get(&key, generation) {
            log::debug!("Viewport cache hit at generation {}", generation);
            return Ok(ViewportResponse::clone(&hit));
        }

        let response = self.track(self.viewport.handle_cancellable(query, cancel))?;
        cache.insert(key, generation, Arc::new(response.clone()));
        Ok(response)
    }

    /// Users around a point, closest first.
    pub fn nearby(&self, query: &NearbyQuery) -> Result<NearbyResponse> {
        self.counters.nearby_queries.fetch_add(1, Ordering::Relaxed);
        self.nearby.search(query)
    }

    /// Entities matching `filter` anywhere.
    pub fn count(&self, filter: &EntityFilter) -> Result<usize> {
        self.index.count(filter)
    }

    /// The sport vocabulary, in display order.
    pub fn sports(&self) -> &'static [Sport] {
        Sport::ALL
    }

    /// Sports present in the index with their entity counts, most common
    /// first.
    pub fn sport_counts(&self) -> Result<SportCounts> {
        self.index.sport_counts()
    }

    pub fn mark_ready(&self) {
        self.index.mark_ready();
    }

    pub fn mark_unavailable(&self) {
        self.index.mark_unavailable();
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_ready()
    }

    pub fn stats(&self) -> EngineStats {
        let index = self.index.stats();
        let (cache_hits, cache_misses, cache_entries) = match &self.cache {
            Some(cache) => (cache.hits(), cache.misses(), cache.len()),
            None => (0, 0, 0),
        };
        EngineStats {
            entities: index.entities,
            shards: index.shards,
            largest_shard: index.largest_shard,
            generation: index.generation,
            ready: self.index.is_ready(),
            viewport_queries: self.counters.viewport_queries.load(Ordering::Relaxed),
            nearby_queries: self.counters.nearby_queries.load(Ordering::Relaxed),
            cancelled_queries: self.counters.cancelled_queries.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            cache_entries,
        }
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(PitchmapError::Cancelled) = &result {
            self.counters
                .cancelled_queries
                .fetch_add(1, Ordering::Relaxed);
            log::debug!("Viewport query cancelled by caller");
        }
        result
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("index", &self.index)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}
