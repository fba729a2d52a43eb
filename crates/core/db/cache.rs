//! Short-lived cache of viewport responses.
//!
//! An entry is served only while it is younger than the TTL and was computed
//! at the index generation that is current now; any write to the index makes
//! every older entry unservable.

use parking_lot::Mutex;
use pitchmap_types::entity::EntityFilter;
use pitchmap_types::query::{ViewportQuery, ViewportResponse};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Identity of a viewport request.
///
/// Bounds are keyed by bit pattern with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    bounds: [u64; 4],
    zoom: i32,
    filter: EntityFilter,
    min_cluster_size: usize,
}

impl CacheKey {
    pub fn new(query: &ViewportQuery, min_cluster_size: usize) -> Self {
        let b = &query.bounds;
        let bits = |v: f64| (v + 0.0).to_bits();
        Self {
            bounds: [
                bits(b.min_lat),
                bits(b.max_lat),
                bits(b.min_lng),
                bits(b.max_lng),
            ],
            zoom: query.zoom,
            filter: query.filter.clone(),
            min_cluster_size,
        }
    }
}

struct CachedEntry {
    response: Arc<ViewportResponse>,
    generation: u64,
    inserted: Instant,
}

pub struct ResultCache {
    entries: Mutex<FxHashMap<CacheKey, CachedEntry>>,
    ttl: Duration,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            ttl,
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached response for `key`, if fresh and computed at `generation`.
    pub fn get(&self, key: &CacheKey, generation: u64) -> Option<Arc<ViewportResponse>> {
        let mut entries = self.entries.lock();
        let fresh = match entries.get(key) {
            Some(entry) => entry.generation == generation && entry.inserted.elapsed() < self.ttl,
            None => false,
        };

        if fresh {
            self.hits.fetch_add(1, Ordering::Relaxed);
            entries.get(key).map(|entry| Arc::clone(&entry.response))
        } else {
            entries.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Store a response computed against `generation`.
    ///
    /// `generation` must be read before the query ran, so a write that races
    /// the query leaves the entry unservable instead of stale.
    pub fn insert(&self, key: CacheKey, generation: u64, response: Arc<ViewportResponse>) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, entry| {
                entry.generation >= generation && entry.inserted.elapsed() < ttl
            });

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
            log::debug!("Result cache full, {} entries kept", entries.len());
        }

        entries.insert(
            key,
            CachedEntry {
                response,
                generation,
                inserted: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchmap_types::bbox::GeoBounds;
    use pitchmap_types::entity::Sport;

    fn response(zoom: i32) -> Arc<ViewportResponse> {
        Arc::new(ViewportResponse {
            viewport: GeoBounds::new(0.0, 1.0, 0.0, 1.0),
            zoom,
            total_in_viewport: 0,
            clusters: Vec::new(),
        })
    }

    fn key(min_lat: f64, zoom: i32) -> CacheKey {
        CacheKey::new(
            &ViewportQuery::new(GeoBounds::new(min_lat, 1.0, 0.0, 1.0), zoom),
            2,
        )
    }

    #[test]
    fn test_hit_requires_same_generation() {
        let cache = ResultCache::new(Duration::from_secs(60), 8);
        cache.insert(key(0.0, 5), 7, response(5));

        assert!(cache.get(&key(0.0, 5), 7).is_some());
        assert!(cache.get(&key(0.0, 5), 8).is_none());
        // The stale entry is dropped on the failed lookup.
        assert!(cache.get(&key(0.0, 5), 7).is_none());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_expired_entries_are_not_served() {
        let cache = ResultCache::new(Duration::ZERO, 8);
        cache.insert(key(0.0, 5), 1, response(5));
        assert!(cache.get(&key(0.0, 5), 1).is_none());
    }

    #[test]
    fn test_key_distinguishes_filter_and_zero_sign() {
        let plain = ViewportQuery::new(GeoBounds::new(0.0, 1.0, 0.0, 1.0), 5);
        let negative_zero = ViewportQuery::new(GeoBounds::new(-0.0, 1.0, 0.0, 1.0), 5);
        assert_eq!(CacheKey::new(&plain, 2), CacheKey::new(&negative_zero, 2));

        let filtered = plain.clone().with_filter(EntityFilter::sport(Sport::Hockey));
        assert_ne!(CacheKey::new(&plain, 2), CacheKey::new(&filtered, 2));
        assert_ne!(CacheKey::new(&plain, 2), CacheKey::new(&plain, 3));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = ResultCache::new(Duration::from_secs(60), 2);
        cache.insert(key(0.0, 1), 1, response(1));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(key(0.0, 2), 1, response(2));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(key(0.0, 3), 1, response(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(0.0, 1), 1).is_none());
        assert!(cache.get(&key(0.0, 3), 1).is_some());
    }

    #[test]
    fn test_full_cache_purges_older_generations_first() {
        let cache = ResultCache::new(Duration::from_secs(60), 2);
        cache.insert(key(0.0, 1), 1, response(1));
        cache.insert(key(0.0, 2), 2, response(2));
        cache.insert(key(0.0, 3), 2, response(3));

        assert!(cache.get(&key(0.0, 2), 2).is_some());
        assert!(cache.get(&key(0.0, 3), 2).is_some());
    }
}
