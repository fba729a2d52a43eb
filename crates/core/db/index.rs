//! Region-sharded spatial index of current entity positions.
//!
//! The globe is cut into `shard_count` longitude bands, each an R*-tree
//! behind its own readers-writer lock. An id directory records every
//! entity's current record so a move can find and drop the old entry.
//!
//! Lock discipline:
//! - writers hold the directory slot of the id, then write-lock the old and
//!   new shards in ascending order, so a cross-shard move is atomic;
//! - readers read-lock every overlapped shard in ascending order and keep
//!   the locks for the whole scan, so a query sees a single snapshot;
//! - readers never touch the directory while holding shard locks.

use crate::compute::spatial::IndexedEntity;
use crate::compute::validation::validate_entity;
use crate::compute::viewport::{LatLngRect, normalize};
use crate::error::{PitchmapError, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use pitchmap_types::bbox::GeoBounds;
use pitchmap_types::cluster::SportCounts;
use pitchmap_types::entity::{Entity, EntityFilter};
use rstar::RTree;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Point-in-time counters of a [`SpatialIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IndexStats {
    pub entities: usize,
    pub shards: usize,
    pub largest_shard: usize,
    pub generation: u64,
}

pub struct SpatialIndex {
    shards: Box<[RwLock<RTree<IndexedEntity>>]>,
    directory: DashMap<String, Arc<Entity>>,
    /// Bumped under the shard write locks by every mutation.
    generation: AtomicU64,
    ready: AtomicBool,
}

impl SpatialIndex {
    /// Create an empty index that serves reads immediately.
    pub fn new(shard_count: usize) -> Self {
        let index = Self::unavailable(shard_count);
        index.mark_ready();
        index
    }

    /// Create an empty index in the loading state: writes are accepted,
    /// reads fail with [`PitchmapError::IndexUnavailable`] until
    /// [`mark_ready`](Self::mark_ready).
    pub fn unavailable(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(RTree::new())).collect(),
            directory: DashMap::new(),
            generation: AtomicU64::new(0),
            ready: AtomicBool::new(false),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn mark_unavailable(&self) {
        self.ready.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    #[inline]
    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(PitchmapError::IndexUnavailable(
                "spatial index is loading".to_string(),
            ))
        }
    }

    /// Mutation counter; changes whenever the indexed contents may have.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard_of(&self, longitude: f64) -> usize {
        let n = self.shards.len();
        let band = ((longitude + 180.0) / 360.0 * n as f64).floor();
        (band.max(0.0) as usize).min(n - 1)
    }

    #[inline]
    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Insert or replace an entity by id. Returns the previous record.
    ///
    /// Idempotent: upserting an identical record leaves the visible contents
    /// unchanged.
    ///
    /// # Errors
    ///
    /// [`PitchmapError::InvalidEntity`] for malformed coordinates; the index
    /// is left unchanged.
    pub fn upsert(&self, entity: Entity) -> Result<Option<Arc<Entity>>> {
        if let Err(e) = validate_entity(&entity) {
            log::warn!("Rejected upsert: {}", e);
            return Err(e);
        }

        let entity = Arc::new(entity);
        let new_shard = self.shard_of(entity.longitude);

        match self.directory.entry(entity.id.clone()) {
            Entry::Occupied(mut slot) => {
                let old = Arc::clone(slot.get());
                let old_shard = self.shard_of(old.longitude);
                let old_entry = IndexedEntity::new(Arc::clone(&old));
                let new_entry = IndexedEntity::new(Arc::clone(&entity));

                if old_shard == new_shard {
                    let mut tree = self.shards[new_shard].write();
                    tree.remove(&old_entry);
                    tree.insert(new_entry);
                    self.bump_generation();
                } else {
                    let (lo, hi) = (old_shard.min(new_shard), old_shard.max(new_shard));
                    let mut lo_tree = self.shards[lo].write();
                    let mut hi_tree = self.shards[hi].write();
                    let (old_tree, new_tree) = if old_shard < new_shard {
                        (&mut lo_tree, &mut hi_tree)
                    } else {
                        (&mut hi_tree, &mut lo_tree)
                    };
                    old_tree.remove(&old_entry);
                    new_tree.insert(new_entry);
                    self.bump_generation();
                }

                slot.insert(entity);
                Ok(Some(old))
            }
            Entry::Vacant(slot) => {
                {
                    let mut tree = self.shards[new_shard].write();
                    tree.insert(IndexedEntity::new(Arc::clone(&entity)));
                    self.bump_generation();
                }
                slot.insert(entity);
                Ok(None)
            }
        }
    }

    /// Delete by id. Absent ids are a no-op and return `None`.
    pub fn remove(&self, id: &str) -> Option<Arc<Entity>> {
        match self.directory.entry(id.to_string()) {
            Entry::Occupied(slot) => {
                let old = Arc::clone(slot.get());
                {
                    let mut tree = self.shards[self.shard_of(old.longitude)].write();
                    if tree.remove(&IndexedEntity::new(Arc::clone(&old))).is_none() {
                        log::warn!("Entity {} missing from its shard on removal", id);
                    }
                    self.bump_generation();
                }
                slot.remove();
                Some(old)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Current record of an entity, if present.
    pub fn get(&self, id: &str) -> Option<Arc<Entity>> {
        self.directory.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Entities inside the box (inclusive) matching `filter`.
    ///
    /// The box is normalized first: latitude clamped, longitudes wrapped, and
    /// split into two scans when `min_lng > max_lng`.
    pub fn query_bounding_box(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lng: f64,
        max_lng: f64,
        filter: &EntityFilter,
    ) -> Result<Vec<Arc<Entity>>> {
        let viewport = normalize(&GeoBounds::new(min_lat, max_lat, min_lng, max_lng))?;
        self.query_rects(viewport.parts(), filter)
    }

    /// Entities inside any of the disjoint `rects` matching `filter`, read
    /// from one consistent snapshot of the overlapped shards.
    pub fn query_rects(
        &self,
        rects: &[LatLngRect],
        filter: &EntityFilter,
    ) -> Result<Vec<Arc<Entity>>> {
        self.ensure_ready()?;

        let mut shard_ids: SmallVec<[usize; 16]> = rects
            .iter()
            .flat_map(|rect| self.shard_of(rect.min_lng)..=self.shard_of(rect.max_lng))
            .collect();
        shard_ids.sort_unstable();
        shard_ids.dedup();

        let guards: SmallVec<[_; 16]> = shard_ids
            .iter()
            .map(|&shard| self.shards[shard].read())
            .collect();

        let envelopes: SmallVec<[_; 2]> = rects.iter().map(LatLngRect::envelope).collect();
        let mut found = Vec::new();
        for tree in &guards {
            for envelope in &envelopes {
                found.extend(
                    tree.locate_in_envelope(envelope)
                        .filter(|entry| filter.matches(&entry.entity))
                        .map(|entry| Arc::clone(&entry.entity)),
                );
            }
        }
        Ok(found)
    }

    /// Number of entities matching `filter`, anywhere on the globe.
    pub fn count(&self, filter: &EntityFilter) -> Result<usize> {
        self.ensure_ready()?;

        let guards: Vec<_> = self.shards.iter().map(|shard| shard.read()).collect();
        if filter.is_unfiltered() {
            return Ok(guards.iter().map(|tree| tree.size()).sum());
        }
        Ok(guards
            .iter()
            .map(|tree| tree.iter().filter(|entry| filter.matches(&entry.entity)).count())
            .sum())
    }

    /// Per-sport tally over the whole index, most common sport first.
    ///
    /// Holds every shard's read lock for the scan, so the tally is a single
    /// consistent snapshot.
    pub fn sport_counts(&self) -> Result<SportCounts> {
        self.ensure_ready()?;

        let guards: Vec<_> = self.shards.iter().map(|shard| shard.read()).collect();
        let mut tallies = FxHashMap::default();
        for tree in &guards {
            for entry in tree.iter() {
                *tallies.entry(entry.entity.sport).or_insert(0usize) += 1;
            }
        }
        Ok(SportCounts::from_tallies(tallies))
    }

    /// Every current record, in no particular order.
    pub fn entities(&self) -> Vec<Arc<Entity>> {
        self.directory
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let sizes: Vec<usize> = self.shards.iter().map(|shard| shard.read().size()).collect();
        IndexStats {
            entities: sizes.iter().sum(),
            shards: sizes.len(),
            largest_shard: sizes.iter().copied().max().unwrap_or(0),
            generation: self.generation(),
        }
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("shards", &self.shards.len())
            .field("entities", &self.directory.len())
            .field("generation", &self.generation())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchmap_types::entity::{Role, Sport};

    fn player(id: &str, lat: f64, lng: f64, sport: Sport) -> Entity {
        Entity::new(id, lat, lng, sport, Role::Player)
    }

    fn ids(mut found: Vec<Arc<Entity>>) -> Vec<String> {
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_upsert_get_remove() {
        let index = SpatialIndex::new(4);
        assert!(index.upsert(player("a", 12.97, 77.59, Sport::Cricket)).unwrap().is_none());
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("a").unwrap().sport, Sport::Cricket);

        let previous = index
            .upsert(player("a", 12.97, 77.59, Sport::Tennis))
            .unwrap()
            .unwrap();
        assert_eq!(previous.sport, Sport::Cricket);
        assert_eq!(index.len(), 1);

        assert!(index.remove("a").is_some());
        assert!(index.remove("a").is_none());
        assert!(index.is_empty());
        assert_eq!(index.stats().entities, 0);
    }

    #[test]
    fn test_invalid_entity_leaves_index_unchanged() {
        let index = SpatialIndex::new(4);
        index.upsert(player("a", 1.0, 1.0, Sport::Golf)).unwrap();
        let generation = index.generation();

        let err = index.upsert(player("a", 100.0, 1.0, Sport::Golf)).unwrap_err();
        assert!(matches!(err, PitchmapError::InvalidEntity(_)));
        assert_eq!(index.get("a").unwrap().latitude, 1.0);
        assert_eq!(index.generation(), generation);
    }

    #[test]
    fn test_move_across_shards() {
        let index = SpatialIndex::new(8);
        index.upsert(player("m", 10.0, -170.0, Sport::Boxing)).unwrap();
        index.upsert(player("m", 10.0, 170.0, Sport::Boxing)).unwrap();

        let any = EntityFilter::any();
        assert!(index.query_bounding_box(0.0, 20.0, -180.0, -160.0, &any).unwrap().is_empty());
        assert_eq!(
            ids(index.query_bounding_box(0.0, 20.0, 160.0, 180.0, &any).unwrap()),
            vec!["m"]
        );
        let stats = index.stats();
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.largest_shard, 1);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let index = SpatialIndex::new(4);
        index.upsert(player("corner", 10.0, 20.0, Sport::Chess)).unwrap();
        let found = index
            .query_bounding_box(10.0, 11.0, 20.0, 21.0, &EntityFilter::any())
            .unwrap();
        assert_eq!(ids(found), vec!["corner"]);
    }

    #[test]
    fn test_filter_applies_during_scan() {
        let index = SpatialIndex::new(4);
        index.upsert(player("p", 1.0, 1.0, Sport::Cricket)).unwrap();
        index
            .upsert(Entity::new("c", 1.0, 1.0, Sport::Cricket, Role::Coach))
            .unwrap();
        index.upsert(player("f", 1.0, 1.0, Sport::Football)).unwrap();

        let cricket = EntityFilter::sport(Sport::Cricket);
        assert_eq!(
            ids(index.query_bounding_box(0.0, 2.0, 0.0, 2.0, &cricket).unwrap()),
            vec!["c", "p"]
        );
        let coaches = cricket.with_role(Role::Coach);
        assert_eq!(
            ids(index.query_bounding_box(0.0, 2.0, 0.0, 2.0, &coaches).unwrap()),
            vec!["c"]
        );
        assert_eq!(index.count(&EntityFilter::sport(Sport::Cricket)).unwrap(), 2);
        assert_eq!(index.count(&EntityFilter::any()).unwrap(), 3);
    }

    #[test]
    fn test_antimeridian_query_has_no_duplicates() {
        let index = SpatialIndex::new(16);
        index.upsert(player("east", 0.0, 175.0, Sport::Swimming)).unwrap();
        index.upsert(player("west", 0.0, -175.0, Sport::Golf)).unwrap();
        index.upsert(player("dateline", 0.0, 180.0, Sport::Golf)).unwrap();
        index.upsert(player("far", 0.0, 0.0, Sport::Golf)).unwrap();

        let found = index
            .query_bounding_box(-5.0, 5.0, 170.0, -170.0, &EntityFilter::any())
            .unwrap();
        assert_eq!(ids(found), vec!["dateline", "east", "west"]);
    }

    #[test]
    fn test_loading_index_rejects_reads_until_ready() {
        let index = SpatialIndex::unavailable(4);
        index.upsert(player("a", 1.0, 1.0, Sport::Golf)).unwrap();

        let err = index
            .query_bounding_box(0.0, 2.0, 0.0, 2.0, &EntityFilter::any())
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(index.count(&EntityFilter::any()).is_err());

        index.mark_ready();
        assert_eq!(index.count(&EntityFilter::any()).unwrap(), 1);
        index.mark_unavailable();
        assert!(!index.is_ready());
    }

    #[test]
    fn test_sport_counts_order_by_frequency() {
        let index = SpatialIndex::new(4);
        index.upsert(player("a", 12.97, 77.59, Sport::Football)).unwrap();
        index.upsert(player("b", 19.07, 72.87, Sport::Cricket)).unwrap();
        index.upsert(player("c", 28.61, 77.2, Sport::Cricket)).unwrap();
        index.upsert(player("d", 40.7, -74.0, Sport::Badminton)).unwrap();
        index.upsert(player("e", -33.9, 151.2, Sport::Cricket)).unwrap();

        let counts = index.sport_counts().unwrap();
        let tallies: Vec<_> = counts.iter().collect();
        assert_eq!(
            tallies,
            vec![(Sport::Cricket, 3), (Sport::Badminton, 1), (Sport::Football, 1)]
        );
        assert_eq!(counts.total(), index.len());

        index.remove("d");
        assert_eq!(index.sport_counts().unwrap().get(Sport::Badminton), 0);
        assert_eq!(index.sport_counts().unwrap().len(), 2);

        index.mark_unavailable();
        assert!(index.sport_counts().unwrap_err().is_retryable());
    }

    #[test]
    fn test_generation_tracks_mutations() {
        let index = SpatialIndex::new(2);
        let start = index.generation();
        index.upsert(player("a", 1.0, 1.0, Sport::Golf)).unwrap();
        index.upsert(player("a", 2.0, 2.0, Sport::Golf)).unwrap();
        index.remove("a");
        index.remove("a");
        assert_eq!(index.generation(), start + 3);
    }

    #[test]
    fn test_shard_assignment_covers_edges() {
        let index = SpatialIndex::new(16);
        assert_eq!(index.shard_of(-180.0), 0);
        assert_eq!(index.shard_of(180.0), 15);
        assert_eq!(index.shard_of(0.0), 8);
        assert_eq!(SpatialIndex::new(0).shard_count(), 1);
    }
}
