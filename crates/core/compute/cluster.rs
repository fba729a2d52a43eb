//! Cell-based clustering of viewport scan results.

use crate::cancel::CancelToken;
use crate::compute::bucket::GeoBucketer;
use crate::error::Result;
use pitchmap_types::cluster::{ClusterItem, ClusterSummary, GeoCell, SportCounts};
use pitchmap_types::entity::{Entity, Sport};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Members of one cell while partitioning.
#[derive(Default)]
struct Partition<'a> {
    members: SmallVec<[&'a Arc<Entity>; 4]>,
    lat_sum: f64,
    lng_sum: f64,
    sports: SmallVec<[(Sport, usize); 4]>,
}

impl<'a> Partition<'a> {
    fn push(&mut self, entity: &'a Arc<Entity>) {
        self.lat_sum += entity.latitude;
        self.lng_sum += entity.longitude;
        match self.sports.iter_mut().find(|(sport, _)| *sport == entity.sport) {
            Some((_, count)) => *count += 1,
            None => self.sports.push((entity.sport, 1)),
        }
        self.members.push(entity);
    }

    fn into_summary(self, cell: GeoCell) -> ClusterSummary {
        let count = self.members.len();
        ClusterSummary {
            cell,
            latitude: self.lat_sum / count as f64,
            longitude: self.lng_sum / count as f64,
            count,
            sport_counts: SportCounts::from_tallies(self.sports),
        }
    }
}

/// Groups entities by [`GeoBucketer`] cell and summarizes dense cells.
///
/// Output order is deterministic for identical input: clusters by descending
/// count (ties by cell), then individual entities by cell and id.
#[derive(Debug, Clone)]
pub struct ClusterAggregator {
    bucketer: GeoBucketer,
    cancel_check_interval: usize,
}

impl ClusterAggregator {
    pub fn new(bucketer: GeoBucketer) -> Self {
        Self {
            bucketer,
            cancel_check_interval: 4096,
        }
    }

    pub fn with_cancel_check_interval(mut self, interval: usize) -> Self {
        self.cancel_check_interval = interval.max(1);
        self
    }

    pub fn bucketer(&self) -> &GeoBucketer {
        &self.bucketer
    }

    /// Partitions `entities` by cell at `zoom`; cells holding at least
    /// `min_cluster_size` members become one [`ClusterSummary`], the rest
    /// pass through as individual entities with their full payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use pitchmap::compute::bucket::GeoBucketer;
    /// use pitchmap::compute::cluster::ClusterAggregator;
    /// use pitchmap_types::{Entity, Role, Sport};
    /// use std::sync::Arc;
    ///
    /// let entities = vec![
    ///     Arc::new(Entity::new("a", 12.97, 77.59, Sport::Cricket, Role::Player)),
    ///     Arc::new(Entity::new("b", 12.971, 77.591, Sport::Cricket, Role::Coach)),
    /// ];
    /// let items = ClusterAggregator::new(GeoBucketer::default()).aggregate(&entities, 11, 2);
    /// assert_eq!(items.len(), 1);
    /// assert!(items[0].is_cluster());
    /// assert_eq!(items[0].count(), 2);
    /// ```
    pub fn aggregate(
        &self,
        entities: &[Arc<Entity>],
        zoom: u8,
        min_cluster_size: usize,
    ) -> Vec<ClusterItem> {
        let mut partitions = FxHashMap::default();
        for entity in entities {
            self.assign(&mut partitions, entity, zoom);
        }
        Self::emit(partitions, min_cluster_size)
    }

    /// Like [`aggregate`](Self::aggregate), polling `cancel` every
    /// `cancel_check_interval` entities.
    pub fn aggregate_cancellable(
        &self,
        entities: &[Arc<Entity>],
        zoom: u8,
        min_cluster_size: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<ClusterItem>> {
        let mut partitions = FxHashMap::default();
        for chunk in entities.chunks(self.cancel_check_interval) {
            cancel.check()?;
            for entity in chunk {
                self.assign(&mut partitions, entity, zoom);
            }
        }
        cancel.check()?;
        Ok(Self::emit(partitions, min_cluster_size))
    }

    #[inline]
    fn assign<'a>(
        &self,
        partitions: &mut FxHashMap<GeoCell, Partition<'a>>,
        entity: &'a Arc<Entity>,
        zoom: u8,
    ) {
        let cell = self
            .bucketer
            .bucket_of(entity.latitude, entity.longitude, zoom);
        partitions.entry(cell).or_default().push(entity);
    }

    fn emit(
        partitions: FxHashMap<GeoCell, Partition<'_>>,
        min_cluster_size: usize,
    ) -> Vec<ClusterItem> {
        let mut clusters = Vec::new();
        let mut singles: Vec<(GeoCell, &Arc<Entity>)> = Vec::new();

        for (cell, partition) in partitions {
            if partition.members.len() >= min_cluster_size {
                clusters.push(partition.into_summary(cell));
            } else {
                singles.extend(partition.members.into_iter().map(|entity| (cell, entity)));
            }
        }

        clusters.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.cell.cmp(&b.cell)));
        singles.sort_by(|(ca, ea), (cb, eb)| ca.cmp(cb).then_with(|| ea.id.cmp(&eb.id)));

        let mut items = Vec::with_capacity(clusters.len() + singles.len());
        items.extend(clusters.into_iter().map(ClusterItem::Cluster));
        items.extend(
            singles
                .into_iter()
                .map(|(_, entity)| ClusterItem::Single(Entity::clone(entity))),
        );
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PitchmapError;
    use pitchmap_types::entity::Role;

    fn entity(id: &str, lat: f64, lng: f64, sport: Sport) -> Arc<Entity> {
        Arc::new(Entity::new(id, lat, lng, sport, Role::Player))
    }

    fn aggregator() -> ClusterAggregator {
        ClusterAggregator::new(GeoBucketer::default())
    }

    #[test]
    fn test_dense_cell_becomes_cluster() {
        let entities = vec![
            entity("a", 12.97, 77.59, Sport::Cricket),
            entity("b", 12.971, 77.591, Sport::Cricket),
            entity("c", 12.9705, 77.5905, Sport::Football),
        ];
        let items = aggregator().aggregate(&entities, 11, 2);
        assert_eq!(items.len(), 1);

        let ClusterItem::Cluster(summary) = &items[0] else {
            panic!("expected a cluster, got {:?}", items[0]);
        };
        assert_eq!(summary.count, 3);
        assert_eq!(summary.id(), "11:2343:5861");
        assert_eq!(summary.sport_counts.dominant(), Some(Sport::Cricket));
        assert_eq!(summary.sport_counts.get(Sport::Football), 1);
        assert!((summary.latitude - 12.9705).abs() < 1e-9);
        assert!((summary.longitude - 77.5905).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_cells_pass_through_with_payload() {
        let lone = Arc::new(
            Entity::new("coach-1", 40.0, -3.7, Sport::Padel, Role::Coach)
                .with_payload(serde_json::json!({"name": "Lola"})),
        );
        let entities = vec![lone.clone(), entity("p-2", -33.86, 151.21, Sport::Swimming)];
        let items = aggregator().aggregate(&entities, 8, 2);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| !item.is_cluster()));

        let ClusterItem::Single(first) = &items[0] else {
            panic!("expected an individual item");
        };
        // Sydney's cell sorts before Madrid's: lower row.
        assert_eq!(first.id, "p-2");
        let ClusterItem::Single(second) = &items[1] else {
            panic!("expected an individual item");
        };
        assert_eq!(second.payload["name"], "Lola");
    }

    #[test]
    fn test_clusters_precede_singles_and_sort_by_count() {
        let mut entities = Vec::new();
        for i in 0..3 {
            entities.push(entity(&format!("delhi-{i}"), 28.61, 77.20, Sport::Hockey));
        }
        for i in 0..5 {
            entities.push(entity(&format!("mumbai-{i}"), 19.07, 72.87, Sport::Cricket));
        }
        entities.push(entity("goa", 15.49, 73.82, Sport::Football));

        let items = aggregator().aggregate(&entities, 6, 2);
        let counts: Vec<usize> = items.iter().map(ClusterItem::count).collect();
        assert_eq!(counts, vec![5, 3, 1]);
        assert!(items[0].is_cluster() && items[1].is_cluster());
        assert!(!items[2].is_cluster());
        assert_eq!(items.iter().map(ClusterItem::count).sum::<usize>(), entities.len());
    }

    #[test]
    fn test_coincident_entities_count_separately() {
        let entities = vec![
            entity("x", 1.0, 1.0, Sport::Chess),
            entity("y", 1.0, 1.0, Sport::Chess),
        ];
        let items = aggregator().aggregate(&entities, 20, 2);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].count(), 2);

        let items = aggregator().aggregate(&entities, 20, 3);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_output_is_order_independent() {
        let mut entities: Vec<Arc<Entity>> = (0..50)
            .map(|i| {
                let offset = i as f64 * 0.37;
                entity(&format!("e{i}"), -40.0 + offset, 100.0 - offset * 2.0, Sport::ALL[i % 5])
            })
            .collect();
        let forward = aggregator().aggregate(&entities, 4, 2);
        entities.reverse();
        let backward = aggregator().aggregate(&entities, 4, 2);

        let ids = |items: &[ClusterItem]| items.iter().map(ClusterItem::id).collect::<Vec<_>>();
        assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregator().aggregate(&[], 3, 2).is_empty());
    }

    #[test]
    fn test_cancelled_aggregation_stops() {
        let entities: Vec<Arc<Entity>> = (0..10)
            .map(|i| entity(&format!("e{i}"), 0.0, i as f64, Sport::Golf))
            .collect();
        let token = CancelToken::new();
        token.cancel();
        let result = aggregator()
            .with_cancel_check_interval(3)
            .aggregate_cancellable(&entities, 5, 2, &token);
        assert_eq!(result, Err(PitchmapError::Cancelled));

        let live = CancelToken::new();
        let items = aggregator()
            .with_cancel_check_interval(3)
            .aggregate_cancellable(&entities, 5, 2, &live)
            .unwrap();
        assert_eq!(items, aggregator().aggregate(&entities, 5, 2));
    }
}
