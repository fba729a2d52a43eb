//! R*-tree entries and geodesic helpers for the spatial index.
//!
//! Entities are indexed as points with `[longitude, latitude]` coordinates,
//! so an index envelope reads `x = lng, y = lat` like the rest of the geo
//! ecosystem.

use geo::{Distance, HaversineMeasure, Point};
use pitchmap_types::bbox::GeoBounds;
use pitchmap_types::entity::Entity;
use rstar::{AABB, RTreeObject};
use std::sync::Arc;

/// Entity entry stored in a shard's R*-tree.
///
/// Equality is by id, which is what `RTree::remove` needs to find the entry
/// at its old position.
#[derive(Debug, Clone)]
pub struct IndexedEntity {
    pub entity: Arc<Entity>,
}

impl IndexedEntity {
    pub fn new(entity: Arc<Entity>) -> Self {
        Self { entity }
    }
}

impl PartialEq for IndexedEntity {
    fn eq(&self, other: &Self) -> bool {
        self.entity.id == other.entity.id
    }
}

impl RTreeObject for IndexedEntity {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.entity.longitude, self.entity.latitude])
    }
}

#[inline]
fn earth_radius_m() -> f64 {
    HaversineMeasure::GRS80_MEAN_RADIUS.radius()
}

/// Great-circle distance in kilometres.
#[inline]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    geo::Haversine.distance(Point::new(lng1, lat1), Point::new(lng2, lat2)) / 1000.0
}

/// Rectangle enclosing every point within `radius_km` of the center.
///
/// The result may extend past [-90, 90] or [-180, 180]; viewport
/// normalization clamps and wraps it. When the circle reaches a pole the
/// rectangle spans every longitude.
///
/// The longitude half-width is the tangent-meridian bound
/// `asin(sin(d) / cos(lat))`, which is wider than the flat `d / cos(lat)`
/// estimate and never clips the circle.
pub fn circle_bounds(latitude: f64, longitude: f64, radius_km: f64) -> GeoBounds {
    let angular = radius_km * 1000.0 / earth_radius_m();
    let lat_degrees = angular.to_degrees();

    let min_lat = latitude - lat_degrees;
    let max_lat = latitude + lat_degrees;
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return GeoBounds::new(min_lat, max_lat, -180.0, 180.0);
    }

    let ratio = angular.sin() / latitude.to_radians().cos();
    if ratio >= 1.0 {
        return GeoBounds::new(min_lat, max_lat, -180.0, 180.0);
    }

    // Rounding slack so points exactly on the circle stay inside.
    let lng_degrees = ratio.asin().to_degrees() + 1e-9;
    GeoBounds::new(
        min_lat - 1e-9,
        max_lat + 1e-9,
        longitude - lng_degrees,
        longitude + lng_degrees,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchmap_types::entity::{Role, Sport};

    #[test]
    fn test_entry_envelope_is_lng_lat() {
        let entry = IndexedEntity::new(Arc::new(Entity::new(
            "a",
            12.97,
            77.59,
            Sport::Cricket,
            Role::Player,
        )));
        assert_eq!(entry.envelope(), AABB::from_point([77.59, 12.97]));
    }

    #[test]
    fn test_entries_compare_by_id() {
        let a = Entity::new("a", 1.0, 1.0, Sport::Cricket, Role::Player);
        let moved = a.clone().moved_to(2.0, 2.0);
        assert_eq!(
            IndexedEntity::new(Arc::new(a)),
            IndexedEntity::new(Arc::new(moved))
        );
    }

    #[test]
    fn test_haversine_km() {
        // Bengaluru to Chennai, roughly 290 km.
        let d = haversine_km(12.97, 77.59, 13.08, 80.27);
        assert!((d - 290.0).abs() < 10.0, "got {}", d);
        assert_eq!(haversine_km(1.0, 2.0, 1.0, 2.0), 0.0);
    }

    #[test]
    fn test_circle_bounds_enclose_circle() {
        let (lat, lng, r) = (60.0, 10.0, 200.0);
        let bounds = circle_bounds(lat, lng, r);
        // Sample the circle boundary by bisecting along each bearing.
        for step in 0..72 {
            let bearing = (step as f64 * 5.0).to_radians();
            let (mut lo, mut hi) = (0.0f64, 5.0f64);
            for _ in 0..60 {
                let mid = (lo + hi) / 2.0;
                let p = (lat + mid * bearing.cos(), lng + mid * bearing.sin() * 2.0);
                if haversine_km(lat, lng, p.0, p.1) <= r {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            let p = (lat + lo * bearing.cos(), lng + lo * bearing.sin() * 2.0);
            assert!(bounds.contains(p.0, p.1), "bearing {} escapes {:?}", step * 5, bounds);
        }
    }

    #[test]
    fn test_circle_bounds_over_pole_span_all_longitudes() {
        let bounds = circle_bounds(89.5, 0.0, 100.0);
        assert_eq!((bounds.min_lng, bounds.max_lng), (-180.0, 180.0));
        assert!(bounds.max_lat > 90.0);
    }
}
