//! Point-and-radius search.
//!
//! The circle is widened to its enclosing rectangle, scanned through the
//! same index path as viewports, then cut back to the exact great-circle
//! distance.

use crate::compute::spatial::{circle_bounds, haversine_km};
use crate::compute::validation::{validate_center, validate_radius};
use crate::compute::viewport::normalize;
use crate::config::NearbyConfig;
use crate::db::index::SpatialIndex;
use crate::error::{PitchmapError, Result};
use pitchmap_types::query::{Center, NearbyEntity, NearbyQuery, NearbyResponse};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NearbySearch {
    index: Arc<SpatialIndex>,
    config: NearbyConfig,
}

impl NearbySearch {
    pub fn new(index: Arc<SpatialIndex>, config: NearbyConfig) -> Self {
        Self { index, config }
    }

    /// Users within the radius of the center, closest first.
    ///
    /// Missing radius and limit take the configured defaults; a limit above
    /// `max_limit` is capped.
    pub fn search(&self, query: &NearbyQuery) -> Result<NearbyResponse> {
        validate_center(query.latitude, query.longitude)?;

        let radius_km = query.radius_km.unwrap_or(self.config.default_radius_km);
        validate_radius(radius_km, self.config.max_radius_km)?;

        let limit = query
            .limit
            .unwrap_or(self.config.default_limit)
            .min(self.config.max_limit);
        if limit == 0 {
            return Err(PitchmapError::InvalidQuery(
                "Limit must be greater than zero".to_string(),
            ));
        }

        let bounds = circle_bounds(query.latitude, query.longitude, radius_km);
        let area = normalize(&bounds)
            .map_err(|e| PitchmapError::InvalidQuery(format!("Search area: {}", e)))?;
        let candidates = self.index.query_rects(area.parts(), &query.filter)?;
        let scanned = candidates.len();

        let mut users: Vec<(f64, NearbyEntity)> = candidates
            .into_iter()
            .filter_map(|entity| {
                let distance = haversine_km(
                    query.latitude,
                    query.longitude,
                    entity.latitude,
                    entity.longitude,
                );
                (distance <= radius_km).then(|| {
                    let rounded = (distance * 10.0).round() / 10.0;
                    (
                        distance,
                        NearbyEntity {
                            entity: Arc::unwrap_or_clone(entity),
                            distance_km: rounded,
                        },
                    )
                })
            })
            .collect();

        users.sort_by(|(da, a), (db, b)| {
            da.total_cmp(db)
                .then_with(|| a.entity.id.cmp(&b.entity.id))
        });
        users.truncate(limit);

        log::debug!(
            "Nearby ({}, {}) r={}km: {} candidates, {} returned",
            query.latitude,
            query.longitude,
            radius_km,
            scanned,
            users.len()
        );

        let users: Vec<NearbyEntity> = users.into_iter().map(|(_, user)| user).collect();
        Ok(NearbyResponse {
            center: Center {
                lat: query.latitude,
                lng: query.longitude,
            },
            radius_km,
            sport_filter: query.filter.sport,
            count: users.len(),
            users,
        })
    }
}
