//! Request and response envelopes of the viewport and nearby endpoints.

use crate::bbox::GeoBounds;
use crate::cluster::ClusterItem;
use crate::entity::{Entity, EntityFilter, Sport};
use serde::{Deserialize, Serialize};

/// What a map client asks for after a pan or zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportQuery {
    pub bounds: GeoBounds,
    /// Integer map zoom; validated against the engine's supported range.
    pub zoom: i32,
    #[serde(default)]
    pub filter: EntityFilter,
}

impl ViewportQuery {
    pub fn new(bounds: GeoBounds, zoom: i32) -> Self {
        Self {
            bounds,
            zoom,
            filter: EntityFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Markers for one viewport.
///
/// `total_in_viewport` counts every matching entity inside the box, whatever
/// the clustering; it equals the sum of `count()` over `clusters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportResponse {
    /// The bounds exactly as requested, before clamping or wrapping.
    pub viewport: GeoBounds,
    pub zoom: i32,
    pub total_in_viewport: usize,
    /// Clusters first, then individual entities.
    pub clusters: Vec<ClusterItem>,
}

impl ViewportResponse {
    pub fn cluster_count(&self) -> usize {
        self.clusters.iter().filter(|item| item.is_cluster()).count()
    }

    pub fn single_count(&self) -> usize {
        self.clusters.len() - self.cluster_count()
    }

    /// Sum of the counts carried by the items.
    pub fn represented(&self) -> usize {
        self.clusters.iter().map(ClusterItem::count).sum()
    }
}

/// Point-and-radius search around a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in kilometres; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_km: Option<f64>,
    /// Maximum number of users returned; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub filter: EntityFilter,
}

impl NearbyQuery {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_km: None,
            limit: None,
            filter: EntityFilter::default(),
        }
    }

    pub fn radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = Some(radius_km);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lng: f64,
}

/// An entity with its distance from the search center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyEntity {
    #[serde(flatten)]
    pub entity: Entity,
    /// Great-circle distance rounded to 0.1 km.
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyResponse {
    pub center: Center,
    pub radius_km: f64,
    pub sport_filter: Option<Sport>,
    /// Closest first.
    pub users: Vec<NearbyEntity>,
    pub count: usize,
}
