//! Pure computation: validation, viewport normalization, grid bucketing,
//! clustering and geodesic helpers.

pub mod bucket;
pub mod cluster;
pub mod spatial;
pub mod validation;
pub mod viewport;

pub use bucket::GeoBucketer;
pub use cluster::ClusterAggregator;
pub use viewport::{LatLngRect, NormalizedViewport, normalize};
