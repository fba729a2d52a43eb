pub mod rtree;

pub use rtree::{IndexedEntity, circle_bounds, haversine_km};
