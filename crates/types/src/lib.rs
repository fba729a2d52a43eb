//! # pitchmap-types
//!
//! Value types shared by the pitchmap clustering engine, its server and its
//! clients:
//!
//! - **Entities**: `Entity`, `Sport`, `Role`, `SkillLevel`, `EntityFilter`
//! - **Viewports**: `GeoBounds`
//! - **Clusters**: `GeoCell`, `SportCounts`, `ClusterSummary`, `ClusterItem`
//! - **Envelopes**: `ViewportQuery`, `ViewportResponse`, `NearbyQuery`, `NearbyResponse`
//!
//! All types serialize with Serde in the JSON shape the map client consumes.
//!
//! ## Examples
//!
//! ```rust
//! use pitchmap_types::bbox::GeoBounds;
//! use pitchmap_types::entity::{Entity, Role, Sport};
//!
//! let viewport = GeoBounds::new(12.9, 13.1, 77.5, 77.7);
//! let player = Entity::new("42", 12.97, 77.59, Sport::Cricket, Role::Player);
//! assert!(viewport.contains(player.latitude, player.longitude));
//! ```

pub mod bbox;
pub mod cluster;
pub mod entity;
pub mod query;

pub use bbox::GeoBounds;
pub use cluster::{ClusterItem, ClusterSummary, GeoCell, SportCounts};
pub use entity::{Entity, EntityFilter, Role, SkillLevel, Sport, UnknownTag};
pub use query::{Center, NearbyEntity, NearbyQuery, NearbyResponse, ViewportQuery, ViewportResponse};
