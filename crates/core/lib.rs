//! Viewport-aware spatial clustering engine.
//!
//! ## Features
//! - **Sharded spatial index**: longitude-band R*-trees with per-shard
//!   readers-writer locks; every query sees one consistent snapshot
//! - **Zoom-stable clustering**: entities grouped by deterministic grid cells
//!   whose size halves with every zoom level
//! - **Antimeridian aware**: viewports crossing longitude 180 are split, never
//!   double-counted
//! - **Nearby search**: point-and-radius queries with exact great-circle
//!   filtering
//! - **Cooperative cancellation** and a generation-checked result cache
//!
//! ```rust
//! use pitchmap::prelude::*;
//!
//! let engine = Engine::new()?;
//! engine.upsert(Entity::new("1", 12.97, 77.59, Sport::Cricket, Role::Player))?;
//! engine.upsert(Entity::new("2", 12.971, 77.591, Sport::Cricket, Role::Coach))?;
//! engine.upsert(Entity::new("3", 13.5, 78.0, Sport::Football, Role::Player))?;
//!
//! let response = engine.viewport(&ViewportQuery::new(
//!     GeoBounds::new(12.9, 13.1, 77.5, 77.7),
//!     11,
//! ))?;
//! assert_eq!(response.total_in_viewport, 2);
//! assert_eq!(response.clusters.len(), 1);
//! assert!(response.clusters[0].is_cluster());
//! # Ok::<(), pitchmap::PitchmapError>(())
//! ```

pub mod builder;
pub mod cancel;
pub mod compute;
pub mod config;
pub mod db;
pub mod error;
pub mod service;

pub use builder::EngineBuilder;
pub use cancel::{CancelOnDrop, CancelToken};
pub use config::{CacheConfig, Config, NearbyConfig};
pub use db::{Engine, EngineStats, IndexStats, SpatialIndex, UpsertReport};
pub use error::{PitchmapError, Result};
pub use service::{NearbySearch, ViewportQueryService};

pub use compute::{ClusterAggregator, GeoBucketer};
pub use compute::validation;

pub use pitchmap_types as types;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{CancelToken, Config, Engine, EngineBuilder, PitchmapError, Result};

    pub use pitchmap_types::{
        ClusterItem, Entity, EntityFilter, GeoBounds, NearbyQuery, Role, SkillLevel, Sport,
        ViewportQuery, ViewportResponse,
    };
}
