//! Engine builder
//!
//! Creates an engine with custom configuration, an optional seed dataset and
//! an optional loading phase during which reads are refused.

use crate::config::Config;
use crate::db::{Engine, SpatialIndex};
use crate::error::{PitchmapError, Result};
use pitchmap_types::entity::Entity;
use std::sync::Arc;

/// Builder for [`Engine`].
///
/// # Example
///
/// ```rust
/// use pitchmap::EngineBuilder;
/// use pitchmap_types::{Entity, Role, Sport};
///
/// let engine = EngineBuilder::new()
///     .seed(vec![Entity::new("p-1", 12.97, 77.59, Sport::Cricket, Role::Player)])
///     .build()
///     .unwrap();
/// assert_eq!(engine.stats().entities, 1);
/// ```
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: Config,
    start_unavailable: bool,
    seed: Vec<Entity>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Start in the loading state; reads fail with `IndexUnavailable` until
    /// [`Engine::mark_ready`] is called.
    pub fn unavailable(mut self) -> Self {
        self.start_unavailable = true;
        self
    }

    /// Entities inserted while building. Invalid ones are skipped.
    pub fn seed(mut self, entities: impl IntoIterator<Item = Entity>) -> Self {
        self.seed.extend(entities);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<Engine> {
        self.config
            .validate()
            .map_err(PitchmapError::InvalidConfig)?;

        let index = Arc::new(SpatialIndex::unavailable(self.config.shard_count));
        let engine = Engine::assemble(self.config, index);

        if !self.seed.is_empty() {
            let report = engine.upsert_many(self.seed);
            if report.rejected > 0 {
                log::warn!("Skipped {} invalid seed entities", report.rejected);
            }
        }

        if !self.start_unavailable {
            engine.mark_ready();
        }
        Ok(engine)
    }
}
