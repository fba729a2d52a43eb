//! Request handling shared by the RPC and HTTP transports

use crate::error::ServerError;
use crate::protocol::{ErrorBody, PitchmapService, SportList};
use crate::writer::{WriteOp, spawn_background_writer};
use pitchmap::{CancelToken, Engine, EngineStats, validation};
use pitchmap_types::{Entity, NearbyQuery, NearbyResponse, ViewportQuery, ViewportResponse};
use std::sync::Arc;
use tarpc::context;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct Handler {
    engine: Engine,
    write_tx: mpsc::Sender<WriteOp>,
}

impl Handler {
    pub fn new(engine: Engine, write_tx: mpsc::Sender<WriteOp>) -> Self {
        Self { engine, write_tx }
    }

    /// Handler whose writes are applied by a fresh background writer.
    pub fn with_background_writer(engine: Engine, buffer_size: usize) -> Self {
        let write_tx = spawn_background_writer(engine.clone(), buffer_size);
        Self::new(engine, write_tx)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Validate an entity and queue it for the background writer.
    pub async fn submit_upsert(&self, entity: Entity) -> Result<(), ServerError> {
        validation::validate_entity(&entity)?;
        self.write_tx
            .send(WriteOp::Upsert(entity))
            .await
            .map_err(|_| ServerError::WriterClosed)
    }

    pub async fn submit_remove(&self, id: String) -> Result<(), ServerError> {
        self.write_tx
            .send(WriteOp::Remove(id))
            .await
            .map_err(|_| ServerError::WriterClosed)
    }

    pub fn lookup(&self, id: &str) -> Option<Entity> {
        self.engine.get(id).map(Arc::unwrap_or_clone)
    }

    pub async fn query_viewport(
        &self,
        query: ViewportQuery,
    ) -> Result<ViewportResponse, ServerError> {
        self.run_query(move |engine, token| engine.viewport_cancellable(&query, token))
            .await
    }

    pub async fn query_nearby(&self, query: NearbyQuery) -> Result<NearbyResponse, ServerError> {
        self.run_query(move |engine, _| engine.nearby(&query)).await
    }

    pub async fn sport_list(&self) -> Result<SportList, ServerError> {
        let counts = self.run_query(|engine, _| engine.sport_counts()).await?;
        Ok(SportList::from(&counts))
    }

    pub fn engine_stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Run a query on the blocking pool.
    ///
    /// If the returned future is dropped before completion, the query's
    /// token is cancelled and the blocking task stops at its next check.
    async fn run_query<T, F>(&self, query: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Engine, &CancelToken) -> pitchmap::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancelToken::new();
        let guard = token.drop_guard();
        let engine = self.engine.clone();

        let outcome = tokio::task::spawn_blocking(move || query(&engine, &token)).await;
        guard.disarm();

        match outcome {
            Ok(result) => result.map_err(ServerError::from),
            Err(e) => Err(ServerError::Task(e.to_string())),
        }
    }
}

impl PitchmapService for Handler {
    async fn upsert(self, _: context::Context, entity: Entity) -> Result<(), ErrorBody> {
        self.submit_upsert(entity).await.map_err(ErrorBody::from)
    }

    async fn remove(self, _: context::Context, id: String) -> Result<(), ErrorBody> {
        self.submit_remove(id).await.map_err(ErrorBody::from)
    }

    async fn get(self, _: context::Context, id: String) -> Result<Option<Entity>, ErrorBody> {
        Ok(self.lookup(&id))
    }

    async fn viewport(
        self,
        _: context::Context,
        query: ViewportQuery,
    ) -> Result<ViewportResponse, ErrorBody> {
        self.query_viewport(query).await.map_err(ErrorBody::from)
    }

    async fn nearby(
        self,
        _: context::Context,
        query: NearbyQuery,
    ) -> Result<NearbyResponse, ErrorBody> {
        self.query_nearby(query).await.map_err(ErrorBody::from)
    }

    async fn sports(self, _: context::Context) -> Result<SportList, ErrorBody> {
        self.sport_list().await.map_err(ErrorBody::from)
    }

    async fn stats(self, _: context::Context) -> EngineStats {
        self.engine_stats()
    }
}
