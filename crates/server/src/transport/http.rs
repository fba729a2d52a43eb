//! HTTP/REST transport for the pitchmap server
//!
//! Routes:
//!
//! - `GET    /api/`                 - service banner
//! - `GET    /api/health`           - liveness and readiness
//! - `GET    /api/users/viewport`   - clustered markers for a map viewport
//! - `GET    /api/users/nearby`     - users around a point
//! - `GET    /api/users/:id`        - one user
//! - `PUT    /api/users`            - queue an upsert
//! - `DELETE /api/users/:id`        - queue a removal
//! - `GET    /api/sports`           - sports present, most common first
//! - `GET    /api/stats`            - engine counters

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use pitchmap::PitchmapError;
use pitchmap_types::{
    Entity, EntityFilter, GeoBounds, NearbyQuery, Role, SkillLevel, Sport, ViewportQuery,
};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::handler::Handler;
use crate::protocol::ErrorBody;

/// Nginx's non-standard "client closed request" status.
fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Engine(PitchmapError::Cancelled) => client_closed_request(),
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            err if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

type ApiResult<T> = Result<T, ServerError>;

fn bad_query(message: impl Into<String>) -> ServerError {
    ServerError::Engine(PitchmapError::InvalidQuery(message.into()))
}

/// Viewport request parameters, camelCase as sent by the map client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportParams {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
    pub zoom: Option<i32>,
    pub sport: Option<String>,
    pub role: Option<String>,
    /// Comma-separated skill levels.
    pub levels: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyParams {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<f64>,
    pub sport: Option<String>,
    pub role: Option<String>,
    pub limit: Option<usize>,
}

fn is_wildcard(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("all")
}

/// Build a filter from the client's query-string spelling.
///
/// `All` (any case) or an empty value means no constraint.
pub fn parse_filter(
    sport: Option<&str>,
    role: Option<&str>,
    levels: Option<&str>,
) -> Result<EntityFilter, ServerError> {
    let mut filter = EntityFilter::any();

    if let Some(sport) = sport.map(str::trim).filter(|s| !is_wildcard(s)) {
        filter.sport = Some(sport.parse::<Sport>().map_err(|e| bad_query(e.to_string()))?);
    }
    if let Some(role) = role.map(str::trim).filter(|r| !is_wildcard(r)) {
        filter = filter.with_role(role.parse::<Role>().map_err(|e| bad_query(e.to_string()))?);
    }
    if let Some(levels) = levels {
        let parsed = levels
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.parse::<SkillLevel>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| bad_query(e.to_string()))?;
        if !parsed.is_empty() {
            filter = filter.with_levels(parsed);
        }
    }
    Ok(filter)
}

async fn banner() -> impl IntoResponse {
    Json(json!({
        "app": "pitchmap",
        "version": pitchmap::VERSION,
        "status": "running",
    }))
}

async fn health(State(handler): State<Handler>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "ready": handler.engine().is_ready(),
    }))
}

async fn viewport(
    State(handler): State<Handler>,
    params: Result<Query<ViewportParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params.map_err(|e| bad_query(e.body_text()))?;
    let filter = parse_filter(
        params.sport.as_deref(),
        params.role.as_deref(),
        params.levels.as_deref(),
    )?;
    let zoom = params
        .zoom
        .unwrap_or(i32::from(handler.engine().config().default_zoom));
    let bounds = GeoBounds::new(params.min_lat, params.max_lat, params.min_lng, params.max_lng);

    debug!("viewport {:?} zoom {} filter {:?}", bounds, zoom, filter);
    let response = handler
        .query_viewport(ViewportQuery::new(bounds, zoom).with_filter(filter))
        .await?;
    Ok(Json(response))
}

async fn nearby(
    State(handler): State<Handler>,
    params: Result<Query<NearbyParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params.map_err(|e| bad_query(e.body_text()))?;
    let filter = parse_filter(params.sport.as_deref(), params.role.as_deref(), None)?;

    let mut query = NearbyQuery::new(params.lat, params.lng).with_filter(filter);
    query.radius_km = params.radius;
    query.limit = params.limit;

    let response = handler.query_nearby(query).await?;
    Ok(Json(response))
}

async fn get_user(
    State(handler): State<Handler>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    handler
        .lookup(&id)
        .map(Json)
        .ok_or(ServerError::NotFound(id))
}

async fn upsert_user(
    State(handler): State<Handler>,
    entity: Result<Json<Entity>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(entity) = entity
        .map_err(|e| ServerError::Engine(PitchmapError::InvalidEntity(e.body_text())))?;
    let id = entity.id.clone();
    handler.submit_upsert(entity).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({"status": "accepted", "id": id}))))
}

async fn remove_user(
    State(handler): State<Handler>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    handler.submit_remove(id.clone()).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({"status": "accepted", "id": id}))))
}

async fn sports(State(handler): State<Handler>) -> ApiResult<impl IntoResponse> {
    Ok(Json(handler.sport_list().await?))
}

async fn stats(State(handler): State<Handler>) -> impl IntoResponse {
    Json(handler.engine_stats())
}

/// Build the API router.
pub fn router(handler: Handler) -> Router {
    Router::new()
        .route("/api/", get(banner))
        .route("/api/health", get(health))
        .route("/api/users/viewport", get(viewport))
        .route("/api/users/nearby", get(nearby))
        .route("/api/users", put(upsert_user))
        .route("/api/users/:id", get(get_user).delete(remove_user))
        .route("/api/sports", get(sports))
        .route("/api/stats", get(stats))
        .with_state(handler)
}

/// Run the HTTP server until `shutdown` resolves.
///
/// A request dropped by its client cancels the query running for it.
pub async fn run_server(
    listener: TcpListener,
    handler: Handler,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("pitchmap HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP server stopped");
    Ok(())
}
