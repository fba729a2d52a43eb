//! Bulk loading of player and coach records from a JSON dataset.
//!
//! The dataset is a JSON array of flat objects:
//!
//! ```json
//! [{"id": 1, "name": "Asha", "sport": "Cricket", "level": "Intermediate",
//!   "role": "player", "city": "Bangalore", "latitude": 12.97, "longitude": 77.59}]
//! ```
//!
//! `id`, `sport`, `latitude` and `longitude` are required; `role` defaults to
//! player. A `level` outside the skill vocabulary (such as "National Level" or
//! "Certified Coach") leaves the entity unlevelled. The whole record is kept
//! as the entity payload.

use anyhow::Context;
use pitchmap::Engine;
use pitchmap_types::{Entity, Role, SkillLevel, Sport};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid `{field}`: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Outcome of a dataset load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

fn invalid(field: &'static str, value: &Value) -> RecordError {
    RecordError::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn parse_id(value: &Value) -> Result<String, RecordError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(invalid("id", other)),
    }
}

fn parse_tag<T: std::str::FromStr>(field: &'static str, value: &Value) -> Result<T, RecordError> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid(field, value))
}

fn parse_coordinate(field: &'static str, value: &Value) -> Result<f64, RecordError> {
    value.as_f64().ok_or_else(|| invalid(field, value))
}

/// Convert one dataset record into an entity.
///
/// Range checks are left to the engine; this only checks shape.
pub fn parse_record(record: &Value) -> Result<Entity, RecordError> {
    let fields = record.as_object().ok_or(RecordError::NotAnObject)?;
    let field = |name: &'static str| fields.get(name).ok_or(RecordError::MissingField(name));

    let id = parse_id(field("id")?)?;
    let sport: Sport = parse_tag("sport", field("sport")?)?;
    let latitude = parse_coordinate("latitude", field("latitude")?)?;
    let longitude = parse_coordinate("longitude", field("longitude")?)?;

    let role = match fields.get("role") {
        None | Some(Value::Null) => Role::Player,
        Some(value) => parse_tag("role", value)?,
    };

    let mut entity = Entity::new(id, latitude, longitude, sport, role).with_payload(record.clone());
    match fields.get("level") {
        None | Some(Value::Null) => {}
        Some(value) => match parse_tag::<SkillLevel>("level", value) {
            Ok(level) => entity = entity.with_level(level),
            Err(e) => debug!("Record {} has no recognised level: {}", entity.id, e),
        },
    }
    Ok(entity)
}

/// Parse a dataset, skipping malformed records.
///
/// Returns the entities and the number of skipped records.
pub fn parse_dataset(json: &str) -> anyhow::Result<(Vec<Entity>, usize)> {
    let records: Vec<Value> =
        serde_json::from_str(json).context("dataset must be a JSON array of records")?;

    let mut entities = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for (position, record) in records.iter().enumerate() {
        match parse_record(record) {
            Ok(entity) => entities.push(entity),
            Err(e) => {
                warn!("Skipping dataset record {}: {}", position, e);
                skipped += 1;
            }
        }
    }
    Ok((entities, skipped))
}

/// Load a dataset file into the engine and mark the engine ready.
pub fn load_file(engine: &Engine, path: &Path) -> anyhow::Result<LoadReport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    let (entities, skipped) = parse_dataset(&json)?;

    let report = engine.upsert_many(entities);
    engine.mark_ready();

    let report = LoadReport {
        loaded: report.accepted,
        skipped: skipped + report.rejected,
    };
    info!(
        "Loaded {} records from {} ({} skipped)",
        report.loaded,
        path.display(),
        report.skipped
    );
    Ok(report)
}
