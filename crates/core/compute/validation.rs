//! Input validation for writes and queries.
//!
//! Every check runs before the index is touched, so a rejected request
//! leaves no trace.

use crate::error::{PitchmapError, Result};
use pitchmap_types::entity::Entity;

/// Validates an entity's identifier and coordinates.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use pitchmap::compute::validation::validate_entity;
/// use pitchmap_types::{Entity, Role, Sport};
///
/// let ok = Entity::new("p-1", 12.97, 77.59, Sport::Cricket, Role::Player);
/// assert!(validate_entity(&ok).is_ok());
///
/// let off_map = Entity::new("p-2", 95.0, 77.59, Sport::Cricket, Role::Player);
/// assert!(validate_entity(&off_map).is_err());
/// ```
pub fn validate_entity(entity: &Entity) -> Result<()> {
    if entity.id.is_empty() {
        return Err(PitchmapError::InvalidEntity(
            "Entity id must not be empty".to_string(),
        ));
    }

    let (lat, lng) = (entity.latitude, entity.longitude);

    if !lat.is_finite() || !lng.is_finite() {
        return Err(PitchmapError::InvalidEntity(format!(
            "Coordinates of {} must be finite, got: ({}, {})",
            entity.id, lat, lng
        )));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(PitchmapError::InvalidEntity(format!(
            "Latitude of {} out of range [-90.0, 90.0]: {}",
            entity.id, lat
        )));
    }

    if !(-180.0..=180.0).contains(&lng) {
        return Err(PitchmapError::InvalidEntity(format!(
            "Longitude of {} out of range [-180.0, 180.0]: {}",
            entity.id, lng
        )));
    }

    Ok(())
}

/// Checks a requested zoom against the supported range and narrows it.
pub fn validate_zoom(zoom: i32, min_zoom: u8, max_zoom: u8) -> Result<u8> {
    match u8::try_from(zoom) {
        Ok(z) if (min_zoom..=max_zoom).contains(&z) => Ok(z),
        _ => Err(PitchmapError::InvalidViewport(format!(
            "Zoom {} out of supported range [{}, {}]",
            zoom, min_zoom, max_zoom
        ))),
    }
}

/// Validates the center of a radius search.
pub fn validate_center(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(PitchmapError::InvalidQuery(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            latitude
        )));
    }

    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(PitchmapError::InvalidQuery(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            longitude
        )));
    }

    Ok(())
}

/// Validates a search radius in kilometres.
pub fn validate_radius(radius_km: f64, max_radius_km: f64) -> Result<()> {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(PitchmapError::InvalidQuery(format!(
            "Radius must be positive and finite, got: {}",
            radius_km
        )));
    }

    if radius_km > max_radius_km {
        return Err(PitchmapError::InvalidQuery(format!(
            "Radius {} km exceeds maximum {} km",
            radius_km, max_radius_km
        )));
    }

    Ok(())
}
