//! Viewport normalization.
//!
//! Turns a client's [`GeoBounds`] into one or two plain latitude/longitude
//! rectangles that never cross the antimeridian and always lie within
//! [-90, 90] x [-180, 180].

use crate::error::{PitchmapError, Result};
use pitchmap_types::bbox::GeoBounds;
use rstar::AABB;
use smallvec::SmallVec;

/// Inclusive rectangle with `min_lng <= max_lng`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngRect {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl LatLngRect {
    #[inline]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lng
            && longitude <= self.max_lng
    }

    /// Index envelope, in `[lng, lat]` order.
    #[inline]
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }
}

/// A viewport split at the antimeridian where needed.
///
/// The parts are disjoint, so scanning each of them once never counts an
/// entity twice.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedViewport {
    parts: SmallVec<[LatLngRect; 2]>,
}

impl NormalizedViewport {
    pub fn parts(&self) -> &[LatLngRect] {
        &self.parts
    }

    pub fn is_split(&self) -> bool {
        self.parts.len() > 1
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.parts.iter().any(|part| part.contains(latitude, longitude))
    }
}

/// Brings a longitude outside [-180, 180] back into range.
#[inline]
fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Normalizes a requested viewport.
///
/// Latitudes are clamped to [-90, 90]; longitudes outside [-180, 180] are
/// wrapped; a longitude span of 360 degrees or more covers the whole globe;
/// `min_lng > max_lng` splits at the antimeridian.
///
/// # Errors
///
/// [`PitchmapError::InvalidViewport`] for non-finite values, an empty
/// latitude span after clamping, or a zero-width longitude span.
///
/// # Examples
///
/// ```
/// use pitchmap::compute::viewport::normalize;
/// use pitchmap_types::GeoBounds;
///
/// let pacific = normalize(&GeoBounds::new(-10.0, 10.0, 170.0, -170.0)).unwrap();
/// assert!(pacific.is_split());
/// assert!(pacific.contains(0.0, 179.0));
/// assert!(pacific.contains(0.0, -179.0));
/// assert!(!pacific.contains(0.0, 0.0));
///
/// assert!(normalize(&GeoBounds::new(10.0, 10.0, 0.0, 1.0)).is_err());
/// ```
pub fn normalize(bounds: &GeoBounds) -> Result<NormalizedViewport> {
    if !bounds.is_finite() {
        return Err(PitchmapError::InvalidViewport(format!(
            "Viewport coordinates must be finite, got: {:?}",
            bounds
        )));
    }

    let min_lat = bounds.min_lat.clamp(-90.0, 90.0);
    let max_lat = bounds.max_lat.clamp(-90.0, 90.0);
    if min_lat >= max_lat {
        return Err(PitchmapError::InvalidViewport(format!(
            "Latitude span is empty: [{}, {}]",
            bounds.min_lat, bounds.max_lat
        )));
    }

    let rect = |min_lng, max_lng| LatLngRect {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    };

    let mut parts = SmallVec::new();

    if bounds.max_lng - bounds.min_lng >= 360.0 {
        parts.push(rect(-180.0, 180.0));
        return Ok(NormalizedViewport { parts });
    }

    let min_lng = wrap_longitude(bounds.min_lng);
    let max_lng = wrap_longitude(bounds.max_lng);
    if min_lng == max_lng {
        return Err(PitchmapError::InvalidViewport(format!(
            "Longitude span is empty: [{}, {}]",
            bounds.min_lng, bounds.max_lng
        )));
    }

    if min_lng > max_lng {
        parts.push(rect(min_lng, 180.0));
        parts.push(rect(-180.0, max_lng));
    } else {
        parts.push(rect(min_lng, max_lng));
    }

    Ok(NormalizedViewport { parts })
}
