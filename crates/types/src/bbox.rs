use serde::{Deserialize, Serialize};

/// A latitude/longitude rectangle as requested by a map client.
///
/// Values are kept exactly as given. `min_lng > max_lng` is legal and means
/// the box crosses the antimeridian; clamping and wrapping happen in the
/// engine, never here, so responses can echo the client's own numbers.
///
/// # Examples
///
/// ```
/// use pitchmap_types::bbox::GeoBounds;
///
/// let bengaluru = GeoBounds::new(12.9, 13.1, 77.5, 77.7);
/// assert!(bengaluru.contains(12.97, 77.59));
/// assert!(!bengaluru.crosses_antimeridian());
///
/// let pacific = GeoBounds::new(-10.0, 10.0, 170.0, -170.0);
/// assert!(pacific.crosses_antimeridian());
/// assert!(pacific.contains(0.0, 179.5));
/// assert!(pacific.contains(0.0, -175.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl GeoBounds {
    /// Arguments follow the wire order: latitudes first, then longitudes.
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// The whole globe.
    pub fn world() -> Self {
        Self::new(-90.0, 90.0, -180.0, 180.0)
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lng > self.max_lng
    }

    pub fn is_finite(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lng, self.max_lng]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Inclusive containment on raw coordinates, honouring antimeridian crossing.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if latitude < self.min_lat || latitude > self.max_lat {
            return false;
        }
        if self.crosses_antimeridian() {
            longitude >= self.min_lng || longitude <= self.max_lng
        } else {
            longitude >= self.min_lng && longitude <= self.max_lng
        }
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude span in degrees, measured eastwards from `min_lng`.
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            360.0 - (self.min_lng - self.max_lng)
        } else {
            self.max_lng - self.min_lng
        }
    }
}
