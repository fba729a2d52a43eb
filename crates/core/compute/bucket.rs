//! Zoom-dependent grid cells.
//!
//! The globe is cut into square cells whose edge is `base / 2^zoom` degrees,
//! anchored at (-90, -180). Each cell at zoom `z + 1` lies inside exactly one
//! cell at zoom `z`, so clusters split cleanly when the map zooms in.

use pitchmap_types::bbox::GeoBounds;
use pitchmap_types::cluster::GeoCell;

/// Deterministic `(lat, lng, zoom) -> GeoCell` mapping.
///
/// # Examples
///
/// ```
/// use pitchmap::compute::bucket::GeoBucketer;
///
/// let bucketer = GeoBucketer::default();
/// let a = bucketer.bucket_of(12.97, 77.59, 11);
/// let b = bucketer.bucket_of(12.971, 77.591, 11);
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "11:2343:5861");
/// assert_ne!(bucketer.bucket_of(12.97, 77.59, 14), bucketer.bucket_of(12.971, 77.591, 14));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBucketer {
    base_cell_degrees: f64,
}

impl GeoBucketer {
    pub const DEFAULT_BASE_CELL_DEGREES: f64 = 90.0;

    /// `base_cell_degrees` must be positive and finite; configuration
    /// validation guarantees it for engine-built bucketers.
    pub fn new(base_cell_degrees: f64) -> Self {
        Self { base_cell_degrees }
    }

    pub fn base_cell_degrees(&self) -> f64 {
        self.base_cell_degrees
    }

    /// Cell edge in degrees at `zoom`.
    #[inline]
    pub fn cell_size(&self, zoom: u8) -> f64 {
        self.base_cell_degrees / 2f64.powi(i32::from(zoom))
    }

    /// Cell containing `(latitude, longitude)` at `zoom`.
    ///
    /// Points on the north pole or on longitude 180 fall into the last
    /// row/column rather than a row/column past the edge.
    #[inline]
    pub fn bucket_of(&self, latitude: f64, longitude: f64, zoom: u8) -> GeoCell {
        let size = self.cell_size(zoom);
        let max_row = (180.0 / size).ceil() as i64 - 1;
        let max_col = (360.0 / size).ceil() as i64 - 1;

        let row = (((latitude + 90.0) / size).floor() as i64).clamp(0, max_row);
        let col = (((longitude + 180.0) / size).floor() as i64).clamp(0, max_col);
        GeoCell::new(zoom, row, col)
    }

    /// Geographic extent of a cell, clipped to the globe.
    pub fn cell_bounds(&self, cell: &GeoCell) -> GeoBounds {
        let size = self.cell_size(cell.zoom);
        let min_lat = -90.0 + cell.row as f64 * size;
        let min_lng = -180.0 + cell.col as f64 * size;
        GeoBounds::new(
            min_lat,
            (min_lat + size).min(90.0),
            min_lng,
            (min_lng + size).min(180.0),
        )
    }
}

impl Default for GeoBucketer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_CELL_DEGREES)
    }
}
