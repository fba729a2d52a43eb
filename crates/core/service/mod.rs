//! Request-facing query services.
//!
//! Both services borrow the shared [`SpatialIndex`] per call and keep no
//! state across requests.

pub mod nearby;

pub use nearby::NearbySearch;

use crate::cancel::CancelToken;
use crate::compute::cluster::ClusterAggregator;
use crate::compute::validation::validate_zoom;
use crate::compute::viewport::normalize;
use crate::db::index::SpatialIndex;
use crate::error::Result;
use pitchmap_types::query::{ViewportQuery, ViewportResponse};
use std::sync::Arc;
use std::time::Instant;

/// Turns a viewport request into clusters and individual markers.
#[derive(Debug, Clone)]
pub struct ViewportQueryService {
    index: Arc<SpatialIndex>,
    aggregator: ClusterAggregator,
    min_cluster_size: usize,
    min_zoom: u8,
    max_zoom: u8,
}

impl ViewportQueryService {
    pub fn new(
        index: Arc<SpatialIndex>,
        aggregator: ClusterAggregator,
        min_cluster_size: usize,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        Self {
            index,
            aggregator,
            min_cluster_size,
            min_zoom,
            max_zoom,
        }
    }

    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    /// Serve one viewport request.
    ///
    /// # Errors
    ///
    /// - [`InvalidViewport`](crate::PitchmapError::InvalidViewport) for a bad
    ///   zoom or box, detected before the index is read
    /// - [`IndexUnavailable`](crate::PitchmapError::IndexUnavailable) while
    ///   the index is loading
    pub fn handle(&self, query: &ViewportQuery) -> Result<ViewportResponse> {
        self.handle_cancellable(query, &CancelToken::new())
    }

    /// Like [`handle`](Self::handle), abandoning the work with
    /// [`Cancelled`](crate::PitchmapError::Cancelled) once `cancel` fires.
    pub fn handle_cancellable(
        &self,
        query: &ViewportQuery,
        cancel: &CancelToken,
    ) -> Result<ViewportResponse> {
        let zoom = validate_zoom(query.zoom, self.min_zoom, self.max_zoom)?;
        let viewport = normalize(&query.bounds)?;

        cancel.check()?;
        let started = Instant::now();
        let matches = self.index.query_rects(viewport.parts(), &query.filter)?;
        let scanned = started.elapsed();

        cancel.check()?;
        let clusters = self.aggregator.aggregate_cancellable(
            &matches,
            zoom,
            self.min_cluster_size,
            cancel,
        )?;

        log::debug!(
            "Viewport {:?} z{}: {} matches, {} items (scan {:?}, total {:?})",
            query.bounds,
            zoom,
            matches.len(),
            clusters.len(),
            scanned,
            started.elapsed()
        );

        Ok(ViewportResponse {
            viewport: query.bounds,
            zoom: query.zoom,
            total_in_viewport: matches.len(),
            clusters,
        })
    }
}
