//! Protocol definitions for pitchmap RPC
//!
//! This module contains the service trait and the wire types shared by the
//! RPC and HTTP transports.

use pitchmap::{EngineStats, PitchmapError};
use pitchmap_types::{
    Entity, NearbyQuery, NearbyResponse, Sport, SportCounts, ViewportQuery, ViewportResponse,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error payload returned by every transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine code such as `INVALID_VIEWPORT`.
    pub code: String,
    pub message: String,
    /// The client should retry later rather than treat the result as empty.
    pub retryable: bool,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl From<&PitchmapError> for ErrorBody {
    fn from(err: &PitchmapError) -> Self {
        Self::new(err.code(), err.to_string(), err.is_retryable())
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorBody {}

/// One row of the per-sport breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SportTally {
    pub sport: Sport,
    pub count: usize,
}

/// Sports present in the data, as served by `GET /api/sports`.
///
/// `sports` and `details` are ordered by descending count, ties by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SportList {
    pub sports: Vec<Sport>,
    pub details: Vec<SportTally>,
    /// Number of distinct sports.
    pub count: usize,
}

impl From<&SportCounts> for SportList {
    fn from(counts: &SportCounts) -> Self {
        let details: Vec<SportTally> = counts
            .iter()
            .map(|(sport, count)| SportTally { sport, count })
            .collect();
        Self {
            sports: details.iter().map(|tally| tally.sport).collect(),
            count: details.len(),
            details,
        }
    }
}

#[tarpc::service]
pub trait PitchmapService {
    /// Queue an upsert; validated before it is accepted.
    async fn upsert(entity: Entity) -> Result<(), ErrorBody>;

    /// Queue a removal.
    async fn remove(id: String) -> Result<(), ErrorBody>;

    async fn get(id: String) -> Result<Option<Entity>, ErrorBody>;

    async fn viewport(query: ViewportQuery) -> Result<ViewportResponse, ErrorBody>;

    async fn nearby(query: NearbyQuery) -> Result<NearbyResponse, ErrorBody>;

    /// Sports present in the index, most common first.
    async fn sports() -> Result<SportList, ErrorBody>;

    async fn stats() -> EngineStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_from_engine_error() {
        let body = ErrorBody::from(&PitchmapError::IndexUnavailable("loading".into()));
        assert_eq!(body.code, "INDEX_UNAVAILABLE");
        assert!(body.retryable);
        assert!(body.message.contains("loading"));

        let body = ErrorBody::from(&PitchmapError::InvalidViewport("zoom".into()));
        assert!(!body.retryable);
    }

    #[test]
    fn test_sport_list_follows_count_order() {
        let counts = SportCounts::from_tallies([
            (Sport::Chess, 1),
            (Sport::Kabaddi, 4),
            (Sport::Badminton, 1),
            (Sport::Cricket, 9),
        ]);
        let list = SportList::from(&counts);
        assert_eq!(list.count, 4);
        assert_eq!(
            list.sports,
            vec![Sport::Cricket, Sport::Kabaddi, Sport::Badminton, Sport::Chess]
        );

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["details"][0]["sport"], "Cricket");
        assert_eq!(json["details"][0]["count"], 9);
        assert_eq!(json["details"][3]["count"], 1);
        assert_eq!(SportList::from(&SportCounts::default()).count, 0);
    }
}
