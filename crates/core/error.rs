//! Error types for the pitchmap engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PitchmapError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PitchmapError {
    /// A write carried malformed coordinates; the index is unchanged.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// The viewport box or zoom cannot be served; no partial response exists.
    #[error("invalid viewport: {0}")]
    InvalidViewport(String),

    /// A nearby search or filter parameter is out of range.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The index is still loading or under maintenance. Retry later.
    #[error("spatial index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("query cancelled by caller")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PitchmapError {
    /// Stable machine-readable code for wire error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PitchmapError::InvalidEntity(_) => "INVALID_ENTITY",
            PitchmapError::InvalidViewport(_) => "INVALID_VIEWPORT",
            PitchmapError::InvalidQuery(_) => "INVALID_QUERY",
            PitchmapError::IndexUnavailable(_) => "INDEX_UNAVAILABLE",
            PitchmapError::Cancelled => "CANCELLED",
            PitchmapError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }

    /// Whether the same request may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PitchmapError::IndexUnavailable(_))
    }
}
