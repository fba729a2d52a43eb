//! Errors surfaced by the transports.

use crate::protocol::ErrorBody;
use pitchmap::PitchmapError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] PitchmapError),

    #[error("user {0} not found")]
    NotFound(String),

    #[error("write queue is closed")]
    WriterClosed,

    #[error("query task failed: {0}")]
    Task(String),
}

impl ServerError {
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Engine(err) => err.code(),
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::WriterClosed => "WRITER_UNAVAILABLE",
            ServerError::Task(_) => "INTERNAL",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ServerError::Engine(err) => err.is_retryable(),
            ServerError::WriterClosed => true,
            ServerError::NotFound(_) | ServerError::Task(_) => false,
        }
    }

    /// Whether the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServerError::Engine(err) => !err.is_retryable() && *err != PitchmapError::Cancelled,
            ServerError::NotFound(_) => true,
            ServerError::WriterClosed | ServerError::Task(_) => false,
        }
    }
}

impl From<&ServerError> for ErrorBody {
    fn from(err: &ServerError) -> Self {
        ErrorBody::new(err.code(), err.to_string(), err.is_retryable())
    }
}

impl From<ServerError> for ErrorBody {
    fn from(err: ServerError) -> Self {
        ErrorBody::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_classes() {
        let err = ServerError::from(PitchmapError::InvalidQuery("radius".into()));
        assert_eq!(err.code(), "INVALID_QUERY");
        assert!(err.is_client_error());
        assert!(!err.is_retryable());

        let err = ServerError::from(PitchmapError::IndexUnavailable("loading".into()));
        assert!(err.is_retryable());
        assert!(!err.is_client_error());

        assert_eq!(ServerError::NotFound("7".into()).code(), "NOT_FOUND");
        assert!(ServerError::WriterClosed.is_retryable());
    }

    #[test]
    fn test_error_body_keeps_engine_message() {
        let body = ErrorBody::from(ServerError::from(PitchmapError::InvalidViewport(
            "zoom 40 outside 0..=20".into(),
        )));
        assert_eq!(body.code, "INVALID_VIEWPORT");
        assert_eq!(body.message, "invalid viewport: zoom 40 outside 0..=20");
    }
}
