//! pitchmap server
//!
//! Network surfaces for the pitchmap clustering engine.
//!
//! # Transports
//!
//! - **HTTP**: the REST API consumed by the map client (axum)
//! - **RPC**: tarpc over length-delimited JSON frames
//!
//! Both share one [`Handler`]: queries run on the blocking pool with a
//! per-request cancel token, writes are validated and queued for a
//! background writer.
//!
//! # Example
//!
//! ```ignore
//! use pitchmap::Engine;
//! use pitchmap_server::{Handler, transport::http};
//!
//! let handler = Handler::with_background_writer(Engine::new()?, 1024);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! http::run_server(listener, handler, shutdown).await?;
//! ```

pub mod error;
pub mod handler;
pub mod loader;
pub mod protocol;
pub mod transport;
pub mod writer;

pub use error::ServerError;
pub use handler::Handler;
pub use protocol::{ErrorBody, PitchmapService, PitchmapServiceClient, SportList, SportTally};
