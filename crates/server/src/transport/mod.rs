//! Transport layer for the pitchmap server
//!
//! Available transports:
//! - `http` - REST API consumed by the map client
//! - `rpc` - tarpc-based RPC for internal callers

pub mod http;
pub mod rpc;
