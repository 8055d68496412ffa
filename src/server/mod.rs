//! HTTP server implementation for isoserve-rs.
//!
//! This module provides the concurrent connection-handling core: a listener
//! that accepts connections, per-connection workers that delegate to the
//! static-file responder, and the response-finalization hook that stamps the
//! cross-origin isolation headers onto every outgoing response.

mod config;
mod error;
mod http_server;
mod isolation;
mod response;
mod tests;

// Re-export public items
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::HttpServer;
pub use isolation::{
    CROSS_ORIGIN_EMBEDDER_POLICY, CROSS_ORIGIN_OPENER_POLICY, CrossOriginIsolation,
    FinalizeResponse,
};
pub use response::{HttpResponse, StatusCode};
