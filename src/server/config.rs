//! Server configuration.

use std::net::SocketAddr;

use crate::parser::HttpVersion;

/// HTTP server configuration.
///
/// Created once at startup and read-only for the lifetime of the server.
/// The response protocol version lives here, per server instance, so two
/// servers in one process can never race on a shared setting.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The protocol version stamped on every response. HTTP/1.0 disables
    /// persistent connections: each worker answers one request and closes.
    pub protocol: HttpVersion,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size, which also bounds the request head.
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".parse().unwrap(),
            protocol: HttpVersion::Http10,
            max_connections: 1024,
            read_buffer_size: 8192,
        }
    }
}
