//! HTTP parser module.
//!
//! This module provides functionality for parsing HTTP requests with a focus on simplicity
//! and correctness. Only the request head (request line and headers) is parsed; the server
//! serves GET and HEAD requests, which carry no body.

mod error;
mod method;
mod request;
mod version;

// Re-export public items
pub use error::Error;
pub use method::Method;
pub use request::HttpRequest;
pub use version::HttpVersion;

// Re-export the parse_request function
pub use request::parse_request;
