//! A minimal static file server that enables cross-origin isolation.
//!
//! Browsers only unlock shared memory (`SharedArrayBuffer`, and with it
//! multithreaded WebAssembly) for pages served with the
//! `Cross-Origin-Opener-Policy: same-origin` and
//! `Cross-Origin-Embedder-Policy: require-corp` response headers. Plain
//! static servers don't send them, so locally developed wasm clients fail in
//! confusing ways. This crate serves a directory over HTTP and stamps both
//! headers onto every response it produces, whatever the status code.
//!
//! # Features
//!
//! - Serve files from a directory with GET/HEAD, directory listings, and an
//!   `index.html` fallback
//! - Unconditional COOP/COEP injection on every response (200s, 404s, all of
//!   them), applied as a finalization step after the file responder runs
//! - One task per connection, HTTP/1.0 responses (one request per
//!   connection, no keep-alive state to reason about)
//! - Graceful shutdown on Ctrl-C: stop accepting, drain in-flight workers,
//!   exit cleanly
//!
//! # Examples
//!
//! ## Finalizing a response
//!
//! ```
//! use isoserve_rs::{CrossOriginIsolation, FinalizeResponse, HttpResponse, StatusCode};
//!
//! let mut response = HttpResponse::new(StatusCode::Ok).with_content_type("text/html");
//! CrossOriginIsolation.finalize(&mut response);
//!
//! assert_eq!(response.header("Cross-Origin-Opener-Policy"), Some("same-origin"));
//! assert_eq!(response.header("Cross-Origin-Embedder-Policy"), Some("require-corp"));
//! ```
//!
//! ## Running a server
//!
//! ```no_run
//! use isoserve_rs::{HttpServer, ServerConfig, StaticResponder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let responder = StaticResponder::new(".")?;
//!     let server = HttpServer::new(ServerConfig::default(), responder);
//!
//!     // Prints the bound address, serves until Ctrl-C
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

// Export the static-file responder module
pub mod files;

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use files::StaticResponder;
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{
    CrossOriginIsolation, Error as ServerError, FinalizeResponse, HttpResponse, HttpServer,
    ServerConfig, StatusCode,
};
