//! Static file resolution and serving.
//!
//! The responder maps request paths to files under a root directory and
//! produces complete base responses (status, content headers, body). It
//! knows nothing about sockets or the isolation headers; the server core
//! finalizes and transmits whatever comes out of here.

mod listing;
mod mime;
mod responder;

// Re-export public items
pub use responder::StaticResponder;
