//! Response finalization for cross-origin isolation.
//!
//! Browsers only grant a page access to shared memory (`SharedArrayBuffer`,
//! and with it multithreaded WebAssembly) when the document arrives with
//! `Cross-Origin-Opener-Policy: same-origin` and
//! `Cross-Origin-Embedder-Policy: require-corp`. The server stamps both onto
//! every response it sends, whatever the status code.

use crate::server::response::HttpResponse;

/// Header appended to every response to isolate the browsing context group.
pub const CROSS_ORIGIN_OPENER_POLICY: (&str, &str) =
    ("Cross-Origin-Opener-Policy", "same-origin");

/// Header appended to every response to require CORP on embedded resources.
pub const CROSS_ORIGIN_EMBEDDER_POLICY: (&str, &str) =
    ("Cross-Origin-Embedder-Policy", "require-corp");

/// A hook run on every response after the responder has produced it and
/// before it is written to the socket.
///
/// The server invokes this exactly once per response. Implementations must
/// not remove or reorder headers already present.
pub trait FinalizeResponse: Send + Sync {
    fn finalize(&self, response: &mut HttpResponse);
}

/// The standard finalizer: appends the COOP/COEP pair after any headers the
/// responder set.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossOriginIsolation;

impl FinalizeResponse for CrossOriginIsolation {
    fn finalize(&self, response: &mut HttpResponse) {
        response.append_header(CROSS_ORIGIN_OPENER_POLICY.0, CROSS_ORIGIN_OPENER_POLICY.1);
        response.append_header(CROSS_ORIGIN_EMBEDDER_POLICY.0, CROSS_ORIGIN_EMBEDDER_POLICY.1);
    }
}
