//! Mapping request paths to files under a root directory.

use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use tokio::fs;

use crate::files::listing;
use crate::files::mime;
use crate::parser::{HttpRequest, Method};
use crate::server::{HttpResponse, StatusCode};

/// Serves GET and HEAD requests for files under a root directory.
///
/// `respond` never fails the calling worker: filesystem problems map to
/// HTTP error responses (404, 403, 500).
pub struct StaticResponder {
    root: PathBuf,
}

impl StaticResponder {
    /// Create a responder serving `root`.
    ///
    /// The root is canonicalized once, so it must exist and be readable.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self { root })
    }

    /// The canonicalized directory being served.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Produce the base response for a request.
    pub async fn respond(&self, request: &HttpRequest) -> HttpResponse {
        match request.method {
            Method::GET | Method::HEAD => {}
            method => {
                return HttpResponse::new(StatusCode::NotImplemented)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Unsupported method ({method})"));
            }
        }
        let head = request.method == Method::HEAD;

        // The raw path, still percent-encoded, without query or fragment:
        // redirects echo this form back
        let raw_path = request.path.split(['?', '#']).next().unwrap_or("");
        let relative = clean_path(raw_path);
        let full = self.root.join(&relative);
        debug!("{method} {raw_path} -> {full}", method = request.method, full = full.display());

        let meta = match fs::metadata(&full).await {
            Ok(meta) => meta,
            Err(e) => return error_response(raw_path, &e),
        };

        if meta.is_dir() {
            // Relative links in a listing or index page only resolve against
            // the directory when the URL ends with a slash
            if !raw_path.ends_with('/') {
                return HttpResponse::new(StatusCode::MovedPermanently)
                    .with_header("Location", format!("{raw_path}/"));
            }

            for index in ["index.html", "index.htm"] {
                let candidate = full.join(index);
                if fs::metadata(&candidate).await.map(|m| m.is_file()).unwrap_or(false) {
                    return self.serve_file(&candidate, head).await;
                }
            }

            let mut response = listing::render(&full, raw_path).await;
            if head {
                response.body.clear(); // Content-Length stays at the full size
            }
            return response;
        }

        self.serve_file(&full, head).await
    }

    /// Serve a regular file. HEAD reports the size without reading the bytes.
    async fn serve_file(&self, path: &Path, head: bool) -> HttpResponse {
        let content_type = mime::from_path(path);

        if head {
            match fs::metadata(path).await {
                Ok(meta) => HttpResponse::new(StatusCode::Ok)
                    .with_content_type(content_type)
                    .with_header("Content-Length", meta.len().to_string()),
                Err(e) => error_response(&path.display().to_string(), &e),
            }
        } else {
            match fs::read(path).await {
                Ok(bytes) => HttpResponse::new(StatusCode::Ok)
                    .with_content_type(content_type)
                    .with_body_bytes(bytes),
                Err(e) => error_response(&path.display().to_string(), &e),
            }
        }
    }
}

/// Reduce a request path to a relative filesystem path that cannot escape
/// the root: percent-decode, then keep only normal components.
fn clean_path(raw: &str) -> PathBuf {
    let decoded = percent_decode(raw);
    Path::new(&decoded)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// Decode `%XX` escapes; malformed escapes pass through literally.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                decoded.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

/// Map an I/O error to the matching HTTP error response.
pub(super) fn error_response(path: &str, e: &std::io::Error) -> HttpResponse {
    match e.kind() {
        std::io::ErrorKind::NotFound => {
            debug!("Not found: {path}");
            HttpResponse::new(StatusCode::NotFound)
                .with_content_type("text/plain")
                .with_body_string("File not found")
        }
        std::io::ErrorKind::PermissionDenied => {
            warn!("Permission denied: {path}");
            HttpResponse::new(StatusCode::Forbidden)
                .with_content_type("text/plain")
                .with_body_string("Permission denied")
        }
        _ => {
            warn!("Error reading {path}: {e}");
            HttpResponse::new(StatusCode::InternalServerError)
                .with_content_type("text/plain")
                .with_body_string("Internal server error")
        }
    }
}
