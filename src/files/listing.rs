//! Directory listing generation.

use std::path::Path;

use tokio::fs;

use crate::files::responder::error_response;
use crate::server::{HttpResponse, StatusCode};

/// Render an HTML listing of `dir`, titled with the decoded request path.
pub(super) async fn render(dir: &Path, raw_path: &str) -> HttpResponse {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) => return error_response(raw_path, &e),
    };

    let mut names = Vec::new();
    loop {
        match read_dir.next_entry().await {
            Ok(Some(entry)) => {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    name.push('/');
                }
                names.push(name);
            }
            Ok(None) => break,
            Err(e) => return error_response(raw_path, &e),
        }
    }
    names.sort();

    let title = format!("Directory listing for {}", escape_html(raw_path));
    let mut html = String::new();
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"));
    for name in &names {
        html.push_str(&format!(
            "<li><a href=\"{href}\">{display}</a></li>\n",
            href = percent_encode(name),
            display = escape_html(name)
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    HttpResponse::new(StatusCode::Ok)
        .with_content_type("text/html; charset=utf-8")
        .with_body_string(html)
}

/// Escape text for embedding in HTML.
pub(super) fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Percent-encode a file name for use in an href.
pub(super) fn percent_encode(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
