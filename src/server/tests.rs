//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::io::{self, Cursor};
    use std::path::{Path, PathBuf};
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;

    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
    use tokio::sync::mpsc;
    use tokio::task::JoinSet;
    use tokio::time;

    use crate::files::StaticResponder;
    use crate::server::{
        CROSS_ORIGIN_EMBEDDER_POLICY, CROSS_ORIGIN_OPENER_POLICY, CrossOriginIsolation, Error,
        FinalizeResponse, HttpResponse, HttpServer, ServerConfig, StatusCode,
    };

    // Mock TcpStream for testing
    struct MockTcpStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
    }

    impl MockTcpStream {
        fn new(read_data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(read_data),
                write_data: Vec::new(),
            }
        }

        fn written_data(&self) -> &[u8] {
            &self.write_data
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = std::io::Read::read(&mut this.read_data, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// A fresh directory under the system temp dir, unique per test.
    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("isoserve-server-{name}-{}", std::process::id()));
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_file(dir: &Path, name: &str, contents: &[u8]) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    /// Run one connection through the handler pipeline and return the raw
    /// response text.
    async fn roundtrip(root: &Path, raw_request: &[u8]) -> (Result<(), Error>, String) {
        let responder = StaticResponder::new(root).unwrap();
        let config = ServerConfig::default();
        let mut stream = MockTcpStream::new(raw_request.to_vec());

        let result =
            HttpServer::handle_connection(&mut stream, &responder, &CrossOriginIsolation, &config)
                .await;
        let response = String::from_utf8_lossy(stream.written_data()).into_owned();
        (result, response)
    }

    fn assert_isolation_headers_once(response: &str) {
        let coop = "Cross-Origin-Opener-Policy: same-origin\r\n";
        let coep = "Cross-Origin-Embedder-Policy: require-corp\r\n";
        assert_eq!(response.matches(coop).count(), 1, "COOP missing or duplicated:\n{response}");
        assert_eq!(response.matches(coep).count(), 1, "COEP missing or duplicated:\n{response}");
    }

    #[tokio::test]
    async fn test_server_creation() {
        let root = temp_root("creation");
        let config = ServerConfig {
            addr: "127.0.0.1:8000".parse().unwrap(),
            max_connections: 100,
            ..ServerConfig::default()
        };

        let server = HttpServer::new(config.clone(), StaticResponder::new(&root).unwrap());
        assert_eq!(server.config.addr, config.addr);
        assert_eq!(server.config.max_connections, 100);
        assert_eq!(server.config.protocol, crate::parser::HttpVersion::Http10);
    }

    #[test]
    fn test_startup_line_ipv4() {
        let addr = "127.0.0.1:8000".parse().unwrap();
        assert_eq!(
            HttpServer::startup_line(&addr),
            "Serving HTTP on 127.0.0.1 port 8000 (http://127.0.0.1:8000/) ..."
        );
    }

    #[test]
    fn test_startup_line_ipv6_is_bracketed() {
        let addr = "[::1]:8000".parse().unwrap();
        assert_eq!(
            HttpServer::startup_line(&addr),
            "Serving HTTP on ::1 port 8000 (http://[::1]:8000/) ..."
        );
    }

    #[test]
    fn test_finalizer_appends_both_headers_after_existing() {
        let mut response = HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/html")
            .with_body_string("x");
        CrossOriginIsolation.finalize(&mut response);

        assert_eq!(response.header("Cross-Origin-Opener-Policy"), Some("same-origin"));
        assert_eq!(response.header("Cross-Origin-Embedder-Policy"), Some("require-corp"));

        // Appended after everything the responder set, in order
        let names: Vec<&str> = response.headers.iter().map(|(k, _)| k.as_str()).collect();
        let coop_at = names.iter().position(|n| *n == CROSS_ORIGIN_OPENER_POLICY.0).unwrap();
        let coep_at = names.iter().position(|n| *n == CROSS_ORIGIN_EMBEDDER_POLICY.0).unwrap();
        let content_type_at = names.iter().position(|n| *n == "Content-Type").unwrap();
        assert!(content_type_at < coop_at);
        assert_eq!(coep_at, coop_at + 1);
        assert_eq!(coep_at, names.len() - 1);
    }

    #[test]
    fn test_capacity_response_carries_isolation_headers() {
        let mut response = HttpServer::capacity_response();
        CrossOriginIsolation.finalize(&mut response);

        assert_eq!(response.status, StatusCode::ServiceUnavailable);
        let text = String::from_utf8(response.to_bytes(crate::parser::HttpVersion::Http10)).unwrap();
        assert!(text.starts_with("HTTP/1.0 503 Service Unavailable\r\n"));
        assert_isolation_headers_once(&text);
    }

    #[tokio::test]
    async fn test_existing_file_gets_isolation_headers() {
        let root = temp_root("ok");
        write_file(&root, "index.html", b"<html>hello</html>");

        let (result, response) =
            roundtrip(&root, b"GET /index.html HTTP/1.0\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/html\r\n"));
        assert!(response.ends_with("<html>hello</html>"));
        assert_isolation_headers_once(&response);
    }

    #[tokio::test]
    async fn test_not_found_gets_isolation_headers() {
        let root = temp_root("404");

        let (result, response) =
            roundtrip(&root, b"GET /missing.html HTTP/1.0\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.0 404 Not Found\r\n"));
        assert_isolation_headers_once(&response);
    }

    #[tokio::test]
    async fn test_bad_request_gets_isolation_headers() {
        let root = temp_root("400");

        let (result, response) = roundtrip(&root, b"GET /index.html\r\n\r\n").await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
        assert_isolation_headers_once(&response);
    }

    #[tokio::test]
    async fn test_unknown_method_gets_501_with_isolation_headers() {
        let root = temp_root("501");

        let (result, response) = roundtrip(&root, b"BREW / HTTP/1.0\r\n\r\n").await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.0 501 Not Implemented\r\n"));
        assert!(response.contains("Unsupported method (BREW)"));
        assert_isolation_headers_once(&response);
    }

    #[tokio::test]
    async fn test_head_sends_headers_without_body() {
        let root = temp_root("head");
        write_file(&root, "data.bin", &[7u8; 512]);

        let (result, response) = roundtrip(&root, b"HEAD /data.bin HTTP/1.0\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(response.contains("Content-Length: 512\r\n"));
        assert!(response.ends_with("\r\n\r\n"), "HEAD response must stop after headers");
        assert_isolation_headers_once(&response);
    }

    #[tokio::test]
    async fn test_empty_connection_is_ignored() {
        let root = temp_root("empty");

        let (result, response) = roundtrip(&root, b"").await;

        assert!(result.is_ok());
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_connections_are_isolated() {
        let root = temp_root("concurrent");
        write_file(&root, "a.txt", b"contents of a");
        write_file(&root, "b.txt", b"contents of b");
        let responder = Arc::new(StaticResponder::new(&root).unwrap());
        let config = ServerConfig::default();

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            for (path, expected) in [("/a.txt", "contents of a"), ("/b.txt", "contents of b")] {
                let responder = responder.clone();
                let config = config.clone();
                tasks.spawn(async move {
                    let raw = format!("GET {path} HTTP/1.0\r\n\r\n");
                    let mut stream = MockTcpStream::new(raw.into_bytes());
                    HttpServer::handle_connection(
                        &mut stream,
                        &responder,
                        &CrossOriginIsolation,
                        &config,
                    )
                    .await
                    .unwrap();
                    (String::from_utf8_lossy(stream.written_data()).into_owned(), expected)
                });
            }
        }

        while let Some(res) = tasks.join_next().await {
            let (response, expected) = res.unwrap();
            assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
            assert!(response.ends_with(expected), "cross-talk between workers:\n{response}");
            assert_isolation_headers_once(&response);
        }
    }

    #[tokio::test]
    async fn test_bind_fails_on_occupied_port() {
        let root = temp_root("bind");
        let occupying = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupying.local_addr().unwrap();

        let config = ServerConfig {
            addr,
            ..ServerConfig::default()
        };
        let server = HttpServer::new(config, StaticResponder::new(&root).unwrap());

        let result = server.bind().await;
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[tokio::test]
    async fn test_shutdown_signal_drains_workers() {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let shutdown_received = Arc::new(AtomicBool::new(false));
        let shutdown_received_clone = shutdown_received.clone();

        // Simulate the serve loop: a few in-flight workers, then a shutdown
        // signal, then the drain
        let server_handle = tokio::spawn(async move {
            let mut tasks = JoinSet::new();

            for i in 0..3 {
                tasks.spawn(async move {
                    time::sleep(Duration::from_millis(50 * (i + 1))).await;
                });
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    shutdown_received_clone.store(true, Ordering::SeqCst);
                }
                _ = time::sleep(Duration::from_secs(5)) => {
                    panic!("Test timed out waiting for shutdown signal");
                }
            }

            let mut drained = 0;
            while let Some(res) = tasks.join_next().await {
                res.unwrap();
                drained += 1;
            }
            drained
        });

        time::sleep(Duration::from_millis(10)).await;
        shutdown_tx.send(()).await.expect("Failed to send shutdown signal");

        let drained = server_handle.await.expect("Server task failed");
        assert!(shutdown_received.load(Ordering::SeqCst), "Shutdown signal was not received");
        assert_eq!(drained, 3, "Not all workers completed during the drain");
    }
}
