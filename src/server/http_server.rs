//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use crate::files::StaticResponder;
use crate::parser::{Error as ParserError, HttpVersion, parse_request};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::isolation::{CrossOriginIsolation, FinalizeResponse};
use crate::server::response::{HttpResponse, StatusCode};

/// An HTTP server that serves a directory with cross-origin isolation enabled.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The static-file responder producing base responses.
    responder: Arc<StaticResponder>,
    /// The finalization hook run on every response before transmission.
    finalizer: Arc<dyn FinalizeResponse>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and responder.
    pub fn new(config: ServerConfig, responder: StaticResponder) -> Self {
        Self {
            config,
            responder: Arc::new(responder),
            finalizer: Arc::new(CrossOriginIsolation),
        }
    }

    /// Replace the response finalizer. Mostly useful for testing the
    /// handler pipeline with a different policy.
    pub fn with_finalizer(mut self, finalizer: impl FinalizeResponse + 'static) -> Self {
        self.finalizer = Arc::new(finalizer);
        self
    }

    /// The one line reported on stdout once the socket is bound. An IPv6
    /// host is bracketed in the URL so the printed address is browsable.
    pub(crate) fn startup_line(addr: &SocketAddr) -> String {
        let host = addr.ip().to_string();
        let port = addr.port();
        let url_host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.clone()
        };
        format!("Serving HTTP on {host} port {port} (http://{url_host}:{port}/) ...")
    }

    /// Open the listening socket and report the bound address.
    ///
    /// A bind failure (address in use, permission denied) propagates
    /// immediately; it is not retried.
    pub async fn bind(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        let addr = listener.local_addr()?;
        println!("{}", Self::startup_line(&addr));
        info!("Serving {root}", root = self.responder.root().display());
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: Arc<mpsc::Sender<()>>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    // The ^C the terminal echoed leaves the cursor mid-line
                    println!("\nKeyboard interrupt received, exiting.");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// The response sent when the connection limit is reached.
    pub(crate) fn capacity_response() -> HttpResponse {
        HttpResponse::new(StatusCode::ServiceUnavailable)
            .with_content_type("text/plain")
            .with_body_string("Server is at capacity, please try again later")
    }

    /// Hand an accepted connection to a new worker task.
    fn dispatch(
        &self,
        mut socket: tokio::net::TcpStream,
        addr: SocketAddr,
        semaphore: &Arc<Semaphore>,
        tasks: &mut JoinSet<()>,
    ) {
        // Try to acquire a permit from the semaphore
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let mut response = Self::capacity_response();
                let finalizer = self.finalizer.clone();
                let protocol = self.config.protocol;
                tasks.spawn(async move {
                    finalizer.finalize(&mut response);
                    let _ = socket.write_all(&response.to_bytes(protocol)).await;
                });
                return;
            }
        };

        let responder = self.responder.clone();
        let finalizer = self.finalizer.clone();
        let config = self.config.clone();

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the slot
            let _permit = permit;

            if let Err(e) =
                Self::handle_connection(&mut socket, &responder, finalizer.as_ref(), &config).await
            {
                warn!("Error handling connection from {addr}: {e}");
            }
        });
    }

    /// Accept errors that only concern the connection being accepted; the
    /// listener stays up and retries.
    fn is_transient_accept_error(e: &std::io::Error) -> bool {
        matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::WouldBlock
        )
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        // Wait for all tasks to complete (with timeout). Workers still in
        // flight after the timeout are cut off by process exit.
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = Duration::from_secs(30);
        let _ = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        info!("Server shutdown complete");
    }

    /// Bind the listening socket and serve until interrupted.
    pub async fn start(&self) -> Result<(), Error> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener` until a Ctrl+C arrives, then drain
    /// in-flight workers and release the socket.
    ///
    /// Returns `Ok(())` on a graceful interrupt. Accept errors that are not
    /// transient propagate and should terminate the process with a nonzero
    /// status.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        // Create a semaphore to limit concurrent connections
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        // Create a channel for shutdown signaling
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let shutdown_tx = Arc::new(shutdown_tx);

        // Use JoinSet to keep track of all spawned tasks
        let mut tasks = JoinSet::new();

        Self::setup_ctrl_c_handler(shutdown_tx.clone(), &mut tasks);

        loop {
            tokio::select! {
                // Check for shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                // Accept new connections
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            self.dispatch(socket, addr, &semaphore, &mut tasks);
                        }
                        Err(e) if Self::is_transient_accept_error(&e) => {
                            warn!("Error accepting connection: {e}");
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                        Err(e) => {
                            error!("Fatal error accepting connection: {e}");
                            return Err(Error::IoError(e));
                        }
                    }
                }
            }
        }

        // Perform graceful shutdown; the listener is released on return
        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Handle a single connection: one request, one response, close.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        responder: &StaticResponder,
        finalizer: &dyn FinalizeResponse,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let head = Self::read_request_head(socket, config.read_buffer_size).await?;
        if head.is_empty() {
            return Ok(()); // Connection closed before sending anything
        }

        // Parse the HTTP request
        let request = match parse_request(&head) {
            Ok(req) => req,
            Err(e) => {
                // An unrecognized method is answered 501 like any other
                // unsupported verb; everything else is a bad request
                let status = match e {
                    ParserError::InvalidMethod(_) => StatusCode::NotImplemented,
                    _ => StatusCode::BadRequest,
                };
                let response = HttpResponse::new(status)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Error parsing request: {e}"));
                Self::send(socket, response, finalizer, config.protocol).await?;
                return Err(Error::ParseError(e));
            }
        };

        // Delegate to the responder; it never fails the worker, filesystem
        // problems come back as HTTP error responses
        let response = responder.respond(&request).await;
        Self::send(socket, response, finalizer, config.protocol).await
    }

    /// Finalize and transmit a response. Every outgoing response passes
    /// through here exactly once.
    async fn send(
        socket: &mut (impl AsyncWrite + Unpin),
        mut response: HttpResponse,
        finalizer: &dyn FinalizeResponse,
        version: HttpVersion,
    ) -> Result<(), Error> {
        finalizer.finalize(&mut response);
        socket.write_all(&response.to_bytes(version)).await?;
        socket.flush().await?;
        Ok(())
    }

    /// Read until the end of the request head (blank line) or until the
    /// buffer is full.
    async fn read_request_head(
        socket: &mut (impl AsyncRead + Unpin),
        max_size: usize,
    ) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0; max_size];
        let mut filled = 0;

        while filled < buf.len() {
            let n = socket.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
            if buf[..filled].windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}
