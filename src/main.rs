//! Command-line entry point for the isoserve static file server.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use isoserve_rs::files::StaticResponder;
use isoserve_rs::server::{HttpServer, ServerConfig};

/// Serve a directory over HTTP with cross-origin isolation enabled
/// (COOP/COEP headers on every response).
#[derive(Debug, Parser)]
#[command(name = "isoserve", version)]
#[command(about = "Static file server that enables cross-origin isolation for wasm development")]
struct Args {
    /// Directory to serve
    #[arg(default_value = ".", env = "ISOSERVE_ROOT")]
    root: PathBuf,

    /// Host or IP address to bind (IPv6 literals work, e.g. ::1)
    #[arg(long, default_value = "127.0.0.1", env = "ISOSERVE_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000, env = "ISOSERVE_PORT")]
    port: u16,

    /// Maximum number of concurrent connections
    #[arg(long, default_value_t = 1024, env = "ISOSERVE_MAX_CONNECTIONS")]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger
    env_logger::init();

    let args = Args::parse();

    let responder = match StaticResponder::new(&args.root) {
        Ok(responder) => responder,
        Err(e) => {
            error!("Cannot serve {root}: {e}", root = args.root.display());
            return ExitCode::FAILURE;
        }
    };

    let config = ServerConfig {
        addr: SocketAddr::new(args.host, args.port),
        max_connections: args.max_connections,
        ..ServerConfig::default()
    };

    // Exit 0 on a graceful interrupt; bind failures and fatal serve-loop
    // errors surface as a nonzero status
    let server = HttpServer::new(config, responder);
    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}
