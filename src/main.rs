//! CouchDB facade.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http server ──▶ route table ──▶ handler ──▶ upstream client ──▶ CouchDB
//!              (request id,    (7 operation    (pre-        (pooled,
//!               tracing)        shapes)         conditions)  deadline)
//!
//!   Client ◀── response relay (status, headers, streamed body) ◀────────────── CouchDB
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use couchdb_facade::config::{load_config, validate_config, ConfigError};
use couchdb_facade::lifecycle::{signals, Shutdown};
use couchdb_facade::observability::{logging, metrics};
use couchdb_facade::HttpServer;

#[derive(Parser)]
#[command(name = "couchdb-facade")]
#[command(about = "Forwards a subset of the CouchDB REST API to one upstream instance", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "COUCHDB_FACADE_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream CouchDB base URL, e.g. http://localhost:5984
    #[arg(long)]
    upstream_url: Option<String>,

    /// Listener bind address, e.g. 0.0.0.0:8080
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(url) = cli.upstream_url {
        config.upstream.base_url = url;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;

    tracing::info!("couchdb-facade v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        request_timeout_secs = config.upstream.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Parse checked by validation.
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config)?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let mut server_task = tokio::spawn(server.run(listener, signal));

    tokio::select! {
        _ = signals::trigger_on_termination(&shutdown) => {}
        result = &mut server_task => {
            result??;
            return Ok(());
        }
    }

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
