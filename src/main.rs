//! Route table server.
//!
//! Serves a TOML route table over HTTP: every request is resolved by the
//! path router and answered with a JSON description of the match.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum, trace + timeout)
//!                          │
//!                          ▼
//!                     routing::CompiledRouter ◀── ArcSwap ◀── config::watcher
//!                          │                                  (--watch)
//!                          ▼
//!     ◀────────────── 200 JSON | 404 | 405 + Allow
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use path_router::config::{load_config, watcher::ConfigWatcher, RoutingConfig};
use path_router::http::HttpServer;
use path_router::lifecycle::{signals, startup, Shutdown};

#[derive(Parser)]
#[command(name = "path-router")]
#[command(about = "Serve a route table with the path router", long_about = None)]
struct Args {
    /// Route table (TOML). Without it an empty table is served.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the route table when the file changes.
    #[arg(short, long)]
    watch: bool,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RoutingConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    startup::init_observability(&config.observability);
    tracing::info!("path-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    let (config_updates, _watcher) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        _ => (mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
