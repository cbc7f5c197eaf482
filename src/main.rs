//! ws-echo
//!
//! WebSocket server that echoes binary frames back to the sender and logs
//! every other frame without replying.

mod config;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Overrides, Settings};
use server::WebSocketServer;

/// WebSocket echo server
///
/// Binary frames are echoed verbatim; text frames are logged and dropped
#[derive(Parser, Debug)]
#[command(name = "ws-echo")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to [default: localhost]
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on [default: 5000]
    #[arg(short, long)]
    port: Option<u16>,

    /// Close connections after this many seconds without a frame (0 disables)
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let overrides = Overrides {
        host: args.bind,
        port: args.port,
        idle_timeout_secs: args.idle_timeout,
    };
    let settings = Settings::load(args.config.as_deref(), overrides)?;

    // Initialize logging; RUST_LOG wins over flags and config
    let level = if args.verbose {
        "debug".to_string()
    } else {
        settings.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("ws-echo v{}", env!("CARGO_PKG_VERSION"));

    let server = Arc::new(WebSocketServer::new(settings.server));
    if let Some(idle) = server.config().idle_timeout {
        info!("Idle timeout enabled: {:?}", idle);
    }

    let server_handle = Arc::clone(&server);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Initiating graceful shutdown...");
        server_handle.shutdown();
    });

    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
