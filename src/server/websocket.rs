//! WebSocket server implementation
//!
//! Listens on a configurable address, upgrades every accepted TCP stream to a
//! WebSocket and hands it to a [`ConnectionHandler`] on its own task.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use super::handler::{ConnectionHandler, HandlerConfig};

/// Default bind host
pub const DEFAULT_HOST: &str = "localhost";

/// Default listening port
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration for the WebSocket server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Close connections that stay silent this long
    pub idle_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            idle_timeout: None,
        }
    }

    /// Set the idle timeout
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            idle_timeout: self.idle_timeout,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

/// Echo server: one handler task per accepted connection
pub struct WebSocketServer {
    config: ServerConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebSocketServer {
    /// Create a new WebSocket server
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a shutdown signal receiver
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger server shutdown
    ///
    /// The accept loop stops and every live connection is sent a close frame.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        info!("WebSocket server listening on ws://{}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_signal();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let handler = ConnectionHandler::with_config(self.config.handler_config());
                            let shutdown_rx = self.shutdown_signal();
                            let span = info_span!("conn", id = %Uuid::new_v4(), peer = %peer_addr);

                            tokio::spawn(
                                async move {
                                    if let Err(e) = handle_connection(stream, peer_addr, handler, shutdown_rx).await {
                                        error!("Connection error from {}: {:#}", peer_addr, e);
                                    }
                                }
                                .instrument(span),
                            );
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Upgrade a TCP stream and run the echo handler on it
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: ConnectionHandler,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    info!("New connection from {}", peer_addr);

    // Any upgrade path is accepted; it is only recorded for the log
    let mut path = String::new();
    let mut ws_stream = accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            path = request.uri().path().to_string();
            Ok(response)
        },
    )
    .await?;
    debug!("Upgraded connection from {} on path {}", peer_addr, path);

    let stopped = tokio::select! {
        result = handler.handle(&mut ws_stream) => {
            result?;
            false
        }
        _ = shutdown_rx.recv() => true,
    };

    if stopped {
        info!("Shutdown signal received, closing connection to {}", peer_addr);
        let _ = ws_stream.send(Message::Close(None)).await;
    }

    info!("Connection from {} closed", peer_addr);
    Ok(())
}
