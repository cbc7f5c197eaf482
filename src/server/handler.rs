//! WebSocket connection handler
//!
//! Drives a single connection frame by frame: binary frames are echoed back
//! verbatim, everything else is logged and dropped.

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info};

use super::frame::Frame;

/// Close reason sent when a connection goes quiet for too long
pub const IDLE_CLOSE_REASON: &str = "idle timeout";

/// Errors that end a connection abnormally
///
/// Graceful closure by the peer is not an error; `handle` returns `Ok(())`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] WsError),
}

/// Result type for handler operations
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Per-connection handler settings
#[derive(Debug, Clone, Default)]
pub struct HandlerConfig {
    /// Close the connection when no frame arrives within this window
    pub idle_timeout: Option<Duration>,
}

/// Handles a single WebSocket connection
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    config: HandlerConfig,
}

impl ConnectionHandler {
    /// Create a new connection handler
    pub fn new() -> Self {
        Self::with_config(HandlerConfig::default())
    }

    pub fn with_config(config: HandlerConfig) -> Self {
        Self { config }
    }

    /// Process `connection` until the peer closes it.
    ///
    /// Frames are handled strictly in arrival order and each echo is flushed
    /// before the next frame is read. Returns `Ok(())` on graceful closure
    /// (stream end or a closed-connection report from the transport); any
    /// other transport fault is returned to the caller.
    pub async fn handle<S>(&self, connection: &mut S) -> HandlerResult<()>
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
    {
        loop {
            let next = match self.config.idle_timeout {
                Some(limit) => match timeout(limit, connection.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        info!("No frame received for {:?}, closing idle connection", limit);
                        let close = CloseFrame {
                            code: CloseCode::Normal,
                            reason: IDLE_CLOSE_REASON.into(),
                        };
                        send_or_closed(connection, Message::Close(Some(close))).await?;
                        await_close_reply(connection, limit).await;
                        return Ok(());
                    }
                },
                None => connection.next().await,
            };

            match next {
                Some(Ok(message)) => match Frame::from(message) {
                    Frame::Binary(data) => {
                        info!("Binary frame received ({} bytes)", data.len());
                        send_or_closed(connection, Message::Binary(data)).await?;
                    }
                    Frame::NonBinary { label, len } => {
                        info!("Non-binary frame received ({}, {} bytes)", label, len);
                    }
                },
                Some(Err(e)) if is_closed(&e) => {
                    info!("Connection closed");
                    return Ok(());
                }
                Some(Err(e)) => return Err(e.into()),
                None => {
                    info!("Connection closed");
                    return Ok(());
                }
            }
        }
    }
}

impl Default for ConnectionHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a transport error just reports that the connection is already closed
fn is_closed(error: &WsError) -> bool {
    matches!(error, WsError::ConnectionClosed | WsError::AlreadyClosed)
}

/// Read until the peer answers our close frame, waiting at most `limit`
async fn await_close_reply<S>(connection: &mut S, limit: Duration)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let drained = timeout(limit, async {
        while let Some(Ok(_)) = connection.next().await {}
    })
    .await;
    if drained.is_err() {
        debug!("No close reply from peer within {:?}", limit);
    }
}

/// Send a message, treating a closed connection as a normal end
async fn send_or_closed<S>(connection: &mut S, message: Message) -> HandlerResult<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    match connection.send(message).await {
        Ok(()) => Ok(()),
        Err(e) if is_closed(&e) => {
            info!("Connection closed during send");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
