//! WebSocket server module
//!
//! Accepts WebSocket connections and echoes binary frames back to the sender.

mod frame;
mod handler;
mod websocket;

#[allow(unused_imports)]
pub use handler::{ConnectionHandler, HandlerConfig, HandlerError, HandlerResult};
pub use websocket::{ServerConfig, WebSocketServer, DEFAULT_HOST, DEFAULT_PORT};
