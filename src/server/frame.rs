//! Inbound frame classification
//!
//! The echo handler only cares whether a frame is binary. Everything else
//! (text and every control frame) is collapsed into a single non-binary kind.

use tokio_tungstenite::tungstenite::Message;

/// A single received message unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Binary payload, echoed verbatim
    Binary(Vec<u8>),
    /// Any other frame; carries a short label for logging only
    NonBinary { label: &'static str, len: usize },
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Binary(data) => Frame::Binary(data),
            Message::Text(text) => Frame::NonBinary {
                label: "text",
                len: text.len(),
            },
            Message::Ping(data) => Frame::NonBinary {
                label: "ping",
                len: data.len(),
            },
            Message::Pong(data) => Frame::NonBinary {
                label: "pong",
                len: data.len(),
            },
            Message::Close(frame) => Frame::NonBinary {
                label: "close",
                len: frame.map(|f| f.reason.len()).unwrap_or(0),
            },
            Message::Frame(frame) => Frame::NonBinary {
                label: "raw",
                len: frame.payload().len(),
            },
        }
    }
}
