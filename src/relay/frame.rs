//! Transport-neutral frames exchanged across a connection pair.
//!
//! The client side speaks axum's WebSocket types and the upstream side speaks
//! tungstenite's. Both are mapped onto [`Frame`] so the relay loop never has to
//! know which library produced a message. Control frames (ping/pong) are
//! answered by the transports themselves and are never relayed.

use axum::extract::ws::{self, close_code};
use bytes::Bytes;
use tokio_tungstenite::tungstenite::{self, protocol::frame::coding::CloseCode};

/// Reason sent to the client when the upstream side fails.
pub const UPSTREAM_ERROR_REASON: &str = "AssemblyAI error";

/// Reason sent upstream when the client side fails.
pub const CLIENT_ERROR_REASON: &str = "Client error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Fallback used to close the client when the upstream side fails.
    pub fn upstream_error() -> Self {
        Self::new(close_code::ERROR, UPSTREAM_ERROR_REASON)
    }

    /// Fallback used to close upstream when the client side fails.
    pub fn client_error() -> Self {
        Self::new(close_code::ERROR, CLIENT_ERROR_REASON)
    }
}

/// A relayed message. Payloads are opaque and forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    /// Close with an optional status. `None` is a generic close.
    Close(Option<CloseReason>),
}

impl Frame {
    pub fn text(payload: impl Into<String>) -> Self {
        Frame::Text(payload.into())
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Frame::Binary(payload.into())
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Frame::Close(_))
    }

    /// Map a client-side message, skipping control frames.
    pub fn from_client(message: ws::Message) -> Option<Self> {
        match message {
            ws::Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
            ws::Message::Binary(data) => Some(Frame::Binary(data)),
            ws::Message::Close(frame) => Some(Frame::Close(frame.map(|f| CloseReason {
                code: f.code,
                reason: f.reason.as_str().to_owned(),
            }))),
            ws::Message::Ping(_) | ws::Message::Pong(_) => None,
        }
    }

    pub fn into_client(self) -> ws::Message {
        match self {
            Frame::Text(text) => ws::Message::Text(text.into()),
            Frame::Binary(data) => ws::Message::Binary(data),
            Frame::Close(reason) => ws::Message::Close(reason.map(|r| ws::CloseFrame {
                code: r.code,
                reason: r.reason.into(),
            })),
        }
    }

    /// Map an upstream message, skipping control and raw frames.
    pub fn from_upstream(message: tungstenite::Message) -> Option<Self> {
        match message {
            tungstenite::Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
            tungstenite::Message::Binary(data) => Some(Frame::Binary(data)),
            tungstenite::Message::Close(frame) => Some(Frame::Close(frame.map(|f| CloseReason {
                code: u16::from(f.code),
                reason: f.reason.as_str().to_owned(),
            }))),
            tungstenite::Message::Ping(_)
            | tungstenite::Message::Pong(_)
            | tungstenite::Message::Frame(_) => None,
        }
    }

    pub fn into_upstream(self) -> tungstenite::Message {
        match self {
            Frame::Text(text) => tungstenite::Message::Text(text.into()),
            Frame::Binary(data) => tungstenite::Message::Binary(data),
            Frame::Close(reason) => {
                tungstenite::Message::Close(reason.map(|r| tungstenite::protocol::CloseFrame {
                    code: CloseCode::from(r.code),
                    reason: r.reason.into(),
                }))
            }
        }
    }
}
