//! The WebSocket side of a relay session, as the relay sees it.
//!
//! The relay only needs three things from a connected client: send one text
//! message, wait for the next text message, and close.  Everything else
//! (handshake, ping/pong, close handshake replies, binary frames) is the
//! transport's business.  Keeping this behind a trait lets the relay be tested
//! with an in-memory session.

use async_trait::async_trait;
use thiserror::Error;

/// Something received from the client that the relay must act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// One text message, to be written to the serial device.
    Text(String),
    /// The client completed a normal close.  Not an error.
    Closed,
}

/// Failures of the WebSocket transport.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The client closed with a code other than normal / going away.
    #[error("websocket closed abnormally with code {code}: {reason:?}")]
    AbnormalClose { code: u16, reason: String },

    /// The TCP connection went away without a close handshake.
    #[error("websocket connection lost without a close handshake")]
    ConnectionLost,

    /// Any other transport failure.
    #[error("websocket transport error: {0}")]
    Transport(String),

    /// The session was already closed normally when we tried to use it.
    ///
    /// The relay treats this exactly like [`Inbound::Closed`].
    #[error("websocket session already closed")]
    Closed,
}

impl SessionError {
    /// Returns `true` if this "error" really reports a normal close.
    pub fn is_graceful(&self) -> bool {
        matches!(self, SessionError::Closed)
    }
}

/// One connected WebSocket client.
#[async_trait]
pub trait MessageSession: Send {
    /// Sends `text` as a single text message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the client has already closed
    /// normally, or another [`SessionError`] on transport failure.
    async fn send_text(&mut self, text: String) -> Result<(), SessionError>;

    /// Waits for the next text message or a normal close.
    ///
    /// Must be cancel safe: the relay wraps it in a timeout, and a message must
    /// never be lost because the timeout fired.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] for abnormal closes and transport failures.
    async fn recv(&mut self) -> Result<Inbound, SessionError>;

    /// Closes the session from our side (the bridge is going away).
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the close frame cannot be sent.
    async fn close(&mut self) -> Result<(), SessionError>;
}
