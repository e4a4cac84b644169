//! [`MessageSession`] over a `tokio-tungstenite` WebSocket stream.
//!
//! # Close handling
//!
//! | Received                                   | Result                         |
//! |--------------------------------------------|--------------------------------|
//! | Close frame, no code / 1000 / 1001 / 1005  | `Ok(Inbound::Closed)`          |
//! | Close frame, any other code                | `Err(AbnormalClose)`           |
//! | EOF without a close frame                  | `Err(ConnectionLost)`          |
//! | stream used after a normal close           | `Err(Closed)` (graceful)       |
//!
//! When tungstenite reads a Close frame it queues the reply itself; we flush
//! once so the client sees the handshake complete.
//!
//! # Cancel safety
//!
//! The relay calls [`MessageSession::recv`] under a timeout.  A received
//! Close frame is classified and stored before the reply is flushed, so a
//! timeout during the flush only delays the outcome to the next `recv`.
//!
//! # Frames the relay never sees
//!
//! Ping/Pong are answered by tungstenite.  Binary frames are not part of the
//! bridge protocol and are logged and skipped.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};

use crate::application::session::{Inbound, MessageSession, SessionError};

/// A WebSocket client connection as seen by the relay.
pub struct WsSession<T> {
    stream: WebSocketStream<T>,
    peer_closed: bool,
    /// Outcome of a received Close frame, held until its reply is flushed.
    pending_close: Option<Result<Inbound, SessionError>>,
}

impl<T> WsSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an already-upgraded WebSocket stream.
    pub fn new(stream: WebSocketStream<T>) -> Self {
        Self {
            stream,
            peer_closed: false,
            pending_close: None,
        }
    }

    /// Closes the connection with an explicit code and reason.
    ///
    /// Used by the listener to tell the client why its session failed (e.g.
    /// the serial device could not be opened).  A no-op if the client already
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the close frame cannot be sent.
    pub async fn close_with(&mut self, code: CloseCode, reason: &str) -> Result<(), SessionError> {
        if self.peer_closed {
            return Ok(());
        }
        let frame = CloseFrame {
            code,
            reason: reason.to_string().into(),
        };
        match self.stream.close(Some(frame)).await {
            Ok(()) => Ok(()),
            Err(e) => match map_ws_error(e) {
                SessionError::Closed => Ok(()),
                other => Err(other),
            },
        }
    }
}

#[async_trait]
impl<T> MessageSession for WsSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        if self.peer_closed {
            return Err(SessionError::Closed);
        }
        self.stream
            .send(WsMessage::Text(text))
            .await
            .map_err(map_ws_error)
    }

    async fn recv(&mut self) -> Result<Inbound, SessionError> {
        loop {
            if self.pending_close.is_some() {
                // Push out the close reply tungstenite queued.  Once the
                // handshake is done this reports ConnectionClosed, which is
                // expected.
                if let Err(e) = self.stream.flush().await {
                    debug!("flush after close: {e}");
                }
                if let Some(outcome) = self.pending_close.take() {
                    return outcome;
                }
            }

            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(map_ws_error(e)),
                None if self.peer_closed => return Ok(Inbound::Closed),
                None => return Err(SessionError::ConnectionLost),
            };

            match message {
                WsMessage::Text(text) => return Ok(Inbound::Text(text)),
                WsMessage::Binary(data) => {
                    warn!("ignoring binary WebSocket frame ({} bytes)", data.len());
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) => {
                    debug!("WebSocket ping/pong");
                }
                WsMessage::Close(frame) => {
                    self.peer_closed = true;
                    self.pending_close = Some(classify_close(frame));
                }
                WsMessage::Frame(_) => {
                    debug!("raw frame (ignored)");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.close_with(CloseCode::Away, "bridge shutting down").await
    }
}

/// Maps a received Close frame to the relay's view of it.
fn classify_close(frame: Option<CloseFrame<'_>>) -> Result<Inbound, SessionError> {
    match frame {
        None => Ok(Inbound::Closed),
        Some(frame) if is_normal_close(frame.code) => Ok(Inbound::Closed),
        Some(frame) => Err(SessionError::AbnormalClose {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        }),
    }
}

/// Close codes that end a session normally.
fn is_normal_close(code: CloseCode) -> bool {
    matches!(code, CloseCode::Normal | CloseCode::Away | CloseCode::Status)
}

fn map_ws_error(e: WsError) -> SessionError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => SessionError::Closed,
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            SessionError::ConnectionLost
        }
        WsError::Io(io)
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) =>
        {
            SessionError::ConnectionLost
        }
        other => SessionError::Transport(other.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
