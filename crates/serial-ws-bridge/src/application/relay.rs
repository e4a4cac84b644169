//! The relay: one serial device ⇄ one WebSocket client.
//!
//! # One iteration
//!
//! ```text
//!  ┌─ shutdown requested? ──► close client, end (Shutdown)
//!  │
//!  ├─ 1. serial → ws   bytes waiting? read one line, decode, send
//!  │                   (no bytes: skip at once, never wait)
//!  │
//!  ├─ 2. ws → serial   wait up to `recv_wait` for one message, write it
//!  │                   (nothing in time: not an error)
//!  │
//!  └─ 3. pace          sleep `idle_pacing`
//! ```
//!
//! The two directions are strictly interleaved inside one task, so each
//! direction keeps its own arrival order and no locking is needed.  The serial
//! link is a local owned by [`Relay::run`], which closes it on every exit path
//! before returning.
//!
//! # Error policy
//!
//! | Condition                          | Effect                               |
//! |------------------------------------|--------------------------------------|
//! | device cannot be opened            | `RelayError::DeviceOpen`, loop never runs |
//! | serial line is not UTF-8           | logged, line dropped, loop continues |
//! | client closes normally             | `Ok(report)` with `ClosedByPeer`     |
//! | any other WebSocket failure        | `RelayError::Session`                |
//! | serial read/write fails mid-session| `RelayError::SerialIo`               |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use serial_link::{decode_line, encode_message, SerialConfig, SerialError, SerialLink, SerialOpener};

use crate::application::session::{Inbound, MessageSession, SessionError};
use crate::domain::{RelayState, RelayTiming, SessionEnd, SessionReport};

// ── Error type ────────────────────────────────────────────────────────────────

/// Fatal errors that end a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The serial device could not be opened.  Nothing was relayed.
    #[error("serial device unavailable: {0}")]
    DeviceOpen(#[source] SerialError),

    /// The WebSocket transport failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The serial device failed after it was opened (e.g. unplugged).
    #[error("serial I/O failed: {0}")]
    SerialIo(#[source] SerialError),
}

// ── Relay ─────────────────────────────────────────────────────────────────────

/// Pairs a serial device with WebSocket sessions, one session at a time per
/// call to [`Relay::run`].
///
/// A `Relay` holds no per-session state, so one instance (behind an `Arc`)
/// serves every accepted connection.
pub struct Relay<O: SerialOpener> {
    opener: O,
    serial: SerialConfig,
    timing: RelayTiming,
    running: Arc<AtomicBool>,
}

impl<O: SerialOpener> Relay<O> {
    /// Creates a relay that opens `serial` through `opener` for each session.
    ///
    /// Sessions end with [`SessionEnd::Shutdown`] once `running` is cleared.
    pub fn new(
        opener: O,
        serial: SerialConfig,
        timing: RelayTiming,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            opener,
            serial,
            timing,
            running,
        }
    }

    /// Runs one complete client session.
    ///
    /// Opens the serial device, relays until the client disconnects (or the
    /// bridge shuts down), then closes the device.  The device is closed
    /// before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`RelayError::DeviceOpen`] if the device cannot be opened.
    /// - [`RelayError::Session`] if the WebSocket fails other than by a normal
    ///   close.
    /// - [`RelayError::SerialIo`] if the device fails mid-session.
    pub async fn run<S: MessageSession>(
        &self,
        session: &mut S,
        session_id: &str,
    ) -> Result<SessionReport, RelayError> {
        let mut state = RelayState::Idle;
        advance(&mut state, RelayState::Opening, session_id);

        let mut link = match self.opener.open(&self.serial) {
            Ok(link) => link,
            Err(e) => {
                warn!("session {session_id}: {e}");
                advance(&mut state, RelayState::Closing, session_id);
                advance(&mut state, RelayState::Closed, session_id);
                return Err(RelayError::DeviceOpen(e));
            }
        };

        info!(
            "session {session_id}: relaying {} @ {} baud",
            link.device(),
            self.serial.baud_rate
        );
        advance(&mut state, RelayState::Relaying, session_id);

        let mut report = SessionReport::new(SessionEnd::ClosedByPeer);
        let outcome = self
            .relay_loop(&mut link, session, session_id, &mut report)
            .await;

        advance(&mut state, RelayState::Closing, session_id);
        link.close();
        advance(&mut state, RelayState::Closed, session_id);

        outcome.map(|end| SessionReport { end, ..report })
    }

    async fn relay_loop<L, S>(
        &self,
        link: &mut L,
        session: &mut S,
        session_id: &str,
        report: &mut SessionReport,
    ) -> Result<SessionEnd, RelayError>
    where
        L: SerialLink,
        S: MessageSession,
    {
        loop {
            if let Some(end) = self.step(link, session, session_id, report).await? {
                return Ok(end);
            }
        }
    }

    /// Runs one iteration.  Returns `Some(end)` when the session is over.
    async fn step<L, S>(
        &self,
        link: &mut L,
        session: &mut S,
        session_id: &str,
        report: &mut SessionReport,
    ) -> Result<Option<SessionEnd>, RelayError>
    where
        L: SerialLink,
        S: MessageSession,
    {
        if !self.running.load(Ordering::Relaxed) {
            debug!("session {session_id}: shutdown requested; closing client");
            if let Err(e) = session.close().await {
                debug!("session {session_id}: close on shutdown failed: {e}");
            }
            return Ok(Some(SessionEnd::Shutdown));
        }

        // ── 1. Serial → WebSocket ─────────────────────────────────────────────
        if link.bytes_available().map_err(RelayError::SerialIo)? {
            let raw = link.read_line().await.map_err(RelayError::SerialIo)?;
            if !raw.is_empty() {
                match decode_line(&raw) {
                    Ok(text) => {
                        debug!("session {session_id}: serial → ws: {text:?}");
                        match session.send_text(text).await {
                            Ok(()) => report.lines_relayed += 1,
                            Err(e) if e.is_graceful() => {
                                return Ok(Some(SessionEnd::ClosedByPeer));
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                    Err(e) => {
                        warn!("session {session_id}: dropping serial line: {e}");
                        report.lines_dropped += 1;
                    }
                }
            }
        }

        // ── 2. WebSocket → Serial ─────────────────────────────────────────────
        match timeout(self.timing.recv_wait, session.recv()).await {
            Err(_elapsed) => {}
            Ok(Ok(Inbound::Text(message))) => {
                link.write_bytes(&encode_message(&message))
                    .await
                    .map_err(RelayError::SerialIo)?;
                debug!("session {session_id}: ws → serial: {message:?}");
                report.messages_relayed += 1;
            }
            Ok(Ok(Inbound::Closed)) => {
                debug!("session {session_id}: client closed the connection");
                return Ok(Some(SessionEnd::ClosedByPeer));
            }
            Ok(Err(e)) if e.is_graceful() => return Ok(Some(SessionEnd::ClosedByPeer)),
            Ok(Err(e)) => return Err(e.into()),
        }

        // ── 3. Idle pacing ────────────────────────────────────────────────────
        sleep(self.timing.idle_pacing).await;
        Ok(None)
    }
}

fn advance(state: &mut RelayState, next: RelayState, session_id: &str) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal relay transition {state} → {next}"
    );
    debug!("session {session_id}: {state} → {next}");
    *state = next;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
