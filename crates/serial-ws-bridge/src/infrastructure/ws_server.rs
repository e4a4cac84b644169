//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from browsers.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Making sure only one session at a time owns the serial device.
//! 5. Running the [`Relay`] for the session and logging how it ended.
//! 6. Stopping the accept loop when the `running` flag is cleared, then
//!    waiting for open sessions to close their clients and the device.
//!
//! # One client at a time
//!
//! Each session opens the serial device itself, and a serial device cannot be
//! meaningfully shared by two readers.  A listener-wide async mutex guards
//! the device: the session that holds it relays, and a client that connects
//! meanwhile is sent close code 1013 ("try again later") straight after the
//! handshake.
//!
//! # Scalability
//!
//! Sessions still run as independent Tokio tasks, so a slow handshake or a
//! rejected client never delays the accept loop.  The tasks live in a
//! [`JoinSet`] owned by [`serve`]; finished ones are reaped on every poll and
//! the rest are drained on shutdown, so `serve` does not return while a
//! session still holds the serial device.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use serial_link::SerialOpener;

use crate::application::{Relay, RelayError};
use crate::domain::BridgeConfig;
use crate::infrastructure::ws_session::WsSession;

/// How often the accept loop re-checks the `running` flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long shutdown waits for open sessions before aborting them.
///
/// A session notices the cleared `running` flag within one relay iteration,
/// which can include a full serial read timeout plus the receive wait.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Close reason sent to a client that connects while the device is in use.
pub const BUSY_REASON: &str = "serial device busy";

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.ws_bind_addr` and serves clients until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server<O>(
    config: BridgeConfig,
    opener: O,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()>
where
    O: SerialOpener + 'static,
{
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;

    serve(listener, config, opener, running).await
}

/// Serves clients on an already-bound listener until `running` is cleared.
///
/// `config.ws_bind_addr` is ignored here; the listener's own address is used.
/// Once the flag is cleared, the accept loop stops and `serve` waits (up to
/// [`SESSION_DRAIN_TIMEOUT`]) for every session to send its close frame and
/// release the serial device.  Sessions still running after that are aborted,
/// which drops their serial links.
///
/// # Errors
///
/// Returns an error if the listener's local address cannot be read.
pub async fn serve<O>(
    listener: TcpListener,
    config: BridgeConfig,
    opener: O,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()>
where
    O: SerialOpener + 'static,
{
    let local_addr = listener
        .local_addr()
        .context("failed to read WebSocket listener address")?;

    info!(
        "WebSocket bridge listening on ws://{local_addr} for serial device {} @ {} baud",
        config.serial.device, config.serial.baud_rate
    );

    let relay = Arc::new(Relay::new(
        opener,
        config.serial,
        config.timing,
        Arc::clone(&running),
    ));
    let device_guard = Arc::new(Mutex::new(()));
    let mut sessions = JoinSet::new();

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the loop notices the shutdown flag even when no
        // browsers are connecting.
        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let relay = Arc::clone(&relay);
                let guard = Arc::clone(&device_guard);
                sessions.spawn(async move {
                    handle_client(stream, peer_addr, relay, guard).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {}
        }

        while let Some(joined) = sessions.try_join_next() {
            log_session_exit(joined);
        }
    }

    drain_sessions(&mut sessions).await;
    Ok(())
}

/// Waits for the remaining session tasks, aborting them after
/// [`SESSION_DRAIN_TIMEOUT`].
async fn drain_sessions(sessions: &mut JoinSet<()>) {
    if sessions.is_empty() {
        return;
    }
    info!("waiting for {} open session(s) to close", sessions.len());

    let drained = timeout(SESSION_DRAIN_TIMEOUT, async {
        while let Some(joined) = sessions.join_next().await {
            log_session_exit(joined);
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            "{} session(s) still open after {:?}; aborting",
            sessions.len(),
            SESSION_DRAIN_TIMEOUT
        );
        sessions.abort_all();
        while let Some(joined) = sessions.join_next().await {
            log_session_exit(joined);
        }
    }
}

fn log_session_exit(joined: Result<(), JoinError>) {
    match joined {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => debug!("session task aborted"),
        Err(e) => error!("session task panicked: {e}"),
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Runs one accepted connection from handshake to close.
async fn handle_client<O>(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    relay: Arc<Relay<O>>,
    device_guard: Arc<Mutex<()>>,
) where
    O: SerialOpener + 'static,
{
    let session_id = Uuid::new_v4().to_string();
    info!("session {session_id}: connection from {peer_addr}");

    let ws_stream = match accept_async(raw_stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("session {session_id}: WebSocket handshake failed: {e}");
            return;
        }
    };
    let mut session = WsSession::new(ws_stream);

    // Held until this function returns, i.e. until the relay has closed the
    // serial device.
    let _device = match device_guard.try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("session {session_id}: {BUSY_REASON}; rejecting {peer_addr}");
            if let Err(e) = session.close_with(CloseCode::Again, BUSY_REASON).await {
                debug!("session {session_id}: busy close failed: {e}");
            }
            return;
        }
    };

    match relay.run(&mut session, &session_id).await {
        Ok(report) => info!("session {session_id}: ended: {report}"),
        Err(e @ (RelayError::DeviceOpen(_) | RelayError::SerialIo(_))) => {
            warn!("session {session_id}: ended with error: {e}");
            // Tell the browser why, so the sketch can show something useful.
            let reason = close_reason(&e.to_string());
            if let Err(close_err) = session.close_with(CloseCode::Error, &reason).await {
                debug!("session {session_id}: error close failed: {close_err}");
            }
        }
        Err(e) => warn!("session {session_id}: ended with error: {e}"),
    }
}

/// Largest close reason that fits in a control frame (125 bytes minus the
/// 2-byte code).
const MAX_CLOSE_REASON: usize = 123;

/// Trims `text` to fit a close frame without splitting a UTF-8 character.
fn close_reason(text: &str) -> String {
    if text.len() <= MAX_CLOSE_REASON {
        return text.to_string();
    }
    let mut end = MAX_CLOSE_REASON;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
