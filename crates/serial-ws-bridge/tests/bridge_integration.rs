//! Integration tests for the full bridge: a real WebSocket listener on an
//! ephemeral port, real `tokio-tungstenite` clients, and a mock serial device.
//!
//! # What is covered
//!
//! - Lines written by the device reach the browser in order, terminators
//!   stripped; browser messages reach the device in order, unmodified.
//! - The device is released when the browser disconnects.
//! - A second browser is turned away with close code 1013 while the device is
//!   in use, and can connect once the first one leaves.
//! - A device that cannot be opened is reported to the browser with 1011.
//! - Clearing the `running` flag closes connected browsers with 1001 and stops
//!   the accept loop; `serve` only returns once the device is released.
//!
//! The relay timing is shortened so the tests run quickly in real time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use serial_link::{MockSerialDevice, SerialConfig};
use serial_ws_bridge::domain::{BridgeConfig, RelayTiming};
use serial_ws_bridge::infrastructure::serve;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEADLINE: Duration = Duration::from_secs(5);

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Bridge {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start_bridge(device: &MockSerialDevice) -> Bridge {
    start_bridge_with_timing(
        device,
        RelayTiming {
            recv_wait: Duration::from_millis(20),
            idle_pacing: Duration::from_millis(2),
        },
    )
    .await
}

async fn start_bridge_with_timing(device: &MockSerialDevice, timing: RelayTiming) -> Bridge {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let config = BridgeConfig {
        ws_bind_addr: addr,
        serial: SerialConfig::new("/dev/mock0", 9600),
        timing,
    };
    let handle = tokio::spawn(serve(
        listener,
        config,
        device.opener(),
        Arc::clone(&running),
    ));
    Bridge {
        addr,
        running,
        handle,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}")).await.unwrap();
    client
}

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let result = timeout(DEADLINE, async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for: {what}");
}

async fn next_message(client: &mut Client) -> Message {
    timeout(DEADLINE, client.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("websocket error")
}

async fn expect_close_code(client: &mut Client, expected: CloseCode) {
    match next_message(client).await {
        Message::Close(Some(frame)) => assert_eq!(frame.code, expected),
        other => panic!("expected close frame with {expected:?}, got {other:?}"),
    }
}

// ── Relay in both directions ──────────────────────────────────────────────────

#[tokio::test]
async fn test_bidirectional_relay_and_release_on_close() {
    // Arrange
    let device = MockSerialDevice::new();
    let bridge = start_bridge(&device).await;
    let mut client = connect(bridge.addr).await;
    wait_until("device opened", || device.is_open()).await;

    // Act 1: device prints two readings
    device.push_bytes(b"12\r\n34\r\n");

    // Assert 1: browser sees them in order, terminators stripped
    assert_eq!(next_message(&mut client).await, Message::Text("12".to_string()));
    assert_eq!(next_message(&mut client).await, Message::Text("34".to_string()));

    // Act 2: browser sends two commands
    client.send(Message::Text("on".to_string())).await.unwrap();
    client.send(Message::Text("off".to_string())).await.unwrap();

    // Assert 2: device receives them verbatim, in order
    wait_until("two serial writes", || device.written().len() == 2).await;
    assert_eq!(device.written(), vec![b"on".to_vec(), b"off".to_vec()]);

    // Act 3: browser leaves normally
    client.close(None).await.unwrap();

    // Assert 3: serial device released exactly once
    wait_until("device closed", || !device.is_open()).await;
    assert_eq!(device.close_count(), 1);

    bridge.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_garbled_line_is_skipped_and_session_survives() {
    let device = MockSerialDevice::new();
    let bridge = start_bridge(&device).await;
    let mut client = connect(bridge.addr).await;
    wait_until("device opened", || device.is_open()).await;

    device.push_bytes(&[0xFF, 0xFE, 0xFD, b'\n']);
    device.push_line("still here");

    assert_eq!(
        next_message(&mut client).await,
        Message::Text("still here".to_string())
    );
    assert!(device.is_open());

    bridge.running.store(false, Ordering::Relaxed);
}

// ── One client at a time ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_client_rejected_while_device_busy() {
    // Arrange: first client holds the device
    let device = MockSerialDevice::new();
    let bridge = start_bridge(&device).await;
    let mut first = connect(bridge.addr).await;
    wait_until("device opened", || device.is_open()).await;

    // Act
    let mut second = connect(bridge.addr).await;

    // Assert: second client is told to try again later; device opened once
    match next_message(&mut second).await {
        Message::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::Again);
            assert_eq!(frame.reason, "serial device busy");
        }
        other => panic!("expected busy close frame, got {other:?}"),
    }
    assert_eq!(device.open_count(), 1);

    // Act: first client leaves, a new one connects
    first.close(None).await.unwrap();
    wait_until("device released", || !device.is_open()).await;
    let _third = connect(bridge.addr).await;

    // Assert: the device is handed to the new client
    wait_until("device reopened", || device.open_count() == 2).await;

    bridge.running.store(false, Ordering::Relaxed);
}

// ── Failure paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_open_failure_closes_client_with_error_code() {
    // Arrange
    let device = MockSerialDevice::new();
    device.set_fail_open(true);
    let bridge = start_bridge(&device).await;

    // Act
    let mut client = connect(bridge.addr).await;

    // Assert
    expect_close_code(&mut client, CloseCode::Error).await;
    assert_eq!(device.open_count(), 0);
    assert!(!device.is_open());

    bridge.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_shutdown_closes_clients_and_stops_listener() {
    // Arrange
    let device = MockSerialDevice::new();
    let bridge = start_bridge(&device).await;
    let mut client = connect(bridge.addr).await;
    wait_until("device opened", || device.is_open()).await;

    // Act
    bridge.running.store(false, Ordering::Relaxed);

    // Assert: browser gets "going away", device released, accept loop ends
    expect_close_code(&mut client, CloseCode::Away).await;
    wait_until("device closed", || !device.is_open()).await;
    let served = timeout(DEADLINE, bridge.handle)
        .await
        .expect("listener did not stop")
        .expect("listener task panicked");
    assert!(served.is_ok());
}

#[tokio::test]
async fn test_serve_waits_for_session_to_release_device_on_shutdown() {
    // Arrange: a long receive wait keeps the session busy when the flag drops
    let device = MockSerialDevice::new();
    let bridge = start_bridge_with_timing(
        &device,
        RelayTiming {
            recv_wait: Duration::from_millis(1000),
            idle_pacing: Duration::from_millis(2),
        },
    )
    .await;
    let mut client = connect(bridge.addr).await;
    wait_until("device opened", || device.is_open()).await;

    // Act
    bridge.running.store(false, Ordering::Relaxed);
    let served = timeout(DEADLINE, bridge.handle)
        .await
        .expect("listener did not stop")
        .expect("listener task panicked");

    // Assert: the device is already released when serve returns, and the
    // browser got a proper close frame rather than a reset
    assert!(served.is_ok());
    assert!(!device.is_open());
    assert_eq!(device.close_count(), 1);
    expect_close_code(&mut client, CloseCode::Away).await;
}
