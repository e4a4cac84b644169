//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from defaults, an optional TOML file and CLI
//! arguments (see `main.rs`), and then handed to the listener.
//!
//! Keeping configuration as a plain struct (no global constants for the port
//! name or baud rate) is what lets the tests run the full relay against a mock
//! serial device on an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

use serial_link::SerialConfig;

/// Default WebSocket listen address: localhost only.
pub const DEFAULT_WS_BIND_ADDR: &str = "127.0.0.1:8765";

/// Default upper bound for one WebSocket receive attempt.
pub const DEFAULT_RECV_WAIT: Duration = Duration::from_millis(100);

/// Default pause at the end of every relay iteration.
pub const DEFAULT_IDLE_PACING: Duration = Duration::from_millis(10);

/// Timing knobs for the relay loop.
///
/// One idle iteration (no serial bytes, no WebSocket message) takes
/// `recv_wait + idle_pacing`, which is also the worst-case latency added in
/// either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTiming {
    /// How long the WebSocket → serial step waits for a message before
    /// moving on.
    pub recv_wait: Duration,
    /// Pause after both steps so an idle session does not spin a CPU core.
    pub idle_pacing: Duration,
}

impl RelayTiming {
    /// Worst-case duration of one iteration when both sides are idle.
    pub fn idle_iteration_bound(&self) -> Duration {
        self.recv_wait + self.idle_pacing
    }
}

impl Default for RelayTiming {
    fn default() -> Self {
        Self {
            recv_wait: DEFAULT_RECV_WAIT,
            idle_pacing: DEFAULT_IDLE_PACING,
        }
    }
}

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use serial_ws_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 8765);
/// assert_eq!(cfg.serial.baud_rate, 9600);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// Defaults to `127.0.0.1` so the serial device is only reachable from a
    /// browser on the same machine.
    pub ws_bind_addr: SocketAddr,

    /// Which serial device to open for each client session.
    pub serial: SerialConfig,

    /// Relay loop timing.
    pub timing: RelayTiming,
}

impl Default for BridgeConfig {
    /// | Field                | Default           |
    /// |----------------------|-------------------|
    /// | ws_bind_addr         | `127.0.0.1:8765`  |
    /// | serial.device        | `/dev/ttyUSB0` (`COM7` on Windows) |
    /// | serial.baud_rate     | 9600              |
    /// | serial.read_timeout  | 1 second          |
    /// | timing.recv_wait     | 100 ms            |
    /// | timing.idle_pacing   | 10 ms             |
    fn default() -> Self {
        Self {
            // Compile-time-known valid socket address.
            ws_bind_addr: SocketAddr::from(([127, 0, 0, 1], 8765)),
            serial: SerialConfig::default(),
            timing: RelayTiming::default(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
