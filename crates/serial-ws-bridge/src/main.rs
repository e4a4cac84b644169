//! serial-ws-bridge: entry point.
//!
//! Opens a WebSocket server and, for each connected client, relays lines from
//! a serial device to the client and client messages back to the device.
//!
//! # Usage
//!
//! ```text
//! serial-ws-bridge [OPTIONS]
//!
//! Options:
//!   --config          <PATH>  TOML config file
//!   --device          <NAME>  Serial device [default: /dev/ttyUSB0, COM7 on Windows]
//!   --baud            <RATE>  Baud rate [default: 9600]
//!   --read-timeout-ms <MS>    Serial line read timeout [default: 1000]
//!   --ws-bind         <IP>    WebSocket bind address [default: 127.0.0.1]
//!   --ws-port         <PORT>  WebSocket port [default: 8765]
//!   --recv-wait-ms    <MS>    WebSocket receive wait per iteration [default: 100]
//!   --idle-ms         <MS>    Pause per iteration [default: 10]
//!   --log-level       <LEVEL> Log filter when RUST_LOG is unset [default: info]
//! ```
//!
//! Every option can also be set through an environment variable
//! (`SERIAL_WS_DEVICE`, `SERIAL_WS_BAUD`, ...) or the config file.  Precedence:
//! CLI / environment, then config file, then the defaults above.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use serial_link::{SerialConfig, TokioSerialOpener};
use serial_ws_bridge::domain::{BridgeConfig, RelayTiming};
use serial_ws_bridge::infrastructure::{load_config, run_server, FileConfig};

const DEFAULT_LOG_LEVEL: &str = "info";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial-to-WebSocket bridge.
///
/// Fields are `Option`s so that an absent flag can fall through to the config
/// file instead of shadowing it with a clap default.
#[derive(Debug, Parser)]
#[command(
    name = "serial-ws-bridge",
    about = "Relays text lines between a serial device and a WebSocket client",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "SERIAL_WS_CONFIG")]
    config: Option<PathBuf>,

    /// Serial device to open, e.g. `/dev/ttyACM0` or `COM7`.
    #[arg(long, env = "SERIAL_WS_DEVICE")]
    device: Option<String>,

    /// Serial baud rate.  Must match the device's firmware.
    #[arg(long, env = "SERIAL_WS_BAUD")]
    baud: Option<u32>,

    /// Maximum time one serial line read may wait for its terminator.
    #[arg(long, env = "SERIAL_WS_READ_TIMEOUT_MS")]
    read_timeout_ms: Option<u64>,

    /// IP address to bind the WebSocket server to.
    ///
    /// The default `127.0.0.1` only accepts browsers on this machine.
    #[arg(long, env = "SERIAL_WS_BIND")]
    ws_bind: Option<String>,

    /// TCP port for the WebSocket server.
    #[arg(long, env = "SERIAL_WS_PORT")]
    ws_port: Option<u16>,

    /// How long each relay iteration waits for a WebSocket message.
    #[arg(long, env = "SERIAL_WS_RECV_WAIT_MS")]
    recv_wait_ms: Option<u64>,

    /// Pause at the end of each relay iteration.
    #[arg(long, env = "SERIAL_WS_IDLE_MS")]
    idle_ms: Option<u64>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "SERIAL_WS_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Merges CLI values over `file` over the defaults.
    ///
    /// Returns the bridge config and the log filter to use.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is not an IP address, or if both
    /// relay waits are zero (the loop would spin).
    fn resolve(self, file: FileConfig) -> anyhow::Result<(BridgeConfig, String)> {
        let defaults = BridgeConfig::default();

        let ws_ip: IpAddr = match self.ws_bind.or(file.websocket.bind_address) {
            Some(text) => text
                .parse()
                .with_context(|| format!("invalid WebSocket bind address: '{text}'"))?,
            None => defaults.ws_bind_addr.ip(),
        };
        let ws_port = self
            .ws_port
            .or(file.websocket.port)
            .unwrap_or(defaults.ws_bind_addr.port());

        let serial = SerialConfig {
            device: self
                .device
                .or(file.serial.device)
                .unwrap_or(defaults.serial.device),
            baud_rate: self
                .baud
                .or(file.serial.baud_rate)
                .unwrap_or(defaults.serial.baud_rate),
            read_timeout: self
                .read_timeout_ms
                .or(file.serial.read_timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.serial.read_timeout),
        };

        let timing = RelayTiming {
            recv_wait: self
                .recv_wait_ms
                .or(file.relay.recv_wait_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.timing.recv_wait),
            idle_pacing: self
                .idle_ms
                .or(file.relay.idle_pacing_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.timing.idle_pacing),
        };
        if timing.idle_iteration_bound().is_zero() {
            anyhow::bail!("recv-wait and idle pacing cannot both be zero");
        }

        let log_level = self
            .log_level
            .or(file.log_level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let config = BridgeConfig {
            ws_bind_addr: SocketAddr::new(ws_ip, ws_port),
            serial,
            timing,
        };
        Ok((config, log_level))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => FileConfig::default(),
    };
    let (config, log_level) = cli.resolve(file)?;

    // `RUST_LOG` wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    info!(
        "serial-ws-bridge starting: ws={}, serial={} @ {} baud",
        config.ws_bind_addr, config.serial.device, config.serial.baud_rate
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    //
    // Cleared on Ctrl+C.  The accept loop checks it every 200 ms and each
    // relay checks it every iteration, closing its client with 1001.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, TokioSerialOpener, running).await?;

    info!("serial-ws-bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
