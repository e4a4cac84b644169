//! serial-ws-bridge library crate.
//!
//! Relays newline-terminated text between one serial device and one WebSocket
//! client, so a browser sketch can read a microcontroller's output and send it
//! commands.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (text over WebSocket)
//!         ↕
//! [serial-ws-bridge]
//!   ├── domain/           Pure types: BridgeConfig, RelayState, SessionReport
//!   ├── application/      The Relay loop and the MessageSession seam
//!   └── infrastructure/
//!         ├── ws_server/  WebSocket accept loop + device guard (tokio-tungstenite)
//!         ├── ws_session/ MessageSession over a WebSocket stream
//!         └── config_file/ Optional TOML configuration
//!         ↕
//! [serial-link]           Line framing + tokio-serial device
//!         ↕
//! Serial device (e.g. an Arduino over USB)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and on the `serial-link` traits only.
//! - `infrastructure` depends on all other layers plus `tokio` and `tungstenite`.

/// Domain layer: configuration and session types (no I/O).
pub mod domain;

/// Application layer: the relay loop.
pub mod application;

/// Infrastructure layer: WebSocket server, session adapter, config file.
pub mod infrastructure;
