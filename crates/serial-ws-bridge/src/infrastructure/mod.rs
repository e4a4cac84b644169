//! Infrastructure layer for serial-ws-bridge.
//!
//! The infrastructure layer handles all I/O that is not the serial device
//! itself (that lives in the `serial-link` crate).
//!
//! # Responsibilities
//!
//! - Binding a TCP listener for browser WebSocket connections
//! - Performing the WebSocket HTTP upgrade handshake
//! - Adapting a `tokio-tungstenite` stream to the relay's `MessageSession`
//! - Guarding the serial device so only one client uses it at a time
//! - Reading the optional TOML config file
//!
//! # What does NOT belong here?
//!
//! - The relay loop itself (that is the application layer)
//! - Configuration types (that is the domain layer)

pub mod config_file;
pub mod ws_server;
pub mod ws_session;

pub use config_file::{load_config, ConfigError, FileConfig};
pub use ws_server::{run_server, serve};
pub use ws_session::WsSession;
