//! Domain layer for serial-ws-bridge.
//!
//! The domain layer contains pure types that have no dependencies on I/O,
//! networking, or external frameworks.
//!
//! # What belongs in the domain layer?
//!
//! - Configuration structures
//! - The relay session state machine
//! - The report describing how a session ended
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, serial port, or `WebSocket` types
//! - File I/O or environment variable reading

pub mod config;
pub mod session;
pub mod state;

pub use config::{BridgeConfig, RelayTiming};
pub use session::{SessionEnd, SessionReport};
pub use state::RelayState;
