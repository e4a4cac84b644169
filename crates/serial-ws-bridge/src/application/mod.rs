//! Application layer for serial-ws-bridge.
//!
//! The application layer knows *what* to do with a client session, but
//! delegates *how* bytes move to the infrastructure layer through traits.
//!
//! # Responsibilities
//!
//! - The [`Relay`]: opens the serial device, interleaves the two directions,
//!   and always releases the device on exit
//! - The [`MessageSession`] seam the relay uses to talk to a WebSocket client
//! - The [`RelayError`] / [`SessionError`] types
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - WebSocket framing (handled by tokio-tungstenite behind `MessageSession`)
//! - Serial driver calls (handled by `serial-link` behind `SerialLink`)

pub mod relay;
pub mod session;

pub use relay::{Relay, RelayError};
pub use session::{Inbound, MessageSession, SessionError};
