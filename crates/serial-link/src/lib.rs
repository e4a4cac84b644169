//! # serial-link
//!
//! The serial side of serial-ws-bridge: everything needed to talk to a
//! byte-stream device that exchanges newline-terminated text.
//!
//! This crate has no knowledge of WebSockets.  It is used by the bridge
//! binary, and its in-memory [`mock`] device is used by the bridge's tests.
//!
//! # Architecture overview (for beginners)
//!
//! A microcontroller on a USB-serial adapter typically prints one reading per
//! line (`"512\r\n"`) and accepts short commands (`"on"`).  This crate
//! provides:
//!
//! - **`config`** – [`SerialConfig`]: which device, which baud rate, and how
//!   long a single line read may wait.
//!
//! - **`line`** – How bytes become text and back.  A line read from the device
//!   is decoded as UTF-8 with the terminator and surrounding whitespace
//!   stripped; a message going to the device is written as raw UTF-8 bytes
//!   with no terminator added.
//!
//! - **`port`** – The [`SerialLink`] / [`SerialOpener`] traits that the relay
//!   programs against, plus the real `tokio-serial` implementation.
//!
//! - **`mock`** – An in-memory device for tests that records writes and
//!   tracks open/close calls.

pub mod config;
pub mod line;
pub mod mock;
pub mod port;

pub use config::SerialConfig;
pub use line::{decode_line, encode_message, LineError, LINE_TERMINATOR};
pub use mock::{MockSerialDevice, MockSerialLink, MockSerialOpener};
pub use port::{SerialError, SerialLink, SerialOpener, TokioSerialLink, TokioSerialOpener};
