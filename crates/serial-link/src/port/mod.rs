//! Serial device abstraction.
//!
//! The relay never touches `tokio-serial` directly.  It is written against two
//! small traits:
//!
//! - [`SerialOpener`] – turns a [`SerialConfig`] into an open link.  One
//!   opener lives for the whole process; it is asked for a fresh link every
//!   time a client connects.
//! - [`SerialLink`] – one open connection: a non-blocking availability check,
//!   a line read bounded by the configured read timeout, a raw write, and an
//!   idempotent close.
//!
//! Production code uses [`TokioSerialOpener`]; tests use
//! [`crate::mock::MockSerialOpener`].

pub mod tokio_port;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SerialConfig;

pub use tokio_port::{TokioSerialLink, TokioSerialOpener};

/// Errors reported by a serial device.
#[derive(Debug, Error)]
pub enum SerialError {
    /// The device could not be opened (missing, busy, or permission denied).
    #[error("cannot open serial device {device}: {reason}")]
    Open { device: String, reason: String },

    /// Querying the number of pending input bytes failed.
    #[error("cannot query serial device {device}: {reason}")]
    Status { device: String, reason: String },

    /// A read or write on an open device failed (e.g. the adapter was unplugged).
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link has already been closed.
    #[error("serial device {0} is closed")]
    Closed(String),
}

/// One open serial connection.
///
/// Implementations must make [`SerialLink::close`] safe to call any number of
/// times, and must release the device when dropped even if `close` was never
/// called.
#[async_trait]
pub trait SerialLink: Send {
    /// Identifier of the underlying device, for log messages.
    fn device(&self) -> &str;

    /// Returns `true` if at least one unread byte is waiting.
    ///
    /// Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Closed`] after `close`, or
    /// [`SerialError::Status`] if the driver query fails.
    fn bytes_available(&self) -> Result<bool, SerialError>;

    /// Reads bytes up to and including the line terminator.
    ///
    /// If the read timeout elapses first, returns whatever was read so far,
    /// which may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Io`] on a driver failure or
    /// [`SerialError::Closed`] after `close`.
    async fn read_line(&mut self) -> Result<Vec<u8>, SerialError>;

    /// Writes all of `bytes` to the device.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Io`] on a driver failure or
    /// [`SerialError::Closed`] after `close`.
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// Releases the device.  Calling it again is a no-op.
    fn close(&mut self);

    /// Returns `false` once `close` has been called.
    fn is_open(&self) -> bool;
}

/// Opens serial links on demand.
pub trait SerialOpener: Send + Sync {
    /// The link type produced by this opener.
    type Link: SerialLink + 'static;

    /// Opens the device described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Open`] if the device cannot be opened.  The
    /// caller must not retry: the session is over.
    fn open(&self, config: &SerialConfig) -> Result<Self::Link, SerialError>;
}
