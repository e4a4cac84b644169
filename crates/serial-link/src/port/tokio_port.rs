//! `tokio-serial` backed implementation of [`SerialLink`].
//!
//! # Non-blocking availability check
//!
//! [`SerialLink::bytes_available`] must never wait.  The driver already knows
//! how many bytes are sitting in its input queue (`bytes_to_read`), but our
//! own `BufReader` may also be holding bytes from an earlier read that
//! overshot a terminator.  Both are checked.
//!
//! # Bounded line reads
//!
//! `read_until` is wrapped in `tokio::time::timeout`.  If the timeout fires
//! part-way through a line, the bytes read so far are already in our buffer
//! (`read_until` appends as it goes), so they are returned rather than lost.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::line::LINE_TERMINATOR;
use crate::port::{SerialError, SerialLink, SerialOpener};

/// Opens real serial devices through `tokio-serial`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSerialOpener;

impl SerialOpener for TokioSerialOpener {
    type Link = TokioSerialLink;

    /// Opens the device in native async mode.
    ///
    /// Must be called from within a Tokio runtime: the port is registered with
    /// the reactor as it is opened.
    fn open(&self, config: &SerialConfig) -> Result<Self::Link, SerialError> {
        let stream = tokio_serial::new(&config.device, config.baud_rate)
            .timeout(config.read_timeout)
            .open_native_async()
            .map_err(|e| SerialError::Open {
                device: config.device.clone(),
                reason: e.to_string(),
            })?;

        info!(
            "serial port {} opened at {} baud",
            config.device, config.baud_rate
        );

        Ok(TokioSerialLink {
            device: config.device.clone(),
            read_timeout: config.read_timeout,
            port: Some(BufReader::new(stream)),
        })
    }
}

/// An open `tokio-serial` connection.
///
/// The stream is held in an `Option` so that [`SerialLink::close`] can drop it
/// (which closes the OS handle) and later calls see `None`.
pub struct TokioSerialLink {
    device: String,
    read_timeout: Duration,
    port: Option<BufReader<SerialStream>>,
}

impl TokioSerialLink {
    fn port_mut(&mut self) -> Result<&mut BufReader<SerialStream>, SerialError> {
        self.port
            .as_mut()
            .ok_or_else(|| SerialError::Closed(self.device.clone()))
    }
}

#[async_trait]
impl SerialLink for TokioSerialLink {
    fn device(&self) -> &str {
        &self.device
    }

    fn bytes_available(&self) -> Result<bool, SerialError> {
        let port = self
            .port
            .as_ref()
            .ok_or_else(|| SerialError::Closed(self.device.clone()))?;

        if !port.buffer().is_empty() {
            return Ok(true);
        }

        let pending = port
            .get_ref()
            .bytes_to_read()
            .map_err(|e| SerialError::Status {
                device: self.device.clone(),
                reason: e.to_string(),
            })?;
        Ok(pending > 0)
    }

    async fn read_line(&mut self) -> Result<Vec<u8>, SerialError> {
        let read_timeout = self.read_timeout;
        let port = self.port_mut()?;

        let mut line = Vec::new();
        let result = timeout(read_timeout, port.read_until(LINE_TERMINATOR, &mut line)).await;
        match result {
            Ok(Ok(_)) => Ok(line),
            Ok(Err(e)) => Err(SerialError::Io(e)),
            Err(_) => {
                debug!(
                    "serial port {}: read timeout with {} bytes of partial line",
                    self.device,
                    line.len()
                );
                Ok(line)
            }
        }
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        let port = self.port_mut()?;
        // BufReader passes writes straight through to the inner stream.
        port.write_all(bytes).await?;
        port.flush().await?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("serial port {} closed", self.device);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for TokioSerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
