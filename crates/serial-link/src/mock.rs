//! In-memory serial device for tests.
//!
//! # Why a mock device?
//!
//! A real serial port needs hardware plugged in, and what the hardware sends
//! cannot be scripted from test code.  [`MockSerialDevice`] replaces the
//! hardware with two in-memory queues:
//!
//! - **incoming** – bytes the "device" has sent and the relay has not read
//!   yet.  Tests fill it with [`MockSerialDevice::push_bytes`] or
//!   [`MockSerialDevice::push_line`].
//! - **written** – every buffer the relay wrote, in order, one entry per
//!   `write_bytes` call.
//!
//! The device also counts opens and closes so tests can assert that the relay
//! released the port on every exit path.
//!
//! # Usage in tests
//!
//! ```rust
//! use serial_link::{MockSerialDevice, SerialConfig, SerialLink, SerialOpener};
//!
//! # tokio_test::block_on(async {
//! let device = MockSerialDevice::new();
//! device.push_line("12");
//!
//! let mut link = device.opener().open(&SerialConfig::default()).unwrap();
//! assert!(link.bytes_available().unwrap());
//! assert_eq!(link.read_line().await.unwrap(), b"12\r\n".to_vec());
//!
//! link.write_bytes(b"on").await.unwrap();
//! link.close();
//!
//! assert_eq!(device.written(), vec![b"on".to_vec()]);
//! assert!(!device.is_open());
//! # });
//! ```
//!
//! `MockSerialDevice` is a cheap handle: clones share the same state, so the
//! test keeps one clone while the relay owns the opener.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::config::SerialConfig;
use crate::line::LINE_TERMINATOR;
use crate::port::{SerialError, SerialLink, SerialOpener};

#[derive(Debug, Default)]
struct DeviceState {
    incoming: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    open_links: usize,
    open_count: usize,
    close_count: usize,
    fail_open: bool,
    fail_writes: bool,
}

/// Shared handle to one simulated serial device.
#[derive(Debug, Clone, Default)]
pub struct MockSerialDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockSerialDevice {
    /// Creates a device with empty queues that opens successfully.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns an opener that hands out links to this device.
    pub fn opener(&self) -> MockSerialOpener {
        MockSerialOpener {
            device: self.clone(),
        }
    }

    /// Appends raw bytes as if the device had just transmitted them.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state().incoming.extend(bytes.iter().copied());
    }

    /// Appends `text` followed by `\r\n`, the Arduino `Serial.println` format.
    pub fn push_line(&self, text: &str) {
        let mut line = text.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.push_bytes(&line);
    }

    /// Number of bytes not yet consumed by a reader.
    pub fn pending_input(&self) -> usize {
        self.state().incoming.len()
    }

    /// Every buffer written so far, in write order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    /// Returns `true` while any link to this device is open.
    pub fn is_open(&self) -> bool {
        self.state().open_links > 0
    }

    /// How many times the device has been opened successfully.
    pub fn open_count(&self) -> usize {
        self.state().open_count
    }

    /// How many times an open link actually released the device.
    pub fn close_count(&self) -> usize {
        self.state().close_count
    }

    /// When `true`, every subsequent `open` fails with [`SerialError::Open`].
    pub fn set_fail_open(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    /// When `true`, every subsequent write fails with a broken-pipe I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }
}

/// [`SerialOpener`] for a [`MockSerialDevice`].
#[derive(Debug, Clone)]
pub struct MockSerialOpener {
    device: MockSerialDevice,
}

impl SerialOpener for MockSerialOpener {
    type Link = MockSerialLink;

    fn open(&self, config: &SerialConfig) -> Result<Self::Link, SerialError> {
        let mut state = self.device.state();
        if state.fail_open {
            return Err(SerialError::Open {
                device: config.device.clone(),
                reason: "mock open failure".to_string(),
            });
        }
        state.open_links += 1;
        state.open_count += 1;
        drop(state);

        Ok(MockSerialLink {
            name: config.device.clone(),
            device: self.device.clone(),
            open: true,
        })
    }
}

/// An open link to a [`MockSerialDevice`].
#[derive(Debug)]
pub struct MockSerialLink {
    name: String,
    device: MockSerialDevice,
    open: bool,
}

impl MockSerialLink {
    fn ensure_open(&self) -> Result<(), SerialError> {
        if self.open {
            Ok(())
        } else {
            Err(SerialError::Closed(self.name.clone()))
        }
    }
}

#[async_trait]
impl SerialLink for MockSerialLink {
    fn device(&self) -> &str {
        &self.name
    }

    fn bytes_available(&self) -> Result<bool, SerialError> {
        self.ensure_open()?;
        Ok(!self.device.state().incoming.is_empty())
    }

    /// Pops bytes through the next terminator, or everything left if there is
    /// no terminator (the equivalent of a read timeout mid-line).
    async fn read_line(&mut self) -> Result<Vec<u8>, SerialError> {
        self.ensure_open()?;
        let mut state = self.device.state();
        let mut line = Vec::new();
        while let Some(byte) = state.incoming.pop_front() {
            line.push(byte);
            if byte == LINE_TERMINATOR {
                break;
            }
        }
        Ok(line)
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.ensure_open()?;
        let mut state = self.device.state();
        if state.fail_writes {
            return Err(SerialError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        state.written.push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let mut state = self.device.state();
        state.open_links -= 1;
        state.close_count += 1;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for MockSerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn open(device: &MockSerialDevice) -> MockSerialLink {
        device.opener().open(&SerialConfig::default()).unwrap()
    }

    #[test]
    fn test_new_device_is_closed() {
        let device = MockSerialDevice::new();
        assert!(!device.is_open());
        assert_eq!(device.open_count(), 0);
    }

    #[test]
    fn test_open_marks_device_open() {
        // Arrange
        let device = MockSerialDevice::new();

        // Act
        let link = open(&device);

        // Assert
        assert!(link.is_open());
        assert!(device.is_open());
        assert_eq!(device.open_count(), 1);
    }

    #[test]
    fn test_fail_open_returns_open_error_and_stays_closed() {
        // Arrange
        let device = MockSerialDevice::new();
        device.set_fail_open(true);

        // Act
        let result = device.opener().open(&SerialConfig::new("COM9", 9600));

        // Assert
        assert!(matches!(result, Err(SerialError::Open { ref device, .. }) if device == "COM9"));
        assert!(!device.is_open());
        assert_eq!(device.open_count(), 0);
    }

    #[test]
    fn test_bytes_available_reflects_incoming_queue() {
        let device = MockSerialDevice::new();
        let link = open(&device);

        assert!(!link.bytes_available().unwrap());
        device.push_bytes(b"x");
        assert!(link.bytes_available().unwrap());
    }

    #[tokio::test]
    async fn test_read_line_stops_after_terminator() {
        // Arrange: two lines queued at once
        let device = MockSerialDevice::new();
        device.push_bytes(b"12\r\n34\r\n");
        let mut link = open(&device);

        // Act
        let first = link.read_line().await.unwrap();

        // Assert: only the first line is consumed
        assert_eq!(first, b"12\r\n".to_vec());
        assert_eq!(device.pending_input(), 4);
    }

    #[tokio::test]
    async fn test_read_line_without_terminator_returns_remainder() {
        let device = MockSerialDevice::new();
        device.push_bytes(b"partial");
        let mut link = open(&device);

        assert_eq!(link.read_line().await.unwrap(), b"partial".to_vec());
        assert_eq!(device.pending_input(), 0);
    }

    #[tokio::test]
    async fn test_writes_are_recorded_in_order() {
        let device = MockSerialDevice::new();
        let mut link = open(&device);

        link.write_bytes(b"on").await.unwrap();
        link.write_bytes(b"off").await.unwrap();

        assert_eq!(device.written(), vec![b"on".to_vec(), b"off".to_vec()]);
    }

    #[tokio::test]
    async fn test_fail_writes_returns_io_error() {
        let device = MockSerialDevice::new();
        device.set_fail_writes(true);
        let mut link = open(&device);

        let result = link.write_bytes(b"on").await;

        assert!(matches!(result, Err(SerialError::Io(_))));
        assert!(device.written().is_empty());
    }

    #[test]
    fn test_close_twice_releases_once() {
        // Arrange
        let device = MockSerialDevice::new();
        let mut link = open(&device);

        // Act: closing an already-closed link must be harmless
        link.close();
        link.close();

        // Assert
        assert!(!link.is_open());
        assert!(!device.is_open());
        assert_eq!(device.close_count(), 1);
    }

    #[tokio::test]
    async fn test_operations_after_close_return_closed() {
        let device = MockSerialDevice::new();
        let mut link = open(&device);
        link.close();

        assert!(matches!(link.bytes_available(), Err(SerialError::Closed(_))));
        assert!(matches!(link.read_line().await, Err(SerialError::Closed(_))));
        assert!(matches!(
            link.write_bytes(b"x").await,
            Err(SerialError::Closed(_))
        ));
    }

    #[test]
    fn test_drop_releases_device() {
        let device = MockSerialDevice::new();
        {
            let _link = open(&device);
            assert!(device.is_open());
        }
        assert!(!device.is_open());
        assert_eq!(device.close_count(), 1);
    }
}
