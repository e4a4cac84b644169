//! Serial connection settings.

use std::time::Duration;

/// Default baud rate: the Arduino `Serial.begin(9600)` convention.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default upper bound for a single line read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default device identifier for the current platform.
#[cfg(target_os = "windows")]
pub const DEFAULT_DEVICE: &str = "COM7";

/// Default device identifier for the current platform.
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Everything needed to open one serial connection.
///
/// The baud rate is not validated: it must simply match what the connected
/// hardware was programmed with.  A mismatch does not fail to open, it just
/// produces garbage bytes (which the line decoder will then drop).
///
/// # Example
///
/// ```rust
/// use serial_link::SerialConfig;
///
/// let cfg = SerialConfig::new("/dev/ttyACM0", 115_200);
/// assert_eq!(cfg.baud_rate, 115_200);
/// assert_eq!(cfg.read_timeout, std::time::Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name, e.g. `/dev/ttyACM0` or `COM7`.
    pub device: String,
    /// Line speed in bits per second.
    pub baud_rate: u32,
    /// How long one `read_line` may wait for the terminator before returning
    /// whatever bytes have arrived so far.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Creates a config with the default read timeout.
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Returns a copy with a different read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE, DEFAULT_BAUD_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_baud_rate_is_9600() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud_rate, 9600);
    }

    #[test]
    fn test_default_read_timeout_is_one_second() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_default_device_matches_platform_constant() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.device, DEFAULT_DEVICE);
    }

    #[test]
    fn test_with_read_timeout_overrides_only_timeout() {
        // Arrange
        let cfg = SerialConfig::new("COM3", 115_200);

        // Act
        let cfg = cfg.with_read_timeout(Duration::from_millis(250));

        // Assert
        assert_eq!(cfg.device, "COM3");
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.read_timeout, Duration::from_millis(250));
    }
}
