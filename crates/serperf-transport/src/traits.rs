use std::time::Duration;

use crate::error::Result;

/// Default blocking-read timeout applied to opened devices.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A duplex byte transport with an all-or-nothing delivery contract.
///
/// Methods take `&self`: a single handle is shared by a reader and a writer
/// thread in loopback mode, the same way a character device file descriptor is.
///
/// - `read` fills as much of `buf` as one delivery provides. A return value
///   smaller than `buf.len()` is a short transfer and the caller treats it as
///   fatal. When nothing arrives in time it returns [`TransportError::Timeout`].
/// - `write` hands `buf` to the device in one delivery and reports how many
///   bytes were accepted.
/// - `clear_rx_buffer` discards anything already received.
///
/// [`TransportError::Timeout`]: crate::TransportError::Timeout
pub trait SerialTransport: Send + Sync {
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    fn write(&self, buf: &[u8]) -> Result<usize>;

    fn clear_rx_buffer(&self) -> Result<()>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<T: SerialTransport + ?Sized> SerialTransport for &T {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn clear_rx_buffer(&self) -> Result<()> {
        (**self).clear_rx_buffer()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

/// How bytes are moved to and from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Plain `read(2)` / `write(2)`.
    #[default]
    ReadWrite,
    /// The serial driver's read/write control requests.
    Ioctl {
        /// Ask the driver to return only once the transmit FIFO has drained.
        wait_for_xmit: bool,
    },
}

impl TransferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::ReadWrite => "read-write",
            TransferMode::Ioctl {
                wait_for_xmit: false,
            } => "ioctl",
            TransferMode::Ioctl {
                wait_for_xmit: true,
            } => "ioctl+wait-for-xmit",
        }
    }
}

/// Configuration applied when a device is opened.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub mode: TransferMode,
    /// How long a single read may block before reporting a timeout.
    pub read_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mode: TransferMode::ReadWrite,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_mode_names() {
        assert_eq!(TransferMode::ReadWrite.as_str(), "read-write");
        assert_eq!(
            TransferMode::Ioctl {
                wait_for_xmit: false
            }
            .as_str(),
            "ioctl"
        );
        assert_eq!(
            TransferMode::Ioctl {
                wait_for_xmit: true
            }
            .as_str(),
            "ioctl+wait-for-xmit"
        );
    }

    #[test]
    fn default_device_config() {
        let cfg = DeviceConfig::default();
        assert_eq!(cfg.mode, TransferMode::ReadWrite);
        assert_eq!(cfg.read_timeout, DEFAULT_READ_TIMEOUT);
    }
}
