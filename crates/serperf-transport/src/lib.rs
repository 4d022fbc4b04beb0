//! Serial character-device transport.
//!
//! This is the lowest layer of serperf. It exposes the [`SerialTransport`]
//! capability the protocol engine is written against:
//! - [`SerialDevice`] drives a real character device (Linux), either through
//!   plain `read(2)`/`write(2)` or through the serial driver's control requests
//! - [`SocketTransport`] carries the same contract over a Unix stream pair,
//!   which is how the engine is exercised without hardware
//!
//! A read that times out is reported as [`TransportError::Timeout`] and is
//! never retried here. Retrying is the caller's decision.

pub mod error;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod device;

#[cfg(unix)]
pub mod socket;

pub use error::{Result, TransportError};
pub use traits::{DeviceConfig, SerialTransport, TransferMode, DEFAULT_READ_TIMEOUT};

#[cfg(target_os = "linux")]
pub use device::SerialDevice;

#[cfg(unix)]
pub use socket::{SocketTransport, DEFAULT_WRITE_TIMEOUT};
