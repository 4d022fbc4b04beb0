use std::path::PathBuf;

/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open or stat the device.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The path exists but is not a character device.
    #[error("{} is not a character device", path.display())]
    NotCharDevice { path: PathBuf },

    /// No data arrived within the read timeout. Not fatal by itself.
    #[error("read timed out")]
    Timeout,

    /// The other end went away (read returned end-of-file).
    #[error("transport closed")]
    Closed,

    /// A driver control request failed.
    #[error("{request} failed: {source}")]
    Control {
        request: &'static str,
        source: std::io::Error,
    },

    /// An I/O error occurred on the device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this error only means "nothing arrived in time".
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
