use serperf_frame::{FrameError, MessageType};
use serperf_transport::TransportError;

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error outside of a frame transfer.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error (short transfer, bad length, bad CRC, unknown type).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A byte-request reply carried a different number of bytes.
    #[error(
        "server reply does not match the bytes requested (requested = {requested}) (got = {got})"
    )]
    ReplyLengthMismatch { requested: u32, got: usize },

    /// A ping-pong reply differs from the payload that was sent.
    #[error("server reply is not the same as the payload sent (first difference at byte {offset})")]
    ReplyPayloadMismatch { offset: usize },

    /// A reply arrived with a different message type than the request.
    #[error("server replied with {got}, expected {expected}")]
    ReplyTypeMismatch {
        expected: MessageType,
        got: MessageType,
    },

    /// A byte request the server cannot honour.
    #[error("invalid byte request: {0}")]
    InvalidRequest(String),

    /// The session configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread could not be started.
    #[error("failed to start {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    /// The session was cancelled before it finished.
    #[error("session cancelled")]
    Cancelled,
}

impl SessionError {
    /// Whether the session ended because it was asked to.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }

    /// Whether the error is a payload integrity failure.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(
            self,
            SessionError::Frame(FrameError::ChecksumMismatch { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
