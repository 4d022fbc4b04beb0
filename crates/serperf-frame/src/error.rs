use std::fmt;

use serperf_transport::TransportError;

/// Which part of a frame a transfer was moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Header,
    Payload,
    /// Header and payload written together.
    Frame,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStage::Header => f.write_str("header"),
            TransferStage::Payload => f.write_str("payload"),
            TransferStage::Frame => f.write_str("frame"),
        }
    }
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The transport failed. A read timeout only reaches this variant when it
    /// happened on the write side or the caller asked for it.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The transport moved fewer bytes than one frame field needs.
    #[error("{stage}: transferred {actual} bytes, expected {expected}")]
    ShortTransfer {
        stage: TransferStage,
        expected: usize,
        actual: usize,
    },

    /// The header length is negative or above the payload ceiling.
    #[error("header length {length} out of range (max {max})")]
    OversizeLength { length: i64, max: usize },

    /// The header type code is not a known message type.
    #[error("unknown message type ({0})")]
    UnknownMessageType(i32),

    /// The payload checksum does not match the header.
    #[error("bad CRC: header carries {expected:#x}, payload computes {computed:#04x}")]
    ChecksumMismatch { expected: u32, computed: u8 },

    /// A header and the payload it was paired with disagree on the length.
    #[error("header length {header} does not match payload length {payload}")]
    HeaderMismatch { header: u32, payload: usize },
}

impl FrameError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FrameError::Transport(err) if err.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
