//! Checksummed message framing over serial transports.
//!
//! Every message is framed with a 12-byte header in host byte order:
//! - a 4-byte payload length
//! - a 4-byte message type
//! - a 4-byte field carrying the CRC-8 of the payload in its low byte
//!
//! The header and the payload are read as two separate transfers, and a
//! header is fully validated before its length is used to size the payload
//! read.

pub mod codec;
pub mod crc;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_header, decode_payload, encode_frame, encode_message, Message, MessageHeader,
    MessageType, HEADER_SIZE, MAX_PAYLOAD_LEN,
};
pub use crc::crc8;
pub use error::{FrameError, Result, TransferStage};
pub use reader::{MessageReader, ReadOutcome};
pub use writer::MessageWriter;
