use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::crc8;
use crate::error::{FrameError, Result};

/// Frame header: length (4) + type (4) + crc (4) = 12 bytes.
pub const HEADER_SIZE: usize = 12;

/// Largest payload a frame may carry. Longer headers are rejected before
/// anything is read into the payload buffer.
pub const MAX_PAYLOAD_LEN: usize = 131_072;

/// Message types carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// The server echoes the payload back unchanged.
    PingPong,
    /// The 4-byte payload holds a byte count the server replies with.
    RequestBytes,
}

impl MessageType {
    /// Wire code of this type.
    pub fn code(self) -> i32 {
        match self {
            MessageType::PingPong => 0,
            MessageType::RequestBytes => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::PingPong => "PING_PONG",
            MessageType::RequestBytes => "REQ_BYTES",
        }
    }
}

impl TryFrom<i32> for MessageType {
    type Error = FrameError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(MessageType::PingPong),
            1 => Ok(MessageType::RequestBytes),
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded frame header.
///
/// `crc` is the raw 32-bit wire field; a valid frame carries the payload's
/// CRC-8 in the low byte and zero above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub length: u32,
    pub kind: MessageType,
    pub crc: u32,
}

impl MessageHeader {
    /// Build the header that describes `payload`.
    pub fn for_payload(kind: MessageType, payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::OversizeLength {
                length: payload.len() as i64,
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(Self {
            length: payload.len() as u32,
            kind,
            crc: u32::from(crc8(payload)),
        })
    }

    /// Payload length as a buffer size.
    pub fn payload_len(&self) -> usize {
        self.length as usize
    }
}

/// A complete message: header plus the payload it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: Bytes,
}

impl Message {
    /// Create a message, computing its header from the payload.
    pub fn new(kind: MessageType, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let header = MessageHeader::for_payload(kind, &payload)?;
        Ok(Self { header, payload })
    }

    pub fn kind(&self) -> MessageType {
        self.header.kind
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The total wire size of this message (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a header and its payload into the wire format.
///
/// Wire format (host byte order):
/// ```text
/// ┌──────────────┬──────────────┬──────────────────┬─────────────────┐
/// │ Length (4B)  │ Type (4B)    │ CRC (4B)         │ Payload         │
/// │ i32          │ i32          │ crc8 in low byte │ (Length bytes)  │
/// └──────────────┴──────────────┴──────────────────┴─────────────────┘
/// ```
pub fn encode_frame(header: &MessageHeader, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if header.payload_len() != payload.len() {
        return Err(FrameError::HeaderMismatch {
            header: header.length,
            payload: payload.len(),
        });
    }
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::OversizeLength {
            length: payload.len() as i64,
            max: MAX_PAYLOAD_LEN,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_i32_ne(header.length as i32);
    dst.put_i32_ne(header.kind.code());
    dst.put_u32_ne(header.crc);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a complete message.
pub fn encode_message(message: &Message, dst: &mut BytesMut) -> Result<()> {
    encode_frame(&message.header, &message.payload, dst)
}

/// Decode and validate a frame header.
///
/// Negative lengths and lengths above [`MAX_PAYLOAD_LEN`] are rejected here,
/// so a corrupt length never sizes a read.
pub fn decode_header(src: &[u8; HEADER_SIZE]) -> Result<MessageHeader> {
    let length = i32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
    let code = i32::from_ne_bytes([src[4], src[5], src[6], src[7]]);
    let crc = u32::from_ne_bytes([src[8], src[9], src[10], src[11]]);

    if length < 0 || length as usize > MAX_PAYLOAD_LEN {
        return Err(FrameError::OversizeLength {
            length: i64::from(length),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let kind = MessageType::try_from(code)?;

    Ok(MessageHeader {
        length: length as u32,
        kind,
        crc,
    })
}

/// Pair a decoded header with its payload bytes and verify the checksum.
pub fn decode_payload(header: MessageHeader, src: &[u8]) -> Result<Message> {
    if src.len() != header.payload_len() {
        return Err(FrameError::HeaderMismatch {
            header: header.length,
            payload: src.len(),
        });
    }

    let computed = crc8(src);
    if header.crc != u32::from(computed) {
        return Err(FrameError::ChecksumMismatch {
            expected: header.crc,
            computed,
        });
    }

    Ok(Message {
        header,
        payload: Bytes::copy_from_slice(src),
    })
}
