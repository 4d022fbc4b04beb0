//! Payload patterns shared by client and server.
//!
//! Generated payloads are filled with [`FILL_BYTE`] and end in
//! [`SENTINEL_BYTE`], so a reply truncated by even one byte no longer ends in
//! the sentinel.

use bytes::Bytes;
use serperf_frame::MAX_PAYLOAD_LEN;

use crate::error::{Result, SessionError};

pub const FILL_BYTE: u8 = 0x55;
pub const SENTINEL_BYTE: u8 = 0xFF;

/// Size of a byte-request payload.
pub const REQUEST_LEN: usize = 4;

/// `len` fill bytes with the sentinel in the last position.
pub fn fill_pattern(len: usize) -> Bytes {
    let mut pattern = vec![FILL_BYTE; len];
    if let Some(last) = pattern.last_mut() {
        *last = SENTINEL_BYTE;
    }
    Bytes::from(pattern)
}

/// Payload of a request for `count` bytes (host byte order).
pub fn request_payload(count: u32) -> Bytes {
    Bytes::copy_from_slice(&count.to_ne_bytes())
}

/// Check that `count` is a byte count the server can reply with.
pub fn validate_request_count(count: u32) -> Result<()> {
    if count == 0 || count as usize > MAX_PAYLOAD_LEN {
        return Err(SessionError::InvalidRequest(format!(
            "{count} bytes requested (valid range 1..={MAX_PAYLOAD_LEN})"
        )));
    }
    Ok(())
}

/// Decode and validate the byte count carried by a request payload.
pub fn parse_request(payload: &[u8]) -> Result<u32> {
    let bytes: [u8; REQUEST_LEN] = payload.try_into().map_err(|_| {
        SessionError::InvalidRequest(format!(
            "request payload is {} bytes, expected {REQUEST_LEN}",
            payload.len()
        ))
    })?;
    let count = u32::from_ne_bytes(bytes);
    validate_request_count(count)?;
    Ok(count)
}

/// Offset of the first byte where `a` and `b` differ, counting a length
/// difference as a difference at the end of the shorter slice.
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b.iter())
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_ends_in_sentinel() {
        let pattern = fill_pattern(8);
        assert_eq!(pattern.len(), 8);
        assert!(pattern[..7].iter().all(|&b| b == FILL_BYTE));
        assert_eq!(pattern[7], SENTINEL_BYTE);
    }

    #[test]
    fn single_byte_pattern_is_sentinel() {
        assert_eq!(fill_pattern(1).as_ref(), &[SENTINEL_BYTE]);
    }

    #[test]
    fn empty_pattern() {
        assert!(fill_pattern(0).is_empty());
    }

    #[test]
    fn request_roundtrip() {
        let payload = request_payload(500);
        assert_eq!(payload.len(), REQUEST_LEN);
        assert_eq!(parse_request(&payload).unwrap(), 500);
    }

    #[test]
    fn request_bounds() {
        assert!(parse_request(&request_payload(1)).is_ok());
        assert!(parse_request(&request_payload(MAX_PAYLOAD_LEN as u32)).is_ok());
        assert!(parse_request(&request_payload(0)).is_err());
        assert!(parse_request(&request_payload(MAX_PAYLOAD_LEN as u32 + 1)).is_err());
    }

    #[test]
    fn request_with_wrong_size_rejected() {
        let err = parse_request(&[1, 0, 0]).unwrap_err();
        assert!(matches!(err, SessionError::InvalidRequest(_)));
        assert!(parse_request(&[1, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn first_difference_cases() {
        assert_eq!(first_difference(b"abc", b"abc"), None);
        assert_eq!(first_difference(b"abc", b"abd"), Some(2));
        assert_eq!(first_difference(b"abc", b"ab"), Some(2));
        assert_eq!(first_difference(b"", b"x"), Some(0));
    }
}
