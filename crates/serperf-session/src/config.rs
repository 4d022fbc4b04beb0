use std::fmt;

use serperf_frame::{Message, MessageType, MAX_PAYLOAD_LEN};

use crate::error::{Result, SessionError};
use crate::pattern::{fill_pattern, request_payload, validate_request_count};
use crate::stop::StopCondition;

/// Which end of the protocol this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
    /// Send and receive on the same looped-back device.
    Loopback,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Server => "Server",
            Role::Client => "Client",
            Role::Loopback => "Loopback",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol settings of a session. Immutable once validated.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub role: Role,
    /// Ping-pong payload length.
    pub msg_len: usize,
    pub msg_type: MessageType,
    /// Byte count asked for by byte-request messages.
    pub requested_bytes: u32,
    pub stop: StopCondition,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::Client,
            msg_len: 1024,
            msg_type: MessageType::PingPong,
            requested_bytes: 0,
            stop: StopCondition::Unbounded,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.msg_len > MAX_PAYLOAD_LEN {
            return Err(SessionError::InvalidConfig(format!(
                "{} bytes: not a valid length (0 <= length <= {MAX_PAYLOAD_LEN})",
                self.msg_len
            )));
        }
        if self.role == Role::Client && self.msg_type == MessageType::RequestBytes {
            validate_request_count(self.requested_bytes)
                .map_err(|err| SessionError::InvalidConfig(err.to_string()))?;
        }
        Ok(())
    }

    /// The message a client or loopback writer sends on every iteration.
    pub fn request_message(&self) -> Result<Message> {
        let payload = match self.msg_type {
            MessageType::PingPong => fill_pattern(self.msg_len),
            MessageType::RequestBytes => request_payload(self.requested_bytes),
        };
        Ok(Message::new(self.msg_type, payload)?)
    }

    /// Length of the payload each request carries.
    pub fn request_len(&self) -> usize {
        match self.msg_type {
            MessageType::PingPong => self.msg_len,
            MessageType::RequestBytes => crate::pattern::REQUEST_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::SENTINEL_BYTE;

    #[test]
    fn default_is_ping_pong_1024() {
        let config = SessionConfig::default();
        config.validate().unwrap();
        let message = config.request_message().unwrap();
        assert_eq!(message.kind(), MessageType::PingPong);
        assert_eq!(message.len(), 1024);
        assert_eq!(message.payload[1023], SENTINEL_BYTE);
    }

    #[test]
    fn byte_request_message_carries_count() {
        let config = SessionConfig {
            msg_type: MessageType::RequestBytes,
            requested_bytes: 500,
            ..SessionConfig::default()
        };
        config.validate().unwrap();
        let message = config.request_message().unwrap();
        assert_eq!(message.len(), 4);
        assert_eq!(config.request_len(), 4);
        assert_eq!(message.payload.as_ref(), &500u32.to_ne_bytes());
    }

    #[test]
    fn oversize_length_rejected() {
        let config = SessionConfig {
            msg_len: MAX_PAYLOAD_LEN + 1,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(SessionError::InvalidConfig(_))));
    }

    #[test]
    fn client_byte_request_needs_a_count() {
        let config = SessionConfig {
            msg_type: MessageType::RequestBytes,
            requested_bytes: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let server = SessionConfig {
            role: Role::Server,
            ..config
        };
        assert!(server.validate().is_ok());
    }

    #[test]
    fn zero_length_ping_pong_is_valid() {
        let config = SessionConfig {
            msg_len: 0,
            ..SessionConfig::default()
        };
        config.validate().unwrap();
        assert!(config.request_message().unwrap().is_empty());
    }
}
