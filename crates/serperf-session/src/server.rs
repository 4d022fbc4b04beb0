use std::convert::Infallible;

use serperf_frame::{Message, MessageType};
use serperf_transport::SerialTransport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Result;
use crate::exchange::Exchange;
use crate::pattern::{fill_pattern, parse_request};
use crate::stats::SessionStats;

/// Answers requests until cancelled or a fatal error.
///
/// Each iteration waits for a header, waits for its payload (both retried
/// from the header on timeout), then dispatches on the message type.
pub struct Server<'a, T> {
    exchange: Exchange<'a, T>,
}

impl<'a, T: SerialTransport> Server<'a, T> {
    pub fn new(transport: &'a T, stats: &'a SessionStats, cancel: CancellationToken) -> Self {
        Self {
            exchange: Exchange::new(transport, stats, cancel),
        }
    }

    /// Receive one request and send its reply.
    pub fn serve_one(&mut self) -> Result<()> {
        let request = self.exchange.receive_with_retry()?;
        let reply = respond(&request)?;
        self.exchange.send(&reply)
    }

    /// Serve until an error. Cancellation surfaces as
    /// [`SessionError::Cancelled`](crate::SessionError::Cancelled).
    pub fn run(&mut self) -> Result<Infallible> {
        info!(
            transport = self.exchange.transport().transport_name(),
            "starting server"
        );
        loop {
            self.serve_one()?;
        }
    }
}

/// Build the reply to a request.
///
/// - ping-pong: same type, payload echoed unchanged
/// - byte request: `N` pattern bytes ending in the sentinel, for the `N` the
///   4-byte payload asks for
pub fn respond(request: &Message) -> Result<Message> {
    match request.kind() {
        MessageType::PingPong => {
            debug!(bytes = request.len(), "ping pong");
            Ok(Message::new(MessageType::PingPong, request.payload.clone())?)
        }
        MessageType::RequestBytes => {
            let count = parse_request(&request.payload)?;
            debug!(count, "request bytes");
            Ok(Message::new(
                MessageType::RequestBytes,
                fill_pattern(count as usize),
            )?)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serperf_frame::{MessageReader, MessageWriter, MAX_PAYLOAD_LEN};
    use serperf_transport::SocketTransport;

    use super::*;
    use crate::error::SessionError;
    use crate::pattern::{request_payload, FILL_BYTE, SENTINEL_BYTE};

    #[test]
    fn ping_pong_echoes_payload() {
        for len in [0usize, 1, 7, 1024, MAX_PAYLOAD_LEN] {
            let payload: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let request = Message::new(MessageType::PingPong, payload.clone()).unwrap();
            let reply = respond(&request).unwrap();
            assert_eq!(reply.kind(), MessageType::PingPong);
            assert_eq!(reply.payload.as_ref(), payload.as_slice());
            assert_eq!(reply.header, request.header);
        }
    }

    #[test]
    fn request_bytes_replies_with_sentinel_pattern() {
        for count in [1u32, 2, 500, 4096, MAX_PAYLOAD_LEN as u32] {
            let request = Message::new(MessageType::RequestBytes, request_payload(count)).unwrap();
            let reply = respond(&request).unwrap();
            assert_eq!(reply.kind(), MessageType::RequestBytes);
            assert_eq!(reply.header.length, count);
            assert_eq!(reply.len(), count as usize);
            assert_eq!(reply.payload[count as usize - 1], SENTINEL_BYTE);
            assert!(reply.payload[..count as usize - 1]
                .iter()
                .all(|&b| b == FILL_BYTE));
        }
    }

    #[test]
    fn request_bytes_out_of_range_is_fatal() {
        for count in [0u32, MAX_PAYLOAD_LEN as u32 + 1] {
            let request = Message::new(MessageType::RequestBytes, request_payload(count)).unwrap();
            assert!(matches!(
                respond(&request),
                Err(SessionError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn serves_over_socket_until_cancelled() {
        let timeout = Some(Duration::from_millis(10));
        let (client_end, server_end) = SocketTransport::pair(timeout).unwrap();
        let stats = SessionStats::new();
        let token = CancellationToken::new();

        let result = std::thread::scope(|s| {
            let server = s.spawn(|| Server::new(&server_end, &stats, token.clone()).run());

            let mut writer = MessageWriter::new(&client_end);
            let mut reader = MessageReader::new(&client_end);
            let request = Message::new(MessageType::PingPong, &b"over the wire"[..]).unwrap();
            for _ in 0..3 {
                writer.send(&request).unwrap();
                assert_eq!(reader.read_message().unwrap(), request);
            }

            token.cancel();
            server.join().unwrap()
        });

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(stats.received(), 3);
        assert_eq!(stats.sent(), 3);
    }
}
