use serperf_frame::{Message, MessageReader, MessageWriter};
use serperf_transport::SerialTransport;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::stats::SessionStats;

/// One side's view of the request/response protocol over a shared transport.
///
/// Owns its own encode and payload buffers, so two exchanges may run on the
/// same transport from two threads. Successful sends and receives are counted
/// in the shared [`SessionStats`]; timeouts are not.
pub struct Exchange<'a, T> {
    transport: &'a T,
    reader: MessageReader<&'a T>,
    writer: MessageWriter<&'a T>,
    stats: &'a SessionStats,
    cancel: CancellationToken,
}

impl<'a, T: SerialTransport> Exchange<'a, T> {
    pub fn new(transport: &'a T, stats: &'a SessionStats, cancel: CancellationToken) -> Self {
        Self {
            transport,
            reader: MessageReader::new(transport),
            writer: MessageWriter::new(transport),
            stats,
            cancel,
        }
    }

    /// Send one message. Short writes, write errors and write timeouts are fatal.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let written = self.writer.send(message)?;
        self.stats.record_sent();
        debug!(bytes = written, kind = %message.kind(), "sent message");
        Ok(())
    }

    /// Receive one message, retrying from the header on every read timeout.
    ///
    /// Returns [`SessionError::Cancelled`] once the cancellation token fires;
    /// the token is checked before every read attempt.
    pub fn receive_with_retry(&mut self) -> Result<Message> {
        let cancel = &self.cancel;
        match self.reader.read_message_until(|| cancel.is_cancelled())? {
            Some(message) => {
                self.stats.record_received();
                debug!(bytes = message.len(), kind = %message.kind(), "received message");
                Ok(message)
            }
            None => Err(SessionError::Cancelled),
        }
    }

    /// Send a request and wait for its reply.
    pub fn exchange(&mut self, request: &Message) -> Result<Message> {
        self.send(request)?;
        self.receive_with_retry()
    }

    pub fn transport(&self) -> &'a T {
        self.transport
    }

    /// Read attempts abandoned on timeout so far.
    pub fn timeouts(&self) -> u64 {
        self.reader.timeouts()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serperf_frame::{FrameError, MessageType};
    use serperf_transport::SocketTransport;

    use super::*;

    const TIMEOUT: Option<Duration> = Some(Duration::from_millis(10));

    #[test]
    fn send_and_receive_are_counted() {
        let (left, right) = SocketTransport::pair(TIMEOUT).unwrap();
        let stats = SessionStats::new();
        let mut a = Exchange::new(&left, &stats, CancellationToken::new());
        let mut b = Exchange::new(&right, &stats, CancellationToken::new());

        let message = Message::new(MessageType::PingPong, &b"ping"[..]).unwrap();
        a.send(&message).unwrap();
        assert_eq!(b.receive_with_retry().unwrap(), message);

        assert_eq!(stats.sent(), 1);
        assert_eq!(stats.received(), 1);
    }

    #[test]
    fn timeouts_are_not_counted() {
        let (left, right) = SocketTransport::pair(TIMEOUT).unwrap();
        let stats = SessionStats::new();
        let mut receiver = Exchange::new(&right, &stats, CancellationToken::new());
        let message = Message::new(MessageType::PingPong, &b"late"[..]).unwrap();

        let received = std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(80));
                MessageWriter::new(&left).send(&message).unwrap();
            });
            receiver.receive_with_retry().unwrap()
        });

        assert_eq!(received, message);
        assert!(receiver.timeouts() >= 3, "timeouts = {}", receiver.timeouts());
        assert_eq!(stats.received(), 1);
        assert_eq!(stats.sent(), 0);
    }

    #[test]
    fn cancelled_receive_returns_cancelled() {
        let (_left, right) = SocketTransport::pair(TIMEOUT).unwrap();
        let stats = SessionStats::new();
        let token = CancellationToken::new();
        let mut receiver = Exchange::new(&right, &stats, token.clone());

        let err = std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(30));
                token.cancel();
            });
            receiver.receive_with_retry().unwrap_err()
        });

        assert!(err.is_cancelled());
        assert_eq!(stats.received(), 0);
    }

    #[test]
    fn closed_peer_is_fatal() {
        let (left, right) = SocketTransport::pair(TIMEOUT).unwrap();
        drop(left);
        let stats = SessionStats::new();
        let mut receiver = Exchange::new(&right, &stats, CancellationToken::new());

        let err = receiver.receive_with_retry().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::Transport(serperf_transport::TransportError::Closed))
        ));
    }
}
