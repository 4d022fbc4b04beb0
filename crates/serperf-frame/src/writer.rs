use bytes::BytesMut;
use serperf_transport::SerialTransport;
use tracing::trace;

use crate::codec::{encode_message, Message, HEADER_SIZE, MAX_PAYLOAD_LEN};
use crate::error::{FrameError, Result, TransferStage};

/// Writes complete messages to a [`SerialTransport`].
///
/// Header and payload go out in one transfer. A short write is fatal and
/// nothing is retried, including write timeouts.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: SerialTransport> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(HEADER_SIZE + MAX_PAYLOAD_LEN),
        }
    }

    /// Encode and send a message. Returns the number of bytes written.
    pub fn send(&mut self, message: &Message) -> Result<usize> {
        self.buf.clear();
        encode_message(message, &mut self.buf)?;

        trace!(bytes = self.buf.len(), kind = %message.kind(), "writing frame");
        let written = self.inner.write(&self.buf)?;
        if written != self.buf.len() {
            return Err(FrameError::ShortTransfer {
                stage: TransferStage::Frame,
                expected: self.buf.len(),
                actual: written,
            });
        }
        Ok(written)
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for MessageWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageWriter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serperf_transport::TransportError;

    use super::*;
    use crate::codec::{decode_header, decode_payload, MessageType};

    #[derive(Default)]
    struct RecordingTransport {
        written: Mutex<Vec<Vec<u8>>>,
        accept_at_most: Option<usize>,
        fail: bool,
    }

    impl SerialTransport for RecordingTransport {
        fn read(&self, _buf: &mut [u8]) -> serperf_transport::Result<usize> {
            Err(TransportError::Timeout)
        }

        fn write(&self, buf: &[u8]) -> serperf_transport::Result<usize> {
            if self.fail {
                return Err(TransportError::Io(std::io::ErrorKind::BrokenPipe.into()));
            }
            let n = self.accept_at_most.map_or(buf.len(), |max| max.min(buf.len()));
            self.written.lock().unwrap().push(buf[..n].to_vec());
            Ok(n)
        }

        fn clear_rx_buffer(&self) -> serperf_transport::Result<()> {
            Ok(())
        }

        fn transport_name(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn header_and_payload_in_one_write() {
        let mut writer = MessageWriter::new(RecordingTransport::default());
        let message = Message::new(MessageType::PingPong, &b"hello"[..]).unwrap();

        assert_eq!(writer.send(&message).unwrap(), HEADER_SIZE + 5);

        let written = writer.into_inner().written.into_inner().unwrap();
        assert_eq!(written.len(), 1);

        let (head, payload) = written[0].split_at(HEADER_SIZE);
        let header = decode_header(head.try_into().unwrap()).unwrap();
        assert_eq!(decode_payload(header, payload).unwrap(), message);
    }

    #[test]
    fn buffer_reused_between_sends() {
        let mut writer = MessageWriter::new(RecordingTransport::default());
        let big = Message::new(MessageType::PingPong, vec![1u8; 2048]).unwrap();
        let small = Message::new(MessageType::PingPong, vec![2u8; 3]).unwrap();

        writer.send(&big).unwrap();
        writer.send(&small).unwrap();

        let written = writer.into_inner().written.into_inner().unwrap();
        assert_eq!(written[1].len(), HEADER_SIZE + 3);
    }

    #[test]
    fn short_write_is_fatal() {
        let transport = RecordingTransport {
            accept_at_most: Some(7),
            ..RecordingTransport::default()
        };
        let mut writer = MessageWriter::new(transport);
        let message = Message::new(MessageType::PingPong, &b"payload"[..]).unwrap();

        let err = writer.send(&message).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortTransfer {
                stage: TransferStage::Frame,
                expected,
                actual: 7
            } if expected == HEADER_SIZE + 7
        ));
    }

    #[test]
    fn io_error_propagates() {
        let transport = RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        };
        let mut writer = MessageWriter::new(transport);
        let message = Message::new(MessageType::RequestBytes, 8u32.to_ne_bytes().to_vec()).unwrap();

        let err = writer.send(&message).unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Io(_))));
    }
}
