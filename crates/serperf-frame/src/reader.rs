use serperf_transport::{SerialTransport, TransportError};
use tracing::{debug, trace};

use crate::codec::{decode_header, decode_payload, Message, HEADER_SIZE, MAX_PAYLOAD_LEN};
use crate::error::{FrameError, Result, TransferStage};

/// Result of a single read attempt.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete, checksum-verified message.
    Message(Message),
    /// The transport timed out while waiting for the given stage. Any partial
    /// frame state has been discarded.
    TimedOut(TransferStage),
}

/// Reads checksummed messages from a [`SerialTransport`].
///
/// The header and the payload are read as two transfers. Either transfer may
/// time out, in which case the attempt is abandoned and the next one starts
/// again from the header. A short transfer is fatal.
pub struct MessageReader<T> {
    inner: T,
    header: [u8; HEADER_SIZE],
    payload: Vec<u8>,
    timeouts: u64,
}

impl<T: SerialTransport> MessageReader<T> {
    /// Create a reader. The payload buffer is sized for the largest frame once,
    /// here, and only ever sliced to validated lengths afterwards.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            header: [0u8; HEADER_SIZE],
            payload: vec![0u8; MAX_PAYLOAD_LEN],
            timeouts: 0,
        }
    }

    /// Make one attempt at reading a message.
    pub fn try_read_message(&mut self) -> Result<ReadOutcome> {
        trace!("reading header");
        if !fill(&self.inner, &mut self.header, TransferStage::Header)? {
            self.timeouts += 1;
            return Ok(ReadOutcome::TimedOut(TransferStage::Header));
        }
        let header = decode_header(&self.header)?;
        debug!(
            length = header.length,
            kind = %header.kind,
            "read header"
        );

        let len = header.payload_len();
        trace!(len, "reading payload");
        if !fill(&self.inner, &mut self.payload[..len], TransferStage::Payload)? {
            self.timeouts += 1;
            return Ok(ReadOutcome::TimedOut(TransferStage::Payload));
        }

        decode_payload(header, &self.payload[..len]).map(ReadOutcome::Message)
    }

    /// Read the next message, retrying from the header on every timeout.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.read_message_until(|| false)? {
                return Ok(message);
            }
        }
    }

    /// Read the next message, retrying on timeouts until `cancelled` returns true.
    ///
    /// `cancelled` is checked before every attempt, so a cancellation is seen
    /// within one read timeout. Returns `Ok(None)` when cancelled; a frame that
    /// was partly received at that moment is dropped.
    pub fn read_message_until(&mut self, cancelled: impl Fn() -> bool) -> Result<Option<Message>> {
        loop {
            if cancelled() {
                return Ok(None);
            }
            match self.try_read_message()? {
                ReadOutcome::Message(message) => return Ok(Some(message)),
                ReadOutcome::TimedOut(stage) => {
                    trace!(%stage, "read timed out, retrying from header");
                }
            }
        }
    }

    /// Number of read attempts abandoned because of a timeout.
    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Fill `buf` with one transfer. `Ok(false)` means the transfer timed out.
fn fill<T: SerialTransport>(inner: &T, buf: &mut [u8], stage: TransferStage) -> Result<bool> {
    if buf.is_empty() {
        return Ok(true);
    }
    match inner.read(buf) {
        Ok(n) if n == buf.len() => Ok(true),
        Ok(n) => Err(FrameError::ShortTransfer {
            stage,
            expected: buf.len(),
            actual: n,
        }),
        Err(TransportError::Timeout) => Ok(false),
        Err(err) => Err(FrameError::Transport(err)),
    }
}

impl<T> std::fmt::Debug for MessageReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageReader")
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
