use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::SerialTransport;

/// How long a write may wait for room in the peer's receive buffer.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A [`SerialTransport`] over a Unix stream socket.
///
/// Stream sockets may split a delivery across several `read` calls, so `read`
/// keeps filling the buffer until it is full, the peer closes, or the read
/// timeout fires. A timeout before the first byte is a [`TransportError::Timeout`];
/// a timeout after some bytes is reported as a short read.
///
/// Writes block until the peer has room, up to [`DEFAULT_WRITE_TIMEOUT`], so a
/// writer whose reader has gone away does not hang forever.
pub struct SocketTransport {
    reader: UnixStream,
    writer: UnixStream,
}

impl SocketTransport {
    /// Wrap one end of a connected stream.
    pub fn new(stream: UnixStream, read_timeout: Option<Duration>) -> Result<Self> {
        let reader = stream.try_clone()?;
        reader.set_read_timeout(read_timeout)?;
        stream.set_write_timeout(Some(DEFAULT_WRITE_TIMEOUT))?;
        Ok(Self {
            reader,
            writer: stream,
        })
    }

    /// Two connected ends, like the two sides of a null-modem cable.
    pub fn pair(read_timeout: Option<Duration>) -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((Self::new(left, read_timeout)?, Self::new(right, read_timeout)?))
    }

    /// A single handle whose writes come back on its own reads, like a device
    /// with its TX line wired to its RX line.
    pub fn looped(read_timeout: Option<Duration>) -> Result<Self> {
        let (tx, rx) = UnixStream::pair()?;
        rx.set_read_timeout(read_timeout)?;
        tx.set_write_timeout(Some(DEFAULT_WRITE_TIMEOUT))?;
        Ok(Self {
            reader: rx,
            writer: tx,
        })
    }

    /// Replace the write timeout.
    pub fn with_write_timeout(self, timeout: Duration) -> Result<Self> {
        self.writer.set_write_timeout(Some(timeout))?;
        Ok(self)
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

impl SerialTransport for SocketTransport {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match (&self.reader).read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Err(TransportError::Closed),
                Ok(0) => return Ok(filled),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) && filled == 0 => return Err(TransportError::Timeout),
                Err(err) if is_timeout(&err) => return Ok(filled),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(filled)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match (&self.writer).write(&buf[offset..]) {
                Ok(0) => break,
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) && offset == 0 => return Err(TransportError::Timeout),
                Err(err) if is_timeout(&err) => break,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(offset)
    }

    fn clear_rx_buffer(&self) -> Result<()> {
        self.reader.set_nonblocking(true)?;

        let mut scratch = [0u8; 4096];
        let mut discarded = 0usize;
        let drained = loop {
            match (&self.reader).read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(n) => discarded += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        self.reader.set_nonblocking(false)?;
        debug!(discarded, "erased receive buffer");
        drained.map_err(|source| TransportError::Control {
            request: "drain",
            source,
        })
    }

    fn transport_name(&self) -> &'static str {
        "unix-stream"
    }
}

impl std::fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketTransport")
            .field("type", &"unix")
            .finish()
    }
}
