use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{DeviceConfig, SerialTransport, TransferMode};

/// Request codes understood by the serial driver, encoded the way `<asm/ioctl.h>`
/// does on the generic (x86, arm, riscv) layout.
mod request {
    const IOC_NONE: u32 = 0;
    const IOC_WRITE: u32 = 1;
    const IOC_READ: u32 = 2;

    const SERIAL_IOC_MAGIC: u32 = b'h' as u32;

    /// Argument of the read/write requests.
    #[repr(C)]
    pub struct SerialRwMsg {
        pub flags: u16,
        pub count: u32,
        pub buf: *mut libc::c_char,
    }

    pub const SERIAL_WAIT_FOR_XMIT: u16 = 1 << 0;

    const fn ioc(dir: u32, nr: u32, size: usize) -> libc::c_ulong {
        ((dir << 30) | ((size as u32) << 16) | (SERIAL_IOC_MAGIC << 8) | nr) as libc::c_ulong
    }

    pub const SERIAL_RX_BUFFER_CLEAR: libc::c_ulong = ioc(IOC_NONE, 3, 0);
    pub const SERIAL_READ_IOC: libc::c_ulong = ioc(
        IOC_READ | IOC_WRITE,
        4,
        std::mem::size_of::<SerialRwMsg>(),
    );
    pub const SERIAL_WRITE_IOC: libc::c_ulong = ioc(
        IOC_READ | IOC_WRITE,
        5,
        std::mem::size_of::<SerialRwMsg>(),
    );
}

/// An opened serial character device.
///
/// The device is opened read/write once and shared by reference; reads and
/// writes from two threads go to the same file descriptor.
pub struct SerialDevice {
    file: File,
    path: PathBuf,
    config: DeviceConfig,
}

impl SerialDevice {
    /// Open `path` and confirm it is a character device.
    pub fn open(path: impl AsRef<Path>, config: DeviceConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        let metadata = file.metadata().map_err(|e| TransportError::Open {
            path: path.clone(),
            source: e,
        })?;
        if !metadata.file_type().is_char_device() {
            return Err(TransportError::NotCharDevice { path });
        }

        info!(
            ?path,
            mode = config.mode.as_str(),
            read_timeout = ?config.read_timeout,
            "opened serial device"
        );

        Ok(Self { file, path, config })
    }

    /// The path this device was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the device is readable or the read timeout elapses.
    fn wait_readable(&self) -> Result<()> {
        let timeout_ms = self.config.read_timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            // SAFETY: `pfd` is a valid pollfd for an fd owned by `self.file`, and the
            // count matches the single entry passed.
            let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            match rc {
                0 => return Err(TransportError::Timeout),
                n if n > 0 => return Ok(()),
                _ => {
                    let err = std::io::Error::last_os_error();
                    if err.kind() == ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(TransportError::Io(err));
                }
            }
        }
    }

    fn rw_request(&self, code: libc::c_ulong, buf: *mut u8, len: usize) -> std::io::Result<usize> {
        let wait_for_xmit = matches!(
            self.config.mode,
            TransferMode::Ioctl {
                wait_for_xmit: true
            }
        );
        let count = u32::try_from(len)
            .map_err(|_| std::io::Error::new(ErrorKind::InvalidInput, "transfer too large"))?;
        let mut msg = request::SerialRwMsg {
            flags: if wait_for_xmit {
                request::SERIAL_WAIT_FOR_XMIT
            } else {
                0
            },
            count,
            buf: buf.cast::<libc::c_char>(),
        };

        // SAFETY: `msg` points at a buffer of `count` bytes that stays borrowed for
        // the duration of the call; the driver reads or fills at most `count` bytes.
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                code as _,
                &mut msg as *mut request::SerialRwMsg,
            )
        };
        if rc < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(rc as usize)
        }
    }
}

fn map_read_error(err: std::io::Error) -> TransportError {
    if err.kind() == ErrorKind::TimedOut
        || err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == Some(libc::ETIMEDOUT)
    {
        TransportError::Timeout
    } else {
        TransportError::Io(err)
    }
}

impl SerialTransport for SerialDevice {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.wait_readable()?;

        loop {
            let result = match self.config.mode {
                TransferMode::ReadWrite => (&self.file).read(buf),
                TransferMode::Ioctl { .. } => {
                    self.rw_request(request::SERIAL_READ_IOC, buf.as_mut_ptr(), buf.len())
                }
            };
            match result {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(map_read_error(err)),
            }
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let result = match self.config.mode {
                TransferMode::ReadWrite => (&self.file).write(buf),
                // The driver only reads from the buffer on a write request.
                TransferMode::Ioctl { .. } => {
                    self.rw_request(request::SERIAL_WRITE_IOC, buf.as_ptr().cast_mut(), buf.len())
                }
            };
            match result {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn clear_rx_buffer(&self) -> Result<()> {
        debug!(path = ?self.path, "erasing receive buffer");
        // SAFETY: the request takes no argument; the fd is owned by `self.file`.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request::SERIAL_RX_BUFFER_CLEAR as _) };
        if rc < 0 {
            return Err(TransportError::Control {
                request: "SERIAL_RX_BUFFER_CLEAR",
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "serial-device"
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("path", &self.path)
            .field("mode", &self.config.mode.as_str())
            .finish()
    }
}
