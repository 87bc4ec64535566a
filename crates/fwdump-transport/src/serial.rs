use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::control::ControlLines;
use crate::error::{Result, TransportError};

/// A serial device opened in raw 8N1 mode.
///
/// Reads block until at least one byte is available or the read timeout
/// expires. Expiry is reported as `ErrorKind::TimedOut`, never as a
/// zero-length read, so upper layers can tell a silent device from a closed
/// stream.
pub struct SerialPort {
    file: File,
    path: PathBuf,
    baud_rate: u32,
    read_timeout: Option<Duration>,
}

impl SerialPort {
    /// Baud rate the device firmware boots with.
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;

    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed =
            baud_constant(baud_rate).ok_or(TransportError::UnsupportedBaudRate(baud_rate))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        configure_raw(file.as_raw_fd(), speed).map_err(|source| TransportError::Configure {
            path: path.clone(),
            source,
        })?;

        info!(?path, baud_rate, "opened serial port");

        Ok(Self {
            file,
            path,
            baud_rate,
            read_timeout: None,
        })
    }

    /// Bound every blocking read. `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Current read timeout.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Duplicate the descriptor so reading and writing can be owned separately.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
            baud_rate: self.baud_rate,
            read_timeout: self.read_timeout,
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured line speed.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        wait_readable(self.file.as_raw_fd(), self.read_timeout)?;
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        // SAFETY: the descriptor is owned by `self.file` and open for the
        // lifetime of this call.
        let rc = unsafe { libc::tcdrain(self.file.as_raw_fd()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

impl ControlLines for SerialPort {
    fn set_rts(&mut self, asserted: bool) -> Result<()> {
        let bits: libc::c_int = libc::TIOCM_RTS;
        let request = if asserted {
            libc::TIOCMBIS
        } else {
            libc::TIOCMBIC
        };
        // SAFETY: TIOCMBIS/TIOCMBIC read a single c_int through the pointer,
        // which stays valid for the duration of the call.
        let rc =
            unsafe { libc::ioctl(self.file.as_raw_fd(), request, &bits as *const libc::c_int) };
        if rc == -1 {
            return Err(TransportError::ControlLine(io::Error::last_os_error()));
        }
        debug!(path = ?self.path, asserted, "set RTS");
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<()> {
        // SAFETY: plain syscall on an open descriptor.
        let rc = unsafe { libc::tcflush(self.file.as_raw_fd(), libc::TCIOFLUSH) };
        if rc == -1 {
            return Err(TransportError::ControlLine(io::Error::last_os_error()));
        }
        debug!(path = ?self.path, "cleared serial queues");
        Ok(())
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

fn configure_raw(fd: RawFd, speed: libc::speed_t) -> io::Result<()> {
    // SAFETY: termios is plain data and is fully written by tcgetattr before
    // any field is read.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `tio` is a valid, writable termios for every call below.
    unsafe {
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(io::Error::last_os_error());
        }
        libc::cfmakeraw(&mut tio);
    }

    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !(libc::CSTOPB | libc::PARENB);
    // Reads are gated by poll(); once readable, return whatever has arrived.
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: same as above.
    unsafe {
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn wait_readable(fd: RawFd, timeout: Option<Duration>) -> io::Result<()> {
    let timeout_ms = match timeout {
        None => -1,
        Some(timeout) => timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
    };
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    // SAFETY: `pfd` is a single valid pollfd and nfds is 1.
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    match rc {
        -1 => Err(io::Error::last_os_error()),
        0 => Err(io::Error::new(ErrorKind::TimedOut, "serial read timed out")),
        _ => Ok(()),
    }
}

fn baud_constant(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        1_200 => libc::B1200,
        2_400 => libc::B2400,
        4_800 => libc::B4800,
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        #[cfg(target_os = "linux")]
        460_800 => libc::B460800,
        #[cfg(target_os = "linux")]
        921_600 => libc::B921600,
        _ => return None,
    };
    Some(speed)
}
