//! Serial transport for the panel's raw sensor stream.

use std::io::Read;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::time::Duration;

use serialport::SerialPort;

use crate::error::DriverError;

/// Bit rate the panel's UART is hard-wired to. Not negotiable; the
/// hardware does not support autobaud.
const BAUD_RATE: u32 = 4_000_000;

/// The panel's serial character device, opened read-only and configured
/// for non-blocking reads so it can be driven from a `calloop` readiness
/// source rather than a blocking read thread.
pub struct SerialDevice {
    port: serialport::TTYPort,
}

impl SerialDevice {
    /// Open `path`, matching the original driver's framing: read-only,
    /// non-blocking, with both buffers flushed before the first read so
    /// stale bytes left over from a previous session can't desynchronize
    /// the decoder.
    pub fn open(path: &str) -> Result<Self, DriverError> {
        let mut port = serialport::new(path, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(0))
            .open_native()
            .map_err(|source| DriverError::SerialOpen { path: path.to_string(), source })?;

        port.clear(serialport::ClearBuffer::All)
            .map_err(|e| DriverError::SerialConfigure { path: path.to_string(), source: e.into() })?;

        set_nonblocking(&port)
            .map_err(|source| DriverError::SerialConfigure { path: path.to_string(), source })?;

        Ok(Self { port })
    }
}

impl Read for SerialDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            // serialport reports an expired zero-length timeout as
            // TimedOut rather than WouldBlock; calloop's drain loop only
            // recognizes the latter.
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                Err(std::io::Error::from(std::io::ErrorKind::WouldBlock))
            }
            Err(e) => Err(e),
        }
    }
}

impl AsFd for SerialDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // Safe: the raw fd is owned by `self.port` for at least `self`'s
        // lifetime, matching `BorrowedFd`'s contract.
        unsafe { BorrowedFd::borrow_raw(self.port.as_raw_fd()) }
    }
}

fn set_nonblocking(port: &serialport::TTYPort) -> std::io::Result<()> {
    let fd = unsafe { BorrowedFd::borrow_raw(port.as_raw_fd()) };
    let flags = rustix::fs::fcntl_getfl(fd)?;
    rustix::fs::fcntl_setfl(fd, flags | rustix::fs::OFlags::NONBLOCK)?;
    Ok(())
}
