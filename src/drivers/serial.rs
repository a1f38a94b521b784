//! Serial transport, built on `serialport` — the crate `WMT-GmbH/pn532`'s
//! `std` feature itself pulls in for raw OS serial port access.
//!
//! The advisory inter-process lock is a sibling `<path>.lock` file
//! rather than a termios sentinel bit: a termios reserved-flag trick has
//! no portable Rust equivalent, and a lock file is strictly observable
//! from outside the process too.

use std::fs::OpenOptions;
use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::SerialPort;

use crate::error::{Error, Result};

/// The fixed set of baud rates `set_speed` accepts.
pub const VALID_BAUD_RATES: [u32; 7] = [9600, 19200, 38400, 57600, 115200, 230400, 460800];

/// Default `receive` timeout.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(30);

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    lock_path: PathBuf,
}

impl SerialTransport {
    /// Opens `path` with exclusive access, raw 8-N-1 framing, and an
    /// advisory sibling lock file. Returns [`Error::Claimed`] if the
    /// lock file already exists: a second `open` on a port already
    /// claimed by this library must not silently share it.
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        if !VALID_BAUD_RATES.contains(&baud) {
            return Err(Error::Invalid("baud rate must be one of the fixed serial rates"));
        }

        let lock_path = lock_file_path(path);
        let lock_file = OpenOptions::new().write(true).create_new(true).open(&lock_path);
        if lock_file.is_err() {
            return Err(Error::Claimed);
        }

        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(DEFAULT_RECEIVE_TIMEOUT)
            .open();

        let port = match port {
            Ok(p) => p,
            Err(e) => {
                let _ = std::fs::remove_file(&lock_path);
                return Err(Error::Transport(e.to_string()));
            }
        };

        let mut transport = Self { port, lock_path };
        transport.flush_input()?;
        Ok(transport)
    }

    pub fn set_speed(&mut self, baud: u32) -> Result<()> {
        if !VALID_BAUD_RATES.contains(&baud) {
            return Err(Error::Invalid("baud rate must be one of the fixed serial rates"));
        }
        self.port
            .set_baud_rate(baud)
            .map_err(|e| Error::Transport(e.to_string()))
    }

    pub fn get_speed(&self) -> Result<u32> {
        self.port.baud_rate().map_err(|e| Error::Transport(e.to_string()))
    }

    /// Sends `data`, returning success only if every byte was accepted
    /// without a short write.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data).map_err(Error::Io)
    }

    /// Waits up to `timeout` for data, draining whatever the OS reports
    /// available. Returns zero bytes (not an error) on a plain timeout;
    /// that is a retryable condition at the protocol-engine layer, not
    /// here.
    pub fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| Error::Transport(e.to_string()))?;
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn flush_input(&mut self) -> Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| Error::Transport(e.to_string()))
    }

    /// Reads from the port until `buf` fills, `timeout` elapses, or a
    /// read returns zero bytes (no more data available this poll).
    /// Returns the number of bytes actually read. Shared by every
    /// serial-backed transport so none of them risk handing a short,
    /// partially-filled frame buffer to `frame::unwrap`.
    pub fn receive_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let deadline = std::time::Instant::now() + timeout;
        let mut total = 0;
        while total < buf.len() && std::time::Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let n = self.receive(&mut buf[total..], remaining)?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    pub fn close(&mut self) -> Result<()> {
        let _ = std::fs::remove_file(&self.lock_path);
        Ok(())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

fn lock_file_path(path: &str) -> PathBuf {
    let mut p = PathBuf::from(path);
    let file_name = p.file_name().map(|n| n.to_os_string());
    if let Some(name) = file_name {
        let mut new_name = name;
        new_name.push(".lock");
        p.set_file_name(new_name);
    } else {
        p = Path::new(path).with_extension("lock");
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_file_path_is_sibling() {
        assert_eq!(lock_file_path("/dev/ttyUSB0"), PathBuf::from("/dev/ttyUSB0.lock"));
    }

    #[test]
    fn rejects_unlisted_baud_rate() {
        assert!(!VALID_BAUD_RATES.contains(&12345));
    }
}
