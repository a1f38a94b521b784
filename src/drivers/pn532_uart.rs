//! PN532-UART driver.
//!
//! Same standard information frame as `pn53x_usb`, plus a one-time wake
//! sequence and an inter-frame pacing delay. The delay is a constructor
//! parameter rather than a hardcoded constant: the safety margin of a
//! shorter delay at higher baud rates is undocumented, so this crate
//! declines to guess and leaves it to the caller.

use std::thread;
use std::time::Duration;

use crate::driver::{Driver, DriverDescriptor};
use crate::drivers::serial::SerialTransport;
use crate::error::{Error, Result};
use crate::frame::{self, AckSlot};

pub const DRIVER_NAME: &str = "pn532_uart";

/// Default serial speed.
pub const DEFAULT_BAUD: u32 = 115200;

/// Default inter-frame pacing delay (matches the source's behavior for
/// the common case; callers targeting high baud rates may shrink it via
/// [`Pn532Uart::with_inter_frame_delay`]).
pub const DEFAULT_INTER_FRAME_DELAY: Duration = Duration::from_millis(50);

/// The 15-byte wake sequence sent once before first use. Its tail is a
/// real `SAMConfiguration` command (`D4 14 01`), so the chip answers it
/// with an ordinary ACK + response frame pair that must be drained
/// before the next `transceive`, or that next call reads the stale wake
/// reply instead of its own.
const WAKE_SEQUENCE: [u8; 15] = [
    0x55, 0x55, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x03, 0xFD, 0xD4, 0x14, 0x01, 0x17, 0x00,
];

/// Bound on draining the wake sequence's ACK + response. Generous but
/// bounded: a chip that doesn't answer within this window leaves
/// `woken` false so the next `transceive` retries the whole sequence.
const WAKE_RESPONSE_TIMEOUT: Duration = Duration::from_millis(250);

pub struct Pn532Uart {
    port: SerialTransport,
    inter_frame_delay: Duration,
    woken: bool,
}

impl Pn532Uart {
    fn probe_fn(_out: &mut Vec<String>, _cap: usize) -> Result<usize> {
        // Serial devices cannot be safely enumerated without opening
        // them; a PN532-UART connection string always names an explicit
        // path, so probing finds nothing by itself.
        Ok(0)
    }

    fn open_fn(transport_specific: &str) -> Result<Box<dyn Driver>> {
        let (path, baud) = parse_connstring(transport_specific)?;
        let port = SerialTransport::open(path, baud)?;
        Ok(Box::new(Self {
            port,
            inter_frame_delay: DEFAULT_INTER_FRAME_DELAY,
            woken: false,
        }))
    }

    pub fn with_inter_frame_delay(mut self, delay: Duration) -> Self {
        self.inter_frame_delay = delay;
        self
    }

    pub fn descriptor() -> DriverDescriptor {
        DriverDescriptor {
            name: DRIVER_NAME,
            probe: Self::probe_fn,
            open: Self::open_fn,
        }
    }

    fn wake_if_needed(&mut self) -> Result<()> {
        if self.woken {
            return Ok(());
        }
        self.port.send(&WAKE_SEQUENCE)?;
        thread::sleep(Duration::from_millis(10));

        // Drain the ACK + SAMConfiguration response the wake sequence's
        // embedded command provokes. Best-effort: a short/absent read
        // here just means the chip was already awake and silent, not a
        // failure worth surfacing — but `woken` stays false in that case
        // so the next call tries the wake sequence again.
        let mut ack = [0u8; 6];
        let ack_read = self.port.receive_exact(&mut ack, WAKE_RESPONSE_TIMEOUT)?;
        if ack_read < 6 {
            return Ok(());
        }
        let mut resp = vec![0u8; frame::MAX_FRAME_LEN + 7];
        let resp_read = self.port.receive_exact(&mut resp, WAKE_RESPONSE_TIMEOUT)?;
        if resp_read == 0 {
            return Ok(());
        }

        self.woken = true;
        Ok(())
    }
}

fn parse_connstring(s: &str) -> Result<(&str, u32)> {
    match s.split_once(':') {
        Some((path, baud)) => {
            let baud = baud.parse().map_err(|_| Error::Invalid("bad baud in connection string"))?;
            Ok((path, baud))
        }
        None => Ok((s, DEFAULT_BAUD)),
    }
}

impl Driver for Pn532Uart {
    fn close(&mut self) -> Result<()> {
        self.port.close()
    }

    fn transceive(&mut self, tx: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        self.wake_if_needed()?;
        let frame = frame::wrap(tx)?;
        self.port.send(&frame)?;
        thread::sleep(self.inter_frame_delay);

        let mut ack = [0u8; 6];
        let n = self.port.receive_exact(&mut ack, timeout)?;
        if n < 6 {
            return Err(Error::Framing("short ACK read"));
        }
        match frame::recognize_ack_nack(&ack) {
            AckSlot::Ack => {}
            AckSlot::Nack => return Err(Error::Nack),
            AckSlot::Mismatch => return Err(Error::AckMismatch),
        }

        let mut buf = vec![0u8; frame::MAX_FRAME_LEN + 7];
        let n = self.port.receive_exact(&mut buf, timeout)?;
        buf.truncate(n);
        Ok(frame::unwrap(&buf)?.to_vec())
    }

    fn abort(&mut self) -> Result<()> {
        Ok(())
    }

    fn idle(&mut self) -> Result<()> {
        Ok(())
    }

    fn strerror(&self) -> String {
        "no error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connstring_with_explicit_baud() {
        let (path, baud) = parse_connstring("/dev/ttyUSB0:230400").unwrap();
        assert_eq!(path, "/dev/ttyUSB0");
        assert_eq!(baud, 230400);
    }

    #[test]
    fn parses_connstring_without_baud() {
        let (path, baud) = parse_connstring("/dev/ttyUSB0").unwrap();
        assert_eq!(path, "/dev/ttyUSB0");
        assert_eq!(baud, DEFAULT_BAUD);
    }

    #[test]
    fn wake_sequence_is_fifteen_bytes() {
        assert_eq!(WAKE_SEQUENCE.len(), 15);
        assert_eq!(WAKE_SEQUENCE[10], 0xD4);
    }
}
