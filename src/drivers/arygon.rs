//! ARYGON driver.
//!
//! The µC wrapper prefixes every command with a protocol selector byte
//! and needs more generous inter-frame pacing than bare PN532-UART.

use std::thread;
use std::time::Duration;

use crate::driver::{Driver, DriverDescriptor};
use crate::drivers::serial::SerialTransport;
use crate::error::{Error, Result};
use crate::frame::{self, AckSlot};

pub const DRIVER_NAME: &str = "arygon";

/// Serial default (ARYGON-APDB2UA33: 9600 8-N-1).
pub const DEFAULT_BAUD: u32 = 9600;

/// `'2'` selects TAMA binary mode.
const PROTOCOL_SELECTOR_TAMA: u8 = b'2';

/// Minimum inter-frame pacing at 9600 baud (≥ 50 ms); configurable since
/// the margin at other bauds is undocumented.
pub const DEFAULT_INTER_FRAME_DELAY: Duration = Duration::from_millis(50);

pub struct Arygon {
    port: SerialTransport,
    inter_frame_delay: Duration,
}

impl Arygon {
    fn probe_fn(_out: &mut Vec<String>, _cap: usize) -> Result<usize> {
        Ok(0)
    }

    fn open_fn(transport_specific: &str) -> Result<Box<dyn Driver>> {
        let (path, baud) = parse_connstring(transport_specific)?;
        let port = SerialTransport::open(path, baud)?;
        Ok(Box::new(Self { port, inter_frame_delay: DEFAULT_INTER_FRAME_DELAY }))
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

/// Strips the protocol selector byte from a received frame.
fn strip_selector(buf: &[u8]) -> Result<&[u8]> {
    match buf.first() {
        Some(&PROTOCOL_SELECTOR_TAMA) => Ok(&buf[1..]),
        _ => Err(Error::Framing("missing ARYGON protocol selector")),
    }
}

impl Driver for Arygon {
    fn close(&mut self) -> Result<()> {
        self.port.close()
    }

    fn transceive(&mut self, tx: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let mut wire = Vec::with_capacity(tx.len() + 8);
        wire.push(PROTOCOL_SELECTOR_TAMA);
        wire.extend_from_slice(&frame::wrap(tx)?);
        self.port.send(&wire)?;
        thread::sleep(self.inter_frame_delay);

        let mut ack = [0u8; 7];
        let n = self.port.receive_exact(&mut ack, timeout)?;
        if n < 7 {
            return Err(Error::Framing("short ACK read"));
        }
        match frame::recognize_ack_nack(strip_selector(&ack)?) {
            AckSlot::Ack => {}
            AckSlot::Nack => return Err(Error::Nack),
            AckSlot::Mismatch => return Err(Error::AckMismatch),
        }

        let mut buf = vec![0u8; frame::MAX_FRAME_LEN + 8];
        let n = self.port.receive_exact(&mut buf, timeout)?;
        buf.truncate(n);
        let inner = strip_selector(&buf)?;
        Ok(frame::unwrap(inner)?.to_vec())
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
    fn strips_tama_selector() {
        let buf = [b'2', 0x00, 0x00, 0xFF];
        assert_eq!(strip_selector(&buf).unwrap(), &[0x00, 0x00, 0xFF]);
    }

    #[test]
    fn rejects_unknown_selector() {
        let buf = [b'X', 0x00];
        assert!(strip_selector(&buf).is_err());
    }
}
