//! PN53x-USB driver.
//!
//! The chip-level payload goes straight onto the wire inside a standard
//! information frame; no extra envelope beyond `frame::wrap`/`unwrap`.

use std::time::Duration;

use crate::driver::{Driver, DriverDescriptor};
use crate::drivers::usb::{UsbEndpointPair, UsbId};
use crate::error::{Error, Result};
use crate::frame::{self, AckSlot};

/// USB identifiers to probe: ASK LoGO, Philips/NXP demo board, SCM
/// Microsystems SCL3711.
const CANDIDATES: &[UsbId] = &[
    UsbId { vid: 0x0B0C, pid: 0xE005 }, // ASK LoGO
    UsbId { vid: 0x04CC, pid: 0x0531 }, // Philips/NXP PN531 demo board
    UsbId { vid: 0x04E6, pid: 0x5591 }, // SCM Microsystems SCL3711
];

pub const DRIVER_NAME: &str = "pn53x_usb";

pub struct Pn53xUsb {
    endpoints: UsbEndpointPair,
    last_error: Option<String>,
}

impl Pn53xUsb {
    fn probe_fn(out: &mut Vec<String>, cap: usize) -> Result<usize> {
        UsbEndpointPair::probe(CANDIDATES, out, cap)
    }

    fn open_fn(transport_specific: &str) -> Result<Box<dyn Driver>> {
        let endpoints = UsbEndpointPair::open(transport_specific)?;
        Ok(Box::new(Self { endpoints, last_error: None }))
    }

    pub fn descriptor() -> DriverDescriptor {
        DriverDescriptor {
            name: DRIVER_NAME,
            probe: Self::probe_fn,
            open: Self::open_fn,
        }
    }
}

impl Driver for Pn53xUsb {
    fn close(&mut self) -> Result<()> {
        self.endpoints.close()
    }

    fn transceive(&mut self, tx: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let frame = frame::wrap(tx)?;
        self.endpoints.write_bulk(&frame)?;

        let mut ack = [0u8; 6];
        let read = self.endpoints.read_bulk(&mut ack)?;
        if read < 6 {
            return Err(Error::Framing("short ACK read"));
        }
        match frame::recognize_ack_nack(&ack) {
            AckSlot::Ack => {}
            AckSlot::Nack => return Err(Error::Nack),
            AckSlot::Mismatch => return Err(Error::AckMismatch),
        }

        let mut buf = vec![0u8; frame::MAX_FRAME_LEN + 7];
        let n = self.endpoints.read_bulk(&mut buf)?;
        let _ = timeout;
        buf.truncate(n);
        Ok(frame::unwrap(&buf)?.to_vec())
    }

    fn abort(&mut self) -> Result<()> {
        // An empty USB packet cancels an in-flight blocking read on the chip.
        self.endpoints.write_bulk(&[])
    }

    fn idle(&mut self) -> Result<()> {
        Ok(())
    }

    fn strerror(&self) -> String {
        self.last_error.clone().unwrap_or_else(|| "no error".to_string())
    }
}
