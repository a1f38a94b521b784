//! ACR122 driver.
//!
//! PC/SC (via the `pcsc` crate) is the primary transport, since the
//! ACR122 enumerates to the OS as a standard smart-card reader; direct
//! USB bulk access via [`super::usb`] is a fallback for environments
//! without a PC/SC service, behind the same [`Driver`] surface — both
//! paths yield the same chip-level bytes.

use std::ffi::CString;
use std::time::Duration;

use pcsc::{Card, Context, Protocols, Scope, ShareMode};

use crate::driver::{Driver, DriverDescriptor};
use crate::error::{Error, Result};

pub const DRIVER_NAME: &str = "acr122";

/// ACR122U.
#[allow(dead_code)]
const USB_VID: u16 = 0x072F;
#[allow(dead_code)]
const USB_PID: u16 = 0x2200;

/// Vendor header prefixed to every PN53x frame sent as PC/SC APDU data.
/// Validated on receive rather than indexed at a hardcoded offset.
const VENDOR_HEADER: [u8; 5] = [0xD4, 0x42, 0x00, 0x00, 0x00];

enum Transport {
    /// `context` is never read directly after `connect` but must outlive
    /// `card`: `SCardReleaseContext` on the owning context invalidates
    /// every handle derived from it, so dropping the `Context` here
    /// would poison `card` for later `transmit` calls.
    Pcsc { context: Context, card: Card },
    Usb(super::usb::UsbEndpointPair),
}

pub struct Acr122 {
    transport: Transport,
}

impl Acr122 {
    fn probe_fn(out: &mut Vec<String>, cap: usize) -> Result<usize> {
        let context = Context::establish(Scope::User).map_err(|e| Error::Transport(e.to_string()))?;
        let mut buf = vec![0u8; 4096];
        let readers = match context.list_readers(&mut buf) {
            Ok(readers) => readers,
            Err(_) => return Ok(0),
        };
        let mut found = 0;
        for reader in readers {
            if found >= cap {
                break;
            }
            let name = reader.to_string_lossy();
            if name.to_lowercase().contains("acr122") {
                out.push(name.to_string());
                found += 1;
            }
        }
        Ok(found)
    }

    fn open_fn(transport_specific: &str) -> Result<Box<dyn Driver>> {
        if let Ok(transport) = Self::open_pcsc(transport_specific) {
            return Ok(Box::new(Self { transport }));
        }
        let endpoints = super::usb::UsbEndpointPair::open(transport_specific)?;
        Ok(Box::new(Self { transport: Transport::Usb(endpoints) }))
    }

    fn open_pcsc(reader_name: &str) -> Result<Transport> {
        let context = Context::establish(Scope::User).map_err(|e| Error::Transport(e.to_string()))?;
        let name = CString::new(reader_name).map_err(|_| Error::Invalid("reader name has embedded NUL"))?;
        let card = context
            .connect(&name, ShareMode::Shared, Protocols::ANY)
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Transport::Pcsc { context, card })
    }

    pub fn descriptor() -> DriverDescriptor {
        DriverDescriptor {
            name: DRIVER_NAME,
            probe: Self::probe_fn,
            open: Self::open_fn,
        }
    }
}

/// Wraps a chip-level payload in the ACR122's PC/SC APDU: `FF 00 00 00
/// Lc` followed by the vendor header and the PN53x frame.
fn wrap_apdu(chip_payload: &[u8]) -> Result<Vec<u8>> {
    let frame = crate::frame::wrap(chip_payload)?;
    let mut body = Vec::with_capacity(VENDOR_HEADER.len() + frame.len());
    body.extend_from_slice(&VENDOR_HEADER);
    body.extend_from_slice(&frame);
    if body.len() > 255 {
        return Err(Error::Invalid("ACR122 APDU payload exceeds single-byte Lc"));
    }
    let mut apdu = Vec::with_capacity(5 + body.len());
    apdu.extend_from_slice(&[0xFF, 0x00, 0x00, 0x00, body.len() as u8]);
    apdu.extend_from_slice(&body);
    Ok(apdu)
}

/// Strips the vendor header from R-APDU data and returns the inner
/// PN53x frame bytes, after validating the header is actually present.
fn unwrap_response(data: &[u8]) -> Result<&[u8]> {
    if data.len() < VENDOR_HEADER.len() || data[..VENDOR_HEADER.len()] != VENDOR_HEADER {
        return Err(Error::Framing("ACR122 response missing vendor header"));
    }
    Ok(&data[VENDOR_HEADER.len()..])
}

impl Driver for Acr122 {
    fn close(&mut self) -> Result<()> {
        match &mut self.transport {
            Transport::Pcsc { card, .. } => {
                let _ = card.disconnect(pcsc::Disposition::LeaveCard);
                Ok(())
            }
            Transport::Usb(endpoints) => endpoints.close(),
        }
    }

    fn transceive(&mut self, tx: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        match &mut self.transport {
            Transport::Pcsc { card, .. } => {
                let apdu = wrap_apdu(tx)?;
                let mut rapdu_buf = vec![0u8; pcsc::MAX_BUFFER_SIZE];
                let rapdu = card
                    .transmit(&apdu, &mut rapdu_buf)
                    .map_err(|e| Error::Transport(e.to_string()))?;
                let inner = unwrap_response(rapdu)?;
                crate::frame::unwrap(inner).map(|p| p.to_vec())
            }
            Transport::Usb(endpoints) => {
                let frame = crate::frame::wrap(tx)?;
                endpoints.write_bulk(&frame)?;
                let _ = timeout;

                let mut ack = [0u8; 6];
                let read = endpoints.read_bulk(&mut ack)?;
                if read < 6 {
                    return Err(Error::Framing("short ACK read"));
                }
                match crate::frame::recognize_ack_nack(&ack) {
                    crate::frame::AckSlot::Ack => {}
                    crate::frame::AckSlot::Nack => return Err(Error::Nack),
                    crate::frame::AckSlot::Mismatch => return Err(Error::AckMismatch),
                }

                let mut buf = vec![0u8; crate::frame::MAX_FRAME_LEN + 7];
                let n = endpoints.read_bulk(&mut buf)?;
                buf.truncate(n);
                crate::frame::unwrap(&buf).map(|p| p.to_vec())
            }
        }
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
    fn wraps_vendor_header_and_apdu() {
        let apdu = wrap_apdu(&[0xD4, 0x02]).unwrap();
        assert_eq!(&apdu[0..4], &[0xFF, 0x00, 0x00, 0x00]);
        assert_eq!(&apdu[5..10], &VENDOR_HEADER);
    }

    #[test]
    fn rejects_response_without_vendor_header() {
        let data = [0x00u8, 0x01, 0x02];
        assert!(unwrap_response(&data).is_err());
    }

    #[test]
    fn strips_vendor_header() {
        let mut data = VENDOR_HEADER.to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0xFF]);
        assert_eq!(unwrap_response(&data).unwrap(), &[0x00, 0x00, 0xFF]);
    }
}
