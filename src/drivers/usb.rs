//! USB endpoint pair, shared by `pn53x_usb` and the direct-USB fallback
//! path of `acr122`.
//!
//! Grounded on `ch347programmer`'s `Ch347Device`: enumerate by
//! `(VID, PID)`, claim an interface, detach the kernel driver first on
//! Linux/macOS, then do timeout-bounded `read_bulk`/`write_bulk`.

use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, UsbContext};

use crate::error::{Error, Result};

/// Default bulk transfer timeout. Deliberately long, since the chip may
/// be mid-polling.
pub const BULK_TIMEOUT: Duration = Duration::from_secs(30);

/// A candidate (vendor, product) ID pair a PN53x-family USB transport
/// probes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

/// A claimed pair of bulk endpoints on a USB device.
pub struct UsbEndpointPair {
    handle: DeviceHandle<Context>,
    interface: u8,
    ep_in: u8,
    ep_out: u8,
}

impl UsbEndpointPair {
    /// Enumerates all buses/devices, appending a `bus:device` connection
    /// string for every device matching one of `candidates` whose active
    /// configuration exposes at least two bulk endpoints.
    ///
    /// The enumeration order is whatever the OS reports for this
    /// snapshot; callers must treat the indices as opaque, so this
    /// returns only display strings, never handles.
    pub fn probe(candidates: &[UsbId], out: &mut Vec<String>, cap: usize) -> Result<usize> {
        let context = Context::new().map_err(|e| Error::Transport(e.to_string()))?;
        let mut found = 0;
        for device in context.devices().map_err(|e| Error::Transport(e.to_string()))?.iter() {
            if found >= cap {
                break;
            }
            let Ok(desc) = device.device_descriptor() else { continue };
            if !candidates.iter().any(|c| c.vid == desc.vendor_id() && c.pid == desc.product_id()) {
                continue;
            }
            if find_bulk_endpoints(&device).is_none() {
                continue;
            }
            out.push(format!("{:03}:{:03}", device.bus_number(), device.address()));
            found += 1;
        }
        Ok(found)
    }

    /// Opens the device at `bus:device_address`, selects configuration 1,
    /// claims interface 0, and locates the first bulk-IN/bulk-OUT
    /// endpoint pair in `altsetting[0]`.
    pub fn open(bus_device: &str) -> Result<Self> {
        let (bus, address) = parse_bus_device(bus_device)?;
        let context = Context::new().map_err(|e| Error::Transport(e.to_string()))?;
        let device = context
            .devices()
            .map_err(|e| Error::Transport(e.to_string()))?
            .iter()
            .find(|d| d.bus_number() == bus && d.address() == address)
            .ok_or(Error::DeviceNotFound)?;

        let (ep_in, ep_out) = find_bulk_endpoints(&device).ok_or(Error::DeviceNotFound)?;

        let mut handle = device.open().map_err(|e| Error::Transport(e.to_string()))?;
        let interface = 0;

        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            if handle.kernel_driver_active(interface).unwrap_or(false) {
                let _ = handle.detach_kernel_driver(interface);
            }
        }

        handle
            .set_active_configuration(1)
            .map_err(|e| Error::Transport(e.to_string()))?;
        handle
            .claim_interface(interface)
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self { handle, interface, ep_in, ep_out })
    }

    pub fn close(&mut self) -> Result<()> {
        let _ = self.handle.release_interface(self.interface);
        Ok(())
    }

    /// Writes `data` in one bulk transfer. Returns an error unless every
    /// byte was accepted without a short write.
    pub fn write_bulk(&self, data: &[u8]) -> Result<()> {
        let written = self
            .handle
            .write_bulk(self.ep_out, data, BULK_TIMEOUT)
            .map_err(|e| Error::Transport(e.to_string()))?;
        if written != data.len() {
            return Err(Error::Transport("short USB bulk write".into()));
        }
        Ok(())
    }

    /// Reads into `buf`, returning the number of bytes actually
    /// transferred. Short reads are returned as-is; framing is the
    /// caller's responsibility.
    pub fn read_bulk(&self, buf: &mut [u8]) -> Result<usize> {
        self.handle
            .read_bulk(self.ep_in, buf, BULK_TIMEOUT)
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

fn find_bulk_endpoints(device: &Device<Context>) -> Option<(u8, u8)> {
    let config = device.active_config_descriptor().ok()?;
    let mut ep_in = None;
    let mut ep_out = None;
    for interface in config.interfaces() {
        let Some(descriptor) = interface.descriptors().next() else { continue };
        for endpoint in descriptor.endpoint_descriptors() {
            if endpoint.transfer_type() != rusb::TransferType::Bulk {
                continue;
            }
            match endpoint.direction() {
                rusb::Direction::In if ep_in.is_none() => ep_in = Some(endpoint.address()),
                rusb::Direction::Out if ep_out.is_none() => ep_out = Some(endpoint.address()),
                _ => {}
            }
        }
    }
    Some((ep_in?, ep_out?))
}

fn parse_bus_device(s: &str) -> Result<(u8, u8)> {
    let (bus, address) = s
        .split_once(':')
        .ok_or(Error::Invalid("USB connection string must be bus:device"))?;
    let bus = bus.parse().map_err(|_| Error::Invalid("bad USB bus index"))?;
    let address = address.parse().map_err(|_| Error::Invalid("bad USB device index"))?;
    Ok((bus, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bus_device_string() {
        assert_eq!(parse_bus_device("001:003").unwrap(), (1, 3));
        assert!(parse_bus_device("nonsense").is_err());
    }
}
