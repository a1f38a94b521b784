//! Process-wide device registry.
//!
//! Generalizes the reference crate's per-board feature-dispatch
//! (`boards::init()` picking one ESP32 variant at compile time) to
//! runtime dispatch over a static, ordered list of [`DriverDescriptor`]s,
//! explicitly populated by [`crate::init`] rather than a hidden static
//! constructor that would race at load time.

use std::sync::OnceLock;

use crate::driver::{Driver, DriverDescriptor};
use crate::error::{Error, Result};

static REGISTRY: OnceLock<Vec<DriverDescriptor>> = OnceLock::new();

/// Environment variable naming the connection string to use when
/// `open(None)` is called.
pub const ENV_DEFAULT_DEVICE: &str = "LIBNFC_DEFAULT_DEVICE";

/// Populates the process-wide registry. Idempotent: a second call is a
/// no-op (the first call's set of descriptors wins), matching the
/// explicit `init`/`exit` lifecycle.
pub(crate) fn install() {
    REGISTRY.get_or_init(build_descriptors);
}

fn build_descriptors() -> Vec<DriverDescriptor> {
    #[allow(unused_mut)]
    let mut descriptors = Vec::new();

    #[cfg(feature = "pn53x_usb")]
    descriptors.push(crate::drivers::pn53x_usb::Pn53xUsb::descriptor());

    #[cfg(feature = "acr122")]
    descriptors.push(crate::drivers::acr122::Acr122::descriptor());

    #[cfg(feature = "pn532_uart")]
    descriptors.push(crate::drivers::pn532_uart::Pn532Uart::descriptor());

    #[cfg(feature = "arygon")]
    descriptors.push(crate::drivers::arygon::Arygon::descriptor());

    descriptors
}

fn registry() -> &'static [DriverDescriptor] {
    REGISTRY.get().map(Vec::as_slice).unwrap_or(&[])
}

/// Iterates each registered driver's `probe`, appending up to `cap`
/// connection strings total and returning the count found.
pub fn list_devices(cap: usize) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for descriptor in registry() {
        if out.len() >= cap {
            break;
        }
        let remaining = cap - out.len();
        let mut found = Vec::new();
        (descriptor.probe)(&mut found, remaining)?;
        for connstring in found {
            out.push(format!("{}:{}", descriptor.name, connstring));
        }
    }
    Ok(out)
}

/// Reads [`ENV_DEFAULT_DEVICE`].
pub fn default_connstring() -> Option<String> {
    std::env::var(ENV_DEFAULT_DEVICE).ok()
}

/// Opens a connection string by matching its `driver_name:` prefix
/// against the registry in order.
pub fn open(connstring: &str) -> Result<Box<dyn Driver>> {
    let (driver_name, transport_specific) = connstring
        .split_once(':')
        .ok_or(Error::Invalid("connection string must be driver_name:transport_specific"))?;

    let descriptor = registry()
        .iter()
        .find(|d| d.name == driver_name)
        .ok_or(Error::DeviceNotFound)?;

    (descriptor.open)(transport_specific)
}

/// Resolves the connection string to actually open: the caller-supplied
/// string if present, otherwise [`ENV_DEFAULT_DEVICE`], otherwise the
/// first entry [`list_devices`] returns.
pub fn resolve_connstring(requested: Option<&str>) -> Result<String> {
    if let Some(s) = requested {
        return Ok(s.to_string());
    }
    if let Some(s) = default_connstring() {
        return Ok(s);
    }
    list_devices(1)?.into_iter().next().ok_or(Error::DeviceNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_connstring_without_colon() {
        install();
        assert!(matches!(open("garbage"), Err(Error::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_driver_name() {
        install();
        assert!(matches!(open("not_a_real_driver:foo"), Err(Error::DeviceNotFound)));
    }
}
