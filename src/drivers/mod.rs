//! Per-transport drivers.
//!
//! Each submodule wraps one physical envelope around the chip-level
//! bytes the shared [`crate::frame`]/[`crate::engine`] codec produces
//! and consumes, and implements [`crate::driver::Driver`] plus exposes a
//! [`crate::driver::DriverDescriptor`] for [`crate::registry`].

#[cfg(any(feature = "pn53x_usb", feature = "acr122"))]
pub mod usb;

#[cfg(feature = "pn53x_usb")]
pub mod pn53x_usb;

#[cfg(feature = "acr122")]
pub mod acr122;

#[cfg(any(feature = "pn532_uart", feature = "arygon"))]
pub mod serial;

#[cfg(feature = "pn532_uart")]
pub mod pn532_uart;

#[cfg(feature = "arygon")]
pub mod arygon;
