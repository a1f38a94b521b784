//! The transport-polymorphism seam.
//!
//! Generalizes the reference crate's `MfrcDriver` trait (a closed set of
//! register read/write primitives implemented once per physical bus) to
//! the PN53x world, where the shared operation is not "register access"
//! but "exchange one chip-level payload for one chip-level response".

use std::time::Duration;

use crate::error::Result;

/// One claimed physical connection to a PN53x device.
///
/// Every transport (`drivers::pn53x_usb`, `drivers::acr122`,
/// `drivers::pn532_uart`, `drivers::arygon`) implements this trait, kept
/// deliberately object-safe (no associated functions returning `Self`)
/// so the registry can hold a process-lifetime list of `Box<dyn
/// Driver>` behind the matching [`DriverDescriptor`]. `probe`/`open`
/// live on the descriptor instead — a record distinct from the live
/// per-connection handle.
///
/// Property writes are not part of this trait: they are assembled as
/// ordinary chip-level payloads by [`crate::device::DeviceHandle`] and
/// sent through the same `transceive` every other command uses, so they
/// get NACK-retry and response validation for free instead of
/// duplicating that logic once per transport.
pub trait Driver {
    /// Releases the underlying resource. Called at most once; the
    /// handle is invalid afterward.
    fn close(&mut self) -> Result<()>;

    /// Sends `tx` (a chip-level payload beginning with `D4` and the
    /// opcode) and returns the chip-level response (beginning with
    /// `D5` and the opcode+1 echo), within `timeout`.
    ///
    /// Wraps `tx` in this transport's physical envelope, writes it,
    /// consumes the ACK, waits for and returns the substantive response.
    fn transceive(&mut self, tx: &[u8], timeout: Duration) -> Result<Vec<u8>>;

    /// Interrupts a blocking call in progress on this handle — the
    /// best-effort cancellation primitive.
    fn abort(&mut self) -> Result<()>;

    /// Returns the transport to a known idle state (field off, FIFO
    /// clear) without fully closing it. Called by `close` before the
    /// transport-specific teardown.
    fn idle(&mut self) -> Result<()>;

    /// Renders the transport's own last-error state, independent of the
    /// engine-level [`crate::error::StrError`] convenience.
    fn strerror(&self) -> String;
}

/// The immutable, process-lifetime record the registry stores per
/// transport. `probe`/`open` are plain function pointers rather than
/// trait methods so [`Driver`] itself can stay object-safe.
pub struct DriverDescriptor {
    /// The connection-string prefix this driver matches, e.g. `"pn53x_usb"`.
    pub name: &'static str,
    /// Enumerates connection strings this transport can open right now,
    /// appending up to `cap` entries and returning the count found.
    pub probe: fn(out: &mut Vec<String>, cap: usize) -> Result<usize>,
    /// Opens the transport-specific resource named by the part of the
    /// connection string after the driver-name prefix.
    pub open: fn(transport_specific: &str) -> Result<Box<dyn Driver>>,
}
