//! Crate-wide error taxonomy.
//!
//! Every fallible call in this crate returns [`Result<T>`]; nothing
//! panics on a recoverable condition. `DeviceHandle` additionally caches
//! the most recent [`Error`] so callers that prefer libnfc's
//! `strerror()`-style convenience can render it without threading the
//! `Result` through.

/// The stable numeric chip-status codes NXP documents for the PN53x
/// family.
///
/// These are the low 6 bits of `rx[0]` for opcodes whose first response
/// byte is a status byte. `Unknown` covers any status value NXP has not
/// documented; it is never produced by this crate's own logic, only by
/// hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChipError {
    #[error("timeout")]
    Timeout,
    #[error("CRC error")]
    Crc,
    #[error("parity error")]
    Parity,
    #[error("erroneous bit count")]
    BitCount,
    #[error("framing error")]
    Framing,
    #[error("bit collision")]
    Collision,
    #[error("buffer too small")]
    SmallBuffer,
    #[error("RF buffer overflow")]
    Overflow,
    #[error("RF transmission timeout")]
    RfTimeout,
    #[error("RF protocol error")]
    RfProtocol,
    #[error("chip overheating")]
    Overheat,
    #[error("internal buffer overflow")]
    InternalOverflow,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("unsupported DEP function")]
    DepUnknown,
    #[error("invalid RX frame")]
    InvalidRxFrame,
    #[error("MIFARE authentication error")]
    MifareAuth,
    #[error("check byte during bit-collision check failed")]
    CheckByte,
    #[error("invalid chip state for this command")]
    InvalidState,
    #[error("operation not allowed in this configuration")]
    NotAllowed,
    #[error("release of a not acceptable command")]
    NotAcceptable,
    #[error("target released by the initiator")]
    TargetReleased,
    #[error("ID of the target does not match")]
    IdMismatch,
    #[error("card was discarded")]
    CardDiscarded,
    #[error("NFCID3 mismatch")]
    NfcId3Mismatch,
    #[error("over-current event detected")]
    OverCurrent,
    #[error("NAD missing in DEP frame")]
    NadMissing,
    #[error("unmapped chip status code {0:#04x}")]
    Unknown(u8),
}

impl ChipError {
    /// Maps the low 6 bits of a chip status byte to a [`ChipError`].
    pub fn from_status_byte(status: u8) -> Self {
        match status & 0x3F {
            0x01 => Self::Timeout,
            0x02 => Self::Crc,
            0x03 => Self::Parity,
            0x04 => Self::BitCount,
            0x05 => Self::Framing,
            0x06 => Self::Collision,
            0x07 => Self::SmallBuffer,
            0x09 => Self::Overflow,
            0x0A => Self::RfTimeout,
            0x0B => Self::RfProtocol,
            0x0D => Self::Overheat,
            0x0E => Self::InternalOverflow,
            0x10 => Self::InvalidParameter,
            0x12 => Self::DepUnknown,
            0x13 => Self::InvalidRxFrame,
            0x14 => Self::MifareAuth,
            0x23 => Self::CheckByte,
            0x25 => Self::InvalidState,
            0x26 => Self::NotAllowed,
            0x27 => Self::NotAcceptable,
            0x29 => Self::TargetReleased,
            0x2A => Self::IdMismatch,
            0x2B => Self::CardDiscarded,
            0x2C => Self::NfcId3Mismatch,
            0x2D => Self::OverCurrent,
            0x2E => Self::NadMissing,
            other => Self::Unknown(other),
        }
    }
}

/// The crate's public error type, covering I/O, framing, chip status,
/// protocol-state and caller errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The OS read/write failed or the device disappeared. The handle
    /// that produced this is poisoned.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad checksum, wrong preamble, unexpected ACK/NACK. The handle
    /// remains usable.
    #[error("framing error: {0}")]
    Framing(&'static str),

    /// The chip reported a non-zero status byte.
    #[error("chip status: {0}")]
    Chip(#[from] ChipError),

    /// Command not permitted in the chip's current state.
    #[error("protocol state error: {0}")]
    ProtocolState(&'static str),

    /// Bad argument, unsupported modulation, buffer too small. Returned
    /// without touching the device.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),

    /// The requested modulation/baud/property combination is not
    /// supported by this chip variant or transport.
    #[error("not supported by device")]
    NotSupported,

    /// A blocking call was interrupted by `abort_command`.
    #[error("operation aborted")]
    Aborted,

    /// No response arrived within the caller-supplied (or default)
    /// timeout. Distinct from [`ChipError::Timeout`], which is a chip
    /// status byte; this variant covers host-side timeouts (ACK wait,
    /// OS read timeout) that never reach the chip-status layer.
    #[error("operation timed out")]
    Timeout,

    /// `open` was retried on a connection string matching no registered
    /// driver, or a USB/serial device matching the requested index could
    /// not be found.
    #[error("no such device")]
    DeviceNotFound,

    /// The serial port (or, for USB, the claimed interface) is already
    /// held by another handle in this process or another process.
    #[error("device already claimed")]
    Claimed,

    /// An unsolicited non-ACK, non-NACK frame appeared in the ACK slot.
    /// Fatal for the in-flight command.
    #[error("ACK mismatch")]
    AckMismatch,

    /// The chip returned a NACK in the ACK slot. Retryable by the
    /// protocol engine, unlike every other variant here.
    #[error("NACK in ACK slot")]
    Nack,

    /// Transport-specific failure message (e.g. PC/SC or libusb error
    /// text) that does not map cleanly onto another variant.
    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Renders the most recently cached error on a handle, mirroring
/// libnfc's `nfc_strerror`. Plain [`Display`](fmt::Display) is already
/// implemented via `thiserror`; this trait exists only to name the
/// convenience explicitly at the call site.
pub trait StrError {
    fn strerror(&self) -> String;
}

impl StrError for Option<Error> {
    fn strerror(&self) -> String {
        match self {
            Some(e) => e.to_string(),
            None => "no error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_byte_table() {
        assert_eq!(ChipError::from_status_byte(0x01), ChipError::Timeout);
        assert_eq!(ChipError::from_status_byte(0x14), ChipError::MifareAuth);
        assert_eq!(ChipError::from_status_byte(0x2E), ChipError::NadMissing);
        // high bits are masked off, they're reserved by the chip
        assert_eq!(ChipError::from_status_byte(0xC1), ChipError::Timeout);
    }

    #[test]
    fn unmapped_status_is_unknown() {
        assert_eq!(ChipError::from_status_byte(0x3F), ChipError::Unknown(0x3F));
    }

    #[test]
    fn strerror_of_no_error() {
        let last: Option<Error> = None;
        assert_eq!(last.strerror(), "no error");
    }
}
