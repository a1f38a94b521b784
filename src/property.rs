//! Device properties and the per-phase timeouts of the suspension
//! points a blocking call can wait on.
//!
//! A property is never a direct register poke from the public API: it
//! is always a `transceive` of `SetParameters`, `RFConfiguration`, or a
//! `ReadRegister`/`WriteRegister` pair, assembled here as pure
//! byte-math and driven by [`crate::device::DeviceHandle`] so the write
//! and the cached [`crate::device::HandleFlags`] bit update happen
//! together.

/// A configurable boolean device option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Chip computes/validates ISO CRC-A on TX/RX.
    HandleCrc,
    /// Chip computes/validates the 8th parity bit per byte.
    HandleParity,
    /// Energize the RF antenna.
    ActivateField,
    /// MIFARE Crypto1 engine on.
    ActivateCrypto1,
    /// Poll forever vs. one attempt.
    InfiniteSelect,
    /// Pass malformed frames to the host instead of discarding them.
    AcceptInvalidFrames,
    /// Do not clear the FIFO between frames.
    AcceptMultipleFrames,
    /// Auto RATS after SEL.
    AutoIso14443_4,
    /// Chip prepends/strips the ISO-DEP framing layer.
    EasyFraming,
    /// Restrict modulation to ISO14443-A.
    ForceIso14443A,
    /// Restrict modulation to ISO14443-B.
    ForceIso14443B,
    /// Restrict baud rate to 106 kbps.
    ForceSpeed106,
}

/// An integer-valued device option — the per-phase timeouts, settable
/// through the same property surface as the boolean ones even though
/// they never touch the chip (the wait bound is enforced host-side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntProperty {
    TimeoutCommand,
    TimeoutAtr,
    TimeoutCom,
}

/// `RFConfiguration` (opcode `0x32`) sub-item numbers.
pub mod rf_config_item {
    pub const FIELD: u8 = 0x01;
    pub const VARIOUS_REGISTERS: u8 = 0x02;
    pub const MAX_RETRIES: u8 = 0x05;
}

/// `ReadRegister`/`WriteRegister` (opcodes `0x06`/`0x08`) addresses this
/// crate touches. 16-bit, sent big-endian.
pub mod register {
    pub const CIU_TX_MODE: u16 = 0x6302;
    pub const CIU_RX_MODE: u16 = 0x6303;
    pub const CIU_STATUS2: u16 = 0x6338;
}

/// Bit within `CIU_TxMode`/`CIU_RxMode` the chip uses to gate CRC
/// generation/checking.
pub const CRC_EN_BIT: u8 = 0x80;
/// Bit within `CIU_RxMode` that *disables* parity handling — inverted
/// relative to [`Property::HandleParity`].
pub const PARITY_DISABLE_BIT: u8 = 0x10;
/// Bit within `CIU_Status2` that reports/activates the Crypto1 engine.
pub const CRYPTO1_ON_BIT: u8 = 0x08;

/// Bits of the `SetParameters` (opcode `0x12`) single-byte argument.
pub mod set_parameters_bit {
    pub const NAD_USED: u8 = 0x01;
    pub const DEP_SAVED: u8 = 0x02;
    pub const AUTO_ATR_RES: u8 = 0x04;
    pub const AUTO_RATS: u8 = 0x10;
    pub const EASY_FRAMING: u8 = 0x40;
}

/// Bits of the `RFConfiguration` item [`rf_config_item::VARIOUS_REGISTERS`]
/// argument byte.
pub mod various_registers_bit {
    pub const ACCEPT_INVALID_FRAMES: u8 = 0x01;
    pub const ACCEPT_MULTIPLE_FRAMES: u8 = 0x02;
    pub const FORCE_ISO14443_A: u8 = 0x04;
    pub const FORCE_ISO14443_B: u8 = 0x08;
    pub const FORCE_SPEED_106: u8 = 0x10;
}

/// Assembles the `SetParameters` argument byte. `AUTO_ATR_RES` is part
/// of the canonical reader configuration, not a property, so it is
/// always set.
pub fn set_parameters_byte(auto_iso14443_4: bool, easy_framing: bool) -> u8 {
    let mut b = set_parameters_bit::AUTO_ATR_RES;
    if auto_iso14443_4 {
        b |= set_parameters_bit::AUTO_RATS;
    }
    if easy_framing {
        b |= set_parameters_bit::EASY_FRAMING;
    }
    b
}

/// Assembles the `RFConfiguration` item `0x02` argument byte.
pub fn various_registers_byte(
    accept_invalid_frames: bool,
    accept_multiple_frames: bool,
    force_iso14443_a: bool,
    force_iso14443_b: bool,
    force_speed_106: bool,
) -> u8 {
    let mut b = 0u8;
    if accept_invalid_frames {
        b |= various_registers_bit::ACCEPT_INVALID_FRAMES;
    }
    if accept_multiple_frames {
        b |= various_registers_bit::ACCEPT_MULTIPLE_FRAMES;
    }
    if force_iso14443_a {
        b |= various_registers_bit::FORCE_ISO14443_A;
    }
    if force_iso14443_b {
        b |= various_registers_bit::FORCE_ISO14443_B;
    }
    if force_speed_106 {
        b |= various_registers_bit::FORCE_SPEED_106;
    }
    b
}

/// Sets or clears `bit` in `current`, returning the new register value.
pub fn with_bit(current: u8, bit: u8, set: bool) -> u8 {
    if set {
        current | bit
    } else {
        current & !bit
    }
}

/// Per-phase timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Wait for the chip's ACK frame. Default 1 s.
    pub ack: std::time::Duration,
    /// Wait for the command's substantive response. Default 30 s.
    pub command: std::time::Duration,
    /// Wait for ATR during DEP activation.
    pub atr: std::time::Duration,
    /// Wait for one `transceive` round-trip at the transport level.
    pub com: std::time::Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        use std::time::Duration;
        Self {
            ack: Duration::from_secs(1),
            command: Duration::from_secs(30),
            atr: Duration::from_secs(30),
            com: Duration::from_millis(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let t = Timeouts::default();
        assert_eq!(t.ack, std::time::Duration::from_secs(1));
        assert_eq!(t.command, std::time::Duration::from_secs(30));
    }

    #[test]
    fn set_parameters_byte_always_carries_auto_atr_res() {
        assert_eq!(set_parameters_byte(false, false), 0x04);
        assert_eq!(set_parameters_byte(true, false), 0x14);
        assert_eq!(set_parameters_byte(true, true), 0x54);
    }

    #[test]
    fn various_registers_byte_combines_independent_bits() {
        assert_eq!(various_registers_byte(true, false, false, false, false), 0x01);
        assert_eq!(various_registers_byte(false, true, false, false, false), 0x02);
        assert_eq!(various_registers_byte(true, true, true, false, true), 0x01 | 0x02 | 0x04 | 0x10);
    }

    #[test]
    fn with_bit_sets_and_clears() {
        assert_eq!(with_bit(0x00, CRC_EN_BIT, true), 0x80);
        assert_eq!(with_bit(0xFF, CRC_EN_BIT, false), 0x7F);
    }
}
