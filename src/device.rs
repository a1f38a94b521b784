//! Device handle: lifecycle, cached operational flags, and the
//! property-write machinery that turns a [`Property`] into a concrete
//! `SetParameters`/`RFConfiguration`/`ReadRegister`/`WriteRegister`
//! exchange.

use std::time::Duration;

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::modulation::ChipType;
use crate::opcode::Command;
use crate::property::{self, register, rf_config_item, IntProperty, Property, Timeouts};
use crate::registry;

/// Mutable operational flags carried on a handle, one cached bool per
/// boolean [`Property`] plus the handle's own activity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleFlags {
    pub crc_handled_by_chip: bool,
    pub parity_handled_by_chip: bool,
    pub active_field: bool,
    pub active_crypto1: bool,
    pub infinite_select: bool,
    pub accept_invalid_frames: bool,
    pub accept_multiple_frames: bool,
    pub auto_iso14443_4: bool,
    pub easy_framing: bool,
    pub force_iso14443_a: bool,
    pub force_iso14443_b: bool,
    pub force_speed_106: bool,
    pub active: bool,
}

impl Default for HandleFlags {
    fn default() -> Self {
        Self {
            crc_handled_by_chip: true,
            parity_handled_by_chip: true,
            active_field: false,
            active_crypto1: false,
            infinite_select: false,
            accept_invalid_frames: false,
            accept_multiple_frames: false,
            auto_iso14443_4: false,
            easy_framing: false,
            force_iso14443_a: false,
            force_iso14443_b: false,
            force_speed_106: false,
            active: false,
        }
    }
}

/// One claimed reader, exclusively owned by the caller until [`close`](DeviceHandle::close).
///
/// Never shared across concurrent callers without external mutual
/// exclusion: nothing on this type is `Sync`.
pub struct DeviceHandle {
    name: String,
    connstring: String,
    chip_type: ChipType,
    engine: Engine,
    flags: HandleFlags,
    timeouts: Timeouts,
    last_error: Option<String>,
    poisoned: bool,
}

impl DeviceHandle {
    pub(crate) fn new(name: String, connstring: String, chip_type: ChipType, engine: Engine) -> Self {
        Self {
            name,
            connstring,
            chip_type,
            engine,
            flags: HandleFlags::default(),
            timeouts: Timeouts::default(),
            last_error: None,
            poisoned: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connstring(&self) -> &str {
        &self.connstring
    }

    pub fn chip_type(&self) -> ChipType {
        self.chip_type
    }

    pub fn flags(&self) -> HandleFlags {
        self.flags
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    pub(crate) fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub(crate) fn flags_mut(&mut self) -> &mut HandleFlags {
        &mut self.flags
    }

    /// Whether an I/O error has poisoned this handle.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub(crate) fn check_not_poisoned(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "handle poisoned")));
        }
        Ok(())
    }

    /// Records `result`'s error (if any) as the handle's last error and
    /// poisons the handle on an I/O error, without otherwise altering
    /// the `Result` the caller receives.
    pub(crate) fn record_result<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if matches!(e, Error::Io(_)) {
                self.poisoned = true;
            }
            self.last_error = Some(e.to_string());
        }
        result
    }

    /// Renders the most recently recorded error, mirroring libnfc's
    /// `strerror`.
    pub fn strerror(&self) -> String {
        match &self.last_error {
            Some(e) => e.clone(),
            None => "no error".to_string(),
        }
    }

    /// `idle` then the driver's `close`. The handle is invalid
    /// thereafter; dropping it without calling `close` still releases
    /// the transport via `Drop` on the underlying driver, but skips the
    /// `idle` step.
    pub fn close(mut self) -> Result<()> {
        let _ = self.engine.driver_mut().idle();
        self.engine.driver_mut().close()
    }

    /// Sets a boolean property by issuing the chip write it maps to,
    /// then updates the cached flag only if that write succeeded — the
    /// flag and the chip's actual state never diverge on a rejected
    /// write.
    pub fn set_property_bool(&mut self, property: Property, value: bool) -> Result<()> {
        self.check_not_poisoned()?;
        let timeout = self.timeouts.command;

        let result = (|| -> Result<()> {
            match property {
                Property::ActivateField => {
                    let arg = if value { 0x01 } else { 0x00 };
                    self.engine.command(Command::RfConfiguration, &[rf_config_item::FIELD, arg], timeout)?;
                }
                Property::InfiniteSelect => {
                    let retries = if value { 0xFF } else { 0x01 };
                    self.engine.command(
                        Command::RfConfiguration,
                        &[rf_config_item::MAX_RETRIES, retries, retries, retries],
                        timeout,
                    )?;
                }
                Property::HandleCrc => self.write_crc_enable(value, timeout)?,
                Property::HandleParity => self.write_parity_enable(value, timeout)?,
                Property::ActivateCrypto1 => self.write_crypto1_enable(value, timeout)?,
                Property::AutoIso14443_4 => {
                    let byte = property::set_parameters_byte(value, self.flags.easy_framing);
                    self.engine.command(Command::SetParameters, &[byte], timeout)?;
                }
                Property::EasyFraming => {
                    let byte = property::set_parameters_byte(self.flags.auto_iso14443_4, value);
                    self.engine.command(Command::SetParameters, &[byte], timeout)?;
                }
                Property::AcceptInvalidFrames
                | Property::AcceptMultipleFrames
                | Property::ForceIso14443A
                | Property::ForceIso14443B
                | Property::ForceSpeed106 => self.write_various_registers(property, value, timeout)?,
            }
            Ok(())
        })();

        if result.is_ok() {
            self.apply_property_flag(property, value);
        }
        self.record_result(result)
    }

    /// Sets an integer-valued property. None of these touch the chip —
    /// they are host-side wait bounds enforced by the engine/driver.
    pub fn set_property_int(&mut self, property: IntProperty, value: Duration) -> Result<()> {
        self.check_not_poisoned()?;
        match property {
            IntProperty::TimeoutCommand => self.timeouts.command = value,
            IntProperty::TimeoutAtr => self.timeouts.atr = value,
            IntProperty::TimeoutCom => self.timeouts.com = value,
        }
        Ok(())
    }

    fn read_register(&mut self, addrs: &[u16], timeout: Duration) -> Result<Vec<u8>> {
        let mut params = Vec::with_capacity(addrs.len() * 2);
        for addr in addrs {
            params.extend_from_slice(&addr.to_be_bytes());
        }
        self.engine.command(Command::ReadRegister, &params, timeout)
    }

    fn write_registers(&mut self, writes: &[(u16, u8)], timeout: Duration) -> Result<()> {
        let mut params = Vec::with_capacity(writes.len() * 3);
        for (addr, value) in writes {
            params.extend_from_slice(&addr.to_be_bytes());
            params.push(*value);
        }
        self.engine.command(Command::WriteRegister, &params, timeout)?;
        Ok(())
    }

    fn write_crc_enable(&mut self, enabled: bool, timeout: Duration) -> Result<()> {
        let current = self.read_register(&[register::CIU_TX_MODE, register::CIU_RX_MODE], timeout)?;
        let (tx_mode, rx_mode) = match current.as_slice() {
            [tx, rx, ..] => (*tx, *rx),
            _ => return Err(Error::Framing("ReadRegister returned too few bytes")),
        };
        let new_tx = property::with_bit(tx_mode, property::CRC_EN_BIT, enabled);
        let new_rx = property::with_bit(rx_mode, property::CRC_EN_BIT, enabled);
        self.write_registers(&[(register::CIU_TX_MODE, new_tx), (register::CIU_RX_MODE, new_rx)], timeout)
    }

    fn write_parity_enable(&mut self, enabled: bool, timeout: Duration) -> Result<()> {
        let current = self.read_register(&[register::CIU_RX_MODE], timeout)?;
        let rx_mode = *current.first().ok_or(Error::Framing("ReadRegister returned no bytes"))?;
        // HANDLE_PARITY is the logical inverse of the chip's ParityDisable bit.
        let new_rx = property::with_bit(rx_mode, property::PARITY_DISABLE_BIT, !enabled);
        self.write_registers(&[(register::CIU_RX_MODE, new_rx)], timeout)
    }

    fn write_crypto1_enable(&mut self, enabled: bool, timeout: Duration) -> Result<()> {
        let current = self.read_register(&[register::CIU_STATUS2], timeout)?;
        let status2 = *current.first().ok_or(Error::Framing("ReadRegister returned no bytes"))?;
        let new_status2 = property::with_bit(status2, property::CRYPTO1_ON_BIT, enabled);
        self.write_registers(&[(register::CIU_STATUS2, new_status2)], timeout)
    }

    /// `AcceptInvalidFrames`/`AcceptMultipleFrames`/`ForceIso14443A`/`ForceIso14443B`/
    /// `ForceSpeed106` share one `RFConfiguration` argument byte, so
    /// setting any one of them re-sends the byte assembled from the
    /// handle's current flags with only `changed` replaced.
    fn write_various_registers(&mut self, changed: Property, value: bool, timeout: Duration) -> Result<()> {
        let mut accept_invalid_frames = self.flags.accept_invalid_frames;
        let mut accept_multiple_frames = self.flags.accept_multiple_frames;
        let mut force_iso14443_a = self.flags.force_iso14443_a;
        let mut force_iso14443_b = self.flags.force_iso14443_b;
        let mut force_speed_106 = self.flags.force_speed_106;

        match changed {
            Property::AcceptInvalidFrames => accept_invalid_frames = value,
            Property::AcceptMultipleFrames => accept_multiple_frames = value,
            Property::ForceIso14443A => force_iso14443_a = value,
            Property::ForceIso14443B => force_iso14443_b = value,
            Property::ForceSpeed106 => force_speed_106 = value,
            _ => unreachable!("write_various_registers only called for its own bit group"),
        }

        let byte = property::various_registers_byte(
            accept_invalid_frames,
            accept_multiple_frames,
            force_iso14443_a,
            force_iso14443_b,
            force_speed_106,
        );
        self.engine
            .command(Command::RfConfiguration, &[rf_config_item::VARIOUS_REGISTERS, byte], timeout)?;
        Ok(())
    }

    fn apply_property_flag(&mut self, property: Property, value: bool) {
        match property {
            Property::HandleCrc => self.flags.crc_handled_by_chip = value,
            Property::HandleParity => self.flags.parity_handled_by_chip = value,
            Property::ActivateField => self.flags.active_field = value,
            Property::ActivateCrypto1 => self.flags.active_crypto1 = value,
            Property::InfiniteSelect => self.flags.infinite_select = value,
            Property::AcceptInvalidFrames => self.flags.accept_invalid_frames = value,
            Property::AcceptMultipleFrames => self.flags.accept_multiple_frames = value,
            Property::AutoIso14443_4 => self.flags.auto_iso14443_4 = value,
            Property::EasyFraming => self.flags.easy_framing = value,
            Property::ForceIso14443A => self.flags.force_iso14443_a = value,
            Property::ForceIso14443B => self.flags.force_iso14443_b = value,
            Property::ForceSpeed106 => self.flags.force_speed_106 = value,
        }
    }
}

/// Opens a device by connection string, or by the registry's default
/// resolution rule if `connstring` is `None`.
pub fn open(connstring: Option<&str>) -> Result<DeviceHandle> {
    let resolved = registry::resolve_connstring(connstring)?;
    let driver = registry::open(&resolved)?;
    let mut engine = Engine::new(driver);

    let firmware = engine.command(
        crate::opcode::Command::GetFirmwareVersion,
        &[],
        Timeouts::default().command,
    )?;
    let chip_type = match firmware.first() {
        Some(0x31) => ChipType::Pn531,
        Some(0x32) => ChipType::Pn532,
        Some(0x33) => ChipType::Pn533,
        _ => ChipType::Pn532,
    };

    let name = resolved.clone();
    Ok(DeviceHandle::new(name, resolved, chip_type, engine))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_handle_crc_and_parity_on_by_default() {
        let flags = HandleFlags::default();
        assert!(flags.crc_handled_by_chip);
        assert!(flags.parity_handled_by_chip);
        assert!(!flags.active);
        assert!(!flags.active_field);
        assert!(!flags.infinite_select);
    }
}
