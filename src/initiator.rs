//! Initiator (reader) operations.

use std::time::Duration;

use crate::decoder;
use crate::device::DeviceHandle;
use crate::error::{Error, Result};
use crate::modulation::Modulation;
use crate::opcode::Command;
use crate::property::Property;
use crate::target::Target;

/// Sets the canonical reader configuration: drop-then-raise field,
/// force ISO14443-A at 106 kbps, infinite select on, reject
/// invalid/multiple frames, auto-ISO14443-4 and easy-framing on, CRC and
/// parity handled by chip, Crypto1 off.
pub fn initiator_init(handle: &mut DeviceHandle) -> Result<()> {
    handle.check_not_poisoned()?;
    let timeout = handle.timeouts().command;

    let result = (|| -> Result<()> {
        // RFConfiguration item 0x01: drop the field before reconfiguring.
        handle.engine_mut().command(Command::RfConfiguration, &[0x01, 0x00], timeout)?;

        handle.set_property_bool(Property::ForceIso14443A, true)?;
        handle.set_property_bool(Property::ForceIso14443B, false)?;
        handle.set_property_bool(Property::ForceSpeed106, true)?;
        handle.set_property_bool(Property::InfiniteSelect, true)?;
        handle.set_property_bool(Property::AcceptInvalidFrames, false)?;
        handle.set_property_bool(Property::AcceptMultipleFrames, false)?;
        handle.set_property_bool(Property::AutoIso14443_4, true)?;
        handle.set_property_bool(Property::EasyFraming, true)?;
        handle.set_property_bool(Property::HandleCrc, true)?;
        handle.set_property_bool(Property::HandleParity, true)?;
        handle.set_property_bool(Property::ActivateCrypto1, false)?;
        handle.set_property_bool(Property::ActivateField, true)?;

        Ok(())
    })();

    handle.record_result(result)
}

/// Re-selects or first-selects a passive target for `modulation`.
///
/// For ISO14443A, `init_data` is the UID to re-select (cascaded as
/// required); for ISO14443B it is the AFI; for FeliCa, the polling
/// payload.
pub fn select_passive_target(
    handle: &mut DeviceHandle,
    modulation: Modulation,
    init_data: &[u8],
) -> Result<Target> {
    handle.check_not_poisoned()?;
    if !modulation.supported_by(handle.chip_type()) {
        return Err(Error::NotSupported);
    }
    let timeout = handle.timeouts().command;
    let chip_type = handle.chip_type();

    let result = (|| -> Result<Target> {
        let mut params = vec![0x01, modulation_byte(modulation)];
        params.extend_from_slice(init_data);
        let resp = handle.engine_mut().command(Command::InListPassiveTarget, &params, timeout)?;

        let count = *resp.first().ok_or(Error::Framing("empty InListPassiveTarget response"))?;
        if count == 0 {
            return Err(Error::ProtocolState("no target found"));
        }
        // resp[1] is Tg; the modulation-specific payload follows.
        let payload = resp.get(2..).unwrap_or(&[]);
        decoder::decode(modulation.kind, payload, chip_type)
    })();

    handle.record_result(result)
}

/// Repeatedly selects+deselects, collecting distinct targets until the
/// chip cycles back to one already seen, up to `cap` entries.
/// FeliCa/Jewel/ISO14443B' always terminate after one target since the
/// chip cannot deselect them.
///
/// Disables `INFINITE_SELECT` for the duration of the call: with it on
/// (as `initiator_init` leaves it), `InListPassiveTarget` polls forever
/// on an empty field instead of returning `NbTg == 0`, so the
/// no-target-found termination below would never fire. The prior value
/// is restored before returning, on every path.
pub fn list_passive_targets(
    handle: &mut DeviceHandle,
    modulation: Modulation,
    cap: usize,
) -> Result<Vec<Target>> {
    use crate::modulation::ModulationType;

    let single_shot = matches!(
        modulation.kind,
        ModulationType::FeliCa | ModulationType::Jewel | ModulationType::Iso14443BPrime
    );

    let restore_infinite_select = handle.flags().infinite_select;
    handle.set_property_bool(Property::InfiniteSelect, false)?;

    let result = (|| -> Result<Vec<Target>> {
        let mut found = Vec::new();
        loop {
            if found.len() >= cap {
                break;
            }
            let target = match select_passive_target(handle, modulation, &[]) {
                Ok(t) => t,
                Err(Error::ProtocolState(_)) => break,
                Err(e) => return Err(e),
            };
            if found.contains(&target) {
                break;
            }
            found.push(target);
            deselect_target(handle)?;
            if single_shot {
                break;
            }
        }
        Ok(found)
    })();

    let _ = handle.set_property_bool(Property::InfiniteSelect, restore_infinite_select);
    result
}

/// Maps to `InAutoPoll` with `nr` polling passes (1..=255) and `period`
/// in units of 150 ms.
pub fn poll_target(handle: &mut DeviceHandle, modulations: &[Modulation], nr: u8, period: u8) -> Result<Option<Target>> {
    handle.check_not_poisoned()?;
    if nr == 0 {
        return Err(Error::Invalid("nr must be in 1..=255"));
    }
    let timeout = handle.timeouts().command;
    let chip_type = handle.chip_type();

    let result = (|| -> Result<Option<Target>> {
        let mut params = vec![nr, period];
        for m in modulations {
            params.push(modulation_byte(*m));
        }
        let resp = handle.engine_mut().command(Command::InAutoPoll, &params, timeout)?;
        if resp.first() == Some(&0) || resp.is_empty() {
            return Ok(None);
        }
        // resp[0] is NbTg, resp[1] is Type, resp[2] is Length; the
        // TargetData for this entry starts only after all three —
        // unlike InListPassiveTarget's NbTg+Tg two-byte header.
        let modulation = modulations.first().copied().unwrap_or(Modulation::iso14443a_106());
        let payload = resp.get(3..).unwrap_or(&[]);
        decoder::decode(modulation.kind, payload, chip_type).map(Some)
    })();

    handle.record_result(result)
}

/// Forwards raw bytes to the selected target, CRC/parity handled per
/// the handle's current flags.
pub fn transceive_bytes(handle: &mut DeviceHandle, tx: &[u8], timeout: Duration) -> Result<Vec<u8>> {
    handle.check_not_poisoned()?;
    let result = handle.engine_mut().command(Command::InDataExchange, tx, timeout);
    handle.record_result(result)
}

/// As [`transceive_bytes`], additionally returning the chip's 16-bit
/// cycle counter (≈ 73 ns resolution, saturating at ~4.8 ms).
pub fn transceive_bytes_timed(handle: &mut DeviceHandle, tx: &[u8], timeout: Duration) -> Result<(Vec<u8>, u16)> {
    let resp = transceive_bytes(handle, tx, timeout)?;
    if resp.len() < 2 {
        return Ok((resp, 0));
    }
    let split = resp.len() - 2;
    let cycles = u16::from_be_bytes([resp[split], resp[split + 1]]);
    Ok((resp[..split].to_vec(), cycles))
}

/// As [`transceive_bytes`], but the caller supplies/receives a raw bit
/// stream (e.g. mid-anti-collision exchanges) instead of a byte-aligned
/// frame. The chip still wraps/unwraps parity per [`crate::bitframing`]
/// when `HANDLE_PARITY` is off.
pub fn transceive_bits(
    handle: &mut DeviceHandle,
    data: &[u8],
    parity: &[bool],
    timeout: Duration,
) -> Result<(Vec<u8>, Vec<bool>)> {
    handle.check_not_poisoned()?;
    let result = (|| -> Result<(Vec<u8>, Vec<bool>)> {
        let wrapped = crate::bitframing::wrap_bits(data, parity);
        let raw = handle.engine_mut().command(Command::InDataExchange, &wrapped.bytes, timeout)?;
        let stream = crate::bitframing::BitStream { bit_count: raw.len() * 8, bytes: raw };
        Ok(crate::bitframing::unwrap_bits(&stream))
    })();
    handle.record_result(result)
}

/// As [`transceive_bits`], additionally returning the chip's 16-bit
/// cycle counter.
pub fn transceive_bits_timed(
    handle: &mut DeviceHandle,
    data: &[u8],
    parity: &[bool],
    timeout: Duration,
) -> Result<(Vec<u8>, Vec<bool>, u16)> {
    handle.check_not_poisoned()?;
    let result = (|| -> Result<(Vec<u8>, Vec<bool>, u16)> {
        let wrapped = crate::bitframing::wrap_bits(data, parity);
        let mut raw = handle.engine_mut().command(Command::InDataExchange, &wrapped.bytes, timeout)?;
        let cycles = if raw.len() >= 2 {
            let split = raw.len() - 2;
            let c = u16::from_be_bytes([raw[split], raw[split + 1]]);
            raw.truncate(split);
            c
        } else {
            0
        };
        let stream = crate::bitframing::BitStream { bit_count: raw.len() * 8, bytes: raw };
        let (bytes, parity) = crate::bitframing::unwrap_bits(&stream);
        Ok((bytes, parity, cycles))
    })();
    handle.record_result(result)
}

/// Issues `InDeselect` to the currently selected `Tg`.
pub fn deselect_target(handle: &mut DeviceHandle) -> Result<()> {
    handle.check_not_poisoned()?;
    let timeout = handle.timeouts().command;
    let result = handle.engine_mut().command(Command::InDeselect, &[0x00], timeout).map(|_| ());
    handle.record_result(result)
}

/// Interrupts a blocking call in progress on this handle.
pub fn abort_command(handle: &mut DeviceHandle) -> Result<()> {
    handle.engine_mut().driver_mut().abort()
}

fn modulation_byte(modulation: Modulation) -> u8 {
    use crate::modulation::{BaudRate, ModulationType};
    match (modulation.kind, modulation.baud) {
        (ModulationType::Iso14443A, BaudRate::Baud106) => 0x00,
        (ModulationType::FeliCa, BaudRate::Baud212) => 0x01,
        (ModulationType::FeliCa, BaudRate::Baud424) => 0x02,
        (ModulationType::Iso14443B, _) => 0x03,
        (ModulationType::Jewel, _) => 0x04,
        (ModulationType::Iso14443B2Ct, _) => 0x06,
        _ => 0x00,
    }
}

#[cfg(test)]
mod tests {
    use super::modulation_byte;
    use crate::modulation::Modulation;

    #[test]
    fn iso14443a_106_maps_to_zero() {
        assert_eq!(modulation_byte(Modulation::iso14443a_106()), 0x00);
    }
}
