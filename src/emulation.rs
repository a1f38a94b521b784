//! Target (emulation) operations.

use std::time::Duration;

use crate::device::DeviceHandle;
use crate::error::{Error, Result};
use crate::opcode::Command;
use crate::property::Property;

/// NFCID3/general-bytes configuration the chip emulates as, reused here
/// as the parameters to `TgInitAsTarget`.
pub struct TargetInitParams {
    pub nfcid3: [u8; 10],
    pub general_bytes: Vec<u8>,
}

/// Configures the chip for emulation (easy-framing off, field off,
/// accept-invalid/multiple off, CRC/parity on, Crypto1 off) and blocks
/// in `TgInitAsTarget` until a foreign initiator sends a
/// non-anti-collision command, returning that command's bytes.
pub fn target_init(handle: &mut DeviceHandle, params: &TargetInitParams, timeout: Duration) -> Result<Vec<u8>> {
    handle.check_not_poisoned()?;

    let result = (|| -> Result<Vec<u8>> {
        handle.set_property_bool(Property::ActivateField, false)?;
        handle.set_property_bool(Property::EasyFraming, false)?;
        handle.set_property_bool(Property::AcceptInvalidFrames, false)?;
        handle.set_property_bool(Property::AcceptMultipleFrames, false)?;
        handle.set_property_bool(Property::HandleCrc, true)?;
        handle.set_property_bool(Property::HandleParity, true)?;
        handle.set_property_bool(Property::ActivateCrypto1, false)?;

        let mut tg_params = Vec::with_capacity(1 + 10 + params.general_bytes.len());
        tg_params.push(0x05); // mode: PICC + DEP, passive only
        tg_params.extend_from_slice(&params.nfcid3);
        tg_params.extend_from_slice(&params.general_bytes);

        let resp = handle.engine_mut().command(Command::TgInitAsTarget, &tg_params, timeout)?;
        resp.get(1..).map(|s| s.to_vec()).ok_or(Error::Framing("empty TgInitAsTarget response"))
    })();

    handle.record_result(result)
}

/// Sends `data` as the emulated tag's response to the initiator.
pub fn target_send_bytes(handle: &mut DeviceHandle, data: &[u8], timeout: Duration) -> Result<()> {
    handle.check_not_poisoned()?;
    let result = handle.engine_mut().command(Command::TgResponseToInitiator, data, timeout).map(|_| ());
    handle.record_result(result)
}

/// Blocks until the initiator sends the next frame, returning its bytes.
pub fn target_receive_bytes(handle: &mut DeviceHandle, timeout: Duration) -> Result<Vec<u8>> {
    handle.check_not_poisoned()?;
    let result = handle.engine_mut().command(Command::TgGetData, &[], timeout);
    handle.record_result(result)
}

/// As [`target_send_bytes`]/[`target_receive_bytes`], but the caller
/// supplies/receives a raw bit stream (e.g. mid-anti-collision replies)
/// instead of a byte-aligned frame. The chip still wraps/unwraps parity
/// per [`crate::bitframing`] when `HANDLE_PARITY` is off.
pub fn target_send_bits(handle: &mut DeviceHandle, data: &[u8], parity: &[bool], timeout: Duration) -> Result<()> {
    handle.check_not_poisoned()?;
    let wrapped = crate::bitframing::wrap_bits(data, parity);
    let result = handle
        .engine_mut()
        .command(Command::TgResponseToInitiator, &wrapped.bytes, timeout)
        .map(|_| ());
    handle.record_result(result)
}

pub fn target_receive_bits(handle: &mut DeviceHandle, timeout: Duration) -> Result<(Vec<u8>, Vec<bool>)> {
    handle.check_not_poisoned()?;
    let result = (|| -> Result<(Vec<u8>, Vec<bool>)> {
        let raw = handle.engine_mut().command(Command::TgGetData, &[], timeout)?;
        let stream = crate::bitframing::BitStream { bit_count: raw.len() * 8, bytes: raw };
        Ok(crate::bitframing::unwrap_bits(&stream))
    })();
    handle.record_result(result)
}
