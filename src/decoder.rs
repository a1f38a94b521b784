//! Target decoder: parses the raw `InListPassiveTarget` payload (first
//! byte `Tg`, then modulation-specific bytes) into a structured
//! [`Target`].

use crate::error::{Error, Result};
use crate::modulation::{ChipType, ModulationType};
use crate::target::{Dep, FeliCa, Iso14443A, Iso14443B, Jewel, Target, Uid};

/// Strips leading cascade tags (`0x88`) from a raw UID. Two cascade tags
/// in a 12-byte UID reduce it to 10 bytes.
pub fn strip_cascade_tags(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == 0x88 && i + 1 < raw.len() {
            i += 1;
            continue;
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

/// Decodes the payload that follows the `Tg` byte of an
/// `InListPassiveTarget`/`InAutoPoll` response for ISO14443-A.
///
/// Layout: `ATQA(2) SAK(1) UID_LEN(1) UID(UID_LEN) [ATS_LEN(1) ATS(ATS_LEN)]`.
/// The PN531 swaps the two ATQA bytes relative to PN532/PN533.
pub fn decode_iso14443a(payload: &[u8], chip: ChipType) -> Result<Iso14443A> {
    if payload.len() < 4 {
        return Err(Error::Framing("invalid frame: ISO14443A payload too short"));
    }
    let mut atqa = [payload[0], payload[1]];
    if chip == ChipType::Pn531 {
        atqa.swap(0, 1);
    }
    let sak = payload[2];
    let uid_len = payload[3] as usize;
    if payload.len() < 4 + uid_len {
        return Err(Error::Framing("invalid frame: UID length exceeds payload"));
    }
    let raw_uid = &payload[4..4 + uid_len];
    let uid = Uid(strip_cascade_tags(raw_uid));

    let rest = &payload[4 + uid_len..];
    let ats = match rest.first() {
        Some(&ats_len) if rest.len() >= 1 + ats_len as usize => {
            Some(rest[1..1 + ats_len as usize].to_vec())
        }
        _ => None,
    };

    Ok(Iso14443A { atqa, sak, uid, ats })
}

/// Decodes an ISO14443-B payload: `ATQB(12) ID(4) protocol params(4)
/// [INF_LEN(1) INF(INF_LEN)]`.
pub fn decode_iso14443b(payload: &[u8]) -> Result<Iso14443B> {
    if payload.len() < 20 {
        return Err(Error::Framing("invalid frame: ISO14443B payload too short"));
    }
    let mut atqb = [0u8; 12];
    atqb.copy_from_slice(&payload[0..12]);
    let mut id = [0u8; 4];
    id.copy_from_slice(&payload[12..16]);
    let mut params = [0u8; 4];
    params.copy_from_slice(&payload[16..20]);

    let rest = &payload[20..];
    let inf = match rest.first() {
        Some(&inf_len) if rest.len() >= 1 + inf_len as usize => {
            Some(rest[1..1 + inf_len as usize].to_vec())
        }
        _ => None,
    };

    Ok(Iso14443B { atqb, id, params, inf })
}

/// Decodes a FeliCa (212/424 kbps) payload: `LEN(1) response_code(1)
/// NFCID2(8) PAD(8) [system_code(2)]`.
pub fn decode_felica(payload: &[u8]) -> Result<FeliCa> {
    if payload.len() < 18 {
        return Err(Error::Framing("invalid frame: FeliCa payload too short"));
    }
    let response_code = payload[1];
    let mut nfcid2 = [0u8; 8];
    nfcid2.copy_from_slice(&payload[2..10]);
    let mut pad = [0u8; 8];
    pad.copy_from_slice(&payload[10..18]);
    let system_code = if payload.len() >= 20 {
        Some([payload[18], payload[19]])
    } else {
        None
    };
    Ok(FeliCa { response_code, nfcid2, pad, system_code })
}

/// Decodes a Jewel/Topaz payload: `SENS_RES(2) ID(4)`.
pub fn decode_jewel(payload: &[u8]) -> Result<Jewel> {
    if payload.len() < 6 {
        return Err(Error::Framing("invalid frame: Jewel payload too short"));
    }
    let mut sens_res = [0u8; 2];
    sens_res.copy_from_slice(&payload[0..2]);
    let mut id = [0u8; 4];
    id.copy_from_slice(&payload[2..6]);
    Ok(Jewel { sens_res, id })
}

/// Decodes a DEP/ATR payload: `NFCID3(10) DID(1) BS(1) BR(1) TO(1)
/// PP(1) [general_bytes...]`.
pub fn decode_dep(payload: &[u8]) -> Result<Dep> {
    if payload.len() < 15 {
        return Err(Error::Framing("invalid frame: DEP payload too short"));
    }
    let mut nfcid3 = [0u8; 10];
    nfcid3.copy_from_slice(&payload[0..10]);
    let did = if payload[10] != 0 { Some(payload[10]) } else { None };
    let bs = payload[11];
    let br = payload[12];
    let to = payload[13];
    let pp = payload[14];
    let general_bytes = if payload.len() > 15 { Some(payload[15..].to_vec()) } else { None };
    Ok(Dep { nfcid3, did, bs, br, to, pp, general_bytes })
}

/// Dispatches to the right per-modulation decoder and wraps the result
/// in a [`Target`].
pub fn decode(modulation: ModulationType, payload: &[u8], chip: ChipType) -> Result<Target> {
    match modulation {
        ModulationType::Iso14443A => decode_iso14443a(payload, chip).map(Target::Iso14443A),
        ModulationType::Iso14443B
        | ModulationType::Iso14443BPrime
        | ModulationType::Iso14443B2Sr
        | ModulationType::Iso14443B2Ct => decode_iso14443b(payload).map(Target::Iso14443B),
        ModulationType::FeliCa => decode_felica(payload).map(Target::FeliCa),
        ModulationType::Jewel => decode_jewel(payload).map(Target::Jewel),
        ModulationType::Dep => decode_dep(payload).map(Target::Dep),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_tag_stripped_from_uid() {
        let raw = [0x88u8, 0x04, 0x5A, 0x6B, 0x31, 0xC2, 0x85];
        let stripped = strip_cascade_tags(&raw);
        assert_eq!(stripped, vec![0x04, 0x5A, 0x6B, 0x31, 0xC2, 0x85]);
        assert_eq!(stripped.len(), 6);
    }

    #[test]
    fn pn531_swaps_atqa_bytes_relative_to_pn532() {
        let payload = [0x44u8, 0x03, 0x08, 0x04, 0xAA, 0xBB, 0xCC, 0xDD];

        let pn531 = decode_iso14443a(&payload, ChipType::Pn531).unwrap();
        assert_eq!(pn531.atqa, [0x03, 0x44]);
        assert_eq!(pn531.sak, 0x08);
        assert_eq!(pn531.uid.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD]);

        let pn532 = decode_iso14443a(&payload, ChipType::Pn532).unwrap();
        assert_eq!(pn532.atqa, [0x44, 0x03]);
        assert_eq!(pn532.sak, 0x08);
        assert_eq!(pn532.uid.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn short_iso14443a_payload_is_invalid_frame() {
        let payload = [0x44u8, 0x03];
        assert!(decode_iso14443a(&payload, ChipType::Pn532).is_err());
    }

    #[test]
    fn seven_byte_uid_with_one_cascade_tag() {
        let raw = [0x88u8, 0x04, 0x5A, 0x6B, 0x31, 0xC2, 0x85];
        assert_eq!(strip_cascade_tags(&raw).len(), 6);
    }

    #[test]
    fn ten_byte_uid_with_two_cascade_tags() {
        let raw = [0x88u8, 1, 2, 3, 0x88, 4, 5, 6, 7, 8, 9, 10];
        let stripped = strip_cascade_tags(&raw);
        assert_eq!(stripped.len(), 10);
    }
}
