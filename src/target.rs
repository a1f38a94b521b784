//! Target descriptor types.
//!
//! These are the decoded, host-normalized counterparts of the raw bytes
//! [`crate::decoder`] parses out of `InListPassiveTarget`/`InAutoPoll`/ATR
//! responses.

/// A contactless UID, normalized to on-card byte order.
///
/// Cascade tags (`0x88`) have already been stripped by the decoder; see
/// [`crate::bitutils`] callers in `decoder.rs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uid(pub Vec<u8>);

impl Uid {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// ISO/IEC 14443 Type A target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso14443A {
    pub atqa: [u8; 2],
    pub sak: u8,
    pub uid: Uid,
    pub ats: Option<Vec<u8>>,
}

/// ISO/IEC 14443 Type B target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso14443B {
    pub atqb: [u8; 12],
    pub id: [u8; 4],
    /// Four protocol parameters (CID, protocol type, max frame size, FWI/ADC/FO).
    pub params: [u8; 4],
    pub inf: Option<Vec<u8>>,
}

/// FeliCa target, 212 or 424 kbps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeliCa {
    pub response_code: u8,
    pub nfcid2: [u8; 8],
    pub pad: [u8; 8],
    pub system_code: Option<[u8; 2]>,
}

/// Jewel/Topaz target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jewel {
    pub sens_res: [u8; 2],
    pub id: [u8; 4],
}

/// NFCIP-1 DEP peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dep {
    pub nfcid3: [u8; 10],
    pub did: Option<u8>,
    pub bs: u8,
    pub br: u8,
    pub to: u8,
    pub pp: u8,
    pub general_bytes: Option<Vec<u8>>,
}

/// A decoded target, tagged by modulation family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Iso14443A(Iso14443A),
    Iso14443B(Iso14443B),
    FeliCa(FeliCa),
    Jewel(Jewel),
    Dep(Dep),
}

impl Target {
    /// The target number (`Tg`) the chip assigned it, needed by
    /// `deselect_target`/`select_passive_target` re-selection. Callers
    /// that need `Tg` keep it alongside the `Target` returned from
    /// [`crate::initiator`]; it is not itself part of the modulation
    /// payload so it is not stored on this enum.
    pub fn uid(&self) -> Option<&[u8]> {
        match self {
            Target::Iso14443A(t) => Some(t.uid.as_bytes()),
            Target::FeliCa(t) => Some(&t.nfcid2),
            Target::Jewel(t) => Some(&t.id),
            Target::Iso14443B(t) => Some(&t.id),
            Target::Dep(t) => Some(&t.nfcid3),
        }
    }
}
