//! Modulation, baud rate and chip-variant types.

/// The chip variant driving a [`crate::device::DeviceHandle`].
///
/// The decoder needs this to reproduce the PN531 ATQA-byte-swap quirk;
/// nothing else in the engine branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipType {
    Pn531,
    Pn532,
    Pn533,
}

/// Air-interface baud rate, in kbps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    Baud106,
    Baud212,
    Baud424,
    Baud847,
}

/// Modulation family, independent of baud rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulationType {
    Iso14443A,
    Iso14443B,
    Iso14443BPrime,
    Iso14443B2Sr,
    Iso14443B2Ct,
    FeliCa,
    Jewel,
    Dep,
}

/// A (type, baud) pair. Not every pair is legal on every chip variant;
/// illegal combinations are rejected by [`crate::initiator`] with
/// [`crate::error::Error::NotSupported`], not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modulation {
    pub kind: ModulationType,
    pub baud: BaudRate,
}

impl Modulation {
    pub const fn new(kind: ModulationType, baud: BaudRate) -> Self {
        Self { kind, baud }
    }

    /// The canonical reader configuration modulation: ISO14443-A at
    /// 106 kbps, forced by `initiator_init`.
    pub const fn iso14443a_106() -> Self {
        Self::new(ModulationType::Iso14443A, BaudRate::Baud106)
    }

    /// Whether this chip variant supports the modulation at all. FeliCa
    /// and the ISO14443B variants are unavailable on the PN531, which
    /// predates FeliCa and type-B support in the PN53x line.
    pub fn supported_by(self, chip: ChipType) -> bool {
        match (chip, self.kind) {
            (ChipType::Pn531, ModulationType::FeliCa) => false,
            (ChipType::Pn531, ModulationType::Iso14443B) => false,
            (ChipType::Pn531, ModulationType::Iso14443BPrime) => false,
            (ChipType::Pn531, ModulationType::Iso14443B2Sr) => false,
            (ChipType::Pn531, ModulationType::Iso14443B2Ct) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pn531_lacks_felica_and_type_b() {
        let felica = Modulation::new(ModulationType::FeliCa, BaudRate::Baud212);
        assert!(!felica.supported_by(ChipType::Pn531));
        assert!(felica.supported_by(ChipType::Pn532));
    }

    #[test]
    fn canonical_modulation_is_iso14443a_106() {
        let m = Modulation::iso14443a_106();
        assert_eq!(m.kind, ModulationType::Iso14443A);
        assert_eq!(m.baud, BaudRate::Baud106);
    }
}
