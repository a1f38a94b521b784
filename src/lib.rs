//! Platform-independent driver for the NXP PN53x family (PN531, PN532,
//! PN533): NFC initiator (reader) and target (emulator) roles over
//! ISO/IEC 14443-A/B, FeliCa, Jewel/Topaz, MIFARE and NFCIP DEP.
//!
//! `init()` must be called once before [`registry::list_devices`] or
//! [`device::open`] are used, and `exit()` when the process is done with
//! the library — an explicit lifecycle, not a hidden static
//! initializer.

pub mod bitframing;
pub mod bitutils;
pub mod decoder;
pub mod device;
pub mod driver;
pub mod drivers;
pub mod emulation;
pub mod engine;
pub mod error;
pub mod frame;
pub mod initiator;
pub mod modulation;
pub mod opcode;
pub mod property;
pub mod registry;
pub mod target;

pub use device::{open, DeviceHandle};
pub use error::{Error, Result, StrError};
pub use modulation::{BaudRate, ChipType, Modulation, ModulationType};
pub use property::{IntProperty, Property, Timeouts};
pub use target::Target;

const ENV_LOG_LEVEL: &str = "LIBNFC_LOG_LEVEL";

/// Installs the process-wide device registry and sets `log`'s max level
/// from `LIBNFC_LOG_LEVEL`, if set. Does not install a logger itself;
/// callers wire up `env_logger` or any other `log::Log` implementer.
pub fn init() {
    registry::install();

    if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
        let max_level = match level.as_str() {
            "0" => log::LevelFilter::Off,
            "1" => log::LevelFilter::Error,
            "2" => log::LevelFilter::Debug,
            "3" => log::LevelFilter::Trace,
            _ => log::LevelFilter::Warn,
        };
        log::set_max_level(max_level);
    }
}

/// Process-wide teardown counterpart to [`init`]. Currently a no-op
/// beyond documenting the lifecycle boundary: the registry holds no
/// resources that outlive individual [`DeviceHandle`]s, so there is
/// nothing left to release once every handle has been closed.
pub fn exit() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        let devices = registry::list_devices(16).unwrap();
        assert!(devices.len() <= 16);
    }
}
