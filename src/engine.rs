//! The PN53x protocol engine: opcode assembly, the ACK/NACK handshake's
//! bounded retry, and chip-status error classification. Ties `frame`,
//! `opcode` and `bitframing` to a [`Driver`] without knowing which
//! transport it is holding.
//!
//! Grounded on the reference crate's `MFRC522::write_reg`/`read_reg` —
//! a thin layer that turns one domain operation into one transport call
//! plus error mapping — generalized from register access to opcode
//! dispatch.

use std::time::Duration;

use crate::driver::Driver;
use crate::error::{ChipError, Error, Result};
use crate::opcode::Command;

/// ACK-NACK retries before surfacing the error ("at least 1, at most 3").
pub const MAX_NACK_RETRIES: u32 = 3;

pub struct Engine {
    driver: Box<dyn Driver>,
}

impl Engine {
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self { driver }
    }

    pub fn driver_mut(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }

    /// Sends `command` with `params` appended, retries on NACK up to
    /// [`MAX_NACK_RETRIES`] times, then strips the `D5` direction byte
    /// and the opcode+1 echo and classifies the chip status byte if
    /// this opcode carries one.
    ///
    /// Only a NACK in the ACK slot is retried. An ACK-mismatch is fatal
    /// for the in-flight command and an I/O error poisons the handle one
    /// layer up — neither is retried here.
    pub fn command(&mut self, command: Command, params: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let mut tx = Vec::with_capacity(2 + params.len());
        tx.extend_from_slice(&command.header());
        tx.extend_from_slice(params);

        let mut attempts = 0;
        let raw = loop {
            match self.driver.transceive(&tx, timeout) {
                Ok(resp) => break resp,
                Err(Error::Nack) if attempts < MAX_NACK_RETRIES => {
                    attempts += 1;
                    log::warn!("NACK on {:?}, retry {}/{}", command, attempts, MAX_NACK_RETRIES);
                    continue;
                }
                Err(e) => return Err(e),
            }
        };

        self.unwrap_response(command, &raw)
    }

    fn unwrap_response(&self, command: Command, raw: &[u8]) -> Result<Vec<u8>> {
        if raw.len() < 2 || raw[0] != Command::CHIP_DIRECTION {
            return Err(Error::Framing("response missing D5 direction byte"));
        }
        if raw[1] != command.response_echo() {
            return Err(Error::Framing("response opcode echo mismatch"));
        }
        let payload = &raw[2..];

        if command.carries_status_byte() {
            let Some(&status) = payload.first() else {
                return Err(Error::Framing("status-carrying response has no status byte"));
            };
            if status & 0x3F != 0 {
                return Err(ChipError::from_status_byte(status).into());
            }
            Ok(payload[1..].to_vec())
        } else {
            Ok(payload.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedDriver {
        responses: Vec<Result<Vec<u8>>>,
    }

    impl ScriptedDriver {
        fn once(response: Vec<u8>) -> Self {
            Self { responses: vec![Ok(response)] }
        }

        fn nacks_then(n: u32, response: Vec<u8>) -> Self {
            let mut responses: Vec<Result<Vec<u8>>> =
                (0..n).map(|_| Err(Error::Nack)).collect();
            responses.push(Ok(response));
            Self { responses }
        }
    }

    impl Driver for ScriptedDriver {
        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn transceive(&mut self, _tx: &[u8], _timeout: Duration) -> Result<Vec<u8>> {
            if self.responses.is_empty() {
                panic!("transceive called more times than scripted");
            }
            self.responses.remove(0)
        }

        fn abort(&mut self) -> Result<()> {
            Ok(())
        }

        fn idle(&mut self) -> Result<()> {
            Ok(())
        }

        fn strerror(&self) -> String {
            "no error".into()
        }
    }

    #[test]
    fn retries_up_to_max_nack_retries() {
        let driver = ScriptedDriver::nacks_then(3, vec![0xD5, 0x03, 0x32, 0x01]);
        let mut engine = Engine::new(Box::new(driver));
        let result = engine.command(Command::GetFirmwareVersion, &[], Duration::from_secs(1));
        assert_eq!(result.unwrap(), vec![0x32, 0x01]);
    }

    #[test]
    fn exhausted_nack_retries_surfaces_error() {
        let driver = ScriptedDriver::nacks_then(4, vec![0xD5, 0x03]);
        let mut engine = Engine::new(Box::new(driver));
        let result = engine.command(Command::GetFirmwareVersion, &[], Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[test]
    fn ack_mismatch_is_not_retried() {
        let driver = ScriptedDriver { responses: vec![Err(Error::AckMismatch), Ok(vec![0xD5, 0x03])] };
        let mut engine = Engine::new(Box::new(driver));
        let result = engine.command(Command::GetFirmwareVersion, &[], Duration::from_secs(1));
        assert!(matches!(result, Err(Error::AckMismatch)));
    }

    #[test]
    fn io_error_is_not_retried() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let driver = ScriptedDriver { responses: vec![Err(Error::Io(io_err)), Ok(vec![0xD5, 0x03])] };
        let mut engine = Engine::new(Box::new(driver));
        let result = engine.command(Command::GetFirmwareVersion, &[], Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn timeout_is_not_retried() {
        let driver = ScriptedDriver { responses: vec![Err(Error::Timeout), Ok(vec![0xD5, 0x03])] };
        let mut engine = Engine::new(Box::new(driver));
        let result = engine.command(Command::GetFirmwareVersion, &[], Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[test]
    fn classifies_chip_status_byte() {
        let driver = ScriptedDriver::once(vec![0xD5, 0x41, 0x01]);
        let mut engine = Engine::new(Box::new(driver));
        let result = engine.command(Command::InDataExchange, &[], Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Chip(ChipError::Timeout))));
    }

    #[test]
    fn rejects_mismatched_echo() {
        let driver = ScriptedDriver::once(vec![0xD5, 0x99]);
        let mut engine = Engine::new(Box::new(driver));
        let result = engine.command(Command::GetFirmwareVersion, &[], Duration::from_secs(1));
        assert!(result.is_err());
    }
}
