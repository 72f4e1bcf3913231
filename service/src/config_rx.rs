//! Configuration endpoint
//!
//! Receives writes to the configuration characteristic. The endpoint checks
//! the length and passes the raw bytes on; it does not parse them.

use std::fmt::Write as _;
use std::sync::Arc;

use shared::{ConfigWriteError, ConfigurationMessage};

use crate::stats::PipelineStats;

/// Consumer of accepted configuration writes
pub trait ConfigInterpreter: Send + Sync + 'static {
    /// Handle one accepted write
    fn interpret(&self, message: &ConfigurationMessage);
}

/// Interpreter that only logs what was written
#[derive(Debug, Default, Clone, Copy)]
pub struct LogInterpreter;

impl ConfigInterpreter for LogInterpreter {
    fn interpret(&self, message: &ConfigurationMessage) {
        log::debug!("Configuration write of {} bytes not interpreted", message.len());
    }
}

/// Validates configuration writes and forwards them
pub struct ConfigEndpoint<I> {
    interpreter: I,
    stats: Arc<PipelineStats>,
}

impl<I: ConfigInterpreter> ConfigEndpoint<I> {
    pub fn new(interpreter: I, stats: Arc<PipelineStats>) -> Self {
        Self { interpreter, stats }
    }

    /// Accept a write, returning the number of bytes taken
    pub fn on_write(&self, data: &[u8]) -> Result<usize, ConfigWriteError> {
        let message = match ConfigurationMessage::new(data) {
            Ok(message) => message,
            Err(e) => {
                self.stats.protocol_violation();
                log::error!("Rejected configuration write: {:?}", e);
                return Err(e);
            }
        };

        log::info!("Received cfg write, len {}, data: 0x{}", message.len(), hex(message.as_bytes()));
        self.interpreter.interpret(&message);
        self.stats.config_accepted(message.len());
        Ok(message.len())
    }
}

fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use shared::CONFIG_WRITE_MAX;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Vec<u8>>>);

    impl ConfigInterpreter for Arc<Recorder> {
        fn interpret(&self, message: &ConfigurationMessage) {
            self.0.lock().unwrap().push(message.as_bytes().to_vec());
        }
    }

    #[test]
    fn test_accepts_and_forwards_raw_bytes() {
        let recorder = Arc::new(Recorder::default());
        let stats = Arc::new(PipelineStats::new());
        let endpoint = ConfigEndpoint::new(recorder.clone(), stats.clone());

        assert_eq!(endpoint.on_write(&[0xDE, 0xAD, 0x01]), Ok(3));
        assert_eq!(*recorder.0.lock().unwrap(), vec![vec![0xDE, 0xAD, 0x01]]);
        assert_eq!(stats.snapshot().config_bytes_accepted, 3);
    }

    #[test]
    fn test_oversized_write_rejected() {
        let recorder = Arc::new(Recorder::default());
        let stats = Arc::new(PipelineStats::new());
        let endpoint = ConfigEndpoint::new(recorder.clone(), stats.clone());

        let result = endpoint.on_write(&vec![0u8; CONFIG_WRITE_MAX + 1]);
        assert!(matches!(result, Err(ConfigWriteError::TooLong { .. })));
        assert!(recorder.0.lock().unwrap().is_empty());
        assert_eq!(stats.snapshot().protocol_violations, 1);
    }

    #[test]
    fn test_hex_rendering() {
        assert_eq!(hex(&[0x00, 0xAB, 0x7F]), "00AB7F");
        assert_eq!(hex(&[]), "");
    }
}
