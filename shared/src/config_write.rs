//! # Configuration Writes
//!
//! The peer may write opaque configuration bytes to the configuration
//! characteristic. Only the length is validated here; interpreting the bytes
//! belongs to whoever receives the [`ConfigurationMessage`].

use heapless::Vec;

use crate::CONFIG_WRITE_MAX;

/// Errors raised when accepting a configuration write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigWriteError {
    /// Write is longer than the characteristic accepts
    TooLong {
        /// Bytes written by the peer
        len: usize,
        /// Largest accepted write
        max: usize,
    },
}

/// Opaque configuration payload written by the peer
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigurationMessage {
    data: Vec<u8, CONFIG_WRITE_MAX>,
}

impl ConfigurationMessage {
    /// Copy a write into a message, rejecting oversized writes
    pub fn new(data: &[u8]) -> Result<Self, ConfigWriteError> {
        let mut vec = Vec::new();
        vec.extend_from_slice(data)
            .map_err(|_| ConfigWriteError::TooLong {
                len: data.len(),
                max: CONFIG_WRITE_MAX,
            })?;
        Ok(Self { data: vec })
    }

    /// Raw bytes as written
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes accepted
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the write carried no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_up_to_max() {
        let msg = ConfigurationMessage::new(&[0xAB; CONFIG_WRITE_MAX]).unwrap();
        assert_eq!(msg.len(), CONFIG_WRITE_MAX);

        let empty = ConfigurationMessage::new(&[]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_rejects_oversized_write() {
        let result = ConfigurationMessage::new(&[0u8; CONFIG_WRITE_MAX + 1]);
        assert_eq!(
            result,
            Err(ConfigWriteError::TooLong {
                len: CONFIG_WRITE_MAX + 1,
                max: CONFIG_WRITE_MAX,
            })
        );
    }

    #[test]
    fn test_bytes_preserved() {
        let msg = ConfigurationMessage::new(&[0x01, 0x02, 0xFF]).unwrap();
        assert_eq!(msg.as_bytes(), &[0x01, 0x02, 0xFF]);
    }
}
