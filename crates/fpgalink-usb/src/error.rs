//! Error types for USB enumeration

use thiserror::Error;

/// Errors raised while scanning the bus
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The host stack could not list devices
    #[error("failed to list USB devices: {0}")]
    Enumerate(String),

    /// A device descriptor could not be read; this aborts the whole scan
    #[error("failed to get device descriptor for {bus:03}:{address:03}: {reason}")]
    Descriptor {
        /// Bus number
        bus: u8,
        /// Device address
        address: u8,
        /// Host stack message
        reason: String,
    },

    /// The device could not be opened
    #[error("failed to open device: {0}")]
    Open(String),

    /// A string descriptor could not be read
    #[error("failed to read string descriptor: {0}")]
    StringRead(String),
}

impl From<ScanError> for fpgalink_core::Error {
    fn from(e: ScanError) -> Self {
        fpgalink_core::Error::ResourceUnavailable(e.to_string())
    }
}
