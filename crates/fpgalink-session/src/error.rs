//! Session errors

use fpgalink_core::error::ConfigError;
use fpgalink_ftdi::FtdiError;
use fpgalink_usb::ScanError;
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by [`crate::Session`]
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration, chain or backend failure
    #[error(transparent)]
    Core(#[from] fpgalink_core::Error),

    /// USB enumeration failure
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Serial link failure
    #[error(transparent)]
    Ftdi(#[from] FtdiError),

    /// A probe was selected before any scan
    #[error("no USB scan available, scan first")]
    NoScan,

    /// Probe index outside the last scan
    #[error("invalid probe index {index}: last scan found {len} device(s)")]
    InvalidSelection {
        /// Requested index
        index: usize,
        /// Probes in the last scan
        len: usize,
    },
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        SessionError::Core(e.into())
    }
}
