//! Error types for the FTDI transports

use std::fmt;

use fpgalink_core::catalog::TransportKind;
use fpgalink_core::error::TransportError;

/// Result type for FTDI operations
pub type Result<T> = std::result::Result<T, FtdiError>;

/// Errors that can occur during FTDI operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FtdiError {
    /// Failed to open device
    OpenFailed(String),

    /// Failed to configure device
    ConfigFailed(String),

    /// Write call failed
    TransferFailed(String),

    /// Read call failed
    ReadFailed(String),

    /// The device accepted fewer bytes than requested
    ShortWrite {
        /// Bytes accepted
        written: usize,
        /// Bytes requested
        expected: usize,
    },

    /// Every read attempt came back empty
    ReadRetriesExhausted(u32),

    /// Invalid parameter
    InvalidParameter(String),

    /// The cable is not driven by these transports
    UnsupportedTransport(TransportKind),

    /// libftdi error
    LibFtdi(String),
}

impl fmt::Display for FtdiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtdiError::OpenFailed(s) => write!(f, "Failed to open device: {}", s),
            FtdiError::ConfigFailed(s) => write!(f, "Failed to configure device: {}", s),
            FtdiError::TransferFailed(s) => write!(f, "USB transfer failed: {}", s),
            FtdiError::ReadFailed(s) => write!(f, "USB read failed: {}", s),
            FtdiError::ShortWrite { written, expected } => {
                write!(f, "Write error: wrote {} of {} bytes", written, expected)
            }
            FtdiError::ReadRetriesExhausted(n) => {
                write!(f, "No response after {} read attempts", n)
            }
            FtdiError::InvalidParameter(s) => write!(f, "Invalid parameter: {}", s),
            FtdiError::UnsupportedTransport(kind) => {
                write!(f, "Transport {} is not supported by the FTDI driver", kind)
            }
            FtdiError::LibFtdi(s) => write!(f, "libftdi error: {}", s),
        }
    }
}

impl std::error::Error for FtdiError {}

#[cfg(feature = "std")]
impl From<ftdi::Error> for FtdiError {
    fn from(e: ftdi::Error) -> Self {
        FtdiError::LibFtdi(e.to_string())
    }
}

impl From<FtdiError> for fpgalink_core::Error {
    fn from(e: FtdiError) -> Self {
        match e {
            FtdiError::ShortWrite { written, expected } => {
                TransportError::ShortWrite { written, expected }.into()
            }
            FtdiError::ReadRetriesExhausted(n) => TransportError::RetriesExhausted(n).into(),
            FtdiError::TransferFailed(s) => TransportError::Write(s).into(),
            FtdiError::ReadFailed(s) => TransportError::Read(s).into(),
            other => fpgalink_core::Error::ResourceUnavailable(other.to_string()),
        }
    }
}
