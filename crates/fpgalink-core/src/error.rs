//! Error types for fpgalink-core
//!
//! Errors are grouped the same way callers have to react to them:
//! configuration problems are caught before any hardware is touched,
//! transport and protocol problems come from an opened probe, and backend
//! problems come from the external manufacturer driver.

use thiserror::Error;

use crate::backend::Manufacturer;

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error taxonomy
#[derive(Debug, Error)]
pub enum Error {
    /// USB or driver context could not be created or opened
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Contradictory or out-of-range user/board/cable settings
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Write/read failure on an opened channel
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Chain walk or device selection failure
    #[error(transparent)]
    Protocol(#[from] ChainError),

    /// The bound manufacturer driver failed
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Configuration resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Board name not present in the catalog
    #[error("cannot find board '{0}'")]
    UnknownBoard(String),

    /// Cable name not present in the catalog
    #[error("cable '{0}' not found")]
    UnknownCable(String),

    /// FTDI channel requested on a cable that is not FTDI based
    #[error("FTDI channel param is for FTDI cables ('{0}' is not)")]
    FtdiChannelNotSupported(String),

    /// FTDI serial filter requested on a cable that is not FTDI based
    #[error("FTDI serial param is for FTDI cables ('{0}' is not)")]
    FtdiSerialNotSupported(String),

    /// FTDI channel outside 0-3
    #[error("invalid FTDI channel {0}: valid channels are 0-3")]
    InvalidFtdiChannel(u8),

    /// More than one of flash-write, sram-write and flash-dump selected
    #[error("only one of write-flash, write-sram and dump-flash may be selected")]
    ConflictingOperations,

    /// Flash dump requested without a size
    #[error("0 size for dump")]
    ZeroDumpSize,

    /// Frequency string could not be parsed
    #[error("invalid frequency '{0}'")]
    InvalidFrequency(String),

    /// Pin specification could not be parsed
    #[error("invalid pin configuration: {0}")]
    InvalidPins(String),

    /// Bus/device specification could not be parsed
    #[error("invalid bus:device '{0}': must be numeric values")]
    InvalidBusDevice(String),

    /// Target flash name not one of primary, secondary, both
    #[error("invalid target flash '{0}': must be primary, secondary or both")]
    InvalidTargetFlash(String),

    /// Secondary flash addressed without a secondary bitstream
    #[error("Secondary bitfile not specified")]
    MissingSecondaryBitfile,

    /// Latency timer outside 1-255
    #[error("invalid latency timer {0}: must be 1-255")]
    InvalidLatency(u16),
}

/// Errors raised while moving bytes over an opened channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Fewer bytes were accepted than requested
    #[error("write error: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes accepted by the device
        written: usize,
        /// Bytes requested
        expected: usize,
    },

    /// The write call itself failed
    #[error("write failed: {0}")]
    Write(String),

    /// The read call itself failed
    #[error("read failed: {0}")]
    Read(String),

    /// The device kept returning no data
    #[error("no response after {0} read attempts")]
    RetriesExhausted(u32),
}

/// JTAG chain walk and device selection errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Chain walk returned no device
    #[error("no device found")]
    NoDevice,

    /// No chain entry is a known FPGA
    #[error("no supported device found in JTAG chain")]
    NoSupportedDevice,

    /// More than one chain entry is a known FPGA and no index was given
    #[error("more than one FPGA found ({0} candidates), use --index-chain to force selection")]
    AmbiguousDevices(usize),

    /// Explicit index outside the chain
    #[error("wrong index {index} for device in JTAG chain of {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Chain length
        len: usize,
    },

    /// The selected idcode is not a known FPGA
    #[error("device 0x{0:08x} not supported")]
    UnsupportedDevice(u32),

    /// The selected FPGA's manufacturer has no backend family
    #[error("manufacturer {0} not supported")]
    UnsupportedManufacturer(String),
}

/// Errors reported by a manufacturer backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// No constructor registered for this manufacturer
    #[error("no driver registered for {0}")]
    NoDriver(Manufacturer),

    /// The driver could not claim the device
    #[error("failed to claim FPGA device: {0}")]
    Claim(String),

    /// Programming failed
    #[error("failed to program FPGA: {0}")]
    Program(String),

    /// Flash dump failed
    #[error("failed to dump flash: {0}")]
    Dump(String),

    /// Unprotect, bulk erase or protect returned failure
    #[error("flash {0} failed")]
    Flash(&'static str),

    /// Reset failed
    #[error("failed to reset FPGA: {0}")]
    Reset(String),
}

/// Errors raised while loading catalog data
#[derive(Debug, Error)]
pub enum CatalogError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Semantic validation error
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Short name of the taxonomy bucket, used in log lines
    pub fn category(&self) -> &'static str {
        match self {
            Error::ResourceUnavailable(_) => "resource",
            Error::Config(_) => "configuration",
            Error::Transport(_) => "transport",
            Error::Protocol(_) => "protocol",
            Error::Backend(_) => "backend",
        }
    }
}
