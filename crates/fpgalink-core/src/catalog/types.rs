//! Catalog entry types

use std::fmt;

/// How a cable talks to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
pub enum TransportKind {
    /// FTDI chip driven through MPSSE
    FtdiSerial,
    /// FTDI chip driven in synchronous bitbang mode
    FtdiBitbang,
    /// CMSIS-DAP probe
    CmsisDap,
    /// DirtyJTAG firmware
    DirtyJtag,
    /// Altera USB-Blaster family
    UsbBlaster,
    /// Segger J-Link
    JLink,
    /// WCH CH347 in JTAG mode
    Ch347,
    /// Anything else
    Other,
}

impl TransportKind {
    /// Whether FTDI-only settings (channel, serial filter) apply
    pub fn is_ftdi(self) -> bool {
        matches!(self, TransportKind::FtdiSerial | TransportKind::FtdiBitbang)
    }

    /// Short display name
    pub fn name(self) -> &'static str {
        match self {
            TransportKind::FtdiSerial => "ftdi-serial",
            TransportKind::FtdiBitbang => "ftdi-bitbang",
            TransportKind::CmsisDap => "cmsis-dap",
            TransportKind::DirtyJtag => "dirtyjtag",
            TransportKind::UsbBlaster => "usb-blaster",
            TransportKind::JLink => "jlink",
            TransportKind::Ch347 => "ch347",
            TransportKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// FTDI interface/channel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
pub enum FtdiChannel {
    /// Channel A (default)
    #[default]
    A,
    /// Channel B
    B,
    /// Channel C
    C,
    /// Channel D
    D,
}

impl FtdiChannel {
    /// Map a channel number (0-3) to a channel
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(FtdiChannel::A),
            1 => Some(FtdiChannel::B),
            2 => Some(FtdiChannel::C),
            3 => Some(FtdiChannel::D),
            _ => None,
        }
    }

    /// Get the channel index (0-3)
    pub fn index(&self) -> u8 {
        match self {
            FtdiChannel::A => 0,
            FtdiChannel::B => 1,
            FtdiChannel::C => 2,
            FtdiChannel::D => 3,
        }
    }

    /// Get the channel letter
    pub fn letter(&self) -> char {
        match self {
            FtdiChannel::A => 'A',
            FtdiChannel::B => 'B',
            FtdiChannel::C => 'C',
            FtdiChannel::D => 'D',
        }
    }
}

/// JTAG pin assignment, used by bitbang cables
///
/// Values are bit numbers on the adapter's data bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub struct JtagPins {
    /// TDI pin
    pub tdi: u8,
    /// TDO pin
    pub tdo: u8,
    /// TCK pin
    pub tck: u8,
    /// TMS pin
    pub tms: u8,
}

/// A named cable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CableProfile {
    /// Vendor ID
    pub vendor_id: u16,
    /// Product ID
    pub product_id: u16,
    /// Transport kind
    pub kind: TransportKind,
    /// Default FTDI channel (FTDI kinds only)
    pub channel: Option<FtdiChannel>,
    /// Default pin mapping (bitbang cables)
    pub pins: JtagPins,
}

/// A named board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardProfile {
    /// Name of the cable wired on the board
    pub cable: String,
    /// Pin mapping
    pub pins: JtagPins,
    /// Default JTAG frequency in Hz, 0 when the board has none
    pub default_frequency: u32,
    /// FPGA manufacturer, `"none"` when unspecified
    pub manufacturer: String,
    /// Exact FPGA part, needed by some flash writers
    pub fpga_part: Option<String>,
}

/// A known FPGA idcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpgaModel {
    /// Manufacturer key, matched exactly when binding a backend
    pub manufacturer: String,
    /// Device family
    pub family: String,
    /// Device model
    pub model: String,
    /// Instruction register length in bits
    pub ir_length: u8,
}

/// A known non-FPGA JTAG idcode (CPU debug ports, CPLD companions...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiscDevice {
    /// Device name
    pub name: String,
    /// Instruction register length in bits
    pub ir_length: u8,
}
