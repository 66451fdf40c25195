//! Configuration resolution
//!
//! Merges board defaults, cable defaults and explicit overrides into one
//! [`ResolvedConfiguration`]. Resolution either succeeds completely or fails
//! with a [`ConfigError`] before any hardware is touched.
//!
//! Precedence, in order:
//!
//! 1. an unknown board is an error
//! 2. the board supplies pins (unless a full pin set was given) and a cable
//!    (unless one was named)
//! 3. with no cable at all, [`DEFAULT_CABLE`] is used
//! 4. frequency: explicit, then board default, then [`DEFAULT_FREQUENCY`];
//!    zero at any tier defers to the next one
//! 5. FTDI channel and serial filters are only legal on FTDI cables
//! 6. VID, PID, bus, device and cable index overrides replace the cable values

use bitflags::bitflags;

use crate::catalog::{Catalog, CableProfile, FtdiChannel, JtagPins, TransportKind};
use crate::error::ConfigError;

/// Cable used when neither a board nor a cable was given
pub const DEFAULT_CABLE: &str = "ft2232";

/// JTAG frequency used when neither the caller nor the board sets one (Hz)
pub const DEFAULT_FREQUENCY: u32 = 6_000_000;

bitflags! {
    /// Operations requested by the caller
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Operations: u8 {
        /// Write the bitstream to non-volatile flash
        const FLASH_WRITE = 1 << 0;
        /// Load the bitstream to SRAM
        const SRAM_WRITE = 1 << 1;
        /// Dump flash contents to a file
        const FLASH_DUMP = 1 << 2;
        /// Target the external flash of a device that has both
        const EXTERNAL_FLASH = 1 << 3;
    }
}

/// What the backend will be asked to do with the bitstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramOperation {
    /// Load to SRAM (volatile)
    #[default]
    WriteSram,
    /// Program non-volatile flash
    WriteFlash,
    /// Read flash back
    DumpFlash,
}

impl ProgramOperation {
    /// Select the operation from the requested flags
    ///
    /// Flash write wins over SRAM write, which wins over dump; external flash
    /// alone implies a flash write. With nothing selected, SRAM load is used.
    pub fn from_operations(ops: Operations) -> Result<Self, ConfigError> {
        let exclusive = ops & (Operations::FLASH_WRITE | Operations::SRAM_WRITE | Operations::FLASH_DUMP);
        if exclusive.bits().count_ones() > 1 {
            return Err(ConfigError::ConflictingOperations);
        }

        let op = if ops.contains(Operations::FLASH_WRITE) {
            ProgramOperation::WriteFlash
        } else if ops.contains(Operations::SRAM_WRITE) {
            ProgramOperation::WriteSram
        } else if ops.contains(Operations::FLASH_DUMP) {
            ProgramOperation::DumpFlash
        } else if ops.contains(Operations::EXTERNAL_FLASH) {
            ProgramOperation::WriteFlash
        } else {
            ProgramOperation::WriteSram
        };
        Ok(op)
    }
}

/// Concrete cable settings handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CableConfig {
    /// Vendor ID
    pub vendor_id: u16,
    /// Product ID
    pub product_id: u16,
    /// FTDI channel, `None` on non-FTDI cables
    pub channel: Option<FtdiChannel>,
    /// USB bus number filter
    pub bus_address: Option<u8>,
    /// USB device address filter
    pub device_address: Option<u8>,
    /// Probe index among identical probes
    pub cable_index: Option<i16>,
    /// Transport kind
    pub kind: TransportKind,
}

impl CableConfig {
    /// Start from a catalog cable
    pub fn from_profile(profile: &CableProfile) -> Self {
        Self {
            vendor_id: profile.vendor_id,
            product_id: profile.product_id,
            channel: if profile.kind.is_ftdi() {
                Some(profile.channel.unwrap_or_default())
            } else {
                None
            },
            bus_address: None,
            device_address: None,
            cable_index: None,
            kind: profile.kind,
        }
    }

    /// Set the FTDI channel, rejecting non-FTDI cables
    pub fn set_channel(&mut self, name: &str, channel: FtdiChannel) -> Result<(), ConfigError> {
        if !self.kind.is_ftdi() {
            return Err(ConfigError::FtdiChannelNotSupported(name.to_string()));
        }
        self.channel = Some(channel);
        Ok(())
    }
}

/// Everything the caller asked for, before merging with the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigRequest {
    /// Board name
    pub board: Option<String>,
    /// Cable name
    pub cable: Option<String>,
    /// Full pin set
    pub pins: Option<JtagPins>,
    /// JTAG frequency in Hz, `Some(0)` counts as unset
    pub frequency: Option<u32>,
    /// FTDI channel number (0-3)
    pub ftdi_channel: Option<u8>,
    /// FTDI serial number filter
    pub ftdi_serial: Option<String>,
    /// Vendor ID override
    pub vendor_id: Option<u16>,
    /// Product ID override
    pub product_id: Option<u16>,
    /// USB bus number
    pub bus_address: Option<u8>,
    /// USB device address
    pub device_address: Option<u8>,
    /// Probe index among identical probes
    pub cable_index: Option<i16>,
    /// Exact FPGA part
    pub fpga_part: Option<String>,
    /// Requested operations
    pub operations: Operations,
}

/// The merged configuration used for the rest of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfiguration {
    /// Name of the selected cable
    pub cable_name: String,
    /// Cable settings
    pub cable: CableConfig,
    /// Pin mapping
    pub pins: JtagPins,
    /// JTAG frequency in Hz
    pub frequency: u32,
    /// Exact FPGA part
    pub fpga_part: Option<String>,
    /// FTDI serial number filter
    pub ftdi_serial: Option<String>,
    /// Board the configuration came from
    pub board: Option<String>,
    /// Selected operation
    pub operation: ProgramOperation,
    /// Target the external flash
    pub external_flash: bool,
}

/// Resolve a request against the catalog
pub fn resolve(
    catalog: &Catalog,
    request: &ConfigRequest,
) -> Result<ResolvedConfiguration, ConfigError> {
    let operation = ProgramOperation::from_operations(request.operations)?;

    let board = match &request.board {
        Some(name) => Some(
            catalog
                .board(name)
                .ok_or_else(|| ConfigError::UnknownBoard(name.clone()))?,
        ),
        None => None,
    };

    let mut cable_name = request.cable.clone();
    let mut pins = request.pins.unwrap_or_default();
    let mut fpga_part = request.fpga_part.clone();
    let mut frequency = request.frequency.filter(|f| *f != 0);

    if let Some(board) = board {
        if request.pins.is_none() {
            pins = board.pins;
        }

        if catalog.cable(&board.cable).is_some() {
            match &cable_name {
                None => cable_name = Some(board.cable.clone()),
                Some(name) => log::info!("Board default cable overridden with {}", name),
            }
        }

        match (&board.fpga_part, &fpga_part) {
            (Some(_), Some(part)) => log::info!("Board default fpga part overridden with {}", part),
            (Some(part), None) => fpga_part = Some(part.clone()),
            _ => {}
        }

        if frequency.is_none() && board.default_frequency != 0 {
            frequency = Some(board.default_frequency);
        }
    }

    let cable_name = cable_name.unwrap_or_else(|| {
        log::warn!(
            "No cable or board specified: using direct {} interface",
            DEFAULT_CABLE
        );
        DEFAULT_CABLE.to_string()
    });

    let profile = catalog
        .cable(&cable_name)
        .ok_or_else(|| ConfigError::UnknownCable(cable_name.clone()))?;

    if request.pins.is_none() && board.is_none() {
        pins = profile.pins;
    }

    let mut cable = CableConfig::from_profile(profile);

    if let Some(index) = request.ftdi_channel {
        let channel = FtdiChannel::from_index(index).ok_or(ConfigError::InvalidFtdiChannel(index))?;
        cable.set_channel(&cable_name, channel)?;
    }

    if request.ftdi_serial.is_some() && !cable.kind.is_ftdi() {
        return Err(ConfigError::FtdiSerialNotSupported(cable_name));
    }

    apply_usb_overrides(&mut cable, request);

    Ok(ResolvedConfiguration {
        cable_name,
        cable,
        pins,
        frequency: frequency.unwrap_or(DEFAULT_FREQUENCY),
        fpga_part,
        ftdi_serial: request.ftdi_serial.clone(),
        board: request.board.clone(),
        operation,
        external_flash: request.operations.contains(Operations::EXTERNAL_FLASH),
    })
}

fn apply_usb_overrides(cable: &mut CableConfig, request: &ConfigRequest) {
    if let Some(vid) = request.vendor_id {
        if vid != cable.vendor_id {
            log::info!("Cable VID overridden: 0x{:04x} -> 0x{:04x}", cable.vendor_id, vid);
        }
        cable.vendor_id = vid;
    }
    if let Some(pid) = request.product_id {
        if pid != cable.product_id {
            log::info!("Cable PID overridden: 0x{:04x} -> 0x{:04x}", cable.product_id, pid);
        }
        cable.product_id = pid;
    }
    if let Some(bus) = request.bus_address {
        if cable.bus_address != Some(bus) {
            log::info!("Cable bus address set to {}", bus);
        }
        cable.bus_address = Some(bus);
    }
    if let Some(dev) = request.device_address {
        if cable.device_address != Some(dev) {
            log::info!("Cable device address set to {}", dev);
        }
        cable.device_address = Some(dev);
    }
    if let Some(index) = request.cable_index {
        if cable.cable_index != Some(index) {
            log::info!("Cable index set to {}", index);
        }
        cable.cable_index = Some(index);
    }
}

// ============================================================================
// Value parsers
// ============================================================================

/// Parse a frequency in Hz, accepting `k`/`K` and `m`/`M` suffixes
///
/// `"6M"` is 6 MHz, `"2.5k"` is 2500 Hz. Values below 1 Hz are rejected.
pub fn parse_frequency(s: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::InvalidFrequency(s.to_string());
    let s = s.trim();

    let (number, scale) = match s.chars().last() {
        Some('k') | Some('K') => (&s[..s.len() - 1], 1e3),
        Some('m') | Some('M') => (&s[..s.len() - 1], 1e6),
        Some(_) => (s, 1.0),
        None => return Err(invalid()),
    };

    let base: f64 = number.parse().map_err(|_| invalid())?;
    let freq = base * scale;
    if !freq.is_finite() || freq < 1.0 || freq > u32::MAX as f64 {
        return Err(invalid());
    }
    Ok(freq as u32)
}

/// FT232R pin names accepted in pin specifications
const FT232R_PINS: &[(&str, u8)] = &[
    ("TXD", 0),
    ("RXD", 1),
    ("RTS", 2),
    ("CTS", 3),
    ("DTR", 4),
    ("DSR", 5),
    ("DCD", 6),
    ("RI", 7),
];

fn parse_pin(s: &str) -> Result<u8, ConfigError> {
    if let Ok(n) = parse_u8(s) {
        return Ok(n);
    }
    FT232R_PINS
        .iter()
        .find(|(name, _)| *name == s)
        .map(|(_, bit)| *bit)
        .ok_or_else(|| ConfigError::InvalidPins(format!("invalid pin name '{}'", s)))
}

/// Parse a `TDI:TDO:TCK:TMS` pin specification
pub fn parse_pins(s: &str) -> Result<JtagPins, ConfigError> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 4 {
        return Err(ConfigError::InvalidPins("pin config needs 4 pins".to_string()));
    }
    Ok(JtagPins {
        tdi: parse_pin(parts[0])?,
        tdo: parse_pin(parts[1])?,
        tck: parse_pin(parts[2])?,
        tms: parse_pin(parts[3])?,
    })
}

/// Parse a `bus:device` pair, decimal or `0x` hex
pub fn parse_bus_device(s: &str) -> Result<(u8, u8), ConfigError> {
    let invalid = || ConfigError::InvalidBusDevice(s.to_string());
    let (bus, dev) = s.split_once(':').ok_or_else(invalid)?;
    Ok((
        parse_u8(bus).map_err(|_| invalid())?,
        parse_u8(dev).map_err(|_| invalid())?,
    ))
}

fn parse_u8(s: &str) -> Result<u8, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        s.parse::<u8>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .load_ron(
                r#"
                (
                    cables: {
                        "x": (vid: 0x0403, pid: 0x6010, kind: FtdiSerial, channel: Some(A)),
                        "y": (vid: 0x0403, pid: 0x6014, kind: FtdiSerial),
                        "ft2232": (vid: 0x0403, pid: 0x6010, kind: FtdiSerial, channel: Some(A)),
                        "jl": (vid: 0x1366, pid: 0x0105, kind: JLink),
                        "bb": (vid: 0x0403, pid: 0x6001, kind: FtdiBitbang,
                               pins: (tdi: 0, tdo: 3, tck: 2, tms: 1)),
                    },
                    boards: {
                        "B": (cable: "x", frequency: 1000, manufacturer: "xilinx",
                              pins: (tdi: 1, tdo: 2, tck: 3, tms: 4),
                              fpga_part: Some("xc7a35tcsg324")),
                        "nofreq": (cable: "x"),
                    },
                )
                "#,
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_board_default_frequency_survives_cable_override() {
        let catalog = fixture();
        let request = ConfigRequest {
            board: Some("B".into()),
            cable: Some("y".into()),
            ..Default::default()
        };
        let resolved = resolve(&catalog, &request).unwrap();
        assert_eq!(resolved.cable_name, "y");
        assert_eq!(resolved.frequency, 1000);
        assert_eq!(resolved.cable.product_id, 0x6014);
    }

    #[test]
    fn test_board_defaults() {
        let catalog = fixture();
        let request = ConfigRequest {
            board: Some("B".into()),
            ..Default::default()
        };
        let resolved = resolve(&catalog, &request).unwrap();
        assert_eq!(resolved.cable_name, "x");
        assert_eq!(resolved.pins, JtagPins { tdi: 1, tdo: 2, tck: 3, tms: 4 });
        assert_eq!(resolved.fpga_part.as_deref(), Some("xc7a35tcsg324"));
        assert_eq!(resolved.operation, ProgramOperation::WriteSram);
    }

    #[test]
    fn test_explicit_values_win() {
        let catalog = fixture();
        let pins = JtagPins { tdi: 7, tdo: 6, tck: 5, tms: 4 };
        let request = ConfigRequest {
            board: Some("B".into()),
            pins: Some(pins),
            frequency: Some(2_000_000),
            fpga_part: Some("xc7a35tcpg236".into()),
            ..Default::default()
        };
        let resolved = resolve(&catalog, &request).unwrap();
        assert_eq!(resolved.pins, pins);
        assert_eq!(resolved.frequency, 2_000_000);
        assert_eq!(resolved.fpga_part.as_deref(), Some("xc7a35tcpg236"));
    }

    #[test]
    fn test_zero_frequency_defers() {
        let catalog = fixture();
        let request = ConfigRequest {
            board: Some("nofreq".into()),
            frequency: Some(0),
            ..Default::default()
        };
        assert_eq!(resolve(&catalog, &request).unwrap().frequency, DEFAULT_FREQUENCY);

        let request = ConfigRequest {
            board: Some("B".into()),
            frequency: Some(0),
            ..Default::default()
        };
        assert_eq!(resolve(&catalog, &request).unwrap().frequency, 1000);
    }

    #[test]
    fn test_default_cable() {
        let catalog = fixture();
        let resolved = resolve(&catalog, &ConfigRequest::default()).unwrap();
        assert_eq!(resolved.cable_name, DEFAULT_CABLE);
        assert_eq!(resolved.frequency, DEFAULT_FREQUENCY);
        assert_eq!(resolved.cable.channel, Some(FtdiChannel::A));
    }

    #[test]
    fn test_cable_default_pins_without_board() {
        let catalog = fixture();
        let request = ConfigRequest {
            cable: Some("bb".into()),
            ..Default::default()
        };
        let resolved = resolve(&catalog, &request).unwrap();
        assert_eq!(resolved.pins, JtagPins { tdi: 0, tdo: 3, tck: 2, tms: 1 });
    }

    #[test]
    fn test_unknown_board_and_cable() {
        let catalog = fixture();
        let request = ConfigRequest {
            board: Some("nope".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve(&catalog, &request),
            Err(ConfigError::UnknownBoard("nope".into()))
        );

        let request = ConfigRequest {
            cable: Some("nope".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve(&catalog, &request),
            Err(ConfigError::UnknownCable("nope".into()))
        );
    }

    #[test]
    fn test_ftdi_channel_rules() {
        let catalog = fixture();
        let request = ConfigRequest {
            cable: Some("jl".into()),
            ftdi_channel: Some(1),
            ..Default::default()
        };
        assert_eq!(
            resolve(&catalog, &request),
            Err(ConfigError::FtdiChannelNotSupported("jl".into()))
        );

        let request = ConfigRequest {
            cable: Some("x".into()),
            ftdi_channel: Some(4),
            ..Default::default()
        };
        assert_eq!(
            resolve(&catalog, &request),
            Err(ConfigError::InvalidFtdiChannel(4))
        );

        let request = ConfigRequest {
            cable: Some("x".into()),
            ftdi_channel: Some(3),
            ..Default::default()
        };
        let resolved = resolve(&catalog, &request).unwrap();
        assert_eq!(resolved.cable.channel, Some(FtdiChannel::D));

        let request = ConfigRequest {
            cable: Some("jl".into()),
            ftdi_serial: Some("FT123".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve(&catalog, &request),
            Err(ConfigError::FtdiSerialNotSupported("jl".into()))
        );
    }

    #[test]
    fn test_non_ftdi_cable_has_no_channel() {
        let catalog = fixture();
        let request = ConfigRequest {
            cable: Some("jl".into()),
            ..Default::default()
        };
        assert_eq!(resolve(&catalog, &request).unwrap().cable.channel, None);
    }

    #[test]
    fn test_usb_overrides_apply_last() {
        let catalog = fixture();
        let request = ConfigRequest {
            cable: Some("x".into()),
            vendor_id: Some(0x1234),
            product_id: Some(0x5678),
            bus_address: Some(3),
            device_address: Some(9),
            cable_index: Some(1),
            ..Default::default()
        };
        let cable = resolve(&catalog, &request).unwrap().cable;
        assert_eq!(cable.vendor_id, 0x1234);
        assert_eq!(cable.product_id, 0x5678);
        assert_eq!(cable.bus_address, Some(3));
        assert_eq!(cable.device_address, Some(9));
        assert_eq!(cable.cable_index, Some(1));
        assert_eq!(cable.kind, TransportKind::FtdiSerial);
    }

    #[test]
    fn test_operations() {
        let catalog = fixture();
        let request = ConfigRequest {
            operations: Operations::FLASH_WRITE | Operations::SRAM_WRITE,
            ..Default::default()
        };
        assert_eq!(
            resolve(&catalog, &request),
            Err(ConfigError::ConflictingOperations)
        );

        assert_eq!(
            ProgramOperation::from_operations(Operations::SRAM_WRITE | Operations::FLASH_DUMP),
            Err(ConfigError::ConflictingOperations)
        );
        assert_eq!(
            ProgramOperation::from_operations(Operations::FLASH_DUMP),
            Ok(ProgramOperation::DumpFlash)
        );
        assert_eq!(
            ProgramOperation::from_operations(Operations::EXTERNAL_FLASH),
            Ok(ProgramOperation::WriteFlash)
        );
        assert_eq!(
            ProgramOperation::from_operations(Operations::empty()),
            Ok(ProgramOperation::WriteSram)
        );

        let request = ConfigRequest {
            operations: Operations::FLASH_WRITE | Operations::EXTERNAL_FLASH,
            ..Default::default()
        };
        let resolved = resolve(&catalog, &request).unwrap();
        assert_eq!(resolved.operation, ProgramOperation::WriteFlash);
        assert!(resolved.external_flash);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let catalog = fixture();
        let request = ConfigRequest {
            board: Some("B".into()),
            cable: Some("y".into()),
            ftdi_channel: Some(1),
            vendor_id: Some(0x0403),
            ..Default::default()
        };
        let a = resolve(&catalog, &request).unwrap();
        let b = resolve(&catalog, &request).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!(parse_frequency("6000000"), Ok(6_000_000));
        assert_eq!(parse_frequency("6M"), Ok(6_000_000));
        assert_eq!(parse_frequency("2.5k"), Ok(2500));
        assert_eq!(parse_frequency("1K"), Ok(1000));
        assert!(parse_frequency("0").is_err());
        assert!(parse_frequency("-3").is_err());
        assert!(parse_frequency("10G").is_err());
        assert!(parse_frequency("").is_err());
        assert!(parse_frequency("k").is_err());
    }

    #[test]
    fn test_parse_pins() {
        assert_eq!(
            parse_pins("DCD:CTS:RTS:RI"),
            Ok(JtagPins { tdi: 6, tdo: 3, tck: 2, tms: 7 })
        );
        assert_eq!(
            parse_pins("0:0x3:2:TXD"),
            Ok(JtagPins { tdi: 0, tdo: 3, tck: 2, tms: 0 })
        );
        assert!(parse_pins("1:2:3").is_err());
        assert!(parse_pins("1:2:3:FOO").is_err());
    }

    #[test]
    fn test_parse_bus_device() {
        assert_eq!(parse_bus_device("1:12"), Ok((1, 12)));
        assert_eq!(parse_bus_device("0x2:0x0a"), Ok((2, 10)));
        assert!(parse_bus_device("1").is_err());
        assert!(parse_bus_device("a:b").is_err());
    }
}
