//! CLI argument parsing

use clap::{Parser, Subcommand};
use fpgalink_core::backend::TargetFlash;
use fpgalink_core::catalog::JtagPins;
use fpgalink_core::config::{parse_bus_device, parse_frequency, parse_pins};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let value = parse_hex_u32(s)?;
    u16::try_from(value).map_err(|_| format!("Value {} does not fit in 16 bits", s))
}

fn parse_freq(s: &str) -> Result<u32, String> {
    parse_frequency(s).map_err(|e| e.to_string())
}

fn parse_pin_config(s: &str) -> Result<JtagPins, String> {
    parse_pins(s).map_err(|e| e.to_string())
}

fn parse_target_flash(s: &str) -> Result<TargetFlash, String> {
    s.parse::<TargetFlash>().map_err(|e| e.to_string())
}

fn parse_busdev(s: &str) -> Result<(u8, u8), String> {
    parse_bus_device(s).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "fpgalink")]
#[command(author, version, about = "FPGA probe loader", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to an extra catalog file or directory (contains .ron files)
    /// Defaults to looking in ./catalog/ and /usr/share/fpgalink/catalog/
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Probe and target selection shared across commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProbeArgs {
    /// Board name
    #[arg(short, long)]
    pub board: Option<String>,

    /// Cable name
    #[arg(short, long)]
    pub cable: Option<String>,

    /// Use the Nth probe of a fresh USB scan (see scan-usb)
    #[arg(long)]
    pub probe_index: Option<usize>,

    /// FTDI channel number (0-3 for A-D)
    #[arg(long)]
    pub ftdi_channel: Option<u8>,

    /// FTDI chip serial number
    #[arg(long)]
    pub ftdi_serial: Option<String>,

    /// Cable vendor ID (hex or decimal)
    #[arg(long, value_parser = parse_hex_u16)]
    pub vid: Option<u16>,

    /// Cable product ID (hex or decimal)
    #[arg(long, value_parser = parse_hex_u16)]
    pub pid: Option<u16>,

    /// USB bus and device number (bus:device)
    #[arg(long, value_parser = parse_busdev)]
    pub busdev_num: Option<(u8, u8)>,

    /// Probe index among identical probes
    #[arg(long)]
    pub cable_index: Option<i16>,

    /// JTAG frequency in Hz (k and M suffixes accepted)
    #[arg(long, value_parser = parse_freq)]
    pub freq: Option<u32>,

    /// Bitbang pins as TDI:TDO:TCK:TMS (numbers or FT232R pin names)
    #[arg(long, value_parser = parse_pin_config)]
    pub pins: Option<JtagPins>,

    /// Exact FPGA part
    #[arg(long)]
    pub fpga_part: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List attached USB probes
    ScanUsb,

    /// List the devices in the JTAG chain
    Detect {
        #[command(flatten)]
        probe: ProbeArgs,
    },

    /// Load a bitstream or manage flash on the selected FPGA
    Program {
        #[command(flatten)]
        probe: ProbeArgs,

        /// Bitstream file
        bitstream: Option<PathBuf>,

        /// Secondary bitstream file (dual-boot images)
        #[arg(long)]
        secondary_bitstream: Option<PathBuf>,

        /// File type, overriding the extension
        #[arg(long)]
        file_type: Option<String>,

        /// Write to flash
        #[arg(short = 'f', long)]
        write_flash: bool,

        /// Write to SRAM (default)
        #[arg(short = 'm', long)]
        write_sram: bool,

        /// Dump flash contents to the bitstream file
        #[arg(long)]
        dump_flash: bool,

        /// Target the external flash
        #[arg(long)]
        external_flash: bool,

        /// Flash chip on boards with two: primary, secondary or both
        #[arg(long, value_parser = parse_target_flash, default_value = "primary")]
        target_flash: TargetFlash,

        /// Flash sector (Lattice parts only)
        #[arg(long)]
        flash_sector: Option<String>,

        /// Microcontroller firmware (Gowin parts only)
        #[arg(long)]
        mcufw: Option<PathBuf>,

        /// Flash offset (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        offset: u32,

        /// Dump size in bytes (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        file_size: u32,

        /// Verify after writing
        #[arg(long)]
        verify: bool,

        /// Reset the FPGA when done
        #[arg(short, long)]
        reset: bool,

        /// Clear flash write protection
        #[arg(long)]
        unprotect_flash: bool,

        /// Erase the whole flash
        #[arg(long)]
        bulk_erase: bool,

        /// Flash block protection mask (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        protect_flash: u32,

        /// Index of the target device in the JTAG chain
        #[arg(long)]
        index_chain: Option<usize>,

        /// SPI-over-JTAG bridge bitstream
        #[arg(long)]
        bridge: Option<PathBuf>,

        /// Don't load the bridge bitstream
        #[arg(long)]
        skip_load_bridge: bool,

        /// Don't reset the FPGA after flash access
        #[arg(long)]
        skip_reset: bool,
    },

    /// Send one AT command on a cable's serial channel
    Send {
        /// Cable name
        #[arg(short, long)]
        cable: String,

        /// Command text
        command: String,

        /// Append CR LF to the command
        #[arg(long)]
        crlf: bool,
    },

    /// List known cables
    ListCables,

    /// List known boards
    ListBoards,

    /// List known FPGAs
    ListFpga {
        /// Filter by manufacturer
        #[arg(long)]
        manufacturer: Option<String>,
    },
}
