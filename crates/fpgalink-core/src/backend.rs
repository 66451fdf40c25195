//! Manufacturer backend interface
//!
//! Programming algorithms live outside this crate. A driver implements
//! [`Backend`] and registers a constructor for its [`Manufacturer`] in a
//! [`BackendRegistry`]; the chain dispatcher then hands it the open JTAG
//! chain once the target device has been selected.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::catalog::FpgaModel;
use crate::chain::JtagChain;
use crate::config::ProgramOperation;
use crate::error::{BackendError, ConfigError};

/// FPGA manufacturers with a backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Manufacturer {
    /// AMD/Xilinx
    Xilinx,
    /// Intel/Altera
    Altera,
    /// Anlogic
    Anlogic,
    /// Efinix
    Efinix,
    /// Gowin
    Gowin,
    /// Lattice
    Lattice,
    /// Cologne Chip
    CologneChip,
}

impl Manufacturer {
    /// All manufacturers, in display order
    pub const ALL: [Manufacturer; 7] = [
        Manufacturer::Xilinx,
        Manufacturer::Altera,
        Manufacturer::Anlogic,
        Manufacturer::Efinix,
        Manufacturer::Gowin,
        Manufacturer::Lattice,
        Manufacturer::CologneChip,
    ];

    /// Match the catalog manufacturer key exactly (case sensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Catalog manufacturer key
    pub fn name(self) -> &'static str {
        match self {
            Manufacturer::Xilinx => "xilinx",
            Manufacturer::Altera => "altera",
            Manufacturer::Anlogic => "anlogic",
            Manufacturer::Efinix => "efinix",
            Manufacturer::Gowin => "Gowin",
            Manufacturer::Lattice => "lattice",
            Manufacturer::CologneChip => "colognechip",
        }
    }
}

/// Flash chip addressed on boards carrying more than one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetFlash {
    /// First flash chip
    #[default]
    Primary,
    /// Second flash chip
    Secondary,
    /// Both chips, primary bitstream to the first and secondary to the second
    Both,
}

impl TargetFlash {
    /// True when the secondary chip is written or read
    pub fn uses_secondary(self) -> bool {
        matches!(self, TargetFlash::Secondary | TargetFlash::Both)
    }
}

impl std::str::FromStr for TargetFlash {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(TargetFlash::Primary),
            "secondary" => Ok(TargetFlash::Secondary),
            "both" => Ok(TargetFlash::Both),
            _ => Err(ConfigError::InvalidTargetFlash(s.to_string())),
        }
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability interface of a bound manufacturer driver
///
/// Every method either completes or reports a [`BackendError`]; there is no
/// partial success.
pub trait Backend {
    /// Load the configured bitstream
    fn program(&mut self, offset: u32, unprotect: bool) -> Result<(), BackendError>;

    /// Read `size` bytes of flash starting at `offset` into the configured file
    fn dump_flash(&mut self, offset: u32, size: u32) -> Result<(), BackendError>;

    /// Clear flash write protection
    fn unprotect_flash(&mut self) -> Result<(), BackendError>;

    /// Erase the whole flash
    fn bulk_erase_flash(&mut self) -> Result<(), BackendError>;

    /// Set flash block protection bits
    fn protect_flash(&mut self, mask: u32) -> Result<(), BackendError>;

    /// Reconfigure the FPGA
    fn reset(&mut self) -> Result<(), BackendError>;
}

/// Settings handed to a backend constructor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendParams {
    /// Bitstream file
    pub bit_file: Option<PathBuf>,
    /// Secondary bitstream file (dual-boot images)
    pub secondary_bit_file: Option<PathBuf>,
    /// Explicit file type, overriding the extension
    pub file_type: Option<String>,
    /// Exact FPGA part
    pub fpga_part: Option<String>,
    /// SPI-over-JTAG bridge bitstream
    pub bridge_path: Option<PathBuf>,
    /// Selected operation
    pub operation: ProgramOperation,
    /// Verify after writing
    pub verify: bool,
    /// Target external flash
    pub external_flash: bool,
    /// Skip loading the bridge bitstream
    pub skip_load_bridge: bool,
    /// Skip the reset after flash access
    pub skip_reset: bool,
    /// Flash chip(s) to address
    pub target_flash: TargetFlash,
    /// Flash sector to program
    pub flash_sector: Option<String>,
    /// Microcontroller firmware loaded alongside the bitstream
    pub mcufw: Option<PathBuf>,
    /// Board name, for drivers with board-specific wiring
    pub board: Option<String>,
    /// Cable name, for drivers with cable-specific handling
    pub cable_name: String,
}

/// The chain device a backend is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpgaTarget {
    /// Position in the chain
    pub index: usize,
    /// JTAG idcode
    pub idcode: u32,
    /// Catalog entry
    pub model: FpgaModel,
}

/// Builds a backend for a selected device
pub trait BackendFactory {
    /// Construct the driver for `manufacturer`, taking ownership of the chain
    fn create(
        &self,
        manufacturer: Manufacturer,
        target: &FpgaTarget,
        chain: Box<dyn JtagChain>,
        params: &BackendParams,
    ) -> Result<Box<dyn Backend>, BackendError>;
}

/// Backend constructor signature
pub type BackendConstructor = Box<
    dyn Fn(&FpgaTarget, Box<dyn JtagChain>, &BackendParams) -> Result<Box<dyn Backend>, BackendError>,
>;

/// Manufacturer-keyed set of backend constructors
#[derive(Default)]
pub struct BackendRegistry {
    constructors: HashMap<Manufacturer, BackendConstructor>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor for a manufacturer, replacing any earlier one
    pub fn register<F>(&mut self, manufacturer: Manufacturer, constructor: F)
    where
        F: Fn(&FpgaTarget, Box<dyn JtagChain>, &BackendParams) -> Result<Box<dyn Backend>, BackendError>
            + 'static,
    {
        if self
            .constructors
            .insert(manufacturer, Box::new(constructor))
            .is_some()
        {
            log::debug!("Backend for {} replaced", manufacturer);
        }
    }

    /// Check if a manufacturer has a constructor
    pub fn supports(&self, manufacturer: Manufacturer) -> bool {
        self.constructors.contains_key(&manufacturer)
    }

    /// Manufacturers with a registered constructor, in display order
    pub fn manufacturers(&self) -> Vec<Manufacturer> {
        Manufacturer::ALL
            .into_iter()
            .filter(|m| self.supports(*m))
            .collect()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("manufacturers", &self.manufacturers())
            .finish()
    }
}

impl BackendFactory for BackendRegistry {
    fn create(
        &self,
        manufacturer: Manufacturer,
        target: &FpgaTarget,
        chain: Box<dyn JtagChain>,
        params: &BackendParams,
    ) -> Result<Box<dyn Backend>, BackendError> {
        let constructor = self
            .constructors
            .get(&manufacturer)
            .ok_or(BackendError::NoDriver(manufacturer))?;
        log::debug!(
            "Binding {} backend to {} {} at index {}",
            manufacturer,
            target.model.family,
            target.model.model,
            target.index
        );
        constructor(target, chain, params)
    }
}
