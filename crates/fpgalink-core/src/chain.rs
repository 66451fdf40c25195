//! JTAG chain dispatch
//!
//! A run goes through four states, each a distinct type so a step cannot be
//! skipped:
//!
//! ```text
//! OpenedChain --walk()--> WalkedChain --select()--> SelectedDevice
//!     --bind()--> BoundBackend --execute()--> done
//! ```
//!
//! Detect-only runs stop at [`WalkedChain`] and report the chain listing.

use std::path::PathBuf;

use crate::backend::{Backend, BackendFactory, BackendParams, FpgaTarget, Manufacturer, TargetFlash};
use crate::catalog::{Catalog, FpgaModel, MiscDevice};
use crate::config::{ProgramOperation, ResolvedConfiguration};
use crate::error::{ChainError, ConfigError, Result};
use crate::VerboseLevel;

/// A JTAG transport able to report the chain and address one device
pub trait JtagChain {
    /// Walk the chain and return the idcodes in scan order
    fn idcodes(&mut self) -> Result<Vec<u32>>;

    /// Address the device at `index` for subsequent operations
    fn select_device(&mut self, index: usize) -> Result<()>;
}

/// Opens a JTAG transport for a resolved configuration
pub trait JtagOpener {
    /// Open the cable described by `config`
    fn open(
        &self,
        config: &ResolvedConfiguration,
        verbosity: VerboseLevel,
    ) -> Result<Box<dyn JtagChain>>;
}

/// One device in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainEntry {
    /// Position in scan order, starting at 0
    pub index: usize,
    /// JTAG idcode (0 for a device in BYPASS)
    pub idcode: u32,
}

/// What the catalog knows about a chain entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind<'a> {
    /// Known FPGA
    Fpga(&'a FpgaModel),
    /// Known non-FPGA device
    Misc(&'a MiscDevice),
    /// Not in any table
    Unknown,
}

impl ChainEntry {
    /// Look the idcode up in the FPGA and misc tables
    pub fn classify<'a>(&self, catalog: &'a Catalog) -> EntryKind<'a> {
        if let Some(model) = catalog.fpga(self.idcode) {
            EntryKind::Fpga(model)
        } else if let Some(misc) = catalog.misc_device(self.idcode) {
            EntryKind::Misc(misc)
        } else {
            EntryKind::Unknown
        }
    }
}

/// Log every entry of a chain, known or not
pub fn log_chain(entries: &[ChainEntry], catalog: &Catalog) {
    for entry in entries {
        match entry.classify(catalog) {
            EntryKind::Fpga(model) => log::info!(
                "index {}: idcode 0x{:08x} manufacturer {} family {} model {} irlength {}",
                entry.index,
                entry.idcode,
                model.manufacturer,
                model.family,
                model.model,
                model.ir_length
            ),
            EntryKind::Misc(misc) => log::info!(
                "index {}: idcode 0x{:08x} type {} irlength {}",
                entry.index,
                entry.idcode,
                misc.name,
                misc.ir_length
            ),
            EntryKind::Unknown => {
                log::info!("index {}: idcode 0x{:08x} unknown", entry.index, entry.idcode)
            }
        }
    }
}

// ============================================================================
// Requested actions
// ============================================================================

/// What to do with the selected device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramRequest {
    /// Bitstream file
    pub bit_file: Option<PathBuf>,
    /// Secondary bitstream file
    pub secondary_bit_file: Option<PathBuf>,
    /// Explicit file type
    pub file_type: Option<String>,
    /// SPI-over-JTAG bridge bitstream
    pub bridge_path: Option<PathBuf>,
    /// Flash offset for write and dump
    pub offset: u32,
    /// Dump size in bytes
    pub file_size: u32,
    /// Verify after writing
    pub verify: bool,
    /// Reset the FPGA at the end
    pub reset: bool,
    /// Clear flash protection
    pub unprotect_flash: bool,
    /// Erase the whole flash
    pub bulk_erase_flash: bool,
    /// Flash block protection mask, 0 leaves protection alone
    pub protect_mask: u32,
    /// Explicit chain index
    pub index_chain: Option<usize>,
    /// Only list the chain
    pub detect: bool,
    /// Skip loading the bridge bitstream
    pub skip_load_bridge: bool,
    /// Skip the reset after flash access
    pub skip_reset: bool,
    /// Flash chip(s) to address
    pub target_flash: TargetFlash,
    /// Flash sector to program
    pub flash_sector: Option<String>,
    /// Microcontroller firmware
    pub mcufw: Option<PathBuf>,
}

impl ProgramRequest {
    /// Reject requests that can be refused before touching hardware
    pub fn validate(&self, operation: ProgramOperation) -> std::result::Result<(), ConfigError> {
        if operation == ProgramOperation::DumpFlash && self.file_size == 0 {
            return Err(ConfigError::ZeroDumpSize);
        }

        // Flash maintenance alone needs no secondary image
        let flash_access = matches!(
            operation,
            ProgramOperation::WriteFlash | ProgramOperation::DumpFlash
        );
        let maintenance = self.protect_mask != 0 || self.unprotect_flash || self.bulk_erase_flash;
        if self.target_flash.uses_secondary()
            && flash_access
            && self.secondary_bit_file.is_none()
            && !maintenance
        {
            return Err(ConfigError::MissingSecondaryBitfile);
        }

        Ok(())
    }

    /// Check if any bitstream input was given
    pub fn has_bitstream(&self) -> bool {
        self.bit_file.is_some() || self.secondary_bit_file.is_some() || self.file_type.is_some()
    }

    /// Constructor parameters for the backend
    pub fn backend_params(&self, config: &ResolvedConfiguration) -> BackendParams {
        BackendParams {
            bit_file: self.bit_file.clone(),
            secondary_bit_file: self.secondary_bit_file.clone(),
            file_type: self.file_type.clone(),
            fpga_part: config.fpga_part.clone(),
            bridge_path: self.bridge_path.clone(),
            operation: config.operation,
            verify: self.verify,
            external_flash: config.external_flash,
            skip_load_bridge: self.skip_load_bridge,
            skip_reset: self.skip_reset,
            target_flash: self.target_flash,
            flash_sector: self.flash_sector.clone(),
            mcufw: self.mcufw.clone(),
            board: config.board.clone(),
            cable_name: config.cable_name.clone(),
        }
    }
}

// ============================================================================
// States
// ============================================================================

/// A freshly opened transport
pub struct OpenedChain<'c> {
    chain: Box<dyn JtagChain>,
    catalog: &'c Catalog,
    verbosity: VerboseLevel,
}

impl<'c> OpenedChain<'c> {
    /// Wrap an open transport
    pub fn new(chain: Box<dyn JtagChain>, catalog: &'c Catalog, verbosity: VerboseLevel) -> Self {
        Self {
            chain,
            catalog,
            verbosity,
        }
    }

    /// Read the chain
    ///
    /// The listing is logged when verbose or when `detect` is set.
    pub fn walk(mut self, detect: bool) -> Result<WalkedChain<'c>> {
        let idcodes = self.chain.idcodes()?;
        if idcodes.is_empty() {
            return Err(ChainError::NoDevice.into());
        }

        let entries: Vec<ChainEntry> = idcodes
            .into_iter()
            .enumerate()
            .map(|(index, idcode)| ChainEntry { index, idcode })
            .collect();
        log::debug!("JTAG chain has {} device(s)", entries.len());

        if detect || self.verbosity.is_verbose() {
            log_chain(&entries, self.catalog);
        }

        Ok(WalkedChain {
            chain: self.chain,
            catalog: self.catalog,
            entries,
        })
    }
}

/// A chain whose devices are known
pub struct WalkedChain<'c> {
    chain: Box<dyn JtagChain>,
    catalog: &'c Catalog,
    entries: Vec<ChainEntry>,
}

impl<'c> WalkedChain<'c> {
    /// All entries in scan order
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Entries found in the FPGA table
    pub fn fpgas(&self) -> impl Iterator<Item = (ChainEntry, &'c FpgaModel)> + '_ {
        let catalog = self.catalog;
        self.entries
            .iter()
            .filter_map(move |e| catalog.fpga(e.idcode).map(|m| (*e, m)))
    }

    /// Give up the transport and keep the listing
    pub fn into_entries(self) -> Vec<ChainEntry> {
        self.entries
    }

    /// Fix the target device
    ///
    /// An explicit index must lie inside the chain. Without one, exactly one
    /// entry must be a known FPGA.
    pub fn select(mut self, index: Option<usize>) -> Result<SelectedDevice<'c>> {
        let entry = match index {
            Some(index) => *self.entries.get(index).ok_or(ChainError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })?,
            None => {
                let candidates: Vec<ChainEntry> = self.fpgas().map(|(e, _)| e).collect();
                match candidates.as_slice() {
                    [] => return Err(ChainError::NoSupportedDevice.into()),
                    [one] => *one,
                    many => return Err(ChainError::AmbiguousDevices(many.len()).into()),
                }
            }
        };

        self.chain.select_device(entry.index)?;
        log::debug!("Selected device 0x{:08x} at index {}", entry.idcode, entry.index);

        Ok(SelectedDevice {
            chain: self.chain,
            catalog: self.catalog,
            entry,
        })
    }
}

/// A chain with its target device fixed
pub struct SelectedDevice<'c> {
    chain: Box<dyn JtagChain>,
    catalog: &'c Catalog,
    entry: ChainEntry,
}

impl SelectedDevice<'_> {
    /// The selected entry
    pub fn entry(&self) -> ChainEntry {
        self.entry
    }

    /// Hand the chain to the manufacturer backend
    pub fn bind(self, factory: &dyn BackendFactory, params: &BackendParams) -> Result<BoundBackend> {
        let idcode = self.entry.idcode;
        let model = self
            .catalog
            .fpga(idcode)
            .ok_or(ChainError::UnsupportedDevice(idcode))?;
        let manufacturer = Manufacturer::from_name(&model.manufacturer)
            .ok_or_else(|| ChainError::UnsupportedManufacturer(model.manufacturer.clone()))?;

        let target = FpgaTarget {
            index: self.entry.index,
            idcode,
            model: model.clone(),
        };
        let backend = factory.create(manufacturer, &target, self.chain, params)?;

        Ok(BoundBackend {
            backend,
            target,
            operation: params.operation,
        })
    }
}

/// A device with its driver attached
pub struct BoundBackend {
    backend: Box<dyn Backend>,
    target: FpgaTarget,
    operation: ProgramOperation,
}

impl BoundBackend {
    /// The bound device
    pub fn target(&self) -> &FpgaTarget {
        &self.target
    }

    /// Run the requested actions in order: program, unprotect, bulk erase,
    /// protect, dump, reset
    pub fn execute(mut self, request: &ProgramRequest) -> Result<FpgaTarget> {
        let dump = self.operation == ProgramOperation::DumpFlash;

        if request.has_bitstream() && !dump {
            log::info!("Programming {} {}", self.target.model.family, self.target.model.model);
            self.backend.program(request.offset, request.unprotect_flash)?;
        }

        if request.unprotect_flash && request.bit_file.is_none() {
            self.backend.unprotect_flash()?;
        }

        if request.bulk_erase_flash && request.bit_file.is_none() {
            self.backend.bulk_erase_flash()?;
        }

        if request.protect_mask != 0 {
            self.backend.protect_flash(request.protect_mask)?;
        }

        if dump {
            log::info!(
                "Dumping {} bytes of flash from offset 0x{:x}",
                request.file_size,
                request.offset
            );
            self.backend.dump_flash(request.offset, request.file_size)?;
        }

        if request.reset {
            self.backend.reset()?;
        }

        Ok(self.target)
    }
}

// ============================================================================
// Whole run
// ============================================================================

/// Result of a dispatcher run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Detect-only run, with the full listing
    Detected(Vec<ChainEntry>),
    /// Actions were executed on this device
    Executed(FpgaTarget),
}

/// Walk, select, bind and execute in one go
pub fn dispatch(
    chain: Box<dyn JtagChain>,
    catalog: &Catalog,
    factory: &dyn BackendFactory,
    config: &ResolvedConfiguration,
    request: &ProgramRequest,
    verbosity: VerboseLevel,
) -> Result<Dispatch> {
    request.validate(config.operation)?;

    let walked = OpenedChain::new(chain, catalog, verbosity).walk(request.detect)?;
    if request.detect {
        return Ok(Dispatch::Detected(walked.into_entries()));
    }

    let params = request.backend_params(config);
    let target = walked
        .select(request.index_chain)?
        .bind(factory, &params)?
        .execute(request)?;
    Ok(Dispatch::Executed(target))
}
