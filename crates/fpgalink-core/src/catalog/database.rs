//! Catalog loading and lookup
//!
//! The catalog is described in RON. One file may contain any subset of the
//! four tables; loading a file on top of an existing catalog adds new entries
//! and replaces entries with the same key.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::types::{
    BoardProfile, CableProfile, FpgaModel, FtdiChannel, JtagPins, MiscDevice, TransportKind,
};
use crate::error::CatalogError;

/// Catalog bundled with the crate
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.ron");

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

#[derive(Debug, Clone, serde::Deserialize)]
struct CableDef {
    vid: u16,
    pid: u16,
    kind: TransportKind,
    #[serde(default)]
    channel: Option<FtdiChannel>,
    #[serde(default)]
    pins: JtagPins,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct BoardDef {
    cable: String,
    #[serde(default)]
    pins: JtagPins,
    #[serde(default)]
    frequency: u32,
    #[serde(default = "default_manufacturer")]
    manufacturer: String,
    #[serde(default)]
    fpga_part: Option<String>,
}

fn default_manufacturer() -> String {
    "none".to_string()
}

#[derive(Debug, Clone, serde::Deserialize)]
struct FpgaDef {
    manufacturer: String,
    family: String,
    model: String,
    irlength: u8,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct MiscDef {
    name: String,
    irlength: u8,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct CatalogDef {
    cables: BTreeMap<String, CableDef>,
    boards: BTreeMap<String, BoardDef>,
    fpgas: BTreeMap<u32, FpgaDef>,
    misc: BTreeMap<u32, MiscDef>,
}

// ============================================================================
// Catalog
// ============================================================================

/// Read-only reference tables
///
/// Maps are ordered by key so listings and first-match lookups are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    cables: BTreeMap<String, CableProfile>,
    boards: BTreeMap<String, BoardProfile>,
    fpgas: BTreeMap<u32, FpgaModel>,
    misc: BTreeMap<u32, MiscDevice>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog bundled with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        catalog.load_ron(BUILTIN_CATALOG)?;
        Ok(catalog)
    }

    /// Load entries from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CatalogError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// Load entries from a RON string, returning how many entries it held
    ///
    /// The string is validated as a whole before anything is merged, so a
    /// rejected file leaves the catalog untouched.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, CatalogError> {
        let def: CatalogDef = ron::from_str(content)?;
        validate(&def)?;

        let count = def.cables.len() + def.boards.len() + def.fpgas.len() + def.misc.len();

        for (name, cable) in def.cables {
            let profile = CableProfile {
                vendor_id: cable.vid,
                product_id: cable.pid,
                kind: cable.kind,
                channel: cable.channel,
                pins: cable.pins,
            };
            if self.cables.insert(name.clone(), profile).is_some() {
                log::debug!("Cable '{}' redefined", name);
            }
        }

        for (name, board) in def.boards {
            let profile = BoardProfile {
                cable: board.cable,
                pins: board.pins,
                default_frequency: board.frequency,
                manufacturer: board.manufacturer,
                fpga_part: board.fpga_part,
            };
            if self.boards.insert(name.clone(), profile).is_some() {
                log::debug!("Board '{}' redefined", name);
            }
        }

        for (idcode, fpga) in def.fpgas {
            self.fpgas.insert(
                idcode,
                FpgaModel {
                    manufacturer: fpga.manufacturer,
                    family: fpga.family,
                    model: fpga.model,
                    ir_length: fpga.irlength,
                },
            );
        }

        for (idcode, misc) in def.misc {
            self.misc.insert(
                idcode,
                MiscDevice {
                    name: misc.name,
                    ir_length: misc.irlength,
                },
            );
        }

        Ok(count)
    }

    /// Look up a cable by name
    pub fn cable(&self, name: &str) -> Option<&CableProfile> {
        self.cables.get(name)
    }

    /// Look up a board by name
    pub fn board(&self, name: &str) -> Option<&BoardProfile> {
        self.boards.get(name)
    }

    /// Look up an FPGA by idcode
    pub fn fpga(&self, idcode: u32) -> Option<&FpgaModel> {
        self.fpgas.get(&idcode)
    }

    /// Look up a non-FPGA JTAG device by idcode
    pub fn misc_device(&self, idcode: u32) -> Option<&MiscDevice> {
        self.misc.get(&idcode)
    }

    /// Cable with this VID/PID; the greatest name wins when several match
    pub fn cable_for_usb_id(&self, vid: u16, pid: u16) -> Option<&str> {
        self.cables
            .iter()
            .rev()
            .find(|(_, c)| c.vendor_id == vid && c.product_id == pid)
            .map(|(name, _)| name.as_str())
    }

    /// Iterate over cables in name order
    pub fn cables(&self) -> impl Iterator<Item = (&str, &CableProfile)> {
        self.cables.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Iterate over boards in name order
    pub fn boards(&self) -> impl Iterator<Item = (&str, &BoardProfile)> {
        self.boards.iter().map(|(n, b)| (n.as_str(), b))
    }

    /// Iterate over FPGAs in idcode order
    pub fn fpgas(&self) -> impl Iterator<Item = (u32, &FpgaModel)> {
        self.fpgas.iter().map(|(id, f)| (*id, f))
    }

    /// Total number of entries over all tables
    pub fn len(&self) -> usize {
        self.cables.len() + self.boards.len() + self.fpgas.len() + self.misc.len()
    }

    /// Check if every table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate(def: &CatalogDef) -> Result<(), CatalogError> {
    for (name, cable) in &def.cables {
        if cable.channel.is_some() && !cable.kind.is_ftdi() {
            return Err(CatalogError::Validation(format!(
                "cable '{}' sets an FTDI channel on a {} cable",
                name, cable.kind
            )));
        }
    }
    for (idcode, fpga) in &def.fpgas {
        if fpga.irlength == 0 {
            return Err(CatalogError::Validation(format!(
                "FPGA 0x{:08x} has a zero IR length",
                idcode
            )));
        }
    }
    for (idcode, misc) in &def.misc {
        if misc.irlength == 0 {
            return Err(CatalogError::Validation(format!(
                "device 0x{:08x} has a zero IR length",
                idcode
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = Catalog::builtin().unwrap();
        assert!(!catalog.is_empty());

        let ft2232 = catalog.cable("ft2232").unwrap();
        assert_eq!(ft2232.vendor_id, 0x0403);
        assert_eq!(ft2232.product_id, 0x6010);
        assert!(ft2232.kind.is_ftdi());

        let arty = catalog.board("arty").unwrap();
        assert!(catalog.cable(&arty.cable).is_some());
        assert_eq!(arty.manufacturer, "xilinx");

        let a7 = catalog.fpga(0x0362d093).unwrap();
        assert_eq!(a7.manufacturer, "xilinx");
        assert_eq!(a7.ir_length, 6);
    }

    #[test]
    fn test_builtin_boards_reference_known_cables() {
        let catalog = Catalog::builtin().unwrap();
        for (name, board) in catalog.boards() {
            assert!(
                catalog.cable(&board.cable).is_some(),
                "board {} uses unknown cable {}",
                name,
                board.cable
            );
        }
    }

    #[test]
    fn test_load_ron_merges() {
        let ron = r#"
        (
            cables: {
                "mycable": (vid: 0x1234, pid: 0x5678, kind: DirtyJtag),
                "myftdi": (vid: 0x0403, pid: 0x6014, kind: FtdiSerial, channel: Some(B)),
            },
            boards: {
                "myboard": (cable: "mycable", frequency: 1000, manufacturer: "lattice"),
            },
            fpgas: {
                0x41111043: (manufacturer: "lattice", family: "ECP5", model: "LFE5U-25", irlength: 8),
            },
        )
        "#;

        let mut catalog = Catalog::new();
        let count = catalog.load_ron(ron).unwrap();
        assert_eq!(count, 4);

        let board = catalog.board("myboard").unwrap();
        assert_eq!(board.default_frequency, 1000);
        assert_eq!(board.fpga_part, None);
        assert_eq!(board.pins, JtagPins::default());
        assert_eq!(
            catalog.cable("myftdi").unwrap().channel,
            Some(FtdiChannel::B)
        );
        assert_eq!(catalog.cable_for_usb_id(0x1234, 0x5678), Some("mycable"));
        assert_eq!(catalog.cable_for_usb_id(0x1234, 0x0000), None);

        // Redefinition replaces
        catalog
            .load_ron(r#"(cables: { "mycable": (vid: 0x1111, pid: 0x2222, kind: Other) })"#)
            .unwrap();
        assert_eq!(catalog.cable("mycable").unwrap().vendor_id, 0x1111);
    }

    #[test]
    fn test_shared_usb_id_resolves_to_greatest_name() {
        let mut catalog = Catalog::new();
        catalog
            .load_ron(
                r#"(cables: {
                    "cmsisdap": (vid: 0x0d28, pid: 0x0204, kind: CmsisDap),
                    "zz-alias": (vid: 0x0d28, pid: 0x0204, kind: CmsisDap),
                    "arm-probe": (vid: 0x0d28, pid: 0x0204, kind: CmsisDap),
                })"#,
            )
            .unwrap();
        assert_eq!(catalog.cable_for_usb_id(0x0d28, 0x0204), Some("zz-alias"));
    }

    #[test]
    fn test_rejects_channel_on_non_ftdi_cable() {
        let ron = r#"(cables: { "bad": (vid: 1, pid: 2, kind: JLink, channel: Some(A)) })"#;
        let mut catalog = Catalog::new();
        let err = catalog.load_ron(ron).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_rejects_malformed_ron() {
        let mut catalog = Catalog::new();
        assert!(matches!(
            catalog.load_ron("(cables: {"),
            Err(CatalogError::Parse(_))
        ));
    }
}
