//! Reference catalogs
//!
//! Cables, boards, FPGA idcodes and other JTAG idcodes. The catalog is plain
//! read-only data: it is built once (from the bundled RON file and optional
//! user files) and then passed by reference to whoever needs a lookup.

mod database;
mod types;

pub use database::Catalog;
pub use types::{
    BoardProfile, CableProfile, FpgaModel, FtdiChannel, JtagPins, MiscDevice, TransportKind,
};
