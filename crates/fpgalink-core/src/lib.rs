//! fpgalink-core - Probe configuration and JTAG chain dispatch
//!
//! This crate holds everything that does not touch USB hardware directly:
//!
//! - [`catalog`] - reference tables of cables, boards and JTAG idcodes,
//!   loaded from RON
//! - [`config`] - merging board defaults, cable defaults and explicit
//!   overrides into one [`config::ResolvedConfiguration`]
//! - [`chain`] - walking a JTAG chain, selecting the target device and
//!   binding it to a manufacturer backend
//! - [`backend`] - the capability interface implemented by external
//!   per-manufacturer programming drivers
//!
//! # Example
//!
//! ```ignore
//! use fpgalink_core::catalog::Catalog;
//! use fpgalink_core::config::{resolve, ConfigRequest};
//!
//! let catalog = Catalog::builtin()?;
//! let request = ConfigRequest {
//!     board: Some("arty".into()),
//!     ..Default::default()
//! };
//! let resolved = resolve(&catalog, &request)?;
//! println!("{} at {} Hz", resolved.cable_name, resolved.frequency);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod error;
pub mod probe;
mod verbose;

pub use error::{Error, Result};
pub use probe::ProbeDescriptor;
pub use verbose::VerboseLevel;
