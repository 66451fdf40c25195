//! fpgalink-usb - USB probe enumeration
//!
//! Lists the USB devices attached to the host and keeps the ones that look
//! like programming probes: FTDI chips (classified by product ID) and any
//! device whose VID/PID appears in the cable catalog. Each kept device is
//! opened briefly to read its manufacturer, product and serial strings.
//!
//! The host stack sits behind the [`UsbHost`] trait. [`NusbHost`] is the
//! real implementation (enabled by the default `nusb` feature).
//!
//! # Example
//!
//! ```ignore
//! use fpgalink_core::{catalog::Catalog, VerboseLevel};
//! use fpgalink_usb::{NusbHost, UsbScanner};
//!
//! let catalog = Catalog::builtin()?;
//! let scanner = UsbScanner::new(NusbHost);
//! for probe in scanner.scan(&catalog, VerboseLevel::Normal)? {
//!     println!("{}", probe);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod error;
mod host;
#[cfg(feature = "nusb")]
mod nusb_host;
mod scanner;

pub use error::ScanError;
pub use host::{DeviceDescriptor, StringDescriptors, StringField, UsbDevice, UsbHost};
#[cfg(feature = "nusb")]
pub use nusb_host::NusbHost;
pub use scanner::{classify, UsbScanner, FTDI_VID, ROOT_HUB_VID};
