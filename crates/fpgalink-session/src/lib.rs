//! fpgalink-session - Stateful probe session
//!
//! [`Session`] is the entry point for a host application. It owns the USB
//! host, the catalog, the transport openers and the backend registry, and it
//! remembers the last scan, the selected probe and the last detection
//! between calls.
//!
//! Typical flow:
//!
//! ```no_run
//! use fpgalink_core::catalog::Catalog;
//! use fpgalink_session::Session;
//!
//! let mut session = Session::new(Catalog::builtin()?);
//! let probes = session.scan_usb()?.len();
//! if probes > 0 {
//!     session.select_usb(0)?;
//!     for (idcode, fpga) in session.detect_fpga("ft2232", None)? {
//!         println!("0x{:08x} {} {}", idcode, fpga.family, fpga.model);
//!     }
//! }
//! println!("{}", session.reset("ft2232", None));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The string-returning methods mirror what an embedding host shows to a
//! user: `"OK"` on success, the error text otherwise. Every one of them has a
//! `try_` variant returning a [`Result`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod error;
mod session;

pub use error::{Result, SessionError};
pub use session::{Session, STATUS_OK};
