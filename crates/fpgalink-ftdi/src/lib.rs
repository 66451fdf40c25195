//! fpgalink-ftdi - FTDI transports
//!
//! Two ways of talking to a probe built on an FTDI chip:
//!
//! - [`AtSerial`] - a text command link on a UART channel, used to reach a
//!   board controller. Each command is answered by the first non-empty read,
//!   with at most 50 read attempts.
//! - [`MpsseJtag`] - a JTAG chain driven by the MPSSE engine, implementing
//!   [`fpgalink_core::chain::JtagChain`] so the dispatcher can walk it.
//!
//! Opening real hardware goes through libftdi1 (the default `std` feature).
//! Both transports are generic over [`SerialChannel`], so they can be driven
//! by an in-memory channel in tests.
//!
//! # Example
//!
//! ```no_run
//! use fpgalink_core::catalog::Catalog;
//! use fpgalink_core::config::{resolve, ConfigRequest};
//! use fpgalink_core::VerboseLevel;
//! use fpgalink_ftdi::{AtSerial, FtdiSerialOpener, SerialOpener};
//!
//! let catalog = Catalog::builtin()?;
//! let request = ConfigRequest {
//!     cable: Some("ft2232_b".into()),
//!     ..Default::default()
//! };
//! let config = resolve(&catalog, &request)?;
//!
//! let opener = FtdiSerialOpener::default();
//! let channel = opener.open(&config.cable)?;
//! let mut at = AtSerial::new(channel, opener.baud_rate(), VerboseLevel::Normal);
//! println!("{}", at.write_command(b"AT\r\n")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # TCK Speed
//!
//! TCK is derived from a 60 MHz base clock:
//!
//! ```text
//! TCK = 60 MHz / ((1 + divisor) * 2)
//! ```
//!
//! | Divisor | TCK      |
//! |---------|----------|
//! | 0       | 30 MHz   |
//! | 2       | 10 MHz   |
//! | 4       | 6 MHz    |
//! | 29      | 1 MHz    |

#![warn(missing_docs)]

mod at_serial;
mod error;
mod jtag;
mod protocol;

pub use at_serial::{unsupported_filters, AtSerial, SerialChannel, SerialOpener, SerialSettings};
#[cfg(feature = "std")]
pub use at_serial::{FtdiPort, FtdiSerialOpener};
pub use error::{FtdiError, Result};
#[cfg(feature = "std")]
pub use jtag::FtdiJtagOpener;
pub use jtag::{split_idcodes, MpsseJtag, MAX_CHAIN_DEVICES};
pub use protocol::{AT_BAUD_RATE, DEFAULT_LATENCY, MAX_READ_ATTEMPTS};
