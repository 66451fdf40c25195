//! AT-command serial link
//!
//! Some boards carry a microcontroller on the second FTDI channel that
//! accepts text commands over a plain UART. [`AtSerial`] sends one command
//! and waits for the reply; the reply is whatever the first non-empty read
//! returns.

use fpgalink_core::config::CableConfig;
use fpgalink_core::error::ConfigError;
use fpgalink_core::VerboseLevel;

use crate::error::{FtdiError, Result};
use crate::protocol::{response_len, AT_BAUD_RATE, DEFAULT_LATENCY, MAX_READ_ATTEMPTS};

/// A byte pipe to an FTDI channel
///
/// Both calls report how many bytes moved; a read of zero means no data
/// was pending.
pub trait SerialChannel {
    /// Write bytes, returning how many the device accepted
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read into `buf`, returning how many bytes arrived
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<T: SerialChannel + ?Sized> SerialChannel for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
}

/// Opens the serial channel of a cable
pub trait SerialOpener {
    /// Open and configure the channel described by `cable`
    fn open(&self, cable: &CableConfig) -> Result<Box<dyn SerialChannel>>;

    /// Baud rate the channel is configured for
    fn baud_rate(&self) -> u32 {
        AT_BAUD_RATE
    }
}

/// Settings used when opening an AT-command channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    /// Latency timer in milliseconds (1-255)
    pub latency: u8,
    /// Baud rate
    pub baud: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            baud: AT_BAUD_RATE,
        }
    }
}

impl SerialSettings {
    /// Set the latency timer
    pub fn latency(mut self, latency: u16) -> std::result::Result<Self, ConfigError> {
        if !(1..=255).contains(&latency) {
            return Err(ConfigError::InvalidLatency(latency));
        }
        self.latency = latency as u8;
        Ok(self)
    }
}

/// Cable filters libftdi cannot apply when opening by VID/PID
///
/// libftdi opens the first matching device; any of these filters set on the
/// cable is ignored by the opener.
pub fn unsupported_filters(cable: &CableConfig, serial: Option<&str>) -> Vec<&'static str> {
    let mut ignored = Vec::new();
    if cable.bus_address.is_some() || cable.device_address.is_some() {
        ignored.push("bus/device");
    }
    if cable.cable_index.is_some() {
        ignored.push("cable index");
    }
    if serial.is_some() {
        ignored.push("FTDI serial");
    }
    ignored
}

/// One command/response exchange at a time over a serial channel
pub struct AtSerial<C> {
    channel: C,
    buffer_len: usize,
    verbosity: VerboseLevel,
}

impl<C: SerialChannel> AtSerial<C> {
    /// Wrap an open channel running at `baud`
    pub fn new(channel: C, baud: u32, verbosity: VerboseLevel) -> Self {
        Self {
            channel,
            buffer_len: response_len(baud).max(1),
            verbosity,
        }
    }

    /// Send a command and return the response text
    ///
    /// The whole command must be accepted by a single write. The response is
    /// taken from the first read that returns data, cut at the first NUL
    /// byte; at most [`MAX_READ_ATTEMPTS`] reads are tried.
    pub fn write_command(&mut self, command: &[u8]) -> Result<String> {
        if self.verbosity.is_verbose() {
            log::info!("send: {}", String::from_utf8_lossy(command));
        }

        let written = self.channel.write(command)?;
        if written != command.len() {
            return Err(FtdiError::ShortWrite {
                written,
                expected: command.len(),
            });
        }

        let mut buf = vec![0u8; self.buffer_len];

        for attempt in 1..=MAX_READ_ATTEMPTS {
            let len = self.channel.read(&mut buf)?;
            if len == 0 {
                if self.verbosity >= VerboseLevel::Debug {
                    log::debug!("empty read {}/{}", attempt, MAX_READ_ATTEMPTS);
                }
                continue;
            }

            if attempt > 1 {
                log::debug!("response after {} empty reads", attempt - 1);
            }

            let data = &buf[..len];
            let end = data.iter().position(|&b| b == 0).unwrap_or(len);
            let response = String::from_utf8_lossy(&data[..end]).into_owned();

            if self.verbosity.is_verbose() {
                log::info!("recv: {}", response);
            }
            return Ok(response);
        }

        Err(FtdiError::ReadRetriesExhausted(MAX_READ_ATTEMPTS))
    }

    /// Give the channel back
    pub fn into_inner(self) -> C {
        self.channel
    }
}

#[cfg(feature = "std")]
mod libftdi {
    use std::io::{Read, Write};

    use fpgalink_core::catalog::FtdiChannel;
    use fpgalink_core::config::CableConfig;
    use ftdi::{find_by_vid_pid, Device, Interface};

    use super::{unsupported_filters, SerialChannel, SerialOpener, SerialSettings};
    use crate::error::{FtdiError, Result};

    /// An open libftdi channel, closed on drop
    pub struct FtdiPort {
        device: Device,
    }

    impl FtdiPort {
        /// Open the channel of `cable` without configuring it
        pub fn open(cable: &CableConfig, serial: Option<&str>) -> Result<Self> {
            if !cable.kind.is_ftdi() {
                return Err(FtdiError::UnsupportedTransport(cable.kind));
            }

            let channel = cable.channel.unwrap_or_default();
            let interface = match channel {
                FtdiChannel::A => Interface::A,
                FtdiChannel::B => Interface::B,
                FtdiChannel::C => Interface::C,
                FtdiChannel::D => Interface::D,
            };

            for filter in unsupported_filters(cable, serial) {
                log::warn!("{} filter is not supported by libftdi, using first match", filter);
            }

            log::debug!(
                "Opening FTDI VID={:04X} PID={:04X} channel {}",
                cable.vendor_id,
                cable.product_id,
                channel.letter()
            );

            let device = find_by_vid_pid(cable.vendor_id, cable.product_id)
                .interface(interface)
                .open()
                .map_err(|e| FtdiError::OpenFailed(format!("{}", e)))?;

            Ok(Self { device })
        }

        /// Underlying libftdi device
        pub fn device_mut(&mut self) -> &mut Device {
            &mut self.device
        }
    }

    impl SerialChannel for FtdiPort {
        fn write(&mut self, data: &[u8]) -> Result<usize> {
            let n = self
                .device
                .write(data)
                .map_err(|e| FtdiError::TransferFailed(format!("Write failed: {}", e)))?;
            log::trace!("Sent {} bytes", n);
            Ok(n)
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = self
                .device
                .read(buf)
                .map_err(|e| FtdiError::ReadFailed(format!("Read failed: {}", e)))?;
            log::trace!("Received {} bytes", n);
            Ok(n)
        }
    }

    /// Opens AT-command channels through libftdi
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FtdiSerialOpener {
        settings: SerialSettings,
    }

    impl FtdiSerialOpener {
        /// Use the given settings
        pub fn new(settings: SerialSettings) -> Self {
            Self { settings }
        }
    }

    impl SerialOpener for FtdiSerialOpener {
        fn open(&self, cable: &CableConfig) -> Result<Box<dyn SerialChannel>> {
            let mut port = FtdiPort::open(cable, None)?;

            port.device_mut()
                .set_latency_timer(self.settings.latency)
                .map_err(|e| FtdiError::ConfigFailed(format!("Set latency timer failed: {}", e)))?;

            port.device_mut()
                .set_baud_rate(self.settings.baud)
                .map_err(|e| FtdiError::ConfigFailed(format!("Set baud rate failed: {}", e)))?;

            log::debug!(
                "Serial channel ready at {} baud, latency {} ms",
                self.settings.baud,
                self.settings.latency
            );

            Ok(Box::new(port))
        }

        fn baud_rate(&self) -> u32 {
            self.settings.baud
        }
    }
}

#[cfg(feature = "std")]
pub use libftdi::{FtdiPort, FtdiSerialOpener};
