//! JTAG chain access through the FTDI MPSSE engine
//!
//! Only what the dispatcher needs is implemented here: reset the TAP, shift
//! the IDCODE registers out of Shift-DR and split them into devices.
//! Everything past device selection belongs to the manufacturer backends.

use fpgalink_core::chain::{JtagChain, JtagOpener};
use fpgalink_core::config::ResolvedConfiguration;
use fpgalink_core::VerboseLevel;

use crate::at_serial::SerialChannel;
use crate::error::{FtdiError, Result};
use crate::protocol::*;

/// Longest chain the walk will report
pub const MAX_CHAIN_DEVICES: usize = 32;

/// Bytes shifted during a chain walk: every device plus one all-ones word
const SCAN_BYTES: usize = 4 * (MAX_CHAIN_DEVICES + 1);

/// Split a Shift-DR capture into idcodes
///
/// After a TAP reset every device holds either IDCODE (32 bits, LSB set) or
/// BYPASS (one 0 bit). With TDI held high, the end of the chain shows up as
/// an all-ones word. A device in BYPASS is reported with idcode 0.
pub fn split_idcodes(capture: &[u8]) -> Vec<u32> {
    if capture.iter().all(|&b| b == 0) {
        return Vec::new();
    }

    let total = capture.len() * 8;
    let bit = |pos: usize| (capture[pos / 8] >> (pos % 8)) & 1;

    let mut idcodes = Vec::new();
    let mut pos = 0;

    while pos < total && idcodes.len() < MAX_CHAIN_DEVICES {
        if bit(pos) == 0 {
            idcodes.push(0);
            pos += 1;
            continue;
        }

        if pos + 32 > total {
            break;
        }
        let word = (0..32).fold(0u32, |acc, i| acc | (u32::from(bit(pos + i)) << i));
        if word == u32::MAX {
            break;
        }
        idcodes.push(word);
        pos += 32;
    }

    idcodes
}

/// JTAG chain driven over an MPSSE channel
pub struct MpsseJtag<C> {
    channel: C,
    selected: Option<usize>,
}

impl<C: SerialChannel> MpsseJtag<C> {
    /// Initialize MPSSE on an open channel and set TCK close to `frequency`
    pub fn new(channel: C, frequency: u32) -> Result<Self> {
        let mut jtag = Self {
            channel,
            selected: None,
        };

        let divisor = tck_divisor(frequency);
        log::debug!(
            "Setting TCK divisor to {} ({} Hz requested, {} Hz actual)",
            divisor,
            frequency,
            tck_frequency(divisor)
        );

        let buf = [
            DIS_DIV_5,
            CLK_NO_ADAPTIVE,
            TCK_DIVISOR,
            (divisor & 0xFF) as u8,
            ((divisor >> 8) & 0xFF) as u8,
            LOOPBACK_END,
            SET_BITS_LOW,
            IDLE_BITS,
            JTAG_PINDIR,
        ];
        jtag.send(&buf)?;

        Ok(jtag)
    }

    /// Index chosen by the last [`JtagChain::select_device`] call
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let written = self.channel.write(data)?;
        if written != data.len() {
            return Err(FtdiError::ShortWrite {
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    fn recv(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut total = 0;
        let mut empty = 0;

        while total < len {
            match self.channel.read(&mut buf[total..])? {
                0 => {
                    empty += 1;
                    if empty >= MAX_READ_ATTEMPTS {
                        return Err(FtdiError::ReadRetriesExhausted(MAX_READ_ATTEMPTS));
                    }
                }
                n => total += n,
            }
        }

        log::trace!("Received {} bytes", total);
        Ok(buf)
    }

    fn walk(&mut self) -> Result<Vec<u32>> {
        let mut buf = Vec::with_capacity(SCAN_BYTES + 16);

        // Test-Logic-Reset: five TMS high clocks
        buf.extend_from_slice(&[TMS_SHIFT, 4, 0x1F]);
        // Run-Test/Idle, Select-DR, Capture-DR, Shift-DR
        buf.extend_from_slice(&[TMS_SHIFT, 3, 0x02]);

        let len = (SCAN_BYTES - 1) as u16;
        buf.push(TDI_TDO_SHIFT);
        buf.push((len & 0xFF) as u8);
        buf.push(((len >> 8) & 0xFF) as u8);
        buf.resize(buf.len() + SCAN_BYTES, 0xFF);

        // Back to Test-Logic-Reset
        buf.extend_from_slice(&[TMS_SHIFT, 4, 0x1F]);
        buf.push(SEND_IMMEDIATE);

        self.send(&buf)?;
        let capture = self.recv(SCAN_BYTES)?;
        Ok(split_idcodes(&capture))
    }
}

impl<C: SerialChannel> JtagChain for MpsseJtag<C> {
    fn idcodes(&mut self) -> fpgalink_core::Result<Vec<u32>> {
        let idcodes = self.walk()?;
        log::debug!("Chain walk found {} device(s)", idcodes.len());
        Ok(idcodes)
    }

    fn select_device(&mut self, index: usize) -> fpgalink_core::Result<()> {
        self.selected = Some(index);
        Ok(())
    }
}

#[cfg(feature = "std")]
mod libftdi {
    use fpgalink_core::catalog::TransportKind;
    use ftdi::BitMode;

    use super::*;
    use crate::at_serial::FtdiPort;

    /// Opens MPSSE JTAG chains through libftdi
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FtdiJtagOpener;

    impl FtdiJtagOpener {
        fn open_port(&self, config: &ResolvedConfiguration) -> Result<MpsseJtag<FtdiPort>> {
            if config.cable.kind != TransportKind::FtdiSerial {
                return Err(FtdiError::UnsupportedTransport(config.cable.kind));
            }

            let mut port = FtdiPort::open(&config.cable, config.ftdi_serial.as_deref())?;
            let device = port.device_mut();

            device
                .usb_reset()
                .map_err(|e| FtdiError::ConfigFailed(format!("USB reset failed: {}", e)))?;
            device
                .set_latency_timer(2)
                .map_err(|e| FtdiError::ConfigFailed(format!("Set latency timer failed: {}", e)))?;
            device
                .set_bitmode(0x00, BitMode::Mpsse)
                .map_err(|e| FtdiError::ConfigFailed(format!("Set MPSSE mode failed: {}", e)))?;

            MpsseJtag::new(port, config.frequency)
        }
    }

    impl JtagOpener for FtdiJtagOpener {
        fn open(
            &self,
            config: &ResolvedConfiguration,
            verbosity: VerboseLevel,
        ) -> fpgalink_core::Result<Box<dyn JtagChain>> {
            let jtag = self.open_port(config)?;
            if verbosity.is_verbose() {
                log::info!(
                    "Cable {} opened at {} Hz",
                    config.cable_name,
                    tck_frequency(tck_divisor(config.frequency))
                );
            }
            Ok(Box::new(jtag))
        }
    }
}

#[cfg(feature = "std")]
pub use libftdi::FtdiJtagOpener;
