//! The session facade

use std::collections::BTreeMap;
use std::path::Path;

use fpgalink_core::backend::BackendRegistry;
use fpgalink_core::catalog::{Catalog, FpgaModel};
use fpgalink_core::chain::{dispatch, Dispatch, JtagOpener, OpenedChain, ProgramRequest};
use fpgalink_core::config::{resolve, ConfigRequest, Operations, ResolvedConfiguration};
use fpgalink_core::{ProbeDescriptor, VerboseLevel};
use fpgalink_ftdi::{AtSerial, FtdiJtagOpener, FtdiSerialOpener, SerialOpener};
use fpgalink_usb::{NusbHost, UsbHost, UsbScanner};

use crate::error::{Result, SessionError};

/// Status string returned by the string-level methods on success
pub const STATUS_OK: &str = "OK";

/// A probe session
///
/// Cached state is replaced, never appended: each scan drops the previous
/// probe list (and the selection pointing into it), each detection drops the
/// previous map.
pub struct Session<H: UsbHost = NusbHost> {
    scanner: UsbScanner<H>,
    catalog: Catalog,
    jtag: Box<dyn JtagOpener>,
    serial: Box<dyn SerialOpener>,
    backends: BackendRegistry,
    verbosity: VerboseLevel,
    probes: Option<Vec<ProbeDescriptor>>,
    selected: Option<usize>,
    detected: BTreeMap<u32, FpgaModel>,
}

impl Session<NusbHost> {
    /// Session on the system USB stack with libftdi transports
    ///
    /// The backend registry starts empty; register manufacturer drivers with
    /// [`Session::backends_mut`].
    pub fn new(catalog: Catalog) -> Self {
        Self::with_parts(
            NusbHost,
            catalog,
            Box::new(FtdiJtagOpener),
            Box::new(FtdiSerialOpener::default()),
            BackendRegistry::new(),
        )
    }
}

impl<H: UsbHost> Session<H> {
    /// Assemble a session from its parts
    pub fn with_parts(
        host: H,
        catalog: Catalog,
        jtag: Box<dyn JtagOpener>,
        serial: Box<dyn SerialOpener>,
        backends: BackendRegistry,
    ) -> Self {
        Self {
            scanner: UsbScanner::new(host),
            catalog,
            jtag,
            serial,
            backends,
            verbosity: VerboseLevel::Normal,
            probes: None,
            selected: None,
            detected: BTreeMap::new(),
        }
    }

    /// Set the verbosity used by every later operation
    pub fn set_verbosity(&mut self, verbosity: VerboseLevel) {
        self.verbosity = verbosity;
    }

    /// The catalog in use
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Manufacturer backends
    pub fn backends_mut(&mut self) -> &mut BackendRegistry {
        &mut self.backends
    }

    /// Probes from the last scan
    pub fn probes(&self) -> Option<&[ProbeDescriptor]> {
        self.probes.as_deref()
    }

    /// The selected probe, if any
    pub fn selected_probe(&self) -> Option<&ProbeDescriptor> {
        let index = self.selected?;
        self.probes.as_ref()?.get(index)
    }

    /// Result of the last detection
    pub fn detected(&self) -> &BTreeMap<u32, FpgaModel> {
        &self.detected
    }

    // ========================================================================
    // Scan and selection
    // ========================================================================

    /// Enumerate the attached probes, replacing the previous scan
    ///
    /// The previous list and selection are dropped first, so a failed scan
    /// leaves no probe cached.
    pub fn scan_usb(&mut self) -> Result<&[ProbeDescriptor]> {
        self.probes = None;
        self.selected = None;

        let probes = self.scanner.scan(&self.catalog, self.verbosity)?;
        log::debug!("Scan found {} probe(s)", probes.len());

        Ok(self.probes.insert(probes).as_slice())
    }

    /// Pick the probe used by later detect, flash and reset calls
    pub fn select_usb(&mut self, index: usize) -> Result<&ProbeDescriptor> {
        let probes = self.probes.as_ref().ok_or(SessionError::NoScan)?;
        let probe = probes.get(index).ok_or(SessionError::InvalidSelection {
            index,
            len: probes.len(),
        })?;

        log::debug!(
            "Selected probe {} at {:03}:{:03}",
            probe.probe_type,
            probe.bus_address,
            probe.device_address
        );
        self.selected = Some(index);
        Ok(probe)
    }

    /// Request for `cable`, pinned to the selected probe when there is one
    fn probe_request(&self, cable: &str, ftdi_channel: Option<u8>) -> ConfigRequest {
        let mut request = ConfigRequest {
            cable: Some(cable.to_string()),
            ftdi_channel,
            ..Default::default()
        };

        if let Some(probe) = self.selected_probe() {
            request.vendor_id = Some(probe.vendor_id);
            request.product_id = Some(probe.product_id);
            request.bus_address = Some(probe.bus_address);
            request.device_address = Some(probe.device_address);
        }

        request
    }

    // ========================================================================
    // JTAG
    // ========================================================================

    /// Walk the chain behind the selected probe
    ///
    /// Only devices found in the FPGA table are kept; the verbose listing
    /// still shows every entry.
    pub fn detect_fpga(
        &mut self,
        cable: &str,
        ftdi_channel: Option<u8>,
    ) -> Result<&BTreeMap<u32, FpgaModel>> {
        self.detected.clear();

        let request = self.probe_request(cable, ftdi_channel);
        let config = resolve(&self.catalog, &request)?;

        let chain = self.jtag.open(&config, self.verbosity)?;
        let walked = OpenedChain::new(chain, &self.catalog, self.verbosity).walk(false)?;

        let detected: BTreeMap<u32, FpgaModel> = walked
            .fpgas()
            .map(|(entry, model)| (entry.idcode, model.clone()))
            .collect();
        log::debug!(
            "{} of {} chain device(s) are known FPGAs",
            detected.len(),
            walked.entries().len()
        );

        self.detected = detected;
        Ok(&self.detected)
    }

    /// Resolve, open and run the dispatcher
    pub fn program(&mut self, request: &ConfigRequest, actions: &ProgramRequest) -> Result<Dispatch> {
        let config = resolve(&self.catalog, request)?;
        actions.validate(config.operation)?;
        self.run(&config, actions)
    }

    fn run(&self, config: &ResolvedConfiguration, actions: &ProgramRequest) -> Result<Dispatch> {
        let chain = self.jtag.open(config, self.verbosity)?;
        let outcome = dispatch(
            chain,
            &self.catalog,
            &self.backends,
            config,
            actions,
            self.verbosity,
        )?;
        Ok(outcome)
    }

    /// Write `data_file` to flash through the bridge bitstream, then verify
    /// and reset
    pub fn try_write_flash(
        &mut self,
        cable: &str,
        ftdi_channel: Option<u8>,
        bridge_file: &Path,
        data_file: &Path,
    ) -> Result<()> {
        let mut request = self.probe_request(cable, ftdi_channel);
        request.operations = Operations::FLASH_WRITE;

        let actions = ProgramRequest {
            bit_file: Some(data_file.to_path_buf()),
            bridge_path: Some(bridge_file.to_path_buf()),
            verify: true,
            reset: true,
            ..Default::default()
        };

        self.program(&request, &actions).map(|_| ())
    }

    /// [`Session::try_write_flash`] with a status string
    pub fn write_flash(
        &mut self,
        cable: &str,
        ftdi_channel: Option<u8>,
        bridge_file: &Path,
        data_file: &Path,
    ) -> String {
        status(self.try_write_flash(cable, ftdi_channel, bridge_file, data_file))
    }

    /// Reconfigure the FPGA behind the selected probe
    pub fn try_reset(&mut self, cable: &str, ftdi_channel: Option<u8>) -> Result<()> {
        let request = self.probe_request(cable, ftdi_channel);
        let actions = ProgramRequest {
            reset: true,
            ..Default::default()
        };
        self.program(&request, &actions).map(|_| ())
    }

    /// [`Session::try_reset`] with a status string
    pub fn reset(&mut self, cable: &str, ftdi_channel: Option<u8>) -> String {
        status(self.try_reset(cable, ftdi_channel))
    }

    // ========================================================================
    // Serial
    // ========================================================================

    /// Send one AT command on the serial channel of `cable`
    ///
    /// The channel is opened for this command only.
    pub fn try_send_command(&mut self, cable: &str, command: &[u8]) -> Result<String> {
        let request = ConfigRequest {
            cable: Some(cable.to_string()),
            ..Default::default()
        };
        let config = resolve(&self.catalog, &request)?;

        let channel = self.serial.open(&config.cable)?;
        let mut at = AtSerial::new(channel, self.serial.baud_rate(), self.verbosity);
        Ok(at.write_command(command)?)
    }

    /// [`Session::try_send_command`], returning the error text on failure
    pub fn send_command(&mut self, cable: &str, command: &[u8]) -> String {
        match self.try_send_command(cable, command) {
            Ok(response) => response,
            Err(e) => {
                log::error!("{}", e);
                e.to_string()
            }
        }
    }
}

fn status(result: Result<()>) -> String {
    match result {
        Ok(()) => STATUS_OK.to_string(),
        Err(e) => {
            log::error!("{}", e);
            e.to_string()
        }
    }
}
