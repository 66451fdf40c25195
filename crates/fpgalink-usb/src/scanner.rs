//! Probe enumeration

use fpgalink_core::catalog::Catalog;
use fpgalink_core::probe::{scan_header, NO_STRING};
use fpgalink_core::{ProbeDescriptor, VerboseLevel};

use crate::host::{StringDescriptors, StringField, UsbDevice, UsbHost};
use crate::ScanError;

/// Linux Foundation, used by root hubs
pub const ROOT_HUB_VID: u16 = 0x1d6b;

/// Future Technology Devices International
pub const FTDI_VID: u16 = 0x0403;

/// FTDI product IDs and the names reported for them
const FTDI_PRODUCTS: &[(u16, &str)] = &[
    (0x6010, "FTDI2232"),
    (0x6011, "ft4232"),
    (0x6001, "ft232RL"),
    (0x6014, "ft232H"),
    (0x6015, "ft231X"),
];

/// Name for an FTDI product ID not in the table
const UNKNOWN_FTDI: &str = "unknown FTDI";

/// Probe type name for a VID/PID, `None` when the device is not a probe
pub fn classify(catalog: &Catalog, vendor_id: u16, product_id: u16) -> Option<String> {
    if vendor_id == FTDI_VID {
        let name = FTDI_PRODUCTS
            .iter()
            .find(|(pid, _)| *pid == product_id)
            .map(|(_, name)| *name)
            .unwrap_or(UNKNOWN_FTDI);
        return Some(name.to_string());
    }

    catalog
        .cable_for_usb_id(vendor_id, product_id)
        .map(str::to_string)
}

/// Scans a USB host for programming probes
#[derive(Debug, Clone, Default)]
pub struct UsbScanner<H> {
    host: H,
}

impl<H: UsbHost> UsbScanner<H> {
    /// Create a scanner over a host stack
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// Access the host stack
    pub fn host(&self) -> &H {
        &self.host
    }

    /// List the attached probes in enumeration order
    ///
    /// A device whose descriptor cannot be read fails the whole scan. A
    /// device that cannot be opened, or a string that cannot be read, only
    /// degrades the affected fields to `"none"`.
    pub fn scan(
        &self,
        catalog: &Catalog,
        verbosity: VerboseLevel,
    ) -> Result<Vec<ProbeDescriptor>, ScanError> {
        let devices = self.host.devices()?;
        log::debug!("{} USB devices attached", devices.len());

        let mut probes = Vec::new();

        for device in &devices {
            let desc = device.descriptor()?;
            if desc.vendor_id == ROOT_HUB_VID {
                continue;
            }

            let probe_type = match classify(catalog, desc.vendor_id, desc.product_id) {
                Some(name) => name,
                None => continue,
            };

            let (manufacturer, product, serial) = read_strings(device);

            probes.push(ProbeDescriptor {
                bus_address: device.bus_number(),
                device_address: device.device_address(),
                vendor_id: desc.vendor_id,
                product_id: desc.product_id,
                probe_type,
                manufacturer,
                serial,
                product,
            });
        }

        if verbosity.is_verbose() {
            log::info!("found {} USB device(s)", probes.len());
            log::info!("{}", scan_header());
            for probe in &probes {
                log::info!("{}", probe);
            }
        }

        Ok(probes)
    }
}

/// Open the device just long enough to read its strings
fn read_strings<D: UsbDevice>(device: &D) -> (String, String, String) {
    let handle = match device.open() {
        Ok(handle) => handle,
        Err(e) => {
            log::debug!(
                "{:03}:{:03}: {}",
                device.bus_number(),
                device.device_address(),
                e
            );
            return (NO_STRING.into(), NO_STRING.into(), NO_STRING.into());
        }
    };

    let read = |field| {
        handle.read(field).unwrap_or_else(|e| {
            log::debug!(
                "{:03}:{:03}: {:?}: {}",
                device.bus_number(),
                device.device_address(),
                field,
                e
            );
            NO_STRING.to_string()
        })
    };

    (
        read(StringField::Manufacturer),
        read(StringField::Product),
        read(StringField::Serial),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DeviceDescriptor;

    #[derive(Clone)]
    struct FakeDevice {
        bus: u8,
        address: u8,
        vid: u16,
        pid: u16,
        descriptor_ok: bool,
        open_ok: bool,
        manufacturer: Option<&'static str>,
        product: Option<&'static str>,
        serial: Option<&'static str>,
    }

    impl FakeDevice {
        fn new(bus: u8, address: u8, vid: u16, pid: u16) -> Self {
            Self {
                bus,
                address,
                vid,
                pid,
                descriptor_ok: true,
                open_ok: true,
                manufacturer: Some("ACME"),
                product: Some("Probe"),
                serial: Some("SN0001"),
            }
        }
    }

    struct FakeHandle(FakeDevice);

    impl StringDescriptors for FakeHandle {
        fn read(&self, field: StringField) -> Result<String, ScanError> {
            let value = match field {
                StringField::Manufacturer => self.0.manufacturer,
                StringField::Product => self.0.product,
                StringField::Serial => self.0.serial,
            };
            value
                .map(str::to_string)
                .ok_or_else(|| ScanError::StringRead("pipe error".into()))
        }
    }

    impl UsbDevice for FakeDevice {
        type Handle = FakeHandle;

        fn bus_number(&self) -> u8 {
            self.bus
        }

        fn device_address(&self) -> u8 {
            self.address
        }

        fn descriptor(&self) -> Result<DeviceDescriptor, ScanError> {
            if !self.descriptor_ok {
                return Err(ScanError::Descriptor {
                    bus: self.bus,
                    address: self.address,
                    reason: "io".into(),
                });
            }
            Ok(DeviceDescriptor {
                vendor_id: self.vid,
                product_id: self.pid,
            })
        }

        fn open(&self) -> Result<FakeHandle, ScanError> {
            if self.open_ok {
                Ok(FakeHandle(self.clone()))
            } else {
                Err(ScanError::Open("access denied".into()))
            }
        }
    }

    struct FakeHost(Vec<FakeDevice>);

    impl UsbHost for FakeHost {
        type Device = FakeDevice;

        fn devices(&self) -> Result<Vec<FakeDevice>, ScanError> {
            Ok(self.0.clone())
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .load_ron(
                r#"
                (
                    cables: {
                        "dirtyJtag": (vid: 0x1209, pid: 0xc0ca, kind: DirtyJtag),
                        "cmsisdap": (vid: 0x0d28, pid: 0x0204, kind: CmsisDap),
                        "zz-alias": (vid: 0x0d28, pid: 0x0204, kind: CmsisDap),
                    },
                )
                "#,
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_classify() {
        let catalog = catalog();
        assert_eq!(classify(&catalog, 0x0403, 0x6010).as_deref(), Some("FTDI2232"));
        assert_eq!(classify(&catalog, 0x0403, 0x6011).as_deref(), Some("ft4232"));
        assert_eq!(classify(&catalog, 0x0403, 0x6001).as_deref(), Some("ft232RL"));
        assert_eq!(classify(&catalog, 0x0403, 0x6014).as_deref(), Some("ft232H"));
        assert_eq!(classify(&catalog, 0x0403, 0x6015).as_deref(), Some("ft231X"));
        assert_eq!(classify(&catalog, 0x0403, 0xbeef).as_deref(), Some("unknown FTDI"));
        // Shared VID/PID: the greatest cable name wins
        assert_eq!(classify(&catalog, 0x0d28, 0x0204).as_deref(), Some("zz-alias"));
        assert_eq!(classify(&catalog, 0x046d, 0xc52b), None);
    }

    #[test]
    fn test_scan_keeps_only_probes() {
        let host = FakeHost(vec![
            FakeDevice::new(1, 1, ROOT_HUB_VID, 0x0002),
            FakeDevice::new(1, 4, 0x046d, 0xc52b),
            FakeDevice::new(1, 7, 0x0403, 0x6010),
            FakeDevice::new(2, 3, 0x1209, 0xc0ca),
        ]);
        let probes = UsbScanner::new(host)
            .scan(&catalog(), VerboseLevel::Verbose)
            .unwrap();

        assert_eq!(probes.len(), 2);
        assert_eq!(probes[0].probe_type, "FTDI2232");
        assert_eq!(probes[0].identity(), (1, 7, 0x0403, 0x6010));
        assert_eq!(probes[0].manufacturer, "ACME");
        assert_eq!(probes[0].product, "Probe");
        assert_eq!(probes[0].serial, "SN0001");
        assert_eq!(probes[1].probe_type, "dirtyJtag");

        let known = ["FTDI2232", "ft4232", "ft232RL", "ft232H", "ft231X", "unknown FTDI"];
        let catalog = catalog();
        for probe in &probes {
            assert!(!probe.probe_type.is_empty());
            assert!(
                known.contains(&probe.probe_type.as_str())
                    || catalog.cable(&probe.probe_type).is_some()
            );
        }
    }

    #[test]
    fn test_string_failures_degrade_to_none() {
        let mut locked = FakeDevice::new(1, 2, 0x0403, 0x6014);
        locked.open_ok = false;
        let mut no_serial = FakeDevice::new(1, 3, 0x0403, 0x6001);
        no_serial.serial = None;

        let probes = UsbScanner::new(FakeHost(vec![locked, no_serial]))
            .scan(&catalog(), VerboseLevel::Normal)
            .unwrap();

        assert_eq!(probes.len(), 2);
        assert_eq!(probes[0].manufacturer, NO_STRING);
        assert_eq!(probes[0].product, NO_STRING);
        assert_eq!(probes[0].serial, NO_STRING);
        assert_eq!(probes[1].manufacturer, "ACME");
        assert_eq!(probes[1].serial, NO_STRING);
    }

    #[test]
    fn test_descriptor_failure_aborts_scan() {
        let mut broken = FakeDevice::new(3, 9, 0x046d, 0xc52b);
        broken.descriptor_ok = false;
        let host = FakeHost(vec![FakeDevice::new(1, 7, 0x0403, 0x6010), broken]);

        let err = UsbScanner::new(host)
            .scan(&catalog(), VerboseLevel::Normal)
            .unwrap_err();
        assert!(matches!(err, ScanError::Descriptor { bus: 3, address: 9, .. }));
    }

    #[test]
    fn test_identical_probes_stay_distinct() {
        let host = FakeHost(vec![
            FakeDevice::new(1, 7, 0x0403, 0x6010),
            FakeDevice::new(1, 7, 0x0403, 0x6010),
        ]);
        let probes = UsbScanner::new(host)
            .scan(&catalog(), VerboseLevel::Normal)
            .unwrap();
        assert_eq!(probes.len(), 2);
        assert_eq!(probes[0], probes[1]);
    }
}
