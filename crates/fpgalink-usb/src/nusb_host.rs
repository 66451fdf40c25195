//! Host stack backed by `nusb`

use std::num::NonZeroU8;
use std::time::Duration;

use nusb::descriptors::language_id::US_ENGLISH;
use nusb::MaybeFuture;

use crate::host::{DeviceDescriptor, StringDescriptors, StringField, UsbDevice, UsbHost};
use crate::ScanError;

/// Control transfer timeout for string descriptor reads
const STRING_TIMEOUT: Duration = Duration::from_millis(500);

/// The system USB stack
#[derive(Debug, Clone, Copy, Default)]
pub struct NusbHost;

impl UsbHost for NusbHost {
    type Device = nusb::DeviceInfo;

    fn devices(&self) -> Result<Vec<nusb::DeviceInfo>, ScanError> {
        let devices = nusb::list_devices()
            .wait()
            .map_err(|e| ScanError::Enumerate(e.to_string()))?;
        Ok(devices.collect())
    }
}

impl UsbDevice for nusb::DeviceInfo {
    type Handle = NusbHandle;

    fn bus_number(&self) -> u8 {
        self.busnum()
    }

    fn device_address(&self) -> u8 {
        nusb::DeviceInfo::device_address(self)
    }

    fn descriptor(&self) -> Result<DeviceDescriptor, ScanError> {
        Ok(DeviceDescriptor {
            vendor_id: self.vendor_id(),
            product_id: self.product_id(),
        })
    }

    fn open(&self) -> Result<NusbHandle, ScanError> {
        let device = nusb::DeviceInfo::open(self)
            .wait()
            .map_err(|e| ScanError::Open(e.to_string()))?;
        Ok(NusbHandle { device })
    }
}

/// An open `nusb` device, closed on drop
pub struct NusbHandle {
    device: nusb::Device,
}

impl NusbHandle {
    fn string_index(&self, field: StringField) -> Option<NonZeroU8> {
        let desc = self.device.device_descriptor();
        match field {
            StringField::Manufacturer => desc.manufacturer_string_index(),
            StringField::Product => desc.product_string_index(),
            StringField::Serial => desc.serial_number_string_index(),
        }
    }
}

impl StringDescriptors for NusbHandle {
    fn read(&self, field: StringField) -> Result<String, ScanError> {
        let index = self
            .string_index(field)
            .ok_or_else(|| ScanError::StringRead(format!("device has no {:?} string", field)))?;

        self.device
            .get_string_descriptor(index, US_ENGLISH, STRING_TIMEOUT)
            .wait()
            .map_err(|e| ScanError::StringRead(e.to_string()))
    }
}
