//! Host stack abstraction

use crate::ScanError;

/// The three string descriptors read during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringField {
    /// iManufacturer
    Manufacturer,
    /// iProduct
    Product,
    /// iSerialNumber
    Serial,
}

/// Identity fields of a device descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// idVendor
    pub vendor_id: u16,
    /// idProduct
    pub product_id: u16,
}

/// An open device handle able to read string descriptors
///
/// The handle is closed when dropped.
pub trait StringDescriptors {
    /// Read one string descriptor as ASCII/UTF-8 text
    fn read(&self, field: StringField) -> Result<String, ScanError>;
}

/// One device as listed by the host stack
pub trait UsbDevice {
    /// Handle type returned by [`UsbDevice::open`]
    type Handle: StringDescriptors;

    /// Bus number
    fn bus_number(&self) -> u8;

    /// Device address on the bus
    fn device_address(&self) -> u8;

    /// Read the device descriptor
    fn descriptor(&self) -> Result<DeviceDescriptor, ScanError>;

    /// Open the device
    fn open(&self) -> Result<Self::Handle, ScanError>;
}

/// The USB host stack
pub trait UsbHost {
    /// Device type listed by this host
    type Device: UsbDevice;

    /// Take a fresh snapshot of the attached devices
    fn devices(&self) -> Result<Vec<Self::Device>, ScanError>;
}
