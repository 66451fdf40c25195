//! Probe descriptors produced by USB enumeration

use std::fmt;

/// Placeholder used when a string descriptor cannot be read
pub const NO_STRING: &str = "none";

/// A USB device recognised as a programming probe
///
/// Two descriptors with the same `(bus, device, vid, pid)` identity are still
/// distinct values; de-duplication is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeDescriptor {
    /// USB bus number
    pub bus_address: u8,
    /// USB device address on the bus
    pub device_address: u8,
    /// Vendor ID
    pub vendor_id: u16,
    /// Product ID
    pub product_id: u16,
    /// Probe type name (FTDI chip name or catalog cable name)
    pub probe_type: String,
    /// Manufacturer string descriptor, or `"none"`
    pub manufacturer: String,
    /// Serial number string descriptor, or `"none"`
    pub serial: String,
    /// Product string descriptor, or `"none"`
    pub product: String,
}

impl ProbeDescriptor {
    /// `(bus, device, vid, pid)` identity tuple
    pub fn identity(&self) -> (u8, u8, u16, u16) {
        (
            self.bus_address,
            self.device_address,
            self.vendor_id,
            self.product_id,
        )
    }
}

impl fmt::Display for ProbeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03} {:03}    0x{:04x}:0x{:04x} {:<15} {:<12} {:<20} {}",
            self.bus_address,
            self.device_address,
            self.vendor_id,
            self.product_id,
            self.probe_type,
            self.manufacturer,
            self.serial,
            self.product
        )
    }
}

/// Header line matching the [`ProbeDescriptor`] display format
pub fn scan_header() -> String {
    format!(
        "{:3} {:3} {:<13} {:<15} {:<12} {:<20} {}",
        "Bus", "device", "vid:pid", "probe type", "manufacturer", "serial", "product"
    )
}
