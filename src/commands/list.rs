//! List commands implementation

use fpgalink_core::catalog::Catalog;

/// List all known cables
pub fn list_cables(catalog: &Catalog) {
    println!("Known cables:");
    println!();
    println!(
        "{:<20} {:<11} {:<14} {:>7}",
        "Name", "vid:pid", "Transport", "Channel"
    );
    println!("{}", "-".repeat(55));

    for (name, cable) in catalog.cables() {
        let channel = cable
            .channel
            .map(|c| c.letter().to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<20} {:04x}:{:04x}  {:<14} {:>7}",
            name,
            cable.vendor_id,
            cable.product_id,
            cable.kind.name(),
            channel
        );
    }
}

/// List all known boards
pub fn list_boards(catalog: &Catalog) {
    println!("Known boards:");
    println!();
    println!(
        "{:<24} {:<18} {:<12} {:>10}",
        "Name", "Cable", "Vendor", "Frequency"
    );
    println!("{}", "-".repeat(67));

    for (name, board) in catalog.boards() {
        println!(
            "{:<24} {:<18} {:<12} {:>10}",
            name,
            board.cable,
            board.manufacturer,
            format_frequency(board.default_frequency)
        );
    }
}

/// List known FPGAs, optionally for one manufacturer
pub fn list_fpgas(catalog: &Catalog, manufacturer_filter: Option<&str>) {
    println!("Known FPGAs:");
    println!();
    println!(
        "{:<10} {:<12} {:<24} {:<16} {:>5}",
        "IDCODE", "Vendor", "Family", "Model", "IR"
    );
    println!("{}", "-".repeat(71));

    for (idcode, fpga) in catalog.fpgas() {
        if let Some(filter) = manufacturer_filter {
            if !fpga
                .manufacturer
                .to_lowercase()
                .contains(&filter.to_lowercase())
            {
                continue;
            }
        }

        println!(
            "0x{:08x} {:<12} {:<24} {:<16} {:>5}",
            idcode, fpga.manufacturer, fpga.family, fpga.model, fpga.ir_length
        );
    }
}

fn format_frequency(hz: u32) -> String {
    if hz >= 1_000_000 && hz % 1_000_000 == 0 {
        format!("{} MHz", hz / 1_000_000)
    } else if hz >= 1_000 && hz % 1_000 == 0 {
        format!("{} kHz", hz / 1_000)
    } else {
        format!("{} Hz", hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_frequency() {
        assert_eq!(format_frequency(6_000_000), "6 MHz");
        assert_eq!(format_frequency(500_000), "500 kHz");
        assert_eq!(format_frequency(1_500_000), "1500 kHz");
        assert_eq!(format_frequency(999), "999 Hz");
    }
}
