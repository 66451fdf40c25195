//! Probe and chain listings

use fpgalink_core::catalog::Catalog;
use fpgalink_core::chain::{ChainEntry, EntryKind};
use fpgalink_core::probe::scan_header;
use fpgalink_core::ProbeDescriptor;

/// Print a scan result, one probe per line with its selection index
pub fn print_probes(probes: &[ProbeDescriptor]) {
    if probes.is_empty() {
        println!("No USB probe found");
        return;
    }

    println!("#   {}", scan_header());
    for (index, probe) in probes.iter().enumerate() {
        println!("{:<3} {}", index, probe);
    }
}

/// One-line summary of a walked chain
pub fn chain_summary(entries: &[ChainEntry], catalog: &Catalog) -> String {
    let fpgas = entries
        .iter()
        .filter(|e| matches!(e.classify(catalog), EntryKind::Fpga(_)))
        .count();
    format!(
        "JTAG chain: {} device(s), {} known FPGA(s)",
        entries.len(),
        fpgas
    )
}
