//! fpgalink - FPGA probe loader
//!
//! Finds USB programming probes, walks the JTAG chain behind them and hands
//! the selected FPGA to a manufacturer backend. Boards can also be driven
//! through the AT-command serial link some probes carry on a second FTDI
//! channel.
//!
//! # Architecture
//!
//! All the logic lives in the library crates; this binary only maps the
//! command line onto a [`fpgalink_session::Session`]:
//! - `fpgalink-core` resolves board, cable and override settings and runs
//!   the chain dispatcher
//! - `fpgalink-usb` enumerates probes
//! - `fpgalink-ftdi` provides the MPSSE JTAG and AT-command transports

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, ProbeArgs};
use fpgalink_core::catalog::Catalog;
use fpgalink_core::chain::{Dispatch, ProgramRequest};
use fpgalink_core::config::{ConfigRequest, Operations};
use fpgalink_core::VerboseLevel;
use fpgalink_session::Session;

use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    if cli.quiet {
        log::set_max_level(log::LevelFilter::Error);
    } else {
        match cli.verbose {
            0 => {} // default (info)
            1 => log::set_max_level(log::LevelFilter::Debug),
            _ => log::set_max_level(log::LevelFilter::Trace),
        }
    }

    let verbosity = if cli.quiet {
        VerboseLevel::Quiet
    } else {
        VerboseLevel::from_level(cli.verbose.min(2) as i8)
    };

    // Load catalog
    let catalog = match load_catalog(cli.catalog.as_deref()) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Failed to load catalog: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("Loaded {} catalog entries", catalog.len());

    match cli.command {
        Commands::ListCables => {
            commands::list_cables(&catalog);
            Ok(())
        }
        Commands::ListBoards => {
            commands::list_boards(&catalog);
            Ok(())
        }
        Commands::ListFpga { manufacturer } => {
            commands::list_fpgas(&catalog, manufacturer.as_deref());
            Ok(())
        }
        Commands::ScanUsb => {
            let mut session = open_session(catalog, verbosity);
            let probes = session.scan_usb()?;
            commands::print_probes(probes);
            Ok(())
        }
        Commands::Detect { probe } => {
            let mut session = open_session(catalog, verbosity);
            let request = config_request(&mut session, &probe, Operations::empty())?;
            let actions = ProgramRequest {
                detect: true,
                ..Default::default()
            };

            // The dispatcher already logs every entry
            if let Dispatch::Detected(entries) = session.program(&request, &actions)? {
                println!("{}", commands::chain_summary(&entries, session.catalog()));
            }
            Ok(())
        }
        Commands::Program {
            probe,
            bitstream,
            secondary_bitstream,
            file_type,
            write_flash,
            write_sram,
            dump_flash,
            external_flash,
            target_flash,
            flash_sector,
            mcufw,
            offset,
            file_size,
            verify,
            reset,
            unprotect_flash,
            bulk_erase,
            protect_flash,
            index_chain,
            bridge,
            skip_load_bridge,
            skip_reset,
        } => {
            let mut operations = Operations::empty();
            operations.set(Operations::FLASH_WRITE, write_flash);
            operations.set(Operations::SRAM_WRITE, write_sram);
            operations.set(Operations::FLASH_DUMP, dump_flash);
            operations.set(Operations::EXTERNAL_FLASH, external_flash);

            let mut session = open_session(catalog, verbosity);
            let request = config_request(&mut session, &probe, operations)?;
            let actions = ProgramRequest {
                bit_file: bitstream,
                secondary_bit_file: secondary_bitstream,
                file_type,
                bridge_path: bridge,
                offset,
                file_size,
                verify,
                reset,
                unprotect_flash,
                bulk_erase_flash: bulk_erase,
                protect_mask: protect_flash,
                index_chain,
                detect: false,
                skip_load_bridge,
                skip_reset,
                target_flash,
                flash_sector,
                mcufw,
            };

            if let Dispatch::Executed(target) = session.program(&request, &actions)? {
                log::info!(
                    "Done with {} {} at chain index {}",
                    target.model.family,
                    target.model.model,
                    target.index
                );
            }
            Ok(())
        }
        Commands::Send {
            cable,
            command,
            crlf,
        } => {
            let mut session = open_session(catalog, verbosity);
            let mut bytes = command.into_bytes();
            if crlf {
                bytes.extend_from_slice(b"\r\n");
            }

            let response = session.try_send_command(&cable, &bytes)?;
            println!("{}", response.trim_end());
            Ok(())
        }
    }
}

fn open_session(catalog: Catalog, verbosity: VerboseLevel) -> Session {
    let mut session = Session::new(catalog);
    session.set_verbosity(verbosity);
    session
}

/// Build a configuration request from the command line
///
/// With `--probe-index`, a fresh scan is run and the chosen probe pins the
/// USB identity unless the matching option was given explicitly.
fn config_request(
    session: &mut Session,
    args: &ProbeArgs,
    operations: Operations,
) -> Result<ConfigRequest, Box<dyn std::error::Error>> {
    let mut request = ConfigRequest {
        board: args.board.clone(),
        cable: args.cable.clone(),
        pins: args.pins,
        frequency: args.freq,
        ftdi_channel: args.ftdi_channel,
        ftdi_serial: args.ftdi_serial.clone(),
        vendor_id: args.vid,
        product_id: args.pid,
        bus_address: args.busdev_num.map(|(bus, _)| bus),
        device_address: args.busdev_num.map(|(_, dev)| dev),
        cable_index: args.cable_index,
        fpga_part: args.fpga_part.clone(),
        operations,
    };

    if let Some(index) = args.probe_index {
        session.scan_usb()?;
        let probe = session.select_usb(index)?;

        request.vendor_id = request.vendor_id.or(Some(probe.vendor_id));
        request.product_id = request.product_id.or(Some(probe.product_id));
        request.bus_address = request.bus_address.or(Some(probe.bus_address));
        request.device_address = request.device_address.or(Some(probe.device_address));
    }

    Ok(request)
}

/// Catalog directories searched when `--catalog` is not given
const DEFAULT_CATALOG_DIRS: &[&str] = &[
    "catalog",
    "/usr/share/fpgalink/catalog",
    "/usr/local/share/fpgalink/catalog",
];

/// Load the builtin catalog, extended from the specified path or default locations
fn load_catalog(path: Option<&Path>) -> Result<Catalog, Box<dyn std::error::Error>> {
    let mut catalog = Catalog::builtin()?;

    match path {
        Some(path) if path.is_dir() => {
            catalog.load_dir(path)?;
        }
        Some(path) if path.is_file() => {
            catalog.load_file(path)?;
        }
        Some(path) => {
            return Err(format!("Catalog path not found: {}", path.display()).into());
        }
        None => {
            let dirs: Vec<PathBuf> = DEFAULT_CATALOG_DIRS.iter().map(PathBuf::from).collect();
            if load_extra_dirs(&mut catalog, &dirs) == 0 {
                log::debug!("No extra catalog directory found, using the builtin catalog only");
            }
        }
    }

    Ok(catalog)
}

/// Merge every readable directory in `dirs`, returning how many were loaded
///
/// A directory that fails to load is skipped with a warning; files merged
/// before the failure stay in the catalog.
fn load_extra_dirs(catalog: &mut Catalog, dirs: &[PathBuf]) -> usize {
    let mut loaded = 0;

    for dir in dirs.iter().filter(|d| d.is_dir()) {
        match catalog.load_dir(dir) {
            Ok(count) => {
                log::debug!("Loaded {} entries from {}", count, dir.display());
                loaded += 1;
            }
            Err(e) => log::warn!("Failed to load catalog from {}: {}", dir.display(), e),
        }
    }

    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_extra_dirs_counts_loaded_directories() {
        let good = tempfile::tempdir().unwrap();
        fs::write(
            good.path().join("lab.ron"),
            r#"(cables: { "lab-probe": (vid: 0x1209, pid: 0x0001, kind: Other) })"#,
        )
        .unwrap();

        let bad = tempfile::tempdir().unwrap();
        fs::write(bad.path().join("broken.ron"), "(cables: {").unwrap();

        let mut catalog = Catalog::new();
        let dirs = vec![
            good.path().to_path_buf(),
            bad.path().to_path_buf(),
            good.path().join("missing"),
        ];
        assert_eq!(load_extra_dirs(&mut catalog, &dirs), 1);
        assert!(catalog.cable("lab-probe").is_some());

        assert_eq!(load_extra_dirs(&mut Catalog::new(), &dirs[1..]), 0);
    }

    #[test]
    fn test_load_catalog_rejects_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ron");
        assert!(load_catalog(Some(missing.as_path())).is_err());

        let file = dir.path().join("extra.ron");
        fs::write(
            &file,
            r#"(cables: { "bench": (vid: 0x1209, pid: 0x0002, kind: Other) })"#,
        )
        .unwrap();
        let catalog = load_catalog(Some(file.as_path())).unwrap();
        assert!(catalog.cable("bench").is_some());
        assert!(catalog.len() > 1);
    }
}
