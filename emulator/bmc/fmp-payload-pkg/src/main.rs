/*++

Licensed under the Apache-2.0 license.

--*/
use clap::{Arg, ArgAction, ArgMatches, Command};
/// FMP Payload Tool
///
/// Builds and inspects FMP payloads: a version 1 payload header, its dependency list,
/// and the firmware image that follows them.
///
/// This CLI tool provides the following subcommands:
/// - `encode`: Convert a manifest TOML file and its image into a payload.
/// - `decode`: Convert a payload back into a manifest TOML file and its image.
/// - `verify`: Check the payload dependencies against an inventory of installed firmware.
///
/// # Examples
///
/// ```bash
/// fmp-payload-pkg encode --manifest manifest.toml --file payload.bin
/// fmp-payload-pkg decode --payload payload.bin --directory output
/// fmp-payload-pkg verify --payload payload.bin --inventory inventory.toml
/// ```
///
use fmp_payload_pkg::{FirmwareInventory, PayloadManifest};
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use std::error::Error;
use std::path::PathBuf;

fn path_arg(matches: &ArgMatches, id: &str) -> Result<PathBuf, Box<dyn Error>> {
    matches
        .get_one::<PathBuf>(id)
        .cloned()
        .ok_or_else(|| format!("missing argument --{}", id).into())
}

fn main() -> Result<(), Box<dyn Error>> {
    let path = || {
        Arg::new("")
            .value_parser(clap::value_parser!(PathBuf))
            .required(true)
    };
    let matches = Command::new("FMP Payload Tool")
        .version("1.0")
        .about("Encodes, decodes and verifies FMP payloads")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("encode")
                .about("Encodes a manifest TOML file to a payload")
                .arg(
                    path()
                        .id("manifest")
                        .short('m')
                        .long("manifest")
                        .value_name("MANIFEST")
                        .help("Path to the manifest TOML file"),
                )
                .arg(
                    path()
                        .id("file")
                        .short('f')
                        .long("file")
                        .value_name("FILE")
                        .help("Output file for the payload"),
                ),
        )
        .subcommand(
            Command::new("decode")
                .about("Decodes a payload to a manifest and image")
                .arg(
                    path()
                        .id("payload")
                        .short('p')
                        .long("payload")
                        .value_name("PAYLOAD")
                        .help("Path to the payload file"),
                )
                .arg(
                    path()
                        .id("dir")
                        .short('d')
                        .long("directory")
                        .value_name("DIRECTORY")
                        .help("Output directory for manifest and image"),
                ),
        )
        .subcommand(
            Command::new("verify")
                .about("Checks payload dependencies against installed firmware")
                .arg(
                    path()
                        .id("payload")
                        .short('p')
                        .long("payload")
                        .value_name("PAYLOAD")
                        .help("Path to the payload file"),
                )
                .arg(
                    path()
                        .id("inventory")
                        .short('i')
                        .long("inventory")
                        .value_name("INVENTORY")
                        .help("Path to the inventory TOML file"),
                ),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    match matches.subcommand() {
        Some(("encode", sub_matches)) => {
            let manifest_path = path_arg(sub_matches, "manifest")?;
            let output_path = path_arg(sub_matches, "file")?;
            let manifest = PayloadManifest::parse_manifest_file(&manifest_path)?;
            manifest.generate_payload(&output_path)?;
            info!("Encoded payload to binary file: {}", output_path.display());
        }
        Some(("decode", sub_matches)) => {
            let payload_path = path_arg(sub_matches, "payload")?;
            let output_dir = path_arg(sub_matches, "dir")?;
            let manifest =
                PayloadManifest::decode_payload(&payload_path, Some(output_dir.as_path()))?;
            info!(
                "Decoded payload (fw version 0x{:X}, {} dependencies) to directory: {}",
                manifest.payload_header_information.fw_version,
                manifest.dependencies.len(),
                output_dir.display()
            );
        }
        Some(("verify", sub_matches)) => {
            let payload_path = path_arg(sub_matches, "payload")?;
            let inventory_path = path_arg(sub_matches, "inventory")?;
            let inventory = FirmwareInventory::parse_inventory_file(&inventory_path)?;
            let payload = std::fs::read(&payload_path)?;
            if inventory.verify_payload(&payload)? {
                info!("All dependencies satisfied");
            } else {
                error!("Dependencies not satisfied");
                std::process::exit(1);
            }
        }
        _ => {
            println!("Use one of the 'encode', 'decode' or 'verify' subcommands.");
            std::process::exit(1);
        }
    }

    Ok(())
}
