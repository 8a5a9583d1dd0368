// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

mod cargo;
mod fmp_payload;
mod header;

pub(crate) static PROJECT_ROOT: LazyLock<PathBuf> = LazyLock::new(|| {
    let current_dir = std::env::current_dir().unwrap_or_default();
    option_env!("CARGO_MANIFEST_DIR")
        .map(Path::new)
        .filter(|p| p.exists())
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(current_dir)
});

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Xtask {
    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run clippy on all targets
    Clippy,
    /// Check that all files are formatted
    Format,
    /// Run pre-check-in checks
    Precheckin,
    /// Check cargo lock
    CargoLock,
    /// Check files for Apache license header
    HeaderCheck,
    /// Add Apache license header to files where it is missing
    HeaderFix,
    /// Run tests
    Test,
    /// Utility to create, parse and check FMP payloads
    FmpPayload {
        #[command(subcommand)]
        subcommand: FmpPayloadCommands,
    },
}

#[derive(Subcommand)]
enum FmpPayloadCommands {
    /// Encode a manifest TOML file to an FMP payload
    Create {
        /// Path to the manifest TOML file
        #[arg(short, long, value_name = "MANIFEST", required = true)]
        manifest: PathBuf,

        /// Output file for the payload
        #[arg(short, long, value_name = "FILE", required = true)]
        file: PathBuf,
    },
    /// Decode an FMP payload to a manifest and image
    Decode {
        /// Path to the payload file
        #[arg(short, long, value_name = "PAYLOAD", required = true)]
        payload: PathBuf,

        /// Output directory for manifest and image
        #[arg(short, long, value_name = "DIRECTORY", required = true)]
        dir: PathBuf,
    },
    /// Check payload dependencies against an inventory of installed firmware
    Verify {
        /// Path to the payload file
        #[arg(short, long, value_name = "PAYLOAD", required = true)]
        payload: PathBuf,

        /// Path to the inventory TOML file
        #[arg(short, long, value_name = "INVENTORY", required = true)]
        inventory: PathBuf,
    },
}

fn main() {
    let cli = Xtask::parse();
    let result = match &cli.xtask {
        Commands::Clippy => cargo::clippy(),
        Commands::Precheckin => cargo::precheckin(),
        Commands::Format => cargo::format(),
        Commands::CargoLock => cargo::cargo_lock(),
        Commands::HeaderFix => header::fix(),
        Commands::HeaderCheck => header::check(),
        Commands::Test => cargo::test(),
        Commands::FmpPayload { subcommand } => match subcommand {
            FmpPayloadCommands::Create { manifest, file } => fmp_payload::create(manifest, file),
            FmpPayloadCommands::Decode { payload, dir } => fmp_payload::decode(payload, dir),
            FmpPayloadCommands::Verify { payload, inventory } => {
                fmp_payload::verify(payload, inventory)
            }
        },
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}
