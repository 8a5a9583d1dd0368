// Licensed under the Apache-2.0 license

use anyhow::{bail, Context, Result};
use fmp_payload_pkg::{FirmwareInventory, PayloadManifest};
use std::path::Path;

pub(crate) fn create(manifest_path: &Path, output_path: &Path) -> Result<()> {
    let manifest = PayloadManifest::parse_manifest_file(manifest_path)
        .with_context(|| format!("Failed to parse manifest file: {}", manifest_path.display()))?;
    manifest
        .generate_payload(output_path)
        .context("Failed to generate FMP payload")?;
    println!("Encoded FMP payload to binary file: {}", output_path.display());
    Ok(())
}

pub(crate) fn decode(payload_path: &Path, output_path: &Path) -> Result<()> {
    PayloadManifest::decode_payload(payload_path, Some(output_path))
        .with_context(|| format!("Failed to decode FMP payload: {}", payload_path.display()))?;
    println!("Decoded FMP payload to directory: {}", output_path.display());
    Ok(())
}

pub(crate) fn verify(payload_path: &Path, inventory_path: &Path) -> Result<()> {
    let inventory = FirmwareInventory::parse_inventory_file(inventory_path)?;
    let payload = std::fs::read(payload_path)
        .with_context(|| format!("Failed to read {}", payload_path.display()))?;
    if !inventory.verify_payload(&payload)? {
        bail!(
            "{} has dependencies not satisfied by {}",
            payload_path.display(),
            inventory_path.display()
        );
    }
    println!("All dependencies of {} are satisfied", payload_path.display());
    Ok(())
}
