// Licensed under the Apache-2.0 license

use fmp_payload_pkg::{FirmwareInventory, PayloadManifest};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

fn setup() -> (Vec<u8>, FirmwareInventory) {
    // Several tests share the process; only the first logger install succeeds.
    let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();

    let manifest = PayloadManifest::parse_manifest_file(&PathBuf::from(
        "tests/manifests/manifest_two_dependencies.toml",
    ))
    .unwrap();
    let inventory =
        FirmwareInventory::parse_inventory_file(&PathBuf::from("tests/manifests/inventory.toml"))
            .unwrap();
    (manifest.encode().unwrap(), inventory)
}

#[test]
fn test_verify_satisfied() {
    let (payload, inventory) = setup();
    assert!(inventory.verify_payload(&payload).unwrap());
}

#[test]
fn test_verify_required_version_too_low() {
    let (payload, mut inventory) = setup();
    inventory.components[0].version = 0x0001_0001;
    assert!(!inventory.verify_payload(&payload).unwrap());

    // Newer than required is fine for a minimum version dependency
    inventory.components[0].version = 0x0002_0000;
    assert!(inventory.verify_payload(&payload).unwrap());
}

#[test]
fn test_verify_exact_version_mismatch() {
    let (payload, mut inventory) = setup();
    inventory.components[1].version = 6;
    assert!(!inventory.verify_payload(&payload).unwrap());
}

#[test]
fn test_verify_missing_components() {
    let (payload, mut inventory) = setup();

    // The second dependency is optional
    inventory.components.truncate(1);
    assert!(inventory.verify_payload(&payload).unwrap());

    // The first one is required
    inventory.components.clear();
    assert!(!inventory.verify_payload(&payload).unwrap());
}

#[test]
fn test_verify_image_index_mismatch() {
    let (payload, mut inventory) = setup();
    // Same component, different image; the optional dependency is then skipped
    inventory.components[1].image_index = 0;
    inventory.components[1].version = 9;
    assert!(inventory.verify_payload(&payload).unwrap());
}

#[test]
fn test_verify_invalid_payload() {
    let (mut payload, inventory) = setup();
    payload.truncate(16);
    assert!(inventory.verify_payload(&payload).is_err());
}
