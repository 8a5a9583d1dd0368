// Licensed under the Apache-2.0 license

pub mod error;
pub mod inventory;
pub mod manifest;

pub use error::PackageError;
pub use inventory::FirmwareInventory;
pub use manifest::PayloadManifest;
