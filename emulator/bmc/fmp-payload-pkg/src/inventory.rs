// Licensed under the Apache-2.0 license

use fmp_payload_header::{verify_dependencies, ComponentRegistry, InstalledComponent};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::error::PackageError;

/// Firmware installed on a system, described in TOML. Used in place of the platform's
/// component registry when checking payload dependencies on the host.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct FirmwareInventory {
    #[serde(default)]
    pub components: Vec<InstalledFirmware>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InstalledFirmware {
    pub component_id: Uuid,
    #[serde(default)]
    pub image_index: u8,
    pub version: u32,
    pub name: Option<String>,
}

impl InstalledComponent for InstalledFirmware {
    fn version(&self) -> u32 {
        self.version
    }
}

impl ComponentRegistry for FirmwareInventory {
    type Component = InstalledFirmware;

    fn lookup(&self, component_id: &Uuid, image_index: u8) -> Option<InstalledFirmware> {
        let found = self
            .components
            .iter()
            .find(|c| c.component_id == *component_id && c.image_index == image_index)
            .cloned();
        debug!(
            "Inventory lookup {} (image index {}): {:?}",
            component_id,
            image_index,
            found.as_ref().map(|c| c.version)
        );
        found
    }
}

impl FirmwareInventory {
    pub fn verify(&self) -> Result<(), PackageError> {
        let mut seen = HashSet::new();
        for (index, component) in self.components.iter().enumerate() {
            if !seen.insert((component.component_id, component.image_index)) {
                return Err(PackageError::InvalidInventory(format!(
                    "components[{}]: {} image index {} is listed more than once",
                    index, component.component_id, component.image_index
                )));
            }
        }
        Ok(())
    }

    pub fn parse_inventory_file(file_path: &Path) -> Result<Self, PackageError> {
        let contents = fs::read_to_string(file_path).map_err(PackageError::io(file_path))?;
        let inventory: FirmwareInventory =
            toml::from_str(&contents).map_err(|source| PackageError::Parse {
                path: file_path.to_path_buf(),
                source,
            })?;
        inventory.verify()?;
        Ok(inventory)
    }

    /// Checks the dependencies of an encoded payload against this inventory.
    pub fn verify_payload(&self, payload: &[u8]) -> Result<bool, PackageError> {
        Ok(verify_dependencies(payload, self)?)
    }
}
