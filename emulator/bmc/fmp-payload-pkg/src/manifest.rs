/*++

Licensed under the Apache-2.0 license.

--*/
use fmp_payload_header::{
    DependencyFlags, FmpPayloadHeader, FwDependency, PayloadHeaderBuilder,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::PackageError;

pub const MANIFEST_FILE_NAME: &str = "manifest.toml";
pub const IMAGE_FILE_NAME: &str = "image.bin";

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct PayloadManifest {
    pub payload_header_information: PayloadHeaderInformation,
    #[serde(default)]
    pub dependencies: Vec<DependencyInformation>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct PayloadHeaderInformation {
    pub fw_version: u32,
    pub lowest_supported_version: u32,
    pub image_location: Option<String>,
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>, // Filled when a payload is decoded
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DependencyInformation {
    pub component_id: Uuid,
    #[serde(default)]
    pub image_index: u8,
    pub required_version_in_system: u32,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub match_exact_version: bool,
    // Flag bits not defined by this header version, carried through unchanged
    #[serde(default)]
    pub additional_flags: u16,
}

impl PayloadHeaderInformation {
    fn verify(&self) -> Result<(), String> {
        if self.lowest_supported_version > self.fw_version {
            return Err(format!(
                "lowest_supported_version 0x{:X} is newer than fw_version 0x{:X}",
                self.lowest_supported_version, self.fw_version
            ));
        }
        Ok(())
    }
}

impl DependencyInformation {
    pub fn flags(&self) -> DependencyFlags {
        let mut flags = DependencyFlags::from_bits_retain(self.additional_flags);
        flags.set(DependencyFlags::REQUIRED, self.required);
        flags.set(DependencyFlags::MATCH_EXACT_VERSION, self.match_exact_version);
        flags
    }

    pub fn to_descriptor(&self) -> FwDependency {
        FwDependency::new(
            self.component_id,
            self.required_version_in_system,
            self.image_index,
            self.flags(),
        )
    }

    pub fn from_descriptor(dependency: &FwDependency) -> Self {
        DependencyInformation {
            component_id: dependency.component_id(),
            image_index: dependency.image_index,
            required_version_in_system: dependency.required_version(),
            required: dependency.is_required(),
            match_exact_version: dependency.match_exact_version(),
            additional_flags: dependency.unknown_flags(),
        }
    }

    fn verify(&self) -> Result<(), String> {
        if self.additional_flags & DependencyFlags::all().bits() != 0 {
            return Err(format!(
                "additional_flags 0x{:X} overlaps the required/match_exact_version bits",
                self.additional_flags
            ));
        }
        Ok(())
    }
}

impl PayloadManifest {
    pub fn verify(&self) -> Result<(), PackageError> {
        self.payload_header_information.verify().map_err(|e| {
            PackageError::InvalidManifest(format!("payload_header_information: {}", e))
        })?;

        for (index, dependency) in self.dependencies.iter().enumerate() {
            if let Err(e) = dependency.verify() {
                return Err(PackageError::InvalidManifest(format!(
                    "dependencies[{}]: {}",
                    index, e
                )));
            }
        }

        let descriptors = self.descriptors();
        self.builder(&descriptors).header_size()?;
        Ok(())
    }

    pub fn descriptors(&self) -> Vec<FwDependency> {
        self.dependencies
            .iter()
            .map(DependencyInformation::to_descriptor)
            .collect()
    }

    fn builder<'a>(&self, descriptors: &'a [FwDependency]) -> PayloadHeaderBuilder<'a> {
        PayloadHeaderBuilder {
            fw_version: self.payload_header_information.fw_version,
            lowest_supported_version: self.payload_header_information.lowest_supported_version,
            dependencies: descriptors,
        }
    }

    fn image(&self) -> Result<Vec<u8>, PackageError> {
        let info = &self.payload_header_information;
        let image = if let Some(location) = &info.image_location {
            fs::read(location).map_err(PackageError::io(location))?
        } else if let Some(data) = &info.image_data {
            data.clone()
        } else {
            return Err(PackageError::InvalidManifest(
                "no image data or location provided".to_string(),
            ));
        };
        if image.is_empty() {
            return Err(PackageError::EmptyImage);
        }
        Ok(image)
    }

    /// Builds the complete payload: header, dependency list, then the image.
    pub fn encode(&self) -> Result<Vec<u8>, PackageError> {
        self.verify()?;
        let descriptors = self.descriptors();
        let builder = self.builder(&descriptors);
        let image = self.image()?;

        let mut payload = vec![0u8; builder.header_size()? as usize];
        builder.encode(&mut payload)?;
        debug!(
            "Encoded payload header of {} bytes with {} dependencies",
            payload.len(),
            descriptors.len()
        );
        payload.extend_from_slice(&image);
        Ok(payload)
    }

    pub fn generate_payload(&self, output_file_path: &Path) -> Result<(), PackageError> {
        info!("Generating FMP payload: {}", output_file_path.display());
        let payload = self.encode()?;
        fs::write(output_file_path, payload).map_err(PackageError::io(output_file_path))
    }

    pub fn parse_manifest_file(file_path: &Path) -> Result<Self, PackageError> {
        let contents = fs::read_to_string(file_path).map_err(PackageError::io(file_path))?;
        let mut manifest: PayloadManifest =
            toml::from_str(&contents).map_err(|source| PackageError::Parse {
                path: file_path.to_path_buf(),
                source,
            })?;

        // Image locations are relative to the manifest
        if let (Some(location), Some(dir)) = (
            manifest.payload_header_information.image_location.as_mut(),
            file_path.parent(),
        ) {
            if Path::new(location).is_relative() {
                *location = dir.join(&*location).to_string_lossy().into_owned();
            }
        }

        manifest.verify()?;
        Ok(manifest)
    }

    /// Reconstructs a manifest from an encoded payload. The image is kept in `image_data`.
    ///
    /// A payload that ends at its header is rejected, as `encode` never produces one.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PackageError> {
        let header = FmpPayloadHeader::parse(payload)?;
        if header.image().is_empty() {
            return Err(PackageError::EmptyImage);
        }
        let dependencies = header
            .dependencies()?
            .iter()
            .map(DependencyInformation::from_descriptor)
            .collect();

        Ok(PayloadManifest {
            payload_header_information: PayloadHeaderInformation {
                fw_version: header.fw_version(),
                lowest_supported_version: header.lowest_supported_version(),
                image_location: None,
                image_data: Some(header.image().to_vec()),
            },
            dependencies,
        })
    }

    /// Decodes a payload file. When `output_dir_path` is given, the manifest and the image
    /// are written there as `manifest.toml` and `image.bin`.
    pub fn decode_payload(
        payload_file_path: &Path,
        output_dir_path: Option<&Path>,
    ) -> Result<Self, PackageError> {
        if let Some(dir) = output_dir_path {
            if !dir.is_dir() {
                return Err(PackageError::NotADirectory(dir.to_path_buf()));
            }
        }

        let payload = fs::read(payload_file_path).map_err(PackageError::io(payload_file_path))?;
        let mut manifest = Self::from_payload(&payload)?;

        if let Some(dir) = output_dir_path {
            let image_path: PathBuf = dir.join(IMAGE_FILE_NAME);
            let image = manifest
                .payload_header_information
                .image_data
                .as_deref()
                .unwrap_or_default();
            fs::write(&image_path, image).map_err(PackageError::io(&image_path))?;
            manifest.payload_header_information.image_location = Some(IMAGE_FILE_NAME.to_string());

            let manifest_path = dir.join(MANIFEST_FILE_NAME);
            let manifest_data = toml::to_string(&manifest)?;
            fs::write(&manifest_path, manifest_data).map_err(PackageError::io(&manifest_path))?;
            info!("Wrote {} and {}", manifest_path.display(), image_path.display());
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[payload_header_information]
fw_version = 0x00020001
lowest_supported_version = 0x00010000

[[dependencies]]
component_id = "8c2a8e3a-6d8f-4b0a-9a61-2a4a1b3c4d5e"
required_version_in_system = 0x00010002
required = true

[[dependencies]]
component_id = "1f5e2b77-0c3d-4e2a-8b1c-9d0e1f2a3b4c"
image_index = 2
required_version_in_system = 5
match_exact_version = true
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest: PayloadManifest = toml::from_str(MANIFEST).unwrap();
        manifest.verify().unwrap();
        assert_eq!(manifest.payload_header_information.fw_version, 0x0002_0001);
        assert_eq!(manifest.dependencies.len(), 2);
        assert_eq!(manifest.dependencies[0].image_index, 0);
        assert_eq!(manifest.dependencies[0].flags(), DependencyFlags::REQUIRED);
        assert_eq!(
            manifest.dependencies[1].flags(),
            DependencyFlags::MATCH_EXACT_VERSION
        );
    }

    #[test]
    fn test_verify_rejects_inverted_versions() {
        let mut manifest: PayloadManifest = toml::from_str(MANIFEST).unwrap();
        manifest.payload_header_information.lowest_supported_version = 0x0003_0000;
        assert!(matches!(
            manifest.verify(),
            Err(PackageError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_verify_rejects_overlapping_flags() {
        let mut manifest: PayloadManifest = toml::from_str(MANIFEST).unwrap();
        manifest.dependencies[1].additional_flags = 0x0001;
        let err = manifest.verify().unwrap_err();
        assert!(err.to_string().contains("dependencies[1]"));
    }

    #[test]
    fn test_encode_requires_image() {
        let manifest: PayloadManifest = toml::from_str(MANIFEST).unwrap();
        assert!(matches!(
            manifest.encode(),
            Err(PackageError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_encode_rejects_empty_image() {
        let mut manifest: PayloadManifest = toml::from_str(MANIFEST).unwrap();
        manifest.payload_header_information.image_data = Some(Vec::new());
        assert!(matches!(manifest.encode(), Err(PackageError::EmptyImage)));
    }

    #[test]
    fn test_from_payload_rejects_header_only() {
        let mut manifest: PayloadManifest = toml::from_str(MANIFEST).unwrap();
        manifest.payload_header_information.image_data = Some(vec![0x11; 4]);
        let payload = manifest.encode().unwrap();

        let header_only = &payload[..16 + 2 * 24];
        assert!(matches!(
            PayloadManifest::from_payload(header_only),
            Err(PackageError::EmptyImage)
        ));
        // One image byte is enough to decode, and the result encodes again.
        let decoded = PayloadManifest::from_payload(&payload[..16 + 2 * 24 + 1]).unwrap();
        assert_eq!(decoded.encode().unwrap(), &payload[..16 + 2 * 24 + 1]);
    }

    #[test]
    fn test_descriptor_conversion_keeps_unknown_flags() {
        let info = DependencyInformation {
            component_id: Uuid::from_u128(0x42),
            image_index: 1,
            required_version_in_system: 3,
            required: true,
            match_exact_version: false,
            additional_flags: 0x0400,
        };
        let descriptor = info.to_descriptor();
        assert_eq!(descriptor.flags().bits(), 0x0401);
        assert_eq!(DependencyInformation::from_descriptor(&descriptor), info);
    }

    #[test]
    fn test_from_payload() {
        let mut manifest: PayloadManifest = toml::from_str(MANIFEST).unwrap();
        manifest.payload_header_information.image_data = Some(vec![0xC3; 100]);
        let payload = manifest.encode().unwrap();
        assert_eq!(payload.len(), 16 + 2 * 24 + 100);

        let decoded = PayloadManifest::from_payload(&payload).unwrap();
        assert_eq!(decoded, manifest);
    }
}
