// Licensed under the Apache-2.0 license

use bitflags::bitflags;
use core::mem::size_of;
use uuid::Uuid;
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const FW_DEPENDENCY_SIZE: usize = size_of::<FwDependency>();

bitflags! {
    /// Policy bits carried by each dependency descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DependencyFlags: u16 {
        /// The component must be present in the system. Without it a dependency only
        /// applies when the component happens to be installed.
        const REQUIRED = 0x0001;
        /// The installed version must equal the required version instead of meeting it.
        const MATCH_EXACT_VERSION = 0x0002;
    }
}

/// A dependency descriptor as laid out in the payload header.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
pub struct FwDependency {
    /// Component identifier in EFI GUID byte order.
    pub fmp_instance: [u8; 16],
    pub required_version_in_system: U32<LittleEndian>,
    /// Matches the image index of the component's image descriptor.
    pub image_index: u8,
    pub reserved: u8,
    pub flags: U16<LittleEndian>,
}

/// Outcome of comparing one dependency against the installed version of its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyCheck {
    Satisfied,
    VersionTooLow,
    VersionNotExact,
}

impl FwDependency {
    pub fn new(
        component_id: Uuid,
        required_version_in_system: u32,
        image_index: u8,
        flags: DependencyFlags,
    ) -> Self {
        Self {
            fmp_instance: component_id.to_bytes_le(),
            required_version_in_system: U32::new(required_version_in_system),
            image_index,
            reserved: 0,
            flags: U16::new(flags.bits()),
        }
    }

    pub fn component_id(&self) -> Uuid {
        Uuid::from_bytes_le(self.fmp_instance)
    }

    pub fn required_version(&self) -> u32 {
        self.required_version_in_system.get()
    }

    /// All flag bits, including ones this header version does not define.
    pub fn flags(&self) -> DependencyFlags {
        DependencyFlags::from_bits_retain(self.flags.get())
    }

    pub fn is_required(&self) -> bool {
        self.flags().contains(DependencyFlags::REQUIRED)
    }

    pub fn match_exact_version(&self) -> bool {
        self.flags().contains(DependencyFlags::MATCH_EXACT_VERSION)
    }

    /// Flag bits outside of [`DependencyFlags::all`], zero when every bit is known.
    pub fn unknown_flags(&self) -> u16 {
        self.flags.get() & !DependencyFlags::all().bits()
    }

    /// Compares the required version against the version installed in the system.
    pub fn evaluate(&self, installed_version: u32) -> DependencyCheck {
        let required = self.required_version();
        if required > installed_version {
            DependencyCheck::VersionTooLow
        } else if self.match_exact_version() && required != installed_version {
            DependencyCheck::VersionNotExact
        } else {
            DependencyCheck::Satisfied
        }
    }
}
