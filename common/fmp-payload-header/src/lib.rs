// Licensed under the Apache-2.0 license

//! Version 1 FMP payload header.
//!
//! An FMP payload starts with a small fixed header followed by a list of dependency
//! descriptors, and then the firmware image itself. This crate validates the header,
//! exposes its fields, and checks the dependency list against the firmware currently
//! installed on the system.

#![cfg_attr(target_arch = "riscv32", no_std)]

pub mod codec;
pub mod dependency;
pub mod error;
pub mod header;
pub mod verifier;

pub use codec::PayloadHeaderBuilder;
pub use dependency::{DependencyFlags, FwDependency, FW_DEPENDENCY_SIZE};
pub use error::PayloadHeaderError;
pub use header::{
    get_fw_version, get_header_size, get_lowest_supported_version, FmpPayloadHeader,
    FmpPayloadHeaderFixed, FMP_PAYLOAD_HEADER_FIXED_SIZE, FMP_PAYLOAD_HEADER_SIGNATURE,
};
pub use verifier::{
    verify_dependencies, verify_dependencies_with_observer, ComponentRegistry,
    InstalledComponent, LogObserver, VerifyEvent, VerifyObserver,
};
