// Licensed under the Apache-2.0 license

use thiserror::Error;

/// Errors returned while validating or encoding an FMP payload header.
///
/// Every variant is an invalid-argument condition: the caller supplied a buffer that is
/// not a well formed version 1 payload header. Unmet dependencies are not errors and are
/// reported through the verdict of [`crate::verify_dependencies`] instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadHeaderError {
    #[error("fixed header does not fit inside a payload of {payload_size} bytes")]
    TruncatedHeader { payload_size: usize },
    #[error("declared header size {header_size} is smaller than the fixed header")]
    HeaderSizeTooSmall { header_size: u32 },
    #[error("declared header size {header_size} runs past the end of a {payload_size} byte payload")]
    HeaderSizeOutOfBounds { header_size: u32, payload_size: usize },
    #[error("invalid payload header signature 0x{0:08x}")]
    InvalidSignature(u32),
    #[error("dependency list of {0} bytes is not a whole number of descriptors")]
    InvalidDependencyListSize(usize),
    #[error("buffer too short, {required} bytes required")]
    BufferTooShort { required: usize },
    #[error("dependency list does not fit in the header size field")]
    TooManyDependencies,
}
