// Licensed under the Apache-2.0 license

use crate::dependency::{FwDependency, FW_DEPENDENCY_SIZE};
use crate::error::PayloadHeaderError;
use crate::header::{
    FmpPayloadHeaderFixed, FMP_PAYLOAD_HEADER_FIXED_SIZE, FMP_PAYLOAD_HEADER_SIGNATURE,
};
use zerocopy::byteorder::U32;
use zerocopy::IntoBytes;

/// Writes a version 1 payload header.
///
/// The encoded header is the fixed header followed by `dependencies` in order. The
/// firmware image is not part of the header and is appended by the caller.
#[derive(Debug, Clone, Copy)]
pub struct PayloadHeaderBuilder<'a> {
    pub fw_version: u32,
    pub lowest_supported_version: u32,
    pub dependencies: &'a [FwDependency],
}

impl PayloadHeaderBuilder<'_> {
    /// Value of the header size field, fixed header and dependency list included.
    pub fn header_size(&self) -> Result<u32, PayloadHeaderError> {
        self.dependencies
            .len()
            .checked_mul(FW_DEPENDENCY_SIZE)
            .and_then(|bytes| bytes.checked_add(FMP_PAYLOAD_HEADER_FIXED_SIZE))
            .and_then(|size| u32::try_from(size).ok())
            .ok_or(PayloadHeaderError::TooManyDependencies)
    }

    /// Encodes the header into the start of `buffer` and returns the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PayloadHeaderError> {
        let header_size = self.header_size()?;
        let required = header_size as usize;
        if buffer.len() < required {
            return Err(PayloadHeaderError::BufferTooShort { required });
        }

        let fixed = FmpPayloadHeaderFixed {
            signature: U32::new(FMP_PAYLOAD_HEADER_SIGNATURE),
            header_size: U32::new(header_size),
            fw_version: U32::new(self.fw_version),
            lowest_supported_version: U32::new(self.lowest_supported_version),
        };
        let (header, rest) = buffer.split_at_mut(FMP_PAYLOAD_HEADER_FIXED_SIZE);
        header.copy_from_slice(fixed.as_bytes());
        rest[..required - FMP_PAYLOAD_HEADER_FIXED_SIZE]
            .copy_from_slice(self.dependencies.as_bytes());
        Ok(required)
    }
}
