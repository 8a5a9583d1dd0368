// Licensed under the Apache-2.0 license

use crate::dependency::{FwDependency, FW_DEPENDENCY_SIZE};
use crate::error::PayloadHeaderError;
use core::mem::size_of;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Identifies a version 1 payload header. Bump the last character when the layout changes.
pub const FMP_PAYLOAD_HEADER_SIGNATURE: u32 = u32::from_le_bytes(*b"MSS1");
pub const FMP_PAYLOAD_HEADER_FIXED_SIZE: usize = size_of::<FmpPayloadHeaderFixed>();

#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
pub struct FmpPayloadHeaderFixed {
    pub signature: U32<LittleEndian>,
    /// Size of this fixed header plus the dependency list that follows it.
    pub header_size: U32<LittleEndian>,
    pub fw_version: U32<LittleEndian>,
    pub lowest_supported_version: U32<LittleEndian>,
}

/// Validates the fixed header at the start of `payload` and returns a view of it.
///
/// The payload must hold at least the fixed header, the declared header size must cover
/// the fixed header and must not run past the payload, and the signature must match.
/// Nothing beyond the fixed header is read.
fn validated_fixed_header(payload: &[u8]) -> Result<&FmpPayloadHeaderFixed, PayloadHeaderError> {
    let payload_size = payload.len();
    let (fixed, _) = FmpPayloadHeaderFixed::ref_from_prefix(payload)
        .map_err(|_| PayloadHeaderError::TruncatedHeader { payload_size })?;

    let header_size = fixed.header_size.get();
    if header_size < FMP_PAYLOAD_HEADER_FIXED_SIZE as u32 {
        return Err(PayloadHeaderError::HeaderSizeTooSmall { header_size });
    }
    match usize::try_from(header_size) {
        Ok(end) if end <= payload_size => {}
        _ => {
            return Err(PayloadHeaderError::HeaderSizeOutOfBounds {
                header_size,
                payload_size,
            })
        }
    }

    let signature = fixed.signature.get();
    if signature != FMP_PAYLOAD_HEADER_SIGNATURE {
        return Err(PayloadHeaderError::InvalidSignature(signature));
    }
    Ok(fixed)
}

/// Field getters additionally require the fixed header to end strictly before the end of
/// the payload, so a buffer holding nothing but the fixed header is rejected.
fn getter_fixed_header(payload: &[u8]) -> Result<&FmpPayloadHeaderFixed, PayloadHeaderError> {
    let payload_size = payload.len();
    if FMP_PAYLOAD_HEADER_FIXED_SIZE >= payload_size {
        return Err(PayloadHeaderError::TruncatedHeader { payload_size });
    }
    validated_fixed_header(payload)
}

/// Returns the size in bytes of the payload header, dependency list included.
pub fn get_header_size(payload: &[u8]) -> Result<u32, PayloadHeaderError> {
    getter_fixed_header(payload).map(|fixed| fixed.header_size.get())
}

/// Returns the firmware version carried by the payload.
pub fn get_fw_version(payload: &[u8]) -> Result<u32, PayloadHeaderError> {
    getter_fixed_header(payload).map(|fixed| fixed.fw_version.get())
}

/// Returns the lowest version the payload supports.
pub fn get_lowest_supported_version(payload: &[u8]) -> Result<u32, PayloadHeaderError> {
    getter_fixed_header(payload).map(|fixed| fixed.lowest_supported_version.get())
}

/// A validated view of a payload header borrowed from the payload buffer.
#[derive(Debug, Clone, Copy)]
pub struct FmpPayloadHeader<'a> {
    fixed: &'a FmpPayloadHeaderFixed,
    dependency_bytes: &'a [u8],
    image: &'a [u8],
}

impl<'a> FmpPayloadHeader<'a> {
    /// Validates the header at the start of `payload`. Unlike the field getters, a payload
    /// that ends exactly at the declared header size is accepted.
    pub fn parse(payload: &'a [u8]) -> Result<Self, PayloadHeaderError> {
        let fixed = validated_fixed_header(payload)?;
        let header_end = fixed.header_size.get() as usize;
        let dependency_bytes = payload
            .get(FMP_PAYLOAD_HEADER_FIXED_SIZE..header_end)
            .ok_or(PayloadHeaderError::HeaderSizeOutOfBounds {
                header_size: fixed.header_size.get(),
                payload_size: payload.len(),
            })?;
        Ok(Self {
            fixed,
            dependency_bytes,
            image: &payload[header_end..],
        })
    }

    pub fn header_size(&self) -> u32 {
        self.fixed.header_size.get()
    }

    pub fn fw_version(&self) -> u32 {
        self.fixed.fw_version.get()
    }

    pub fn lowest_supported_version(&self) -> u32 {
        self.fixed.lowest_supported_version.get()
    }

    /// Raw bytes between the fixed header and the end of the declared header size.
    pub fn dependency_bytes(&self) -> &'a [u8] {
        self.dependency_bytes
    }

    /// The dependency descriptors, in the order they appear in the payload.
    pub fn dependencies(&self) -> Result<&'a [FwDependency], PayloadHeaderError> {
        let len = self.dependency_bytes.len();
        if len % FW_DEPENDENCY_SIZE != 0 {
            return Err(PayloadHeaderError::InvalidDependencyListSize(len));
        }
        <[FwDependency]>::ref_from_bytes(self.dependency_bytes)
            .map_err(|_| PayloadHeaderError::InvalidDependencyListSize(len))
    }

    /// The firmware image following the header.
    pub fn image(&self) -> &'a [u8] {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PayloadHeaderBuilder;
    use crate::dependency::DependencyFlags;
    use uuid::Uuid;

    fn build_payload(
        fw_version: u32,
        lowest_supported_version: u32,
        dependencies: &[FwDependency],
        image: &[u8],
    ) -> Vec<u8> {
        let builder = PayloadHeaderBuilder {
            fw_version,
            lowest_supported_version,
            dependencies,
        };
        let mut payload = vec![0u8; builder.header_size().unwrap() as usize + image.len()];
        let len = builder.encode(&mut payload).unwrap();
        payload[len..].copy_from_slice(image);
        payload
    }

    fn raw_header(signature: u32, header_size: u32) -> [u8; 20] {
        let mut raw = [0xAAu8; 20];
        raw[..4].copy_from_slice(&signature.to_le_bytes());
        raw[4..8].copy_from_slice(&header_size.to_le_bytes());
        raw[8..12].copy_from_slice(&3u32.to_le_bytes());
        raw[12..16].copy_from_slice(&1u32.to_le_bytes());
        raw
    }

    fn all_getters(payload: &[u8]) -> [Result<u32, PayloadHeaderError>; 3] {
        [
            get_header_size(payload),
            get_fw_version(payload),
            get_lowest_supported_version(payload),
        ]
    }

    #[test]
    fn test_signature_value() {
        assert_eq!(FMP_PAYLOAD_HEADER_FIXED_SIZE, 16);
        assert_eq!(
            FMP_PAYLOAD_HEADER_SIGNATURE,
            (b'M' as u32) | ((b'S' as u32) << 8) | ((b'S' as u32) << 16) | ((b'1' as u32) << 24)
        );
    }

    #[test]
    fn test_getters_round_trip() {
        let payload = build_payload(0x0001_0203, 0x0000_0100, &[], &[0x55; 8]);
        assert_eq!(get_header_size(&payload), Ok(16));
        assert_eq!(get_fw_version(&payload), Ok(0x0001_0203));
        assert_eq!(get_lowest_supported_version(&payload), Ok(0x0000_0100));

        // Repeated calls see the same values.
        assert_eq!(get_fw_version(&payload), Ok(0x0001_0203));
    }

    #[test]
    fn test_short_buffers_rejected() {
        let payload = build_payload(2, 1, &[], &[0x55; 4]);
        for len in 0..=FMP_PAYLOAD_HEADER_FIXED_SIZE {
            for result in all_getters(&payload[..len]) {
                assert_eq!(
                    result,
                    Err(PayloadHeaderError::TruncatedHeader { payload_size: len })
                );
            }
        }
    }

    #[test]
    fn test_bad_signature_rejected() {
        let raw = raw_header(u32::from_le_bytes(*b"MSS2"), 16);
        for result in all_getters(&raw) {
            assert_eq!(
                result,
                Err(PayloadHeaderError::InvalidSignature(u32::from_le_bytes(
                    *b"MSS2"
                )))
            );
        }
    }

    #[test]
    fn test_header_size_too_small() {
        let raw = raw_header(FMP_PAYLOAD_HEADER_SIGNATURE, 15);
        for result in all_getters(&raw) {
            assert_eq!(
                result,
                Err(PayloadHeaderError::HeaderSizeTooSmall { header_size: 15 })
            );
        }
    }

    #[test]
    fn test_header_size_past_payload() {
        for header_size in [21, 0x1000, u32::MAX - 8, u32::MAX] {
            let raw = raw_header(FMP_PAYLOAD_HEADER_SIGNATURE, header_size);
            for result in all_getters(&raw) {
                assert_eq!(
                    result,
                    Err(PayloadHeaderError::HeaderSizeOutOfBounds {
                        header_size,
                        payload_size: 20
                    })
                );
            }
            assert!(FmpPayloadHeader::parse(&raw).is_err());
        }
    }

    #[test]
    fn test_parse_view() {
        let deps = [
            FwDependency::new(Uuid::from_u128(1), 5, 0, DependencyFlags::REQUIRED),
            FwDependency::new(Uuid::from_u128(2), 9, 1, DependencyFlags::empty()),
        ];
        let payload = build_payload(7, 3, &deps, &[0xDE, 0xAD]);
        let header = FmpPayloadHeader::parse(&payload).unwrap();

        assert_eq!(header.header_size(), 16 + 2 * 24);
        assert_eq!(header.fw_version(), 7);
        assert_eq!(header.lowest_supported_version(), 3);
        assert_eq!(header.dependency_bytes().len(), 48);
        assert_eq!(header.dependencies().unwrap(), &deps[..]);
        assert_eq!(header.image(), &[0xDE, 0xAD]);
    }

    #[test]
    fn test_parse_header_only_payload() {
        let payload = build_payload(2, 1, &[], &[]);
        assert_eq!(payload.len(), FMP_PAYLOAD_HEADER_FIXED_SIZE);
        let header = FmpPayloadHeader::parse(&payload).unwrap();
        assert_eq!(header.header_size(), 16);
        assert_eq!(header.dependencies(), Ok(&[][..]));
        assert!(header.image().is_empty());

        // The getters still require the fixed header to lie strictly inside the payload.
        for result in all_getters(&payload) {
            assert_eq!(
                result,
                Err(PayloadHeaderError::TruncatedHeader { payload_size: 16 })
            );
        }

        let deps = [FwDependency::new(Uuid::from_u128(3), 1, 0, DependencyFlags::REQUIRED)];
        let payload = build_payload(2, 1, &deps, &[]);
        let header = FmpPayloadHeader::parse(&payload).unwrap();
        assert_eq!(header.dependencies().unwrap(), &deps[..]);
        assert_eq!(get_header_size(&payload), Ok(40));

        for len in 0..FMP_PAYLOAD_HEADER_FIXED_SIZE {
            assert_eq!(
                FmpPayloadHeader::parse(&payload[..len]).map(|h| h.header_size()),
                Err(PayloadHeaderError::TruncatedHeader { payload_size: len })
            );
        }
    }

    #[test]
    fn test_misaligned_dependency_list() {
        let mut raw = [0u8; 64];
        raw[..20].copy_from_slice(&raw_header(FMP_PAYLOAD_HEADER_SIGNATURE, 16 + 25));
        let header = FmpPayloadHeader::parse(&raw).unwrap();
        assert_eq!(
            header.dependencies(),
            Err(PayloadHeaderError::InvalidDependencyListSize(25))
        );

        // Getters only look at the fixed header.
        assert_eq!(get_header_size(&raw), Ok(41));
    }
}
