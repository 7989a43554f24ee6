//! `UnityFS` bundle header

use crate::compression::{flags, CompressionType};
use crate::error::{InsightError, Result};
use crate::reader::BinaryReader;
use serde::Serialize;

/// Signature carried by the bundles this pipeline reads.
pub const UNITY_FS: &str = "UnityFS";

/// Header of a `UnityFS` bundle.
///
/// All header fields are big-endian. Legacy signatures (`UnityWeb`,
/// `UnityRaw`) and encrypted bundles are out of scope; anything that is
/// not `UnityFS` is reported as [`InsightError::BadSignature`] so the
/// caller can skip the blob quietly.
#[derive(Debug, Clone, Serialize)]
pub struct BundleHeader {
    pub signature: String,
    pub version: i32,
    /// Engine version that produced the bundle (e.g. `5.x.x`)
    pub unity_version: String,
    /// Engine revision (e.g. `2022.3.14f1`)
    pub unity_revision: String,
    /// Declared total bundle size
    pub size: i64,
    pub compressed_blocks_info_size: u32,
    pub uncompressed_blocks_info_size: u32,
    pub flags: u32,
}

impl BundleHeader {
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        let signature = reader.read_cstring()?;
        if signature != UNITY_FS {
            return Err(InsightError::BadSignature(signature));
        }
        let version = reader.read_i32()?;
        let unity_version = reader.read_cstring()?;
        let unity_revision = reader.read_cstring()?;
        let size = reader.read_i64()?;
        let compressed_blocks_info_size = reader.read_i32()? as u32;
        let uncompressed_blocks_info_size = reader.read_i32()? as u32;
        let flags = reader.read_i32()? as u32;

        Ok(Self {
            signature,
            version,
            unity_version,
            unity_revision,
            size,
            compressed_blocks_info_size,
            uncompressed_blocks_info_size,
            flags,
        })
    }

    /// Compression scheme of the block-info directory.
    pub fn blocks_info_compression(&self) -> Result<CompressionType> {
        CompressionType::from_flags(self.flags)
    }

    /// Whether the block-info directory sits at the end of the stream.
    pub fn block_info_at_end(&self) -> bool {
        self.flags & flags::BLOCK_INFO_AT_END != 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.version <= 0 {
            return Err(InsightError::malformed(format!(
                "bundle version {}",
                self.version
            )));
        }
        if self.compressed_blocks_info_size == 0 {
            return Err(InsightError::malformed("empty block-info directory"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ByteOrder;

    fn header_bytes(flags: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"UnityFS\0");
        data.extend_from_slice(&6i32.to_be_bytes());
        data.extend_from_slice(b"5.x.x\0");
        data.extend_from_slice(b"2022.3.14f1\0");
        data.extend_from_slice(&4096i64.to_be_bytes());
        data.extend_from_slice(&100i32.to_be_bytes());
        data.extend_from_slice(&200i32.to_be_bytes());
        data.extend_from_slice(&(flags as i32).to_be_bytes());
        data
    }

    #[test]
    fn test_parse_header() {
        let data = header_bytes(0x43);
        let mut reader = BinaryReader::new(&data, ByteOrder::Big);
        let header = BundleHeader::from_reader(&mut reader).unwrap();
        assert_eq!(header.version, 6);
        assert_eq!(header.unity_revision, "2022.3.14f1");
        assert_eq!(header.size, 4096);
        assert_eq!(header.compressed_blocks_info_size, 100);
        assert_eq!(
            header.blocks_info_compression().unwrap(),
            CompressionType::Lz4Hc
        );
        assert!(!header.block_info_at_end());
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_block_info_at_end_flag() {
        let data = header_bytes(0x80);
        let mut reader = BinaryReader::new(&data, ByteOrder::Big);
        let header = BundleHeader::from_reader(&mut reader).unwrap();
        assert!(header.block_info_at_end());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let mut data = header_bytes(0);
        data[5] = b'W'; // UnityWS
        let mut reader = BinaryReader::new(&data, ByteOrder::Big);
        assert!(matches!(
            BundleHeader::from_reader(&mut reader),
            Err(InsightError::BadSignature(_))
        ));
    }
}
