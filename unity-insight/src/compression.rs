//! Compression support for bundle payloads

use crate::error::{InsightError, Result};
use tracing::warn;

/// Compression schemes named by bundle flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// No compression
    None = 0,
    /// LZMA compression (recognized, declined)
    Lzma = 1,
    /// LZ4 block compression
    Lz4 = 2,
    /// LZ4HC; same frameless block codec as LZ4 on the decode side
    Lz4Hc = 3,
}

impl CompressionType {
    /// Decode the compression scheme from the low 6 bits of a flags word.
    pub fn from_flags(flags: u32) -> Result<Self> {
        match flags & flags::COMPRESSION_MASK {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Lzma),
            2 => Ok(CompressionType::Lz4),
            3 => Ok(CompressionType::Lz4Hc),
            other => Err(InsightError::UnsupportedCompression(other)),
        }
    }

    /// Whether this scheme can be decoded here.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            CompressionType::None | CompressionType::Lz4 | CompressionType::Lz4Hc
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "None",
            CompressionType::Lzma => "LZMA",
            CompressionType::Lz4 => "LZ4",
            CompressionType::Lz4Hc => "LZ4HC",
        }
    }
}

/// Flag masks shared by the bundle header and storage-block records.
pub mod flags {
    /// Low six bits select the compression scheme.
    pub const COMPRESSION_MASK: u32 = 0x3F;
    /// Padding follows the block table (not applied; see DESIGN.md).
    pub const BLOCK_INFO_PADDING: u32 = 0x40;
    /// Block-info directory sits at the end of the stream.
    pub const BLOCK_INFO_AT_END: u32 = 0x80;
}

/// Decompress `data` according to `compression`, expecting roughly
/// `uncompressed_size` bytes out.
///
/// LZ4 gets one retry with a larger buffer; an output length that differs
/// from the declared size is accepted and logged. LZMA is declined.
pub fn decompress(
    data: &[u8],
    compression: CompressionType,
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Lz4 | CompressionType::Lz4Hc => decompress_lz4(data, uncompressed_size),
        CompressionType::Lzma => Err(InsightError::UnsupportedCompression(
            CompressionType::Lzma as u32,
        )),
    }
}

fn decompress_lz4(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let decoded = match lz4_flex::block::decompress(data, uncompressed_size) {
        Ok(out) => out,
        Err(first) => {
            let retry_size = uncompressed_size.saturating_mul(2).max(64);
            match lz4_flex::block::decompress(data, retry_size) {
                Ok(out) => out,
                Err(_) => return Err(first.into()),
            }
        }
    };
    if decoded.is_empty() && uncompressed_size > 0 {
        return Err(InsightError::decompression(
            "LZ4 decode produced no output".to_string(),
        ));
    }
    if decoded.len() != uncompressed_size {
        warn!(
            declared = uncompressed_size,
            actual = decoded.len(),
            "LZ4 output length differs from declared size"
        );
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(
            CompressionType::from_flags(0).unwrap(),
            CompressionType::None
        );
        assert_eq!(CompressionType::from_flags(2).unwrap(), CompressionType::Lz4);
        assert_eq!(
            CompressionType::from_flags(3).unwrap(),
            CompressionType::Lz4Hc
        );
        // High bits do not disturb the scheme
        assert_eq!(
            CompressionType::from_flags(0x43 | flags::BLOCK_INFO_AT_END).unwrap(),
            CompressionType::Lz4Hc
        );
        assert!(matches!(
            CompressionType::from_flags(5),
            Err(InsightError::UnsupportedCompression(5))
        ));
    }

    #[test]
    fn test_lzma_declined() {
        assert!(!CompressionType::Lzma.is_supported());
        assert!(matches!(
            decompress(&[0u8; 16], CompressionType::Lzma, 16),
            Err(InsightError::UnsupportedCompression(1))
        ));
    }

    #[test]
    fn test_none_roundtrip() {
        let data = b"plain bytes";
        let out = decompress(data, CompressionType::None, data.len()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_lz4_roundtrip() {
        let plain: Vec<u8> = (0..512u32).map(|i| (i % 251) as u8).collect();
        let packed = lz4_flex::compress(&plain);
        let out = decompress(&packed, CompressionType::Lz4, plain.len()).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn test_lz4_garbage_fails() {
        let garbage = [0xFFu8; 24];
        assert!(decompress(&garbage, CompressionType::Lz4, 1024).is_err());
    }
}
