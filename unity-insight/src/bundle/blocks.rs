//! Storage blocks and node directory of a bundle

use crate::compression::CompressionType;
use crate::error::Result;
use serde::Serialize;

/// Node flag marking serialized-file content.
pub const NODE_FLAG_SERIALIZED: u32 = 0x04;

/// One compressed storage block.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StorageBlock {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub flags: u16,
}

impl StorageBlock {
    pub fn compression_type(&self) -> Result<CompressionType> {
        CompressionType::from_flags(self.flags as u32)
    }
}

/// One named node in the bundle directory, addressed in the uncompressed
/// concatenation of all storage blocks.
#[derive(Debug, Clone, Serialize)]
pub struct BundleNode {
    pub offset: i64,
    pub size: i64,
    pub flags: u32,
    pub path: String,
}

impl BundleNode {
    /// Last path segment, the name serialized files are keyed by.
    pub fn basename(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }

    fn is_resource_blob(&self) -> bool {
        let lower = self.path.to_ascii_lowercase();
        lower.ends_with(".ress") || lower.ends_with(".resource")
    }

    /// Whether this node should be handed to the serialized-asset reader:
    /// marked serialized via flags, or named like a serialized file.
    /// Resource blobs are never parsed.
    pub fn is_serialized_candidate(&self) -> bool {
        if self.is_resource_blob() {
            return false;
        }
        if self.flags & NODE_FLAG_SERIALIZED != 0 {
            return true;
        }
        looks_serialized(self.basename())
    }

    pub fn end_offset(&self) -> i64 {
        self.offset + self.size
    }
}

/// Name-shape test shared with standalone container entries: asset-file
/// suffixes, scene files, global managers, and the built-in resource
/// sentinels.
pub fn looks_serialized(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".assets")
        || lower.ends_with(".sharedassets")
        || lower.contains("globalgamemanagers")
        || lower.starts_with("level")
        || lower.contains("unity_builtin_extra")
        || lower.contains("unity default resources")
}
