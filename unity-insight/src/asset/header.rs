//! Serialized-file header

use crate::error::{InsightError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use serde::Serialize;

/// Header of a serialized asset file.
///
/// The first four fields are always big-endian. From version 9 an endian
/// flag governs every later metadata read; version 22 replaces the four
/// initial values with an extended header (read big-endian, before the
/// endian flag takes effect).
#[derive(Debug, Clone, Serialize)]
pub struct AssetHeader {
    pub metadata_size: i64,
    pub file_size: i64,
    pub version: i32,
    pub data_offset: i64,
    /// Endianness of all metadata reads past the header. Versions before
    /// 9 carry no flag and are treated as big-endian.
    pub big_endian: bool,
    /// Engine version recorded in the file (version ≥ 7)
    pub unity_version: String,
    /// Build target platform (version ≥ 7)
    pub target_platform: i32,
}

impl AssetHeader {
    /// Parse the header and leave `reader` positioned after it with the
    /// byte order the rest of the metadata must be read in.
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        reader.set_byte_order(ByteOrder::Big);
        let mut metadata_size = reader.read_i32()? as i64;
        let mut file_size = reader.read_i32()? as i64;
        let version = reader.read_i32()?;
        let mut data_offset = reader.read_i32()? as i64;

        if !(1..100).contains(&version) {
            return Err(InsightError::malformed(format!(
                "implausible serialized-file version {version}"
            )));
        }

        let mut big_endian = true;
        if version >= 9 {
            big_endian = reader.read_u8()? == 1;
            reader.skip(3)?;
        }
        if version >= 22 {
            // Extended header replaces the four initial values outright.
            metadata_size = reader.read_u32()? as i64;
            file_size = reader.read_i64()?;
            data_offset = reader.read_i64()?;
            reader.skip(8)?;
        }

        reader.set_byte_order(if big_endian {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        });

        let mut unity_version = String::new();
        let mut target_platform = 0;
        if version >= 7 {
            unity_version = reader.read_cstring()?;
            target_platform = reader.read_i32()?;
        }

        let header = Self {
            metadata_size,
            file_size,
            version,
            data_offset,
            big_endian,
            unity_version,
            target_platform,
        };
        header.validate()?;
        Ok(header)
    }

    pub fn byte_order(&self) -> ByteOrder {
        if self.big_endian {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.metadata_size < 0 || self.file_size < 0 || self.data_offset < 0 {
            return Err(InsightError::malformed(format!(
                "negative header field (metadata {}, file {}, data offset {})",
                self.metadata_size, self.file_size, self.data_offset
            )));
        }
        Ok(())
    }
}
