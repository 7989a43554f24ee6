//! Serialized asset files
//!
//! The engine's on-disk object store: header, type table, object
//! directory, scripts table, externals list, then the data region. Only
//! the structures needed to locate `GameObject`, `MonoBehaviour` and
//! `MonoScript` payloads are retained; type trees are skipped over, never
//! reconstructed.

mod header;
pub mod objects;
mod types;

pub use header::AssetHeader;
pub use types::{class_ids, class_name, ObjectInfo};

use crate::error::{InsightError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use std::collections::HashMap;
use tracing::debug;

/// A parsed serialized asset file.
#[derive(Debug)]
pub struct SerializedAsset {
    /// Original file name (container entry or bundle node basename)
    pub name: String,
    pub header: AssetHeader,
    /// Type table reduced to its class ids, in table order
    pub class_ids: Vec<i32>,
    pub objects: Vec<ObjectInfo>,
    /// Basenames of externally referenced asset files, in input order
    pub externals: Vec<String>,
    data: Vec<u8>,
    by_path_id: HashMap<i64, usize>,
}

impl SerializedAsset {
    /// Parse a serialized file from its raw bytes.
    pub fn parse(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let mut reader = BinaryReader::new(&data, ByteOrder::Big);
        let header = AssetHeader::from_reader(&mut reader)?;
        let version = header.version;

        let mut has_type_tree = false;
        let mut class_ids = Vec::new();
        if version >= 13 {
            has_type_tree = reader.read_bool()?;
            let type_count = reader.read_i32()?;
            if type_count < 0 {
                return Err(InsightError::malformed(format!("type count {type_count}")));
            }
            class_ids.reserve(type_count as usize);
            for _ in 0..type_count {
                class_ids.push(read_type_entry(&mut reader, version, has_type_tree)?);
            }
        }

        let object_count = reader.read_i32()?;
        if object_count < 0 {
            return Err(InsightError::malformed(format!(
                "object count {object_count}"
            )));
        }
        let mut objects = Vec::with_capacity(object_count.min(0x10_0000) as usize);
        for _ in 0..object_count {
            objects.push(read_object_entry(&mut reader, version, &class_ids)?);
        }

        if version >= 11 {
            skip_scripts_table(&mut reader, version)?;
        }

        let externals = read_externals(&mut reader, version)?;

        let by_path_id = objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.path_id, i))
            .collect();
        debug!(
            file = %name,
            version,
            objects = objects.len(),
            externals = externals.len(),
            "parsed serialized file"
        );

        Ok(Self {
            name,
            header,
            class_ids,
            objects,
            externals,
            data,
            by_path_id,
        })
    }

    /// The object with `path_id`, if present in this file.
    pub fn object_by_path(&self, path_id: i64) -> Option<&ObjectInfo> {
        self.by_path_id.get(&path_id).map(|&i| &self.objects[i])
    }

    /// Class id of the object with `path_id`, if present in this file.
    pub fn object_class(&self, path_id: i64) -> Option<i32> {
        self.object_by_path(path_id).map(|o| o.class_id)
    }

    /// Objects of one class kind, in directory order.
    pub fn objects_of_class(&self, class_id: i32) -> impl Iterator<Item = &ObjectInfo> {
        self.objects.iter().filter(move |o| o.class_id == class_id)
    }

    /// Payload bytes of one object, located in the data region.
    pub fn object_slice(&self, object: &ObjectInfo) -> Result<&[u8]> {
        let start = self
            .header
            .data_offset
            .checked_add(object.byte_start)
            .filter(|&s| s >= 0)
            .ok_or_else(|| InsightError::malformed("object start overflows"))?;
        let end = start
            .checked_add(object.byte_size as i64)
            .ok_or_else(|| InsightError::malformed("object end overflows"))?;
        if end as usize > self.data.len() {
            return Err(InsightError::malformed(format!(
                "object {} spans {start}..{end} past file end {}",
                object.path_id,
                self.data.len()
            )));
        }
        Ok(&self.data[start as usize..end as usize])
    }
}

/// Read one type-table entry, returning its class id. Type-tree payloads
/// are measured and skipped, never decoded.
fn read_type_entry(reader: &mut BinaryReader, version: i32, has_type_tree: bool) -> Result<i32> {
    let class_id = reader.read_i32()?;
    if version >= 16 {
        let _stripped = reader.read_u8()?;
    }
    if version >= 17 {
        let _script_type_index = reader.read_i16()?;
    }
    if class_id == class_ids::MONO_BEHAVIOUR || class_id < 0 {
        reader.skip(16)?; // script hash
    }
    reader.skip(16)?; // type hash
    if has_type_tree {
        let node_count = reader.read_i32()?;
        let string_size = reader.read_i32()?;
        if node_count < 0 || string_size < 0 {
            return Err(InsightError::malformed(format!(
                "type tree with node count {node_count}, string size {string_size}"
            )));
        }
        let node_width = if version >= 19 { 32 } else { 24 };
        reader.skip(node_count as usize * node_width + string_size as usize)?;
    }
    Ok(class_id)
}

fn read_object_entry(
    reader: &mut BinaryReader,
    version: i32,
    class_ids_table: &[i32],
) -> Result<ObjectInfo> {
    if version >= 22 {
        reader.align();
    }
    let path_id = if version >= 14 {
        reader.read_i64()?
    } else {
        reader.read_i32()? as i64
    };
    let byte_start = if version >= 22 {
        reader.read_i64()?
    } else {
        reader.read_i32()? as i64
    };
    let byte_size = reader.read_u32()?;
    let type_id = reader.read_i32()?;

    let class_id = if version < 16 {
        reader.read_u16()? as i32
    } else {
        let index = usize::try_from(type_id)
            .ok()
            .filter(|&i| i < class_ids_table.len())
            .ok_or_else(|| {
                InsightError::malformed(format!(
                    "type id {type_id} outside table of {}",
                    class_ids_table.len()
                ))
            })?;
        class_ids_table[index]
    };
    if version == 15 || version == 16 {
        let _stripped = reader.read_u8()?;
    }

    Ok(ObjectInfo {
        path_id,
        byte_start,
        byte_size,
        type_id,
        class_id,
    })
}

fn skip_scripts_table(reader: &mut BinaryReader, version: i32) -> Result<()> {
    let script_count = reader.read_i32()?;
    if script_count < 0 {
        return Err(InsightError::malformed(format!(
            "script count {script_count}"
        )));
    }
    for _ in 0..script_count {
        let _file_index = reader.read_i32()?;
        if version >= 14 {
            reader.read_i64()?;
        } else {
            reader.read_i32()?;
        }
    }
    Ok(())
}

fn read_externals(reader: &mut BinaryReader, version: i32) -> Result<Vec<String>> {
    let count = reader.read_i32()?;
    if count < 0 {
        return Err(InsightError::malformed(format!("external count {count}")));
    }
    let mut externals = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let path = if version >= 6 {
            let _asset_name = reader.read_cstring()?;
            reader.skip(16)?; // GUID
            let _type = reader.read_i32()?;
            reader.read_cstring()?
        } else {
            reader.read_cstring()?
        };
        let basename = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        externals.push(basename);
    }
    Ok(externals)
}
