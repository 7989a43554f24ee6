//! Targeted object parsing
//!
//! Only three class kinds are ever opened: `MonoScript` for the script
//! name table, `MonoBehaviour` for its script pointer, and `GameObject`
//! for its component list. Each parser gets a fresh cursor over the
//! object's payload in the owning file's endianness.

use crate::error::{InsightError, Result};
use crate::reader::{BinaryReader, ByteOrder};

/// Length-prefixed strings inside objects are rejected past this size.
pub const MAX_NAME_LEN: usize = 1024;

/// Component lists past this bound are treated as garbage.
const MAX_COMPONENTS: i32 = 1000;

/// A typed reference to an object, possibly in another file.
/// `file_id` 0 means the same file; positive values index the externals
/// list 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PPtr {
    pub file_id: i32,
    pub path_id: i64,
}

fn read_pptr(reader: &mut BinaryReader, version: i32) -> Result<PPtr> {
    let file_id = reader.read_i32()?;
    let path_id = if version >= 14 {
        reader.read_i64()?
    } else {
        reader.read_i32()? as i64
    };
    Ok(PPtr { file_id, path_id })
}

/// A `MonoScript` payload reduced to what evidence fusion needs.
#[derive(Debug, Clone)]
pub struct MonoScript {
    pub script_name: String,
    pub class_name: String,
    pub namespace: String,
    pub assembly_name: String,
}

impl MonoScript {
    /// `namespace.class`, or plain class name, or the script name when the
    /// class name is empty.
    pub fn qualified_name(&self) -> String {
        if self.class_name.is_empty() {
            self.script_name.clone()
        } else if self.namespace.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}.{}", self.namespace, self.class_name)
        }
    }
}

/// Parse a `MonoScript` object payload.
pub fn parse_mono_script(data: &[u8], byte_order: ByteOrder) -> Result<MonoScript> {
    let mut reader = BinaryReader::new(data, byte_order);
    let script_name = reader.read_aligned_string(MAX_NAME_LEN)?;
    let _execution_order = reader.read_i32()?;
    reader.skip(16)?; // properties hash
    let class_name = reader.read_aligned_string(MAX_NAME_LEN)?;
    let namespace = reader.read_aligned_string(MAX_NAME_LEN)?;
    let assembly_name = reader.read_aligned_string(MAX_NAME_LEN)?;
    Ok(MonoScript {
        script_name,
        class_name,
        namespace,
        assembly_name,
    })
}

/// Read a `MonoBehaviour` payload up to its script pointer.
pub fn parse_mono_behaviour_script(
    data: &[u8],
    byte_order: ByteOrder,
    version: i32,
) -> Result<PPtr> {
    let mut reader = BinaryReader::new(data, byte_order);
    let _game_object = read_pptr(&mut reader, version)?;
    let _enabled = reader.read_u8()?;
    reader.align();
    read_pptr(&mut reader, version)
}

/// A `GameObject` payload: its component pointers, layer, and name.
#[derive(Debug, Clone)]
pub struct GameObjectRecord {
    pub components: Vec<PPtr>,
    pub layer: i32,
    pub name: String,
}

/// Parse a `GameObject` object payload.
pub fn parse_game_object(
    data: &[u8],
    byte_order: ByteOrder,
    version: i32,
) -> Result<GameObjectRecord> {
    let mut reader = BinaryReader::new(data, byte_order);
    let count = reader.read_i32()?;
    if !(0..=MAX_COMPONENTS).contains(&count) {
        return Err(InsightError::malformed(format!(
            "component count {count} outside 0..={MAX_COMPONENTS}"
        )));
    }
    let mut components = Vec::with_capacity(count as usize);
    for _ in 0..count {
        components.push(read_pptr(&mut reader, version)?);
    }
    let layer = reader.read_i32()?;
    // Name-length alignment after the string is deliberately not applied.
    let name = reader.read_sized_string(MAX_NAME_LEN)?;
    Ok(GameObjectRecord {
        components,
        layer,
        name,
    })
}
