//! Fixture builders: serialized asset files, `UnityFS` bundles, and ZIP
//! containers assembled in memory byte-for-byte.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const GAME_OBJECT: i32 = 1;
pub const TRANSFORM: i32 = 4;
pub const MONO_BEHAVIOUR: i32 = 114;
pub const MONO_SCRIPT: i32 = 115;

/// Little-endian byte sink for object payloads and metadata sections.
#[derive(Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn i16(mut self, v: i16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    pub fn i32(mut self, v: i32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    pub fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    pub fn i64(mut self, v: i64) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    pub fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }
    pub fn zeros(mut self, n: usize) -> Self {
        self.0.extend(std::iter::repeat(0).take(n));
        self
    }
    pub fn cstr(mut self, s: &str) -> Self {
        self.0.extend_from_slice(s.as_bytes());
        self.0.push(0);
        self
    }
    /// Length-prefixed string padded to a 4-byte boundary.
    pub fn aligned_str(mut self, s: &str) -> Self {
        self.0.extend_from_slice(&(s.len() as i32).to_le_bytes());
        self.0.extend_from_slice(s.as_bytes());
        while self.0.len() % 4 != 0 {
            self.0.push(0);
        }
        self
    }
    /// Length-prefixed string without padding.
    pub fn raw_str(mut self, s: &str) -> Self {
        self.0.extend_from_slice(&(s.len() as i32).to_le_bytes());
        self.0.extend_from_slice(s.as_bytes());
        self
    }
}

/// `MonoScript` payload.
pub fn mono_script_payload(script_name: &str, class: &str, namespace: &str, assembly: &str) -> Vec<u8> {
    Bytes::new()
        .aligned_str(script_name)
        .i32(0) // execution order
        .zeros(16) // properties hash
        .aligned_str(class)
        .aligned_str(namespace)
        .aligned_str(assembly)
        .0
}

/// `MonoBehaviour` payload up to its script pointer (plus a name tail).
pub fn mono_behaviour_payload(game_object: i64, script_file: i32, script_path: i64) -> Vec<u8> {
    Bytes::new()
        .i32(0)
        .i64(game_object)
        .u8(1) // enabled
        .zeros(3)
        .i32(script_file)
        .i64(script_path)
        .raw_str("behaviour")
        .0
}

/// `GameObject` payload.
pub fn game_object_payload(components: &[(i32, i64)], layer: i32, name: &str) -> Vec<u8> {
    let mut b = Bytes::new().i32(components.len() as i32);
    for &(file_id, path_id) in components {
        b = b.i32(file_id).i64(path_id);
    }
    b.i32(layer).raw_str(name).0
}

/// Builder for a format-17, little-endian serialized asset file.
pub struct AssetBuilder {
    unity_version: String,
    types: Vec<i32>,
    objects: Vec<(i64, usize, Vec<u8>)>,
    externals: Vec<String>,
}

impl AssetBuilder {
    pub fn new(unity_version: &str) -> Self {
        Self {
            unity_version: unity_version.to_string(),
            types: Vec::new(),
            objects: Vec::new(),
            externals: Vec::new(),
        }
    }

    pub fn external(mut self, path: &str) -> Self {
        self.externals.push(path.to_string());
        self
    }

    pub fn object(mut self, path_id: i64, class_id: i32, payload: Vec<u8>) -> Self {
        let type_index = match self.types.iter().position(|&c| c == class_id) {
            Some(i) => i,
            None => {
                self.types.push(class_id);
                self.types.len() - 1
            }
        };
        self.objects.push((path_id, type_index, payload));
        self
    }

    pub fn build(self) -> Vec<u8> {
        // Metadata, little-endian per the endian flag below.
        let mut meta = Bytes::new();
        // type table: no trees
        meta = meta.u8(0).i32(self.types.len() as i32);
        for &class_id in &self.types {
            meta = meta.i32(class_id).u8(0).i16(-1);
            if class_id == MONO_BEHAVIOUR || class_id < 0 {
                meta = meta.zeros(16); // script hash
            }
            meta = meta.zeros(16); // type hash
        }
        // object directory, payloads packed back to back
        meta = meta.i32(self.objects.len() as i32);
        let mut cursor = 0i64;
        for (path_id, type_index, payload) in &self.objects {
            meta = meta
                .i64(*path_id)
                .i32(cursor as i32)
                .u32(payload.len() as u32)
                .i32(*type_index as i32);
            cursor += payload.len() as i64;
        }
        // scripts table, empty
        meta = meta.i32(0);
        // externals
        meta = meta.i32(self.externals.len() as i32);
        for path in &self.externals {
            meta = meta.cstr("").zeros(16).i32(0).cstr(path);
        }

        let pre_data = 20 + self.unity_version.len() + 1 + 4 + meta.0.len();
        let data_offset = (pre_data + 15) & !15;
        let file_size = data_offset
            + self
                .objects
                .iter()
                .map(|(_, _, p)| p.len())
                .sum::<usize>();

        let mut out = Vec::new();
        out.extend_from_slice(&(meta.0.len() as i32).to_be_bytes());
        out.extend_from_slice(&(file_size as i32).to_be_bytes());
        out.extend_from_slice(&17i32.to_be_bytes());
        out.extend_from_slice(&(data_offset as i32).to_be_bytes());
        out.push(0); // little endian
        out.extend_from_slice(&[0; 3]);
        out.extend_from_slice(self.unity_version.as_bytes());
        out.push(0);
        out.extend_from_slice(&13i32.to_le_bytes()); // Android
        out.extend_from_slice(&meta.0);
        out.resize(data_offset, 0);
        for (_, _, payload) in &self.objects {
            out.extend_from_slice(payload);
        }
        out
    }
}

/// Build a `UnityFS` bundle. Each block is `(plain bytes, block flags)`;
/// flag 2 LZ4-compresses the block, 0 stores it. Nodes are
/// `(offset, size, node flags, path)`.
pub fn build_bundle(
    version: i32,
    blocks: &[(Vec<u8>, u16)],
    nodes: &[(i64, i64, u32, &str)],
) -> Vec<u8> {
    let packed: Vec<Vec<u8>> = blocks
        .iter()
        .map(|(plain, flags)| match flags & 0x3F {
            0 => plain.clone(),
            2 | 3 => lz4_flex::compress(plain),
            other => panic!("fixture block flags {other}"),
        })
        .collect();

    let mut info = Vec::new();
    info.extend_from_slice(&[0u8; 16]);
    info.extend_from_slice(&(blocks.len() as i32).to_be_bytes());
    for ((plain, flags), packed) in blocks.iter().zip(&packed) {
        info.extend_from_slice(&(plain.len() as u32).to_be_bytes());
        info.extend_from_slice(&(packed.len() as u32).to_be_bytes());
        info.extend_from_slice(&flags.to_be_bytes());
    }
    info.extend_from_slice(&(nodes.len() as i32).to_be_bytes());
    for (offset, size, flags, path) in nodes {
        info.extend_from_slice(&offset.to_be_bytes());
        info.extend_from_slice(&size.to_be_bytes());
        info.extend_from_slice(&(*flags as i32).to_be_bytes());
        info.extend_from_slice(path.as_bytes());
        info.push(0);
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"UnityFS\0");
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(b"5.x.x\0");
    out.extend_from_slice(b"2022.3.14f1\0");
    out.extend_from_slice(&0i64.to_be_bytes());
    let size_at = out.len() - 8;
    out.extend_from_slice(&(info.len() as i32).to_be_bytes());
    out.extend_from_slice(&(info.len() as i32).to_be_bytes());
    out.extend_from_slice(&0i32.to_be_bytes()); // info after header, stored
    if version >= 7 {
        while out.len() % 16 != 0 {
            out.push(0);
        }
    }
    out.extend_from_slice(&info);
    if version >= 7 {
        while out.len() % 16 != 0 {
            out.push(0);
        }
    }
    for packed in &packed {
        out.extend_from_slice(packed);
    }
    let total = out.len() as i64;
    out[size_at..size_at + 8].copy_from_slice(&total.to_be_bytes());
    out
}

/// Write a ZIP container with stored entries.
pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (entry_name, bytes) in entries {
        writer.start_file(*entry_name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
    path
}
