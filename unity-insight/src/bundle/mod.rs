//! `UnityFS` bundle reading
//!
//! A bundle is a header, a (possibly LZ4-compressed, possibly end-of-file)
//! block-info directory, a table of compressed storage blocks, and a node
//! directory addressing the uncompressed concatenation of those blocks.
//! Nodes are materialized individually, decompressing only the blocks that
//! cover the requested range.

mod blocks;
mod header;

pub use blocks::{looks_serialized, BundleNode, StorageBlock, NODE_FLAG_SERIALIZED};
pub use header::{BundleHeader, UNITY_FS};

use crate::compression::decompress;
use crate::error::{InsightError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use tracing::debug;

/// Bundle versions from which block-info and data starts are 16-byte
/// aligned.
const ALIGNED_VERSION: i32 = 7;

/// A parsed bundle holding the raw stream plus its directory.
#[derive(Debug)]
pub struct BundleFile {
    pub header: BundleHeader,
    pub blocks: Vec<StorageBlock>,
    pub nodes: Vec<BundleNode>,
    data: Vec<u8>,
    /// Absolute offset of the first storage block in `data`.
    data_start: u64,
}

impl BundleFile {
    /// Parse a bundle from its raw bytes.
    ///
    /// Non-`UnityFS` blobs come back as [`InsightError::BadSignature`];
    /// block-info compression outside none/LZ4/LZ4HC as
    /// [`InsightError::UnsupportedCompression`]. Both are meant to be
    /// skipped by the caller, not surfaced.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let mut reader = BinaryReader::new(&data, ByteOrder::Big);
        let header = BundleHeader::from_reader(&mut reader)?;
        header.validate()?;

        let info_size = header.compressed_blocks_info_size as usize;
        let mut after_header = reader.position();
        if header.version >= ALIGNED_VERSION {
            after_header = align16(after_header);
        }

        let (info_range, data_start) = if header.block_info_at_end() {
            if info_size > data.len() {
                return Err(InsightError::short_read(info_size, data.len()));
            }
            ((data.len() - info_size)..data.len(), after_header)
        } else {
            let start = after_header as usize;
            let end = start.checked_add(info_size).unwrap_or(usize::MAX);
            if end > data.len() {
                return Err(InsightError::short_read(
                    info_size,
                    data.len().saturating_sub(start),
                ));
            }
            let mut data_start = end as u64;
            if header.version >= ALIGNED_VERSION {
                data_start = align16(data_start);
            }
            (start..end, data_start)
        };

        let compression = header.blocks_info_compression()?;
        if !compression.is_supported() {
            return Err(InsightError::UnsupportedCompression(compression as u32));
        }
        let blocks_info = decompress(
            &data[info_range],
            compression,
            header.uncompressed_blocks_info_size as usize,
        )?;

        let (blocks, nodes) = parse_blocks_info(&blocks_info)?;
        debug!(
            version = header.version,
            unity_version = %header.unity_version,
            unity_revision = %header.unity_revision,
            blocks = blocks.len(),
            nodes = nodes.len(),
            "parsed bundle directory"
        );

        Ok(Self {
            header,
            blocks,
            nodes,
            data,
            data_start,
        })
    }

    /// Total uncompressed length of all storage blocks.
    pub fn uncompressed_len(&self) -> i64 {
        self.blocks
            .iter()
            .map(|b| b.uncompressed_size as i64)
            .sum()
    }

    /// Nodes that should be handed to the serialized-asset reader.
    pub fn serialized_nodes(&self) -> impl Iterator<Item = &BundleNode> {
        self.nodes.iter().filter(|n| n.is_serialized_candidate())
    }

    /// Materialize the byte content of one node.
    ///
    /// Only the storage blocks intersecting `[offset, offset + size)` are
    /// decompressed; the relevant sub-range of each is copied out.
    pub fn node_bytes(&self, node: &BundleNode) -> Result<Vec<u8>> {
        if node.size < 0 || node.offset < 0 {
            return Err(InsightError::malformed(format!(
                "node {:?} has negative extent",
                node.path
            )));
        }
        if node.end_offset() > self.uncompressed_len() {
            return Err(InsightError::malformed(format!(
                "node {:?} extends past the block space",
                node.path
            )));
        }
        let mut out = Vec::new();
        out.try_reserve_exact(node.size as usize)
            .map_err(|_| InsightError::Memory(node.size as u64))?;

        let start = node.offset;
        let end = node.end_offset();
        let mut comp_off = self.data_start as usize;
        let mut plain_off: i64 = 0;

        for block in &self.blocks {
            let block_start = plain_off;
            let block_end = plain_off + block.uncompressed_size as i64;
            let next_comp = comp_off
                .checked_add(block.compressed_size as usize)
                .filter(|&e| e <= self.data.len())
                .ok_or_else(|| {
                    InsightError::short_read(block.compressed_size as usize, self.data.len())
                })?;

            if block_end > start && block_start < end {
                let raw = &self.data[comp_off..next_comp];
                let plain = decompress(
                    raw,
                    block.compression_type()?,
                    block.uncompressed_size as usize,
                )?;
                let from = (start - block_start).max(0) as usize;
                let to = ((end - block_start).min(block.uncompressed_size as i64)) as usize;
                if to > plain.len() {
                    return Err(InsightError::decompression(format!(
                        "block under-produced: wanted {to} bytes, decoded {}",
                        plain.len()
                    )));
                }
                out.extend_from_slice(&plain[from..to]);
            }

            comp_off = next_comp;
            plain_off = block_end;
            if plain_off >= end {
                break;
            }
        }

        if out.len() as i64 != node.size {
            return Err(InsightError::malformed(format!(
                "node {:?}: materialized {} of {} bytes",
                node.path,
                out.len(),
                node.size
            )));
        }
        Ok(out)
    }
}

fn align16(pos: u64) -> u64 {
    (pos + 15) & !15
}

/// Parse the decompressed block-info payload: a 16-byte hash, the storage
/// block table, then the node directory. All fields big-endian.
fn parse_blocks_info(data: &[u8]) -> Result<(Vec<StorageBlock>, Vec<BundleNode>)> {
    let mut reader = BinaryReader::new(data, ByteOrder::Big);
    reader.skip(16)?;

    let block_count = reader.read_i32()?;
    if block_count < 0 {
        return Err(InsightError::malformed(format!(
            "block count {block_count}"
        )));
    }
    let mut blocks = Vec::with_capacity(block_count as usize);
    for _ in 0..block_count {
        blocks.push(StorageBlock {
            uncompressed_size: reader.read_u32()?,
            compressed_size: reader.read_u32()?,
            flags: reader.read_u16()?,
        });
    }

    let node_count = reader.read_i32()?;
    if node_count < 0 {
        return Err(InsightError::malformed(format!("node count {node_count}")));
    }
    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        nodes.push(BundleNode {
            offset: reader.read_i64()?,
            size: reader.read_i64()?,
            flags: reader.read_i32()? as u32,
            path: reader.read_cstring()?,
        });
    }
    Ok((blocks, nodes))
}
